//! Replay engine boundary for meshview.
//!
//! The mesh pipeline never talks to a graphics replay directly. It goes
//! through the [`ReplayEngine`] trait, whose three operations return boxed
//! futures (`Pin<Box<dyn Future + Send>>`). The futures are not
//! self-driving; run them on an async runtime.
//!
//! # Engines
//!
//! - [`MemoryEngine`] - In-memory buffers, textures and post-transform
//!   captures, with failure injection and call recording for tests
//!
//! Remote or capture-file backed engines implement [`ReplayEngine`] outside
//! this crate.

mod engine;
mod error;
mod memory;

pub use engine::{PostTransformData, ReplayEngine, ReplayFuture};
pub use error::{ReplayError, ReplayResult};
pub use memory::{EngineCall, MemoryEngine};
