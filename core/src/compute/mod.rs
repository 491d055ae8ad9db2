//! Cooperative cancellation primitives.
//!
//! - [`FetchEpoch`] - Pipeline-wide counter bumped whenever the selection changes
//! - [`EpochToken`] - Snapshot of the counter carried by a fetch/decode job
//! - [`Cancelled`] - Error a job returns when its token has gone stale
//!
//! No job is ever interrupted from the outside. Jobs call
//! [`EpochToken::check`] at their own boundaries and unwind with `?`.

mod epoch;

pub use epoch::{Cancelled, EpochToken, FetchEpoch};
