//! Mesh data model shared by the fetch and decode layers.
//!
//! - [`FormatElement`] / [`ResourceFormat`] - Per-attribute decode recipes
//! - [`Layout`] - One stage's elements, buffer bindings, index buffer and draw
//! - [`PrimitiveTopology`] / [`IndexFormat`] / [`PrimitiveRestart`] - Primitive assembly
//! - [`MeshDataStage`] - Which pipeline stage a dataset is captured from
//! - [`ComponentValue`] - A single decoded component

mod format;
mod layout;
mod stage;
mod topology;
mod value;

pub use format::{CompType, FormatElement, ResourceFormat, SpecialFormat, SystemValue};
pub use layout::{DrawParams, IndexBufferBinding, Layout, RawSource, VertexBufferBinding};
pub use stage::MeshDataStage;
pub use topology::{IndexFormat, PrimitiveRestart, PrimitiveTopology};
pub use value::ComponentValue;
