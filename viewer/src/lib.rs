//! # meshview
//!
//! Fetches vertex data for a selected draw from a [`ReplayEngine`], decodes
//! it into typed rows and keeps the results consistent with the latest
//! selection.
//!
//! Three stages are served independently: vertex input, vertex output and
//! geometry output ([`MeshDataStage`]). Each selection change advances a
//! global fetch epoch; background jobs compare their token against it and
//! quietly stop once superseded, so the consumer only ever sees data from
//! the newest selection.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use meshview::{MeshPipeline, MeshSelection, ViewerConfig};
//! use meshview_core::mesh::{Layout, MeshDataStage};
//! use meshview_replay::MemoryEngine;
//!
//! let mut pipeline = MeshPipeline::new(Arc::new(MemoryEngine::new()), ViewerConfig::default());
//! pipeline.select(MeshSelection::new(0).with_stage(MeshDataStage::VertexInput, Layout::new()));
//! pipeline.wait_settled(Duration::from_secs(1));
//! let rows = pipeline.row_count(MeshDataStage::VertexInput);
//! # let _ = rows;
//! ```
//!
//! [`ReplayEngine`]: meshview_replay::ReplayEngine
//! [`MeshDataStage`]: meshview_core::mesh::MeshDataStage

mod bounds;
mod cache;
mod config;
mod dataset;
mod decode;
mod fetch;
mod format;
mod index;
mod job;
mod pipeline;
mod runtime;
mod stage_map;

pub use bounds::{BoundsAccumulator, ElementBounds, MeshBounds};
pub use cache::{CacheSuppressor, RowCache, SuppressGuard};
pub use config::{ConfigError, DecodeMode, FormatterConfig, ViewerConfig};
pub use dataset::{Dataset, FetchDiagnostic};
pub use decode::{Cell, Row, decode_row, decode_row_with_bounds, read_element, reshape_matrix};
pub use fetch::fetch;
pub use format::{MISSING, NumberFormatter, format_row, hex_digits};
pub use index::{DisplayIndex, ResolvedIndex, apply_base_vertex, element_index, resolve};
pub use job::{JobState, JobStatus, StageEvent, decode_all};
pub use pipeline::{MeshPipeline, MeshSelection, RowSlot};
pub use runtime::FetchRuntime;
pub use stage_map::StageMap;
