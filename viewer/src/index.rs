//! Row to vertex resolution.
//!
//! Each stage addresses its bytes differently:
//!
//! - **Input**: rows follow the draw's index buffer (or `0..N`), and the
//!   draw's base vertex is applied before the buffer lookup.
//! - **Vertex output**: rows follow the engine's remap indices; the original
//!   indices are only displayed, shifted by the base vertex.
//! - **Geometry output**: rows are read in order; indices are displayed raw.

use meshview_core::mesh::{FormatElement, MeshDataStage};

use crate::dataset::Dataset;

/// What the index column shows for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayIndex {
    /// A resolved vertex index.
    Vertex(u32),
    /// The primitive restart sentinel, displayed as `-1`.
    Restart,
    /// No index available (missing index buffer or index out of range).
    Missing,
}

/// Addressing information for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIndex {
    pub row: usize,
    /// Record index used to locate per-vertex bytes.
    pub data_index: u32,
    pub display: DisplayIndex,
}

/// Applies a signed base vertex, clamping underflow at zero.
pub fn apply_base_vertex(index: u32, base_vertex: i32) -> u32 {
    if base_vertex >= 0 {
        index.saturating_add(base_vertex as u32)
    } else {
        let shift = base_vertex.unsigned_abs();
        if shift > index {
            log::debug!("base vertex {base_vertex} underflows index {index}, clamped to 0");
        }
        index.saturating_sub(shift)
    }
}

/// Resolves the data and display index of `row`.
pub fn resolve(dataset: &Dataset, row: usize) -> ResolvedIndex {
    if dataset.missing_index_buffer {
        return ResolvedIndex {
            row,
            data_index: 0,
            display: DisplayIndex::Missing,
        };
    }

    let raw_data = match &dataset.data_indices {
        Some(indices) => match indices.get(row) {
            Some(&i) => i,
            None => {
                return ResolvedIndex {
                    row,
                    data_index: 0,
                    display: DisplayIndex::Missing,
                };
            }
        },
        None => row as u32,
    };
    let raw_display = match &dataset.display_indices {
        Some(indices) => indices.get(row).copied(),
        None => None,
    };

    let data_index = match dataset.stage {
        MeshDataStage::VertexInput => apply_base_vertex(raw_data, dataset.base_vertex),
        _ => raw_data,
    };

    let display = match raw_display {
        Some(raw) if is_restart(dataset, raw) => DisplayIndex::Restart,
        Some(raw) => match dataset.stage {
            MeshDataStage::VertexInput | MeshDataStage::VertexOutput => {
                DisplayIndex::Vertex(apply_base_vertex(raw, dataset.base_vertex))
            }
            MeshDataStage::GeometryOutput => DisplayIndex::Vertex(raw),
        },
        None if dataset.display_indices.is_some() => DisplayIndex::Missing,
        None if dataset.data_indices.is_some() && is_restart(dataset, raw_data) => {
            DisplayIndex::Restart
        }
        None => DisplayIndex::Vertex(data_index),
    };

    ResolvedIndex {
        row,
        data_index,
        display,
    }
}

/// Whether a raw, unadjusted index is the restart sentinel of a strip draw.
fn is_restart(dataset: &Dataset, raw: u32) -> bool {
    let layout = &dataset.layout;
    let Some(format) = layout.index_format() else {
        return false;
    };
    matches!(format.size(), 2 | 4)
        && dataset.topology.is_strip()
        && layout.restart.active_sentinel() == Some(raw)
}

/// Record index an element reads from for a row resolved to `data_index`.
///
/// Per-instance elements advance once every `instance_rate` instances; a
/// rate of 0 pins them to the first record.
pub fn element_index(element: &FormatElement, data_index: u32, instance: u32) -> u32 {
    if element.per_instance {
        if element.instance_rate > 0 {
            instance / element.instance_rate
        } else {
            0
        }
    } else {
        data_index
    }
}
