use std::sync::Arc;

use meshview_core::mesh::{Layout, MeshDataStage, PrimitiveTopology};
use meshview_replay::ReplayError;

use crate::cache::RowCache;
use crate::decode::{Row, decode_row};

/// Non-fatal problem noticed while fetching a dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchDiagnostic {
    /// An engine call failed and the stage was degraded to an empty dataset.
    EngineFailure { call: &'static str, error: ReplayError },
    /// The engine returned fewer bytes than requested.
    ShortRead {
        buffer: Option<usize>,
        expected: u64,
        actual: u64,
    },
    /// A buffer slot is read by both per-vertex and per-instance elements.
    MixedBufferUsage { buffer: usize },
    /// The draw is indexed but no index buffer is bound.
    MissingIndexBuffer,
    /// A referenced buffer slot has nothing bound and was zero-filled.
    UnboundBuffer { buffer: usize },
}

/// The raw result of one fetch for one stage.
///
/// Datasets are immutable snapshots: a newer fetch always produces a new
/// `Dataset`, which starts with a fresh, empty row cache.
#[derive(Debug)]
pub struct Dataset {
    pub stage: MeshDataStage,
    pub layout: Arc<Layout>,
    /// Fetched bytes per buffer slot.
    pub buffers: Vec<Vec<u8>>,
    /// Index shown to the user per row.
    pub display_indices: Option<Vec<u32>>,
    /// Index used to locate bytes per row.
    pub data_indices: Option<Vec<u32>>,
    pub row_count: usize,
    pub topology: PrimitiveTopology,
    /// Stride replacing the layout's per-buffer strides (post-transform and raw views).
    pub stride_override: Option<u32>,
    pub base_vertex: i32,
    /// Instance the dataset was fetched for.
    pub instance: u32,
    /// Byte offset added to every read (raw views).
    pub byte_offset: u64,
    /// Indexed draw without a bound index buffer.
    pub missing_index_buffer: bool,
    pub diagnostics: Vec<FetchDiagnostic>,
    cache: RowCache,
}

impl Dataset {
    /// A dataset with no rows.
    pub fn empty(stage: MeshDataStage, layout: Arc<Layout>, instance: u32) -> Self {
        Self {
            stage,
            layout,
            buffers: Vec::new(),
            display_indices: None,
            data_indices: None,
            row_count: 0,
            topology: PrimitiveTopology::Unknown,
            stride_override: None,
            base_vertex: 0,
            instance,
            byte_offset: 0,
            missing_index_buffer: false,
            diagnostics: Vec::new(),
            cache: RowCache::new(0),
        }
    }

    /// Size the row cache to `row_count`. Called once by the fetcher.
    pub(crate) fn seal(mut self) -> Self {
        self.cache = RowCache::new(self.row_count);
        self
    }

    /// Stride used to address records of `buffer`.
    pub fn stride(&self, buffer: usize) -> u32 {
        self.stride_override
            .unwrap_or_else(|| self.layout.stride(buffer))
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Returns the decoded row, decoding and caching it on first access.
    ///
    /// Returns `None` for rows outside `0..row_count`.
    pub fn materialize(&self, row: usize) -> Option<Arc<Row>> {
        self.cache.get_or_insert_with(row, || decode_row(self, row))
    }

    /// Returns the row only if it has already been decoded.
    pub fn cached_row(&self, row: usize) -> Option<Arc<Row>> {
        self.cache.get(row)
    }

    pub fn cache(&self) -> &RowCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshview_core::mesh::{FormatElement, ResourceFormat, VertexBufferBinding};
    use meshview_core::ResourceId;

    #[test]
    fn empty_dataset_has_no_rows() {
        let ds = Dataset::empty(MeshDataStage::VertexOutput, Arc::new(Layout::new()), 2);
        assert!(ds.is_empty());
        assert_eq!(ds.instance, 2);
        assert!(ds.materialize(0).is_none());
    }

    #[test]
    fn stride_override_wins() {
        let layout = Arc::new(
            Layout::new()
                .with_buffer(VertexBufferBinding::new(ResourceId::new(1), 12))
                .with_element(FormatElement::new("POSITION", ResourceFormat::float(3))),
        );
        let mut ds = Dataset::empty(MeshDataStage::VertexInput, layout, 0);
        assert_eq!(ds.stride(0), 12);
        ds.stride_override = Some(32);
        assert_eq!(ds.stride(0), 32);
    }

    #[test]
    fn seal_sizes_the_cache() {
        let mut ds = Dataset::empty(MeshDataStage::VertexInput, Arc::new(Layout::new()), 0);
        ds.row_count = 4;
        let ds = ds.seal();
        assert_eq!(ds.cache().len(), 4);
        assert!(ds.cached_row(3).is_none());
    }
}
