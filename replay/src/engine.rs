use std::future::Future;
use std::pin::Pin;

use meshview_core::ResourceId;
use meshview_core::mesh::{MeshDataStage, PrimitiveTopology};

use crate::error::ReplayError;

/// A boxed, `Send` future returning a `Result`.
///
/// All [`ReplayEngine`] methods return this type so calls can be spawned on
/// any async runtime. The futures do not drive themselves.
pub type ReplayFuture<T> = Pin<Box<dyn Future<Output = Result<T, ReplayError>> + Send>>;

/// Where the engine stored one stage's post-transform vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostTransformData {
    /// Buffer holding the transformed vertices, `None` if the stage produced nothing.
    pub buffer: Option<ResourceId>,
    /// Engine-side index buffer mapping draw indices to rows of `buffer`.
    ///
    /// Uses the same index width as the original draw.
    pub remap_index_buffer: Option<ResourceId>,
    /// Byte offset of the first vertex in `buffer`.
    pub byte_offset: u64,
    /// Bytes between consecutive vertices.
    pub stride: u32,
    /// Number of vertices (or indices, when remapped).
    pub vertex_count: u32,
    /// Topology of the transformed output.
    pub topology: PrimitiveTopology,
    /// Base vertex the engine applied when capturing.
    pub base_vertex: i32,
}

/// Black-box access to a graphics replay.
///
/// Implementations may complete on any worker; callers never assume a call
/// is synchronous.
pub trait ReplayEngine: Send + Sync + 'static {
    /// Read `len` bytes of a buffer starting at `offset`.
    ///
    /// A `len` of 0 reads to the end. Reads past the end are truncated, so
    /// the result may be shorter than requested.
    fn get_buffer_bytes(&self, id: ResourceId, offset: u64, len: u64) -> ReplayFuture<Vec<u8>>;

    /// Read the bytes of one texture mip starting at `offset`.
    fn get_texture_bytes(&self, id: ResourceId, offset: u64, mip: u32) -> ReplayFuture<Vec<u8>>;

    /// Locate the post-transform capture of `stage` for `instance`.
    fn get_post_transform_data(
        &self,
        instance: u32,
        stage: MeshDataStage,
    ) -> ReplayFuture<PostTransformData>;
}
