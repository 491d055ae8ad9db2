//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use meshview::{MeshPipeline, ViewerConfig};
use meshview_core::ResourceId;
use meshview_core::mesh::{
    DrawParams, FormatElement, IndexBufferBinding, IndexFormat, Layout, MeshDataStage,
    ResourceFormat, VertexBufferBinding,
};
use meshview_replay::{MemoryEngine, PostTransformData, ReplayEngine, ReplayFuture};
use tokio::sync::Semaphore;

pub const VB: ResourceId = ResourceId::new(1);
pub const IB: ResourceId = ResourceId::new(2);
pub const POST_VS: ResourceId = ResourceId::new(10);
pub const REMAP_VS: ResourceId = ResourceId::new(11);

pub const SETTLE: Duration = Duration::from_secs(5);

pub fn init_logging() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

pub fn u16_bytes(values: &[u16]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

/// POSITION (float3) followed by TEXCOORD (float2) in one 20-byte stream.
pub fn position_uv_layout(vertex_count: u32) -> Layout {
    Layout::new()
        .with_label("position_uv")
        .with_buffer(VertexBufferBinding::new(VB, 20))
        .with_element(FormatElement::new("POSITION", ResourceFormat::float(3)))
        .with_element(FormatElement::new("TEXCOORD", ResourceFormat::float(2)).with_offset(12))
        .with_draw(DrawParams::new(vertex_count))
}

/// Indexed float3 positions with a 16-bit index buffer.
pub fn indexed_layout(index_count: u32) -> Layout {
    Layout::new()
        .with_label("indexed")
        .with_buffer(VertexBufferBinding::new(VB, 12))
        .with_element(FormatElement::new("POSITION", ResourceFormat::float(3)))
        .with_index_buffer(IndexBufferBinding::new(IB, IndexFormat::Uint16))
        .with_draw(DrawParams::indexed(index_count))
}

/// Layout for a post-transform stage: SV_Position as float4.
pub fn post_layout() -> Layout {
    Layout::new()
        .with_label("vs_out")
        .with_element(FormatElement::new("SV_Position", ResourceFormat::float(4)))
        .with_draw(DrawParams::new(3))
}

/// Engine with four vertices of `position_uv_layout`.
pub fn quad_engine() -> MemoryEngine {
    let engine = MemoryEngine::new();
    engine.insert_pod(
        VB,
        &[
            0.0f32, 0.0, 0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, 1.0, 0.0, //
            1.0, 1.0, 0.0, 1.0, 1.0, //
            0.0, 1.0, 0.5, 0.0, 1.0,
        ],
    );
    engine
}

/// Engine with a captured vertex-shader output of three float4 positions.
pub fn post_transform_engine() -> MemoryEngine {
    let engine = MemoryEngine::new();
    engine.insert_pod(
        POST_VS,
        &[
            -1.0f32, -1.0, 0.0, 1.0, //
            1.0, -1.0, 0.0, 1.0, //
            0.0, 1.0, 0.5, 1.0,
        ],
    );
    engine.insert_post_transform(
        0,
        MeshDataStage::VertexOutput,
        PostTransformData {
            buffer: Some(POST_VS),
            stride: 16,
            vertex_count: 3,
            ..PostTransformData::default()
        },
    );
    engine
}

pub fn pipeline(engine: impl ReplayEngine, config: ViewerConfig) -> MeshPipeline {
    init_logging();
    MeshPipeline::new(Arc::new(engine), config)
}

/// Wraps an engine and holds every buffer read until [`GatedEngine::open`].
#[derive(Clone)]
pub struct GatedEngine {
    inner: MemoryEngine,
    gate: Arc<Semaphore>,
}

impl GatedEngine {
    pub fn new(inner: MemoryEngine) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    /// Lets all pending and future reads through.
    pub fn open(&self) {
        self.gate.add_permits(1 << 20);
    }

    pub fn inner(&self) -> &MemoryEngine {
        &self.inner
    }
}

impl ReplayEngine for GatedEngine {
    fn get_buffer_bytes(&self, id: ResourceId, offset: u64, len: u64) -> ReplayFuture<Vec<u8>> {
        let gate = Arc::clone(&self.gate);
        let read = self.inner.get_buffer_bytes(id, offset, len);
        Box::pin(async move {
            let _permit = gate.acquire().await;
            read.await
        })
    }

    fn get_texture_bytes(&self, id: ResourceId, offset: u64, mip: u32) -> ReplayFuture<Vec<u8>> {
        self.inner.get_texture_bytes(id, offset, mip)
    }

    fn get_post_transform_data(
        &self,
        instance: u32,
        stage: MeshDataStage,
    ) -> ReplayFuture<PostTransformData> {
        self.inner.get_post_transform_data(instance, stage)
    }
}

/// Wraps an engine whose first post-transform query panics.
pub struct PanicOnceEngine {
    inner: MemoryEngine,
    tripped: AtomicBool,
}

impl PanicOnceEngine {
    pub fn new(inner: MemoryEngine) -> Self {
        Self {
            inner,
            tripped: AtomicBool::new(false),
        }
    }
}

impl ReplayEngine for PanicOnceEngine {
    fn get_buffer_bytes(&self, id: ResourceId, offset: u64, len: u64) -> ReplayFuture<Vec<u8>> {
        self.inner.get_buffer_bytes(id, offset, len)
    }

    fn get_texture_bytes(&self, id: ResourceId, offset: u64, mip: u32) -> ReplayFuture<Vec<u8>> {
        self.inner.get_texture_bytes(id, offset, mip)
    }

    fn get_post_transform_data(
        &self,
        instance: u32,
        stage: MeshDataStage,
    ) -> ReplayFuture<PostTransformData> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("engine crashed while capturing {stage}");
        }
        self.inner.get_post_transform_data(instance, stage)
    }
}
