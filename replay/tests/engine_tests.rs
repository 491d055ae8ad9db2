//! Drives [`ReplayEngine`] through a trait object the way the pipeline does.

use std::sync::Arc;

use meshview_core::ResourceId;
use meshview_core::mesh::{MeshDataStage, PrimitiveTopology};
use meshview_replay::{MemoryEngine, PostTransformData, ReplayEngine, ReplayError};

fn engine_with_capture() -> (MemoryEngine, Arc<dyn ReplayEngine>) {
    let memory = MemoryEngine::new();
    memory.insert_pod(ResourceId::new(10), &[0u16, 1, 2, 2, 1, 3]);
    memory.insert_post_transform(
        1,
        MeshDataStage::VertexOutput,
        PostTransformData {
            buffer: Some(ResourceId::new(20)),
            remap_index_buffer: Some(ResourceId::new(21)),
            byte_offset: 16,
            stride: 32,
            vertex_count: 6,
            topology: PrimitiveTopology::TriangleList,
            base_vertex: 0,
        },
    );
    let shared: Arc<dyn ReplayEngine> = Arc::new(memory.clone());
    (memory, shared)
}

#[test]
fn buffer_reads_through_trait_object() {
    let (_, engine) = engine_with_capture();
    let bytes = pollster::block_on(engine.get_buffer_bytes(ResourceId::new(10), 2, 4)).unwrap();
    let indices: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(indices, vec![1, 2]);
}

#[test]
fn post_transform_lookup_is_per_instance() {
    let (_, engine) = engine_with_capture();
    let hit = pollster::block_on(engine.get_post_transform_data(1, MeshDataStage::VertexOutput))
        .unwrap();
    assert_eq!(hit.stride, 32);
    assert_eq!(hit.byte_offset, 16);

    let miss = pollster::block_on(engine.get_post_transform_data(0, MeshDataStage::VertexOutput))
        .unwrap();
    assert_eq!(miss, PostTransformData::default());
}

#[test]
fn mutations_are_visible_to_shared_handles() {
    let (memory, engine) = engine_with_capture();
    memory.remove_buffer(ResourceId::new(10));
    let err = pollster::block_on(engine.get_buffer_bytes(ResourceId::new(10), 0, 0)).unwrap_err();
    assert_eq!(err, ReplayError::NoSuchResource(ResourceId::new(10)));
    assert_eq!(err.to_string(), "No such resource: res#10");
}

#[test]
fn futures_are_send() {
    fn assert_send<T: Send>(_: &T) {}
    let (_, engine) = engine_with_capture();
    let fut = engine.get_texture_bytes(ResourceId::new(1), 0, 0);
    assert_send(&fut);
}
