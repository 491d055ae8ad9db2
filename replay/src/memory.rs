use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use meshview_core::ResourceId;
use meshview_core::mesh::MeshDataStage;
use parking_lot::{Mutex, RwLock};

use crate::engine::{PostTransformData, ReplayEngine, ReplayFuture};
use crate::error::ReplayError;

/// A call received by a [`MemoryEngine`], recorded for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    Buffer {
        id: ResourceId,
        offset: u64,
        len: u64,
    },
    Texture {
        id: ResourceId,
        offset: u64,
        mip: u32,
    },
    PostTransform {
        instance: u32,
        stage: MeshDataStage,
    },
}

#[derive(Default)]
struct Store {
    buffers: HashMap<ResourceId, Vec<u8>>,
    textures: HashMap<ResourceId, Vec<Vec<u8>>>,
    post: HashMap<(u32, MeshDataStage), PostTransformData>,
    failing: HashSet<ResourceId>,
    failing_stages: HashSet<MeshDataStage>,
}

/// In-memory replay engine for tests and offline captures.
///
/// Thread-safe and mutable while shared with a pipeline. Every future it
/// returns is ready on the first poll.
///
/// # Example
///
/// ```ignore
/// let engine = MemoryEngine::new();
/// engine.insert_pod(ResourceId::new(1), &[0.0f32, 1.0, 2.0]);
/// engine.insert_post_transform(0, MeshDataStage::VertexOutput, post);
///
/// let bytes = pollster::block_on(engine.get_buffer_bytes(ResourceId::new(1), 4, 8))?;
/// ```
#[derive(Clone, Default)]
pub struct MemoryEngine {
    store: Arc<RwLock<Store>>,
    calls: Arc<Mutex<Vec<EngineCall>>>,
    disconnected: Arc<AtomicBool>,
}

impl MemoryEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a buffer.
    pub fn insert_buffer(&self, id: ResourceId, data: Vec<u8>) {
        self.store.write().buffers.insert(id, data);
    }

    /// Insert a buffer from plain-old-data values in native byte order.
    pub fn insert_pod<T: bytemuck::Pod>(&self, id: ResourceId, values: &[T]) {
        self.insert_buffer(id, bytemuck::cast_slice(values).to_vec());
    }

    /// Insert or replace a texture, one byte array per mip.
    pub fn insert_texture(&self, id: ResourceId, mips: Vec<Vec<u8>>) {
        self.store.write().textures.insert(id, mips);
    }

    /// Register the post-transform capture of `stage` for `instance`.
    pub fn insert_post_transform(
        &self,
        instance: u32,
        stage: MeshDataStage,
        data: PostTransformData,
    ) {
        self.store.write().post.insert((instance, stage), data);
    }

    /// Remove a buffer, returning its data if it existed.
    pub fn remove_buffer(&self, id: ResourceId) -> Option<Vec<u8>> {
        self.store.write().buffers.remove(&id)
    }

    /// Make every read of `id` fail with [`ReplayError::Engine`].
    pub fn fail_resource(&self, id: ResourceId) {
        self.store.write().failing.insert(id);
    }

    /// Make post-transform requests for `stage` fail with
    /// [`ReplayError::StageUnavailable`].
    pub fn fail_stage(&self, stage: MeshDataStage) {
        self.store.write().failing_stages.insert(stage);
    }

    /// Make every subsequent call fail with [`ReplayError::Disconnected`].
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::Release);
    }

    /// Calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().push(call);
    }

    fn check_connected(&self) -> Result<(), ReplayError> {
        if self.disconnected.load(Ordering::Acquire) {
            Err(ReplayError::Disconnected)
        } else {
            Ok(())
        }
    }
}

/// Slice `data[offset..offset + len]`, truncated to what exists.
fn read_range(data: &[u8], offset: u64, len: u64) -> Vec<u8> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let end = if len == 0 {
        data.len()
    } else {
        usize::try_from(offset.saturating_add(len))
            .unwrap_or(usize::MAX)
            .min(data.len())
    };
    let out = data[start..end].to_vec();
    if len != 0 && (out.len() as u64) < len {
        log::debug!(
            "short read: wanted {len} bytes at {offset}, buffer has {}",
            data.len()
        );
    }
    out
}

impl ReplayEngine for MemoryEngine {
    fn get_buffer_bytes(&self, id: ResourceId, offset: u64, len: u64) -> ReplayFuture<Vec<u8>> {
        self.record(EngineCall::Buffer { id, offset, len });
        let result = self.check_connected().and_then(|()| {
            let store = self.store.read();
            if store.failing.contains(&id) {
                return Err(ReplayError::Engine(format!("injected failure reading {id}")));
            }
            store
                .buffers
                .get(&id)
                .map(|data| read_range(data, offset, len))
                .ok_or(ReplayError::NoSuchResource(id))
        });
        Box::pin(async move { result })
    }

    fn get_texture_bytes(&self, id: ResourceId, offset: u64, mip: u32) -> ReplayFuture<Vec<u8>> {
        self.record(EngineCall::Texture { id, offset, mip });
        let result = self.check_connected().and_then(|()| {
            let store = self.store.read();
            if store.failing.contains(&id) {
                return Err(ReplayError::Engine(format!("injected failure reading {id}")));
            }
            let mips = store
                .textures
                .get(&id)
                .ok_or(ReplayError::NoSuchResource(id))?;
            mips.get(mip as usize)
                .map(|data| read_range(data, offset, 0))
                .ok_or(ReplayError::OutOfRange { resource: id, mip })
        });
        Box::pin(async move { result })
    }

    fn get_post_transform_data(
        &self,
        instance: u32,
        stage: MeshDataStage,
    ) -> ReplayFuture<PostTransformData> {
        self.record(EngineCall::PostTransform { instance, stage });
        let result = self.check_connected().and_then(|()| {
            let store = self.store.read();
            if store.failing_stages.contains(&stage) {
                return Err(ReplayError::StageUnavailable(stage));
            }
            // An uncaptured stage is not an error: it simply has no buffer.
            Ok(store
                .post
                .get(&(instance, stage))
                .copied()
                .unwrap_or_default())
        });
        Box::pin(async move { result })
    }
}
