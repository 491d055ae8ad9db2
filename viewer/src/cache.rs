use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::decode::Row;

/// Sparse per-row cache owned by a [`Dataset`](crate::Dataset).
///
/// Slots are created on first access, so memory follows the rows actually
/// materialized rather than the row count. Each slot is a [`OnceLock`]: two
/// callers materializing the same row decode it once, the second one blocks
/// and then observes the cached result.
#[derive(Debug, Default)]
pub struct RowCache {
    len: usize,
    slots: Mutex<HashMap<usize, Arc<OnceLock<Arc<Row>>>>>,
    decodes: AtomicUsize,
}

impl RowCache {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            slots: Mutex::new(HashMap::new()),
            decodes: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The cached row, if it has been materialized.
    pub fn get(&self, row: usize) -> Option<Arc<Row>> {
        self.slots.lock().get(&row)?.get().cloned()
    }

    /// Returns the cached row, or runs `decode` and caches its result.
    ///
    /// Returns `None` if `row` is outside the cache.
    pub fn get_or_insert_with(
        &self,
        row: usize,
        decode: impl FnOnce() -> Row,
    ) -> Option<Arc<Row>> {
        if row >= self.len {
            return None;
        }
        // The map lock is released before decoding; only the row's slot blocks.
        let slot = Arc::clone(self.slots.lock().entry(row).or_default());
        let cached = slot.get_or_init(|| {
            self.decodes.fetch_add(1, Ordering::Relaxed);
            Arc::new(decode())
        });
        Some(Arc::clone(cached))
    }

    /// Number of rows currently materialized.
    pub fn materialized_count(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Number of decodes performed since creation.
    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::Relaxed)
    }
}

/// Shared switch that turns materialization into a no-op.
///
/// Held while the consumer swaps datasets in bulk, so transient row-count
/// resets don't trigger a storm of decodes. Guards nest.
#[derive(Debug, Clone, Default)]
pub struct CacheSuppressor {
    depth: Arc<AtomicUsize>,
}

impl CacheSuppressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress materialization until the returned guard is dropped.
    pub fn suppress(&self) -> SuppressGuard {
        self.depth.fetch_add(1, Ordering::AcqRel);
        SuppressGuard {
            depth: Arc::clone(&self.depth),
        }
    }

    pub fn is_suppressed(&self) -> bool {
        self.depth.load(Ordering::Acquire) > 0
    }
}

/// RAII guard returned by [`CacheSuppressor::suppress`].
#[must_use = "materialization is only suppressed while the guard is alive"]
#[derive(Debug)]
pub struct SuppressGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for SuppressGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}
