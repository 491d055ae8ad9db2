use std::future::Future;
use std::sync::Arc;

/// Runtime driving replay engine futures and stage jobs.
///
/// A tokio multi-thread runtime owned by the pipeline. Engine calls and job
/// orchestration run on its workers; row decoding goes through
/// `spawn_blocking` so it never starves engine IO.
///
/// Clone is cheap (Arc-wrapped).
#[derive(Clone)]
pub struct FetchRuntime {
    inner: Arc<tokio::runtime::Runtime>,
}

impl FetchRuntime {
    /// Creates a runtime with `worker_threads` workers (at least one).
    pub fn new(worker_threads: usize) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("meshview-fetch")
            .enable_all()
            .build()
            .expect("Failed to create tokio fetch runtime");

        Self {
            inner: Arc::new(runtime),
        }
    }

    /// Spawns a future on the runtime.
    ///
    /// The returned handle can be dropped; the task keeps running.
    pub fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.inner.spawn(future)
    }
}

impl Default for FetchRuntime {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn creation_and_clone() {
        let rt = FetchRuntime::new(1);
        let _rt2 = rt.clone();
    }

    #[test]
    fn spawned_task_can_block_off_the_workers() {
        let rt = FetchRuntime::default();
        let (tx, rx) = std::sync::mpsc::channel();
        rt.spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let value = tokio::task::spawn_blocking(|| 7u32).await.unwrap_or(0);
            let _ = tx.send(value);
        });
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(7));
    }
}
