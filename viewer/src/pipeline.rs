//! The consumer-facing side of the viewer.
//!
//! [`MeshPipeline`] turns selection changes into per-stage jobs and applies
//! their results. Results travel over a channel and are only applied from
//! [`MeshPipeline::poll`], on the consumer's thread, after checking that
//! their epoch is still current.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use meshview_core::compute::FetchEpoch;
use meshview_core::mesh::{Layout, MeshDataStage};
use meshview_replay::ReplayEngine;

use crate::bounds::{ElementBounds, MeshBounds};
use crate::cache::{CacheSuppressor, SuppressGuard};
use crate::config::ViewerConfig;
use crate::dataset::Dataset;
use crate::decode::Row;
use crate::format::{NumberFormatter, format_row};
use crate::job::{JobState, JobStatus, StageEvent, StageJob};
use crate::runtime::FetchRuntime;
use crate::stage_map::StageMap;

/// What the consumer wants to look at: one layout per stage, or `None` to
/// leave the stage empty.
#[derive(Debug, Clone, Default)]
pub struct MeshSelection {
    pub layouts: StageMap<Option<Arc<Layout>>>,
    pub instance: u32,
}

impl MeshSelection {
    pub fn new(instance: u32) -> Self {
        Self {
            layouts: StageMap::default(),
            instance,
        }
    }

    pub fn with_stage(mut self, stage: MeshDataStage, layout: impl Into<Arc<Layout>>) -> Self {
        self.layouts[stage] = Some(layout.into());
        self
    }
}

/// Outcome of asking for a row.
#[derive(Debug, Clone)]
pub enum RowSlot {
    Ready(Arc<Row>),
    /// Nothing to show yet, or caching is suppressed.
    Placeholder,
    OutOfRange,
}

#[derive(Default)]
struct StageSlot {
    /// State reported for the stage's latest request.
    status: JobStatus,
    /// Last job actually spawned; the next one waits for it to wind down.
    live_job: Option<JobStatus>,
    dataset: Option<Arc<Dataset>>,
    bounds: Option<MeshBounds>,
}

impl StageSlot {
    fn reset(&mut self) {
        self.status = JobStatus::default();
        self.dataset = None;
        self.bounds = None;
    }
}

/// Fetches, decodes and serves mesh data for the three pipeline stages.
pub struct MeshPipeline {
    engine: Arc<dyn ReplayEngine>,
    config: ViewerConfig,
    runtime: FetchRuntime,
    epoch: FetchEpoch,
    stages: StageMap<StageSlot>,
    events_tx: Sender<StageEvent>,
    events_rx: Receiver<StageEvent>,
    suppressor: CacheSuppressor,
    formatter: NumberFormatter,
}

impl MeshPipeline {
    pub fn new(engine: Arc<dyn ReplayEngine>, config: ViewerConfig) -> Self {
        let runtime = FetchRuntime::new(config.io_worker_threads);
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            engine,
            formatter: NumberFormatter::new(&config.formatter),
            config,
            runtime,
            epoch: FetchEpoch::new(),
            stages: StageMap::default(),
            events_tx,
            events_rx,
            suppressor: CacheSuppressor::new(),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Current fetch epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch.current()
    }

    /// Requests data for a new selection.
    ///
    /// Advances the epoch once, clears every stage and starts one job per
    /// stage with a layout. Returns the new epoch.
    pub fn select(&mut self, selection: MeshSelection) -> u64 {
        let token = self.epoch.advance_and_snapshot();
        log::debug!("Selection changed, epoch {}", token.value());

        for stage in MeshDataStage::ALL {
            self.stages[stage].reset();
            if let Some(layout) = selection.layouts[stage].clone() {
                self.spawn_job(stage, layout, selection.instance, 0);
            }
        }
        token.value()
    }

    /// Shows `layout` (built with [`Layout::raw_buffer`] or
    /// [`Layout::raw_texture`]) starting `byte_offset` bytes in.
    ///
    /// Raw views replace the vertex input stage and clear the others.
    pub fn view_raw(&mut self, layout: impl Into<Arc<Layout>>, byte_offset: u64) -> u64 {
        let token = self.epoch.advance_and_snapshot();
        log::debug!("Raw view requested, epoch {}", token.value());

        for stage in MeshDataStage::ALL {
            self.stages[stage].reset();
        }
        self.spawn_job(MeshDataStage::VertexInput, layout.into(), 0, byte_offset);
        token.value()
    }

    /// Drops all data and invalidates every running job.
    pub fn clear(&mut self) {
        self.epoch.advance();
        for stage in MeshDataStage::ALL {
            self.stages[stage].reset();
        }
    }

    fn spawn_job(
        &mut self,
        stage: MeshDataStage,
        layout: Arc<Layout>,
        instance: u32,
        byte_offset: u64,
    ) {
        let status = JobStatus::new(JobState::Fetching);
        let slot = &mut self.stages[stage];
        let predecessor = slot.live_job.replace(status.clone());
        slot.status = status.clone();

        let job = StageJob {
            stage,
            layout,
            instance,
            byte_offset,
            engine: Arc::clone(&self.engine),
            token: self.epoch.snapshot(),
            status,
            predecessor,
            mode: self.config.decode_mode,
            events: self.events_tx.clone(),
        };
        self.runtime.spawn(job.run());
    }

    /// Applies every pending job result. Results from superseded epochs are
    /// discarded. Returns the stages whose published data changed.
    pub fn poll(&mut self) -> Vec<MeshDataStage> {
        let mut changed = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            let current = self.epoch.current();
            if event.epoch() != current {
                log::debug!(
                    "{}: dropping result of epoch {} (current {current})",
                    event.stage(),
                    event.epoch()
                );
                continue;
            }
            let stage = event.stage();
            let slot = &mut self.stages[stage];
            match event {
                StageEvent::Fetched { dataset, .. } => {
                    for diagnostic in &dataset.diagnostics {
                        log::debug!("{stage}: {diagnostic:?}");
                    }
                    slot.dataset = Some(dataset);
                    slot.bounds = None;
                }
                StageEvent::Ready { bounds, .. } => slot.bounds = Some(bounds),
            }
            if !changed.contains(&stage) {
                changed.push(stage);
            }
        }
        changed
    }

    /// Polls until every stage is idle, ready or aborted, or `timeout` passes.
    ///
    /// Returns whether the pipeline settled.
    pub fn wait_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let interval = Duration::from_millis(self.config.settle_poll_interval_ms.max(1));
        loop {
            // Jobs publish before turning terminal, so this poll sees their last event.
            let settled = self.is_settled();
            self.poll();
            if settled {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(interval);
        }
    }

    /// Whether no stage has work in flight.
    pub fn is_settled(&self) -> bool {
        self.stages.iter().all(|(_, slot)| slot.status.get().is_terminal())
    }

    pub fn job_state(&self, stage: MeshDataStage) -> JobState {
        self.stages[stage].status.get()
    }

    /// Dataset currently published for `stage`.
    pub fn dataset(&self, stage: MeshDataStage) -> Option<Arc<Dataset>> {
        self.stages[stage].dataset.clone()
    }

    /// Row count of the published dataset, 0 if there is none.
    pub fn row_count(&self, stage: MeshDataStage) -> usize {
        self.stages[stage].dataset.as_ref().map_or(0, |ds| ds.row_count)
    }

    /// Bounds of a stage, available once its job is ready.
    pub fn bounds(&self, stage: MeshDataStage) -> Option<&MeshBounds> {
        self.stages[stage].bounds.as_ref()
    }

    /// Bounds of the position element of `stage`.
    pub fn position_bounds(&self, stage: MeshDataStage) -> Option<ElementBounds> {
        let slot = &self.stages[stage];
        slot.bounds.as_ref()?.position(&slot.dataset.as_ref()?.layout)
    }

    /// Returns a decoded row, decoding it now if needed.
    ///
    /// While caching is suppressed only placeholders are returned and nothing
    /// is decoded.
    pub fn materialize(&self, stage: MeshDataStage, row: usize) -> RowSlot {
        if self.suppressor.is_suppressed() {
            return RowSlot::Placeholder;
        }
        let Some(dataset) = &self.stages[stage].dataset else {
            return RowSlot::Placeholder;
        };
        match dataset.materialize(row) {
            Some(row) => RowSlot::Ready(row),
            None => RowSlot::OutOfRange,
        }
    }

    /// Materializes and renders a row. `None` unless the row is ready.
    pub fn format_row(&self, stage: MeshDataStage, row: usize) -> Option<Vec<String>> {
        let RowSlot::Ready(decoded) = self.materialize(stage, row) else {
            return None;
        };
        let dataset = self.stages[stage].dataset.as_ref()?;
        Some(format_row(&decoded, &dataset.layout, &self.formatter))
    }

    /// Suppresses row materialization until the guard drops.
    ///
    /// Hold this across bulk refreshes of the consumer's view.
    pub fn suppress_caching(&self) -> SuppressGuard {
        self.suppressor.suppress()
    }

    pub fn suppressor(&self) -> &CacheSuppressor {
        &self.suppressor
    }

    pub fn formatter(&self) -> &NumberFormatter {
        &self.formatter
    }
}

impl Drop for MeshPipeline {
    fn drop(&mut self) {
        // Running jobs see a stale token and stop at their next check.
        self.epoch.advance();
    }
}
