//! Per-stage background jobs.
//!
//! A job fetches one stage's [`Dataset`], publishes it, then decodes every
//! row in a blocking task. It checks its [`EpochToken`] right after the
//! fetch, at the top of every decoded row and before publishing, and exits
//! as [`JobState::Aborted`] once the token goes stale. Nothing interrupts a
//! job from outside.

use std::sync::Arc;
use std::sync::mpsc::Sender;

use meshview_core::compute::{Cancelled, EpochToken};
use meshview_core::mesh::{Layout, MeshDataStage};
use meshview_replay::ReplayEngine;
use tokio::sync::watch;

use crate::bounds::{BoundsAccumulator, MeshBounds};
use crate::config::DecodeMode;
use crate::dataset::Dataset;
use crate::decode::decode_row_with_bounds;
use crate::fetch::fetch;

/// Lifecycle of a stage job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    /// No job requested.
    #[default]
    Idle,
    /// Waiting for the engine (or for the previous job to wind down).
    Fetching,
    /// Dataset published, rows being decoded.
    Decoding,
    /// Every row decoded and bounds published.
    Ready,
    /// Superseded by a newer request; output discarded.
    Aborted,
}

impl JobState {
    /// Whether no work is in flight.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Idle | Self::Ready | Self::Aborted)
    }
}

/// Observable state of one job.
///
/// Clone is cheap; all clones observe the same job.
#[derive(Debug, Clone)]
pub struct JobStatus {
    state: Arc<watch::Sender<JobState>>,
}

impl JobStatus {
    pub fn new(initial: JobState) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
        }
    }

    pub fn get(&self) -> JobState {
        *self.state.borrow()
    }

    pub(crate) fn set(&self, state: JobState) {
        self.state.send_replace(state);
    }

    /// Resolves once the job is in a terminal state.
    pub async fn settled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel can't close while we wait.
        let _ = rx.wait_for(JobState::is_terminal).await;
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::new(JobState::Idle)
    }
}

/// Result of a job, delivered to the consumer through the pipeline's channel.
#[derive(Debug, Clone)]
pub enum StageEvent {
    /// A dataset was fetched; rows can be materialized.
    Fetched {
        stage: MeshDataStage,
        epoch: u64,
        dataset: Arc<Dataset>,
    },
    /// Every row was decoded.
    Ready {
        stage: MeshDataStage,
        epoch: u64,
        bounds: MeshBounds,
    },
}

impl StageEvent {
    pub fn stage(&self) -> MeshDataStage {
        match self {
            Self::Fetched { stage, .. } | Self::Ready { stage, .. } => *stage,
        }
    }

    pub fn epoch(&self) -> u64 {
        match self {
            Self::Fetched { epoch, .. } | Self::Ready { epoch, .. } => *epoch,
        }
    }
}

/// Everything one job needs; moved onto the runtime.
pub(crate) struct StageJob {
    pub stage: MeshDataStage,
    pub layout: Arc<Layout>,
    pub instance: u32,
    pub byte_offset: u64,
    pub engine: Arc<dyn ReplayEngine>,
    pub token: EpochToken,
    pub status: JobStatus,
    pub predecessor: Option<JobStatus>,
    pub mode: DecodeMode,
    pub events: Sender<StageEvent>,
}

/// Marks a job `Aborted` if it is dropped before reaching a terminal state.
///
/// Covers panics inside the job and tasks dropped by a runtime shutdown, so
/// a successor waiting on [`JobStatus::settled`] is always released.
struct SettleOnDrop {
    stage: MeshDataStage,
    status: JobStatus,
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        if self.status.get().is_terminal() {
            return;
        }
        if std::thread::panicking() {
            log::error!("{}: job panicked, stage aborted", self.stage);
        }
        self.status.set(JobState::Aborted);
    }
}

impl StageJob {
    pub async fn run(self) {
        let _settle = SettleOnDrop {
            stage: self.stage,
            status: self.status.clone(),
        };
        if let Some(previous) = &self.predecessor {
            previous.settled().await;
        }
        if let Err(Cancelled) = self.execute().await {
            log::debug!("{}: job for epoch {} aborted", self.stage, self.token.value());
            self.status.set(JobState::Aborted);
        }
    }

    async fn execute(&self) -> Result<(), Cancelled> {
        self.token.check()?;
        self.status.set(JobState::Fetching);
        log::info!("{}: fetching (epoch {})", self.stage, self.token.value());

        let dataset = Arc::new(
            fetch(
                &*self.engine,
                self.stage,
                Arc::clone(&self.layout),
                self.instance,
                self.byte_offset,
            )
            .await,
        );
        self.token.check()?;

        self.status.set(JobState::Decoding);
        self.publish(StageEvent::Fetched {
            stage: self.stage,
            epoch: self.token.value(),
            dataset: Arc::clone(&dataset),
        });

        let rows = dataset.row_count;
        let token = self.token.clone();
        let mode = self.mode;
        let decoded = tokio::task::spawn_blocking(move || decode_all(&dataset, &token, mode)).await;
        let bounds = match decoded {
            Ok(bounds) => bounds?,
            Err(e) => {
                log::error!("{}: decode task panicked: {e}", self.stage);
                return Err(Cancelled);
            }
        };
        self.token.check()?;

        log::info!("{}: ready ({rows} rows)", self.stage);
        // Publish before flipping the state so a settled consumer always finds the event.
        self.publish(StageEvent::Ready {
            stage: self.stage,
            epoch: self.token.value(),
            bounds,
        });
        self.status.set(JobState::Ready);
        Ok(())
    }

    fn publish(&self, event: StageEvent) {
        if self.events.send(event).is_err() {
            log::debug!("{}: consumer gone, dropping event", self.stage);
        }
    }
}

/// Decodes every row of `dataset`, returning per-element bounds.
///
/// In eager mode rows are stored in the dataset's cache; in lazy mode they
/// are decoded for bounds only and left for the consumer to materialize.
pub fn decode_all(
    dataset: &Dataset,
    token: &EpochToken,
    mode: DecodeMode,
) -> Result<MeshBounds, Cancelled> {
    let mut bounds = BoundsAccumulator::new(dataset.layout.elements.len());
    for row in 0..dataset.row_count {
        token.check()?;
        match mode {
            DecodeMode::Eager => {
                let mut decoded_here = false;
                dataset.cache().get_or_insert_with(row, || {
                    decoded_here = true;
                    decode_row_with_bounds(dataset, row, Some(&mut bounds))
                });
                if !decoded_here {
                    // The consumer got there first; still fold the row into the bounds.
                    decode_row_with_bounds(dataset, row, Some(&mut bounds));
                }
            }
            DecodeMode::Lazy => {
                decode_row_with_bounds(dataset, row, Some(&mut bounds));
            }
        }
    }
    Ok(bounds.finish())
}
