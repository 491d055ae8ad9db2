use meshview_core::ResourceId;
use meshview_core::mesh::MeshDataStage;
use thiserror::Error;

/// Errors a replay engine call can fail with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    #[error("No such resource: {0}")]
    NoSuchResource(ResourceId),
    #[error("Subresource out of range: {resource} mip {mip}")]
    OutOfRange { resource: ResourceId, mip: u32 },
    #[error("Post-transform data unavailable for {0}")]
    StageUnavailable(MeshDataStage),
    #[error("Engine error: {0}")]
    Engine(String),
    #[error("Replay connection lost")]
    Disconnected,
}

pub type ReplayResult<T> = Result<T, ReplayError>;
