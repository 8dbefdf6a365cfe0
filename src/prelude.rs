//! Convenient re-exports for common types and traits

pub use crate::core::{CancellationReason, CancellationToken, PipelineError, Result, WorkItem};
pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use crate::queue::{BoundedQueue, QueueObserver, QueueStats};
pub use crate::store::{Container, ItemSink, ItemSource};
pub use crate::worker::{
    ConsumerWorker, ProducerWorker, WorkerHandle, WorkerReport, WorkerRole, WorkerState,
};
