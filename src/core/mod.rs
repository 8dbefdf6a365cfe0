//! Core types shared by the queue, the workers and the pipeline

pub mod cancellation;
pub mod error;
pub mod item;

pub use cancellation::{CancellationCallbackGuard, CancellationReason, CancellationToken};
pub use error::{PipelineError, Result};
pub use item::WorkItem;
