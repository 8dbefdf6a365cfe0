//! Tracing integration for observability.
//!
//! With the `tracing` feature enabled, every worker loop runs inside a
//! `worker` span and the functions in [`metrics`] emit structured events
//! for queue transfers, worker lifecycle and pipeline runs. Field names
//! follow the `counter.*` / `gauge.*` / `histogram.*` convention so a
//! metrics layer can pick them up.
//!
//! # Example
//!
//! ```rust,ignore
//! use rust_producer_consumer::prelude::*;
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env()
//!         .add_directive("rust_producer_consumer=trace".parse().unwrap()))
//!     .init();
//!
//! let report = Pipeline::new(PipelineConfig::default())?.run()?;
//! ```

/// Metrics recording functions.
pub mod metrics {
    use crate::queue::QueueOperation;
    use crate::worker::{WorkerRole, WorkerState};
    use std::time::Duration;

    /// Records one successful `put` or `get` and the resulting occupancy.
    #[inline]
    pub fn record_transfer(operation: QueueOperation, size: usize, capacity: usize) {
        match operation {
            QueueOperation::Put => tracing::trace!(
                counter.items_produced = 1,
                gauge.queue_size = size as i64,
                capacity = capacity,
                "item produced"
            ),
            QueueOperation::Get => tracing::trace!(
                counter.items_consumed = 1,
                gauge.queue_size = size as i64,
                capacity = capacity,
                "item consumed"
            ),
        }
    }

    /// Records a worker entering its loop.
    #[inline]
    pub fn record_worker_started(name: &str, role: WorkerRole) {
        tracing::debug!(
            gauge.workers_running = 1,
            worker = name,
            role = %role,
            "worker started"
        );
    }

    /// Records a worker reaching a terminal state.
    #[inline]
    pub fn record_worker_finished(
        name: &str,
        role: WorkerRole,
        state: WorkerState,
        items: u64,
        elapsed: Duration,
    ) {
        match state {
            WorkerState::Finished => tracing::debug!(
                gauge.workers_running = -1i64,
                worker = name,
                role = %role,
                items = items,
                histogram.worker_duration_ms = elapsed.as_millis() as u64,
                "worker finished"
            ),
            _ => tracing::warn!(
                gauge.workers_running = -1i64,
                counter.workers_stopped = 1,
                worker = name,
                role = %role,
                state = %state,
                items = items,
                histogram.worker_duration_ms = elapsed.as_millis() as u64,
                "worker stopped early"
            ),
        }
    }

    /// Records a completed pipeline run.
    #[inline]
    pub fn record_pipeline_completed(
        items_requested: u64,
        items_delivered: usize,
        elapsed: Duration,
        deadline_exceeded: bool,
    ) {
        tracing::info!(
            items_requested = items_requested,
            items_delivered = items_delivered,
            duration_ms = elapsed.as_millis() as u64,
            deadline_exceeded = deadline_exceeded,
            "pipeline completed"
        );
    }
}
