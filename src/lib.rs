//! # Rust Producer Consumer
//!
//! A bounded, thread-safe hand-off queue with producer and consumer workers
//! built around it.
//!
//! ## Features
//!
//! - **Bounded Queue**: fixed-capacity FIFO; `put` blocks while full, `get` blocks while empty
//! - **Close Protocol**: producers register and sign off; the last one out closes the queue
//!   and every waiting consumer sees end-of-stream
//! - **Cancellation**: any blocked `put`/`get` can be abandoned through a [`CancellationToken`]
//! - **Workers**: [`ProducerWorker`] and [`ConsumerWorker`] run the transfer loops on
//!   named threads and report how they ended
//! - **Pipeline Driver**: [`Pipeline`] wires sources, queue, workers and destination
//!   from a serde-loadable [`PipelineConfig`], with an optional deadline
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_producer_consumer::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let source: Arc<Container<WorkItem>> =
//!     Arc::new(WorkItem::sequence(1..=10).into_iter().collect());
//! let destination: Arc<Container<WorkItem>> = Arc::new(Container::new());
//! let queue: Arc<BoundedQueue<WorkItem>> = Arc::new(BoundedQueue::new(3)?);
//!
//! let producer =
//!     ProducerWorker::new("Producer-1", source.clone(), Arc::clone(&queue), Duration::ZERO)?;
//! let consumer = ConsumerWorker::new(
//!     "Consumer-1",
//!     Arc::clone(&queue),
//!     destination.clone(),
//!     10,
//!     Duration::ZERO,
//! )?;
//!
//! let producer = producer.spawn()?;
//! let consumer = consumer.spawn()?;
//! producer.join()?;
//! consumer.join()?;
//!
//! assert_eq!(destination.len(), 10);
//! assert!(queue.is_empty());
//! println!("{}", queue.stats());
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline Configuration
//!
//! ```rust
//! use rust_producer_consumer::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let config = PipelineConfig::new(100, 8)
//!     .with_producers(2)
//!     .with_consumers(4)
//!     .with_thread_name_prefix("etl")
//!     .with_deadline(Duration::from_secs(30));
//!
//! let report = Pipeline::new(config)?.run()?;
//! assert!(report.is_complete());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod pipeline;
pub mod prelude;
pub mod queue;
pub mod store;
#[cfg(feature = "tracing")]
pub mod tracing;
pub mod worker;

pub use crate::core::{CancellationToken, PipelineError, Result, WorkItem};
pub use pipeline::{Pipeline, PipelineConfig, PipelineReport};
pub use queue::{BoundedQueue, QueueStats};
pub use store::Container;
pub use worker::{ConsumerWorker, ProducerWorker, WorkerHandle, WorkerReport, WorkerState};
