//! End-to-end driver: sources, one queue, producers, consumers, one destination.
//!
//! ```rust
//! use rust_producer_consumer::pipeline::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::new(50, 4).with_producers(2).with_consumers(3);
//! let report = Pipeline::new(config).unwrap().run().unwrap();
//!
//! assert!(report.is_complete());
//! assert_eq!(report.destination_size, 50);
//! assert!(report.queue.is_drained());
//! ```

mod config;

pub use config::PipelineConfig;

use crate::core::{CancellationReason, CancellationToken, PipelineError, Result, WorkItem};
use crate::queue::{BoundedQueue, LogObserver, QueueObserver, QueueStats};
use crate::store::Container;
use crate::worker::{ConsumerWorker, ProducerWorker, WorkerHandle, WorkerReport, WorkerState};
use crossbeam_channel::RecvTimeoutError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Runs a configured producer/consumer transfer and reports on it.
pub struct Pipeline {
    config: PipelineConfig,
    observer: Arc<dyn QueueObserver>,
}

impl Pipeline {
    /// Creates a pipeline whose queue logs transfers through [`LogObserver`].
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `config` does not validate.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            observer: Arc::new(LogObserver),
        })
    }

    /// Replaces the queue observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn QueueObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Moves every item from the sources to the destination.
    ///
    /// Ids `1..=num_items` are split into contiguous ranges, one source per
    /// producer. Consumer budgets are split the same way, so together the
    /// consumers take exactly `num_items`. The call returns once every
    /// worker thread has been joined. If a deadline is configured and
    /// passes first, all workers are cancelled and the report is returned
    /// with `deadline_exceeded` set.
    ///
    /// # Errors
    ///
    /// `SpawnError` if a worker thread could not be started, `JoinError`
    /// if one died outside its loop guard.
    pub fn run(&self) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4();
        let config = &self.config;
        let prefix = config.thread_name_prefix.trim();

        log::info!(
            "[{}] Starting pipeline: {} items, capacity {}, {} producer(s), {} consumer(s)",
            run_id,
            config.num_items,
            config.queue_capacity,
            config.producers,
            config.consumers
        );

        let queue: Arc<BoundedQueue<WorkItem>> = Arc::new(BoundedQueue::with_observer(
            config.queue_capacity,
            Arc::clone(&self.observer),
        )?);
        let destination: Arc<Container<WorkItem>> = Arc::new(Container::new());
        let parent = CancellationToken::new();
        let (tx, rx) = crossbeam_channel::unbounded();

        // Every producer registers before any starts, so an early finisher
        // cannot close the queue on the others.
        let mut sources = Vec::with_capacity(config.producers);
        let mut producers = Vec::with_capacity(config.producers);
        let mut next_id = 1u64;
        for (i, count) in split_evenly(config.num_items, config.producers)
            .into_iter()
            .enumerate()
        {
            let source: Arc<Container<WorkItem>> = Arc::new(if count == 0 {
                Container::new()
            } else {
                WorkItem::sequence(next_id..=next_id + count - 1)
                    .into_iter()
                    .collect()
            });
            next_id += count;

            producers.push(
                ProducerWorker::new(
                    &format!("{}-producer-{}", prefix, i + 1),
                    source.clone(),
                    Arc::clone(&queue),
                    config.producer_delay,
                )?
                .with_token(parent.child()),
            );
            sources.push(source);
        }

        let start = Instant::now();
        let mut handles: Vec<WorkerHandle> =
            Vec::with_capacity(config.producers + config.consumers);

        for producer in producers {
            match producer.spawn_with_notifier(tx.clone()) {
                Ok(handle) => handles.push(handle),
                Err(e) => return Err(abort(&parent, handles, e)),
            }
        }

        for (i, target) in split_evenly(config.num_items, config.consumers)
            .into_iter()
            .enumerate()
        {
            let consumer = match ConsumerWorker::new(
                &format!("{}-consumer-{}", prefix, i + 1),
                Arc::clone(&queue),
                destination.clone(),
                target,
                config.consumer_delay,
            ) {
                Ok(consumer) => consumer.with_token(parent.child()),
                Err(e) => return Err(abort(&parent, handles, e)),
            };

            match consumer.spawn_with_notifier(tx.clone()) {
                Ok(handle) => handles.push(handle),
                Err(e) => return Err(abort(&parent, handles, e)),
            }
        }
        drop(tx);

        let deadline_exceeded = self.await_completion(&rx, handles.len(), &parent, start);

        let workers = handles
            .into_iter()
            .map(WorkerHandle::join)
            .collect::<Result<Vec<_>>>()?;
        let elapsed = start.elapsed();

        let report = PipelineReport {
            run_id,
            elapsed,
            items_requested: config.num_items,
            source_remaining: sources.iter().map(|s| s.len()).sum(),
            destination_size: destination.len(),
            queue: queue.stats(),
            workers,
            deadline_exceeded,
            destination: destination.snapshot(),
        };

        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_pipeline_completed(
            report.items_requested,
            report.destination_size,
            report.elapsed,
            report.deadline_exceeded,
        );

        if report.is_complete() {
            log::info!(
                "[{}] All {} items transferred in {}ms",
                run_id,
                report.items_requested,
                elapsed.as_millis()
            );
        } else {
            log::warn!(
                "[{}] Expected {} items in destination, got {}",
                run_id,
                report.items_requested,
                report.destination_size
            );
        }

        Ok(report)
    }

    /// Waits for `expected` completion notices. Returns whether the deadline
    /// fired, in which case every worker has been cancelled.
    fn await_completion(
        &self,
        rx: &crossbeam_channel::Receiver<WorkerReport>,
        expected: usize,
        parent: &CancellationToken,
        start: Instant,
    ) -> bool {
        let mut deadline_at = self.config.deadline.map(|d| (d, start + d));
        let mut deadline_exceeded = false;
        let mut received = 0;

        while received < expected {
            let next = match deadline_at {
                Some((_, at)) => rx.recv_deadline(at),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match next {
                Ok(report) => {
                    received += 1;
                    if report.state != WorkerState::Finished {
                        log::warn!("{}", report);
                    } else {
                        log::debug!("{}", report);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Some((deadline, _)) = deadline_at.take() {
                        log::warn!(
                            "Deadline of {:?} exceeded, cancelling {} worker(s)",
                            deadline,
                            expected - received
                        );
                        parent.cancel_with_reason(CancellationReason::Deadline(deadline));
                        deadline_exceeded = true;
                    }
                }
                // Every sender is gone, so every worker has exited
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        deadline_exceeded
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish()
    }
}

/// Cancels and joins the workers started so far, then hands back `error`.
fn abort(
    parent: &CancellationToken,
    handles: Vec<WorkerHandle>,
    error: PipelineError,
) -> PipelineError {
    log::error!("Aborting pipeline: {}", error);
    parent.cancel();
    for handle in handles {
        let _ = handle.join();
    }
    error
}

/// Splits `total` into `parts` near-equal shares; the first
/// `total % parts` shares are one larger.
fn split_evenly(total: u64, parts: usize) -> Vec<u64> {
    if parts == 0 {
        return Vec::new();
    }
    let n = parts as u64;
    let (base, remainder) = (total / n, total % n);
    (0..n).map(|i| base + u64::from(i < remainder)).collect()
}

/// What a [`Pipeline::run`] did.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineReport {
    /// Unique id of this run, also tagged on its log lines
    pub run_id: Uuid,
    /// Wall-clock time from first spawn to last join
    pub elapsed: Duration,
    /// Items the sources started with
    pub items_requested: u64,
    /// Items still in the sources at the end
    pub source_remaining: usize,
    /// Items that reached the destination
    pub destination_size: usize,
    /// Queue counters at the end
    pub queue: QueueStats,
    /// One report per worker, producers first
    pub workers: Vec<WorkerReport>,
    /// Whether the deadline cancelled the run
    pub deadline_exceeded: bool,
    #[serde(skip)]
    destination: Vec<WorkItem>,
}

impl PipelineReport {
    /// True if every item reached the destination and the queue is empty
    pub fn is_complete(&self) -> bool {
        !self.deadline_exceeded
            && self.destination_size as u64 == self.items_requested
            && self.queue.current_size == 0
    }

    /// Items delivered per second
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.destination_size as f64 / secs
        } else {
            0.0
        }
    }

    /// Destination contents in arrival order
    pub fn destination(&self) -> &[WorkItem] {
        &self.destination
    }

    /// Reports of workers that did not finish normally
    pub fn stopped_workers(&self) -> impl Iterator<Item = &WorkerReport> {
        self.workers
            .iter()
            .filter(|w| w.state != WorkerState::Finished)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.queue)?;
        writeln!(f)?;
        writeln!(f, "=== Results ===")?;
        writeln!(f, "Run id: {}", self.run_id)?;
        writeln!(f, "Time elapsed: {}ms", self.elapsed.as_millis())?;
        writeln!(f, "Source size: {}", self.source_remaining)?;
        writeln!(f, "Destination size: {}", self.destination_size)?;
        write!(f, "Queue size: {}", self.queue.current_size)?;
        for worker in &self.workers {
            write!(f, "\n  {}", worker)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::NoopObserver;
    use std::thread;

    fn quiet(config: PipelineConfig) -> Pipeline {
        Pipeline::new(config)
            .unwrap()
            .with_observer(Arc::new(NoopObserver))
    }

    #[test]
    fn test_split_evenly() {
        assert_eq!(split_evenly(10, 3), vec![4, 3, 3]);
        assert_eq!(split_evenly(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(split_evenly(0, 2), vec![0, 0]);
        assert_eq!(split_evenly(9, 1), vec![9]);
        assert!(split_evenly(5, 0).is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Pipeline::new(PipelineConfig::new(10, 0));
        assert!(matches!(result, Err(PipelineError::InvalidConfig { .. })));
    }

    #[test]
    fn test_single_pair_preserves_order() {
        let report = quiet(PipelineConfig::new(20, 5)).run().unwrap();

        assert!(report.is_complete());
        assert_eq!(report.source_remaining, 0);
        let ids: Vec<u64> = report.destination().iter().map(WorkItem::id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<_>>());
        assert_eq!(report.workers.len(), 2);
        assert_eq!(report.stopped_workers().count(), 0);
    }

    #[test]
    fn test_zero_items() {
        let report = quiet(PipelineConfig::new(0, 1).with_consumers(2)).run().unwrap();

        assert!(report.is_complete());
        assert_eq!(report.destination_size, 0);
        assert!(report.queue.closed);
        assert!(report.workers.iter().all(|w| w.items == 0));
    }

    #[test]
    fn test_worker_names_use_prefix() {
        let report = quiet(
            PipelineConfig::new(4, 2)
                .with_producers(2)
                .with_thread_name_prefix("etl"),
        )
        .run()
        .unwrap();

        let names: Vec<&str> = report.workers.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["etl-producer-1", "etl-producer-2", "etl-consumer-1"]);
    }

    #[test]
    fn test_abort_stops_started_workers() {
        let queue: Arc<BoundedQueue<u32>> =
            Arc::new(BoundedQueue::with_observer(1, Arc::new(NoopObserver)).unwrap());
        let source: Arc<Container<u32>> = Arc::new((1..=3).collect());
        let parent = CancellationToken::new();

        let handle = ProducerWorker::new("P1", source.clone(), Arc::clone(&queue), Duration::ZERO)
            .unwrap()
            .with_token(parent.child())
            .spawn()
            .unwrap();

        // The producer parks on the full queue holding its second item
        while source.len() > 1 {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        let error = abort(&parent, vec![handle], PipelineError::illegal_state("boom"));

        assert!(matches!(error, PipelineError::IllegalState { .. }));
        assert!(parent.is_cancelled());
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(queue.len(), 1);
        assert!(queue.is_closed());
    }

    #[test]
    fn test_report_display() {
        let report = quiet(PipelineConfig::new(3, 2)).run().unwrap();
        let text = report.to_string();

        assert!(text.contains("=== Queue Statistics ==="));
        assert!(text.contains("Destination size: 3"));
        assert!(text.contains("Queue size: 0"));
    }
}
