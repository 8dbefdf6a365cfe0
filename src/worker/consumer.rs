use super::{
    execute, pause, validate_name, StateCell, WorkerHandle, WorkerReport, WorkerRole, WorkerState,
};
use crate::core::{CancellationToken, Result};
use crate::queue::BoundedQueue;
use crate::store::ItemSink;
use crossbeam_channel::Sender;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Moves up to `target_count` items from a [`BoundedQueue`] into an [`ItemSink`].
///
/// The loop ends as `Finished` when the budget is spent or when the queue
/// reports end-of-stream, whichever comes first.
pub struct ConsumerWorker<T> {
    name: String,
    queue: Arc<BoundedQueue<T>>,
    destination: Arc<dyn ItemSink<T>>,
    target_count: u64,
    delay: Duration,
    token: CancellationToken,
    state: Arc<StateCell>,
}

impl<T: Send + 'static> ConsumerWorker<T> {
    /// Creates a consumer.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `name` is blank.
    pub fn new(
        name: &str,
        queue: Arc<BoundedQueue<T>>,
        destination: Arc<dyn ItemSink<T>>,
        target_count: u64,
        delay: Duration,
    ) -> Result<Self> {
        Ok(Self {
            name: validate_name(WorkerRole::Consumer, name)?,
            queue,
            destination,
            target_count,
            delay,
            token: CancellationToken::new(),
            state: Arc::new(StateCell::new()),
        })
    }

    /// Uses `token` for cancellation instead of a fresh one.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Consumer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Item budget
    pub fn target_count(&self) -> u64 {
        self.target_count
    }

    /// The token that stops this consumer
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Runs the transfer loop on the calling thread.
    pub fn run(self) -> WorkerReport {
        let ConsumerWorker {
            name,
            queue,
            destination,
            target_count,
            delay,
            token,
            state,
        } = self;

        execute(&name, WorkerRole::Consumer, &state, |consumed| {
            if target_count == 0 {
                log::info!("[{}] No items to consume", name);
                return Ok(());
            }

            while *consumed < target_count {
                token.check("consume")?;
                match queue.get_cancellable(&token)? {
                    Some(item) => {
                        destination.add(item);
                        *consumed += 1;
                        pause(delay, &token, "consume")?;
                    }
                    None => {
                        log::info!(
                            "[{}] Queue closed and drained, stopping after {} of {} items",
                            name,
                            consumed,
                            target_count
                        );
                        break;
                    }
                }
            }
            Ok(())
        })
    }

    /// Runs the transfer loop on a new thread named after the consumer.
    ///
    /// # Errors
    ///
    /// `SpawnError` if the thread could not be started.
    pub fn spawn(self) -> Result<WorkerHandle> {
        self.spawn_inner(None)
    }

    /// Like [`spawn`](Self::spawn), also sending the report to `notify`
    /// when the thread finishes.
    pub fn spawn_with_notifier(self, notify: Sender<WorkerReport>) -> Result<WorkerHandle> {
        self.spawn_inner(Some(notify))
    }

    fn spawn_inner(self, notify: Option<Sender<WorkerReport>>) -> Result<WorkerHandle> {
        let name = self.name.clone();
        let token = self.token.clone();
        let state = Arc::clone(&self.state);
        WorkerHandle::spawn(name, WorkerRole::Consumer, token, state, notify, move || {
            self.run()
        })
    }
}

impl<T> fmt::Debug for ConsumerWorker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerWorker")
            .field("name", &self.name)
            .field("target_count", &self.target_count)
            .field("delay", &self.delay)
            .field("state", &self.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineError;
    use crate::queue::NoopObserver;
    use crate::store::Container;
    use std::thread;
    use std::time::Instant;

    fn queue(capacity: usize) -> Arc<BoundedQueue<u32>> {
        Arc::new(BoundedQueue::with_observer(capacity, Arc::new(NoopObserver)).unwrap())
    }

    #[test]
    fn test_blank_name_rejected() {
        let sink: Arc<Container<u32>> = Arc::new(Container::new());
        let result = ConsumerWorker::new("", queue(1), sink, 1, Duration::ZERO);
        assert!(matches!(result, Err(PipelineError::InvalidArgument { .. })));
    }

    #[test]
    fn test_zero_target_finishes_immediately() {
        let q = queue(1);
        q.register_producer().unwrap();
        let sink: Arc<Container<u32>> = Arc::new(Container::new());

        let report = ConsumerWorker::new("C1", Arc::clone(&q), sink.clone(), 0, Duration::ZERO)
            .unwrap()
            .run();

        assert_eq!(report.state, WorkerState::Finished);
        assert_eq!(report.items, 0);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_stops_at_target() {
        let q = queue(10);
        for i in 1..=6u32 {
            q.put(i).unwrap();
        }
        let sink: Arc<Container<u32>> = Arc::new(Container::new());

        let report = ConsumerWorker::new("C1", Arc::clone(&q), sink.clone(), 4, Duration::ZERO)
            .unwrap()
            .run();

        assert_eq!(report.state, WorkerState::Finished);
        assert_eq!(report.items, 4);
        assert_eq!(sink.snapshot(), vec![1, 2, 3, 4]);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_stops_early_at_end_of_stream() {
        let q = queue(10);
        q.register_producer().unwrap();
        q.put(1u32).unwrap();
        q.put(2u32).unwrap();
        q.producer_done();
        let sink: Arc<Container<u32>> = Arc::new(Container::new());

        let report = ConsumerWorker::new("C1", Arc::clone(&q), sink.clone(), 5, Duration::ZERO)
            .unwrap()
            .run();

        assert_eq!(report.state, WorkerState::Finished);
        assert_eq!(report.items, 2);
        assert_eq!(sink.snapshot(), vec![1, 2]);
    }

    #[test]
    fn test_released_when_queue_closes() {
        let q = queue(2);
        q.register_producer().unwrap();
        let sink: Arc<Container<u32>> = Arc::new(Container::new());

        let handle = ConsumerWorker::new("C1", Arc::clone(&q), sink, 3, Duration::ZERO)
            .unwrap()
            .spawn()
            .unwrap();

        thread::sleep(Duration::from_millis(20));
        assert!(!handle.is_finished());

        let start = Instant::now();
        q.producer_done();
        let report = handle.join().unwrap();

        assert_eq!(report.state, WorkerState::Finished);
        assert_eq!(report.items, 0);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_while_waiting_on_empty_queue() {
        let q = queue(2);
        q.register_producer().unwrap();
        let sink: Arc<Container<u32>> = Arc::new(Container::new());

        let handle = ConsumerWorker::new("C1", Arc::clone(&q), sink, 3, Duration::ZERO)
            .unwrap()
            .spawn()
            .unwrap();

        thread::sleep(Duration::from_millis(20));
        handle.cancel();
        assert!(handle.is_cancelled());

        let report = handle.join().unwrap();
        assert_eq!(report.state, WorkerState::Interrupted);
        assert!(report.error.unwrap().contains("manually cancelled"));
        assert!(!q.is_closed());
    }

    #[test]
    fn test_cancel_during_delay_stops_at_once() {
        let q = queue(2);
        q.put(1u32).unwrap();
        q.put(2u32).unwrap();
        let sink: Arc<Container<u32>> = Arc::new(Container::new());

        let delay = Duration::from_secs(3);
        let handle = ConsumerWorker::new("C1", Arc::clone(&q), sink.clone(), 2, delay)
            .unwrap()
            .spawn()
            .unwrap();

        while sink.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        handle.cancel();
        let report = handle.join().unwrap();

        assert!(start.elapsed() < Duration::from_millis(500), "took {:?}", start.elapsed());
        assert_eq!(report.state, WorkerState::Interrupted);
        assert_eq!(report.items, 1);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_sink_panic_is_contained() {
        struct Exploding;
        impl ItemSink<u32> for Exploding {
            fn add(&self, _item: u32) {
                panic!("disk full");
            }
            fn len(&self) -> usize {
                0
            }
        }

        let q = queue(2);
        q.put(1u32).unwrap();

        let sink = Arc::new(Exploding);
        let report = ConsumerWorker::new("C1", Arc::clone(&q), sink, 1, Duration::ZERO)
            .unwrap()
            .run();

        assert_eq!(report.state, WorkerState::Failed);
        assert_eq!(report.error.as_deref(), Some("panicked: disk full"));
    }

    #[test]
    fn test_notifier_receives_report() {
        let q = queue(2);
        q.put(9u32).unwrap();
        let sink: Arc<Container<u32>> = Arc::new(Container::new());
        let (tx, rx) = crossbeam_channel::unbounded();

        let handle = ConsumerWorker::new("C1", Arc::clone(&q), sink, 1, Duration::ZERO)
            .unwrap()
            .spawn_with_notifier(tx)
            .unwrap();

        let notified = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let joined = handle.join().unwrap();
        assert_eq!(notified, joined);
        assert_eq!(joined.items, 1);
    }
}
