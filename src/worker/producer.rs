use super::{
    execute, pause, validate_name, StateCell, WorkerHandle, WorkerReport, WorkerRole, WorkerState,
};
use crate::core::{CancellationToken, Result};
use crate::queue::BoundedQueue;
use crate::store::ItemSource;
use crossbeam_channel::Sender;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One registered producer slot on a queue, released on drop.
struct Registration<T> {
    queue: Arc<BoundedQueue<T>>,
}

impl<T> Registration<T> {
    fn acquire(queue: Arc<BoundedQueue<T>>) -> Result<Self> {
        queue.register_producer()?;
        Ok(Self { queue })
    }
}

impl<T> Drop for Registration<T> {
    fn drop(&mut self) {
        self.queue.producer_done();
    }
}

/// Drains an [`ItemSource`] into a [`BoundedQueue`].
///
/// The producer registers with the queue when it is constructed and signs
/// off exactly once when it is dropped, whether it ran to completion, was
/// cancelled, failed, or never ran at all. The queue therefore closes as
/// soon as the last producer is gone.
///
/// # Example
///
/// ```rust
/// use rust_producer_consumer::queue::BoundedQueue;
/// use rust_producer_consumer::store::Container;
/// use rust_producer_consumer::worker::{ProducerWorker, WorkerState};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let source: Arc<Container<u32>> = Arc::new((1..=3).collect());
/// let queue = Arc::new(BoundedQueue::<u32>::new(5).unwrap());
///
/// let producer = ProducerWorker::new("P1", source, Arc::clone(&queue), Duration::ZERO).unwrap();
/// let report = producer.run();
///
/// assert_eq!(report.state, WorkerState::Finished);
/// assert_eq!(report.items, 3);
/// assert!(queue.is_closed());
/// ```
pub struct ProducerWorker<T> {
    name: String,
    source: Arc<dyn ItemSource<T>>,
    delay: Duration,
    token: CancellationToken,
    state: Arc<StateCell>,
    registration: Registration<T>,
}

impl<T: Send + 'static> ProducerWorker<T> {
    /// Creates a producer and registers it with `queue`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `name` is blank
    /// - `IllegalState` if `queue` has already closed
    pub fn new(
        name: &str,
        source: Arc<dyn ItemSource<T>>,
        queue: Arc<BoundedQueue<T>>,
        delay: Duration,
    ) -> Result<Self> {
        // Validate before registering so a rejected producer never holds a slot
        let name = validate_name(WorkerRole::Producer, name)?;
        let registration = Registration::acquire(queue)?;

        Ok(Self {
            name,
            source,
            delay,
            token: CancellationToken::new(),
            state: Arc::new(StateCell::new()),
            registration,
        })
    }

    /// Uses `token` for cancellation instead of a fresh one.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Producer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The token that stops this producer
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Runs the transfer loop on the calling thread.
    ///
    /// Each round checks for cancellation, takes the next item from the
    /// source and puts it into the queue, then sleeps for the configured
    /// delay. An empty source ends the loop. If the producer is cancelled
    /// while waiting for space, the item it was holding is dropped.
    pub fn run(self) -> WorkerReport {
        let ProducerWorker {
            name,
            source,
            delay,
            token,
            state,
            registration,
        } = self;
        let queue = &registration.queue;

        let report = execute(&name, WorkerRole::Producer, &state, |produced| {
            loop {
                token.check("produce")?;
                let Some(item) = source.remove_first() else {
                    return Ok(());
                };
                queue.put_cancellable(item, &token)?;
                *produced += 1;
                pause(delay, &token, "produce")?;
            }
        });

        drop(registration);
        report
    }

    /// Runs the transfer loop on a new thread named after the producer.
    ///
    /// # Errors
    ///
    /// `SpawnError` if the thread could not be started. The producer is
    /// dropped in that case, releasing its registration.
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
        WorkerHandle::spawn(name, WorkerRole::Producer, token, state, notify, move || {
            self.run()
        })
    }
}

impl<T> fmt::Debug for ProducerWorker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerWorker")
            .field("name", &self.name)
            .field("delay", &self.delay)
            .field("state", &self.state.get())
            .field("remaining", &self.source.len())
            .finish()
    }
}
