//! Bounded blocking FIFO queue with a producer-registration close protocol.

use super::observer::{LogObserver, Occupancy, QueueObserver, QueueOperation};
use super::stats::QueueStats;
use crate::core::{CancellationCallbackGuard, CancellationToken, PipelineError, Result};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Largest accepted capacity, a few slots short of `i32::MAX`.
pub const MAX_CAPACITY: usize = (i32::MAX - 8) as usize;

/// Upper bound on the buffer space reserved up front.
const PREALLOCATE_LIMIT: usize = 1024;

struct QueueState<T> {
    buffer: VecDeque<T>,
    active_producers: usize,
    closed: bool,
    produced: u64,
    consumed: u64,
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    /// Signalled on every insert, removal, close and cancellation
    changed: Condvar,
}

/// A fixed-capacity FIFO queue shared by many producers and many consumers.
///
/// `put` blocks while the queue is full and `get` blocks while it is empty.
/// Producers announce themselves with [`register_producer`] and sign off
/// with [`producer_done`]; when the last one signs off the queue closes,
/// every parked thread wakes up, and `get` starts returning `Ok(None)` once
/// the buffer is drained.
///
/// [`register_producer`]: BoundedQueue::register_producer
/// [`producer_done`]: BoundedQueue::producer_done
///
/// # Example
///
/// ```rust
/// use rust_producer_consumer::BoundedQueue;
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(BoundedQueue::<u32>::new(2).unwrap());
/// queue.register_producer().unwrap();
///
/// let q = Arc::clone(&queue);
/// let producer = thread::spawn(move || {
///     for i in 0..10u32 {
///         q.put(i).unwrap();
///     }
///     q.producer_done();
/// });
///
/// let mut received = Vec::new();
/// while let Some(i) = queue.get().unwrap() {
///     received.push(i);
/// }
/// producer.join().unwrap();
///
/// assert_eq!(received, (0..10).collect::<Vec<_>>());
/// ```
pub struct BoundedQueue<T> {
    shared: Arc<Shared<T>>,
    capacity: usize,
    observer: Arc<dyn QueueObserver>,
}

impl<T: Send + 'static> BoundedQueue<T> {
    /// Creates an empty queue that logs transfers through [`LogObserver`].
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `capacity` is 0 or above [`MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_observer(capacity, Arc::new(LogObserver))
    }

    /// Creates an empty queue reporting transfers to `observer`.
    pub fn with_observer(capacity: usize, observer: Arc<dyn QueueObserver>) -> Result<Self> {
        if capacity < 1 {
            return Err(PipelineError::invalid_config(
                "capacity",
                format!("queue capacity must be at least 1, but was {}", capacity),
            ));
        }
        if capacity > MAX_CAPACITY {
            return Err(PipelineError::invalid_config(
                "capacity",
                format!(
                    "queue capacity too large: {} (maximum is {})",
                    capacity, MAX_CAPACITY
                ),
            ));
        }

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    buffer: VecDeque::with_capacity(capacity.min(PREALLOCATE_LIMIT)),
                    active_producers: 0,
                    closed: false,
                    produced: 0,
                    consumed: 0,
                }),
                changed: Condvar::new(),
            }),
            capacity,
            observer,
        })
    }

    /// Inserts an item, waiting while the queue is full.
    ///
    /// Accepts either a `T` or an `Option<T>`; `None` is rejected.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `item` is `None`; the queue is untouched
    /// - `IllegalState` if the queue is closed once space is available
    pub fn put(&self, item: impl Into<Option<T>>) -> Result<()> {
        self.insert(item.into(), None)
    }

    /// Like [`put`](Self::put), but gives up with `Cancelled` if `token`
    /// is cancelled while waiting for space.
    ///
    /// The item is not inserted when this fails, and `token` stays cancelled.
    pub fn put_cancellable(
        &self,
        item: impl Into<Option<T>>,
        token: &CancellationToken,
    ) -> Result<()> {
        self.insert(item.into(), Some(token))
    }

    /// Inserts an item only if there is room right now.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `None`, `IllegalState` if closed, `QueueFull`
    /// if there is no free slot.
    pub fn try_put(&self, item: impl Into<Option<T>>) -> Result<()> {
        let item = item.into().ok_or_else(absent_item)?;
        let size = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(closed_queue());
            }
            if state.buffer.len() >= self.capacity {
                return Err(PipelineError::queue_full(state.buffer.len(), self.capacity));
            }
            self.push(&mut state, item)
        };
        self.report(QueueOperation::Put, size);
        Ok(())
    }

    /// Removes the head item, waiting while the queue is empty and open.
    ///
    /// Returns `Ok(None)` once the queue is closed and drained: no producer
    /// will ever supply another item.
    pub fn get(&self) -> Result<Option<T>> {
        self.remove(None)
    }

    /// Like [`get`](Self::get), but gives up with `Cancelled` if `token`
    /// is cancelled while waiting for an item.
    pub fn get_cancellable(&self, token: &CancellationToken) -> Result<Option<T>> {
        self.remove(Some(token))
    }

    /// Removes the head item if there is one, without waiting.
    pub fn try_get(&self) -> Option<T> {
        let (item, size) = {
            let mut state = self.shared.state.lock();
            let item = self.pop(&mut state)?;
            (item, state.buffer.len())
        };
        self.report(QueueOperation::Get, size);
        Some(item)
    }

    fn insert(&self, item: Option<T>, token: Option<&CancellationToken>) -> Result<()> {
        let item = item.ok_or_else(absent_item)?;
        // Registered before locking: an already-cancelled token runs the
        // callback inline, and the callback takes the queue lock.
        let _wake = token.map(|t| self.wake_on_cancel(t));

        let size = {
            let mut state = self.shared.state.lock();
            while state.buffer.len() >= self.capacity {
                self.park(&mut state, token, "put")?;
            }
            if state.closed {
                return Err(closed_queue());
            }
            self.push(&mut state, item)
        };

        self.report(QueueOperation::Put, size);
        Ok(())
    }

    fn remove(&self, token: Option<&CancellationToken>) -> Result<Option<T>> {
        let _wake = token.map(|t| self.wake_on_cancel(t));

        let (item, size) = {
            let mut state = self.shared.state.lock();
            while state.buffer.is_empty() && !state.closed {
                self.park(&mut state, token, "get")?;
            }
            match self.pop(&mut state) {
                Some(item) => (item, state.buffer.len()),
                None => return Ok(None),
            }
        };

        self.report(QueueOperation::Get, size);
        Ok(Some(item))
    }

    fn push(&self, state: &mut QueueState<T>, item: T) -> usize {
        state.buffer.push_back(item);
        state.produced += 1;
        self.shared.changed.notify_all();
        state.buffer.len()
    }

    fn pop(&self, state: &mut QueueState<T>) -> Option<T> {
        let item = state.buffer.pop_front()?;
        state.consumed += 1;
        self.shared.changed.notify_all();
        Some(item)
    }

    /// Waits once on the condition variable. Callers re-check their condition.
    fn park(
        &self,
        state: &mut MutexGuard<'_, QueueState<T>>,
        token: Option<&CancellationToken>,
        context: &str,
    ) -> Result<()> {
        if let Some(token) = token {
            // Checked under the lock; the wake callback needs the same lock
            // to notify, so a cancellation cannot slip in before the wait.
            if token.is_cancelled() {
                return Err(token.to_error(context));
            }
        }
        self.shared.changed.wait(state);
        Ok(())
    }

    fn wake_on_cancel(&self, token: &CancellationToken) -> CancellationCallbackGuard {
        let shared = Arc::downgrade(&self.shared);
        token.on_cancel(move || {
            if let Some(shared) = shared.upgrade() {
                let _state = shared.state.lock();
                shared.changed.notify_all();
            }
        })
    }

    fn report(&self, operation: QueueOperation, size: usize) {
        #[cfg(feature = "tracing")]
        crate::tracing::metrics::record_transfer(operation, size, self.capacity);

        self.observer.on_transfer(&Occupancy {
            operation,
            size,
            capacity: self.capacity,
        });
    }
}

impl<T> BoundedQueue<T> {
    /// Announces one more producer.
    ///
    /// # Errors
    ///
    /// `IllegalState` if the queue has already closed.
    pub fn register_producer(&self) -> Result<()> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(PipelineError::illegal_state(
                "cannot register a producer on a closed queue",
            ));
        }
        state.active_producers += 1;
        Ok(())
    }

    /// Signs one producer off.
    ///
    /// Calling this with no active producers is a no-op. Returns `true` only
    /// for the call that closed the queue.
    pub fn producer_done(&self) -> bool {
        let mut state = self.shared.state.lock();
        if state.active_producers == 0 {
            return false;
        }

        state.active_producers -= 1;
        if state.active_producers == 0 {
            state.closed = true;
            self.shared.changed.notify_all();
            log::debug!("queue closed: all producers finished");
            return true;
        }
        false
    }

    /// Number of buffered items
    pub fn len(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }

    /// True if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().buffer.is_empty()
    }

    /// True if every slot is taken
    pub fn is_full(&self) -> bool {
        self.shared.state.lock().buffer.len() >= self.capacity
    }

    /// Maximum number of buffered items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total items ever inserted
    pub fn items_produced(&self) -> u64 {
        self.shared.state.lock().produced
    }

    /// Total items ever removed
    pub fn items_consumed(&self) -> u64 {
        self.shared.state.lock().consumed
    }

    /// Items inserted but not yet removed
    pub fn items_in_transit(&self) -> u64 {
        let state = self.shared.state.lock();
        state.produced - state.consumed
    }

    /// Producers registered and not yet done
    pub fn active_producers(&self) -> usize {
        self.shared.state.lock().active_producers
    }

    /// True once the last registered producer has finished
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// All counters, read in a single critical section
    pub fn stats(&self) -> QueueStats {
        let state = self.shared.state.lock();
        QueueStats {
            capacity: self.capacity,
            produced: state.produced,
            consumed: state.consumed,
            current_size: state.buffer.len(),
            in_transit: state.produced - state.consumed,
            closed: state.closed,
        }
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("BoundedQueue")
            .field("size", &state.buffer.len())
            .field("capacity", &self.capacity)
            .field("produced", &state.produced)
            .field("consumed", &state.consumed)
            .field("active_producers", &state.active_producers)
            .field("closed", &state.closed)
            .finish()
    }
}

fn absent_item() -> PipelineError {
    PipelineError::invalid_argument("item", "cannot put an absent (null) item into the queue")
}

fn closed_queue() -> PipelineError {
    PipelineError::illegal_state("queue closed: cannot put items into a closed queue")
}
