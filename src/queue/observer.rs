//! Per-transfer diagnostics hook.
//!
//! The queue reports its occupancy after every successful `put` and `get`.
//! Observers are called on the caller's thread after the queue lock has been
//! released, so a slow observer delays only its own caller.

use std::fmt;

/// Which side of the queue a transfer happened on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueOperation {
    /// An item was inserted
    Put,
    /// An item was removed
    Get,
}

impl fmt::Display for QueueOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueOperation::Put => write!(f, "Produced item"),
            QueueOperation::Get => write!(f, "Consumed item"),
        }
    }
}

/// Queue occupancy right after a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occupancy {
    /// The transfer that produced this record
    pub operation: QueueOperation,
    /// Buffer length after the transfer
    pub size: usize,
    /// Queue capacity
    pub capacity: usize,
}

/// Receives an [`Occupancy`] record for every transfer.
///
/// Any `Fn(&Occupancy) + Send + Sync` closure is an observer:
///
/// ```rust
/// use rust_producer_consumer::queue::{BoundedQueue, Occupancy};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let peak = Arc::new(AtomicUsize::new(0));
/// let p = Arc::clone(&peak);
/// let queue = BoundedQueue::<u32>::with_observer(4, Arc::new(move |o: &Occupancy| {
///     p.fetch_max(o.size, Ordering::Relaxed);
/// }))
/// .unwrap();
///
/// queue.put(1u32).unwrap();
/// queue.put(2u32).unwrap();
/// assert_eq!(peak.load(Ordering::Relaxed), 2);
/// ```
pub trait QueueObserver: Send + Sync {
    /// Called once per successful `put` or `get`
    fn on_transfer(&self, occupancy: &Occupancy);
}

impl<F> QueueObserver for F
where
    F: Fn(&Occupancy) + Send + Sync,
{
    fn on_transfer(&self, occupancy: &Occupancy) {
        self(occupancy)
    }
}

/// Default observer: one `debug!` line per transfer, tagged with the thread name.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl QueueObserver for LogObserver {
    fn on_transfer(&self, occupancy: &Occupancy) {
        let thread = std::thread::current();
        log::debug!(
            "[{}] {}. Queue size: {}/{}",
            thread.name().unwrap_or("unnamed"),
            occupancy.operation,
            occupancy.size,
            occupancy.capacity
        );
    }
}

/// Observer that ignores every record.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl QueueObserver for NoopObserver {
    fn on_transfer(&self, _occupancy: &Occupancy) {}
}
