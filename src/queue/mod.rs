//! The bounded hand-off queue shared by producers and consumers.
//!
//! - [`BoundedQueue`]: fixed-capacity FIFO with blocking `put`/`get`,
//!   cancellable variants, and the producer-registration close protocol
//! - [`QueueStats`]: a consistent snapshot of the queue's counters
//! - [`QueueObserver`]: per-transfer occupancy hook ([`LogObserver`] by default)
//!
//! # Close protocol
//!
//! ```rust
//! use rust_producer_consumer::queue::BoundedQueue;
//!
//! let queue = BoundedQueue::<&str>::new(4).unwrap();
//! queue.register_producer().unwrap();
//! queue.put("last").unwrap();
//!
//! // The last producer signing off closes the queue...
//! assert!(queue.producer_done());
//!
//! // ...buffered items still drain, then get() reports end-of-stream.
//! assert_eq!(queue.get().unwrap(), Some("last"));
//! assert_eq!(queue.get().unwrap(), None);
//! ```

mod bounded;
mod observer;
mod stats;

pub use bounded::{BoundedQueue, MAX_CAPACITY};
pub use observer::{LogObserver, NoopObserver, Occupancy, QueueObserver, QueueOperation};
pub use stats::QueueStats;
