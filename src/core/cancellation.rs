//! Cooperative cancellation for workers parked on the queue
//!
//! A [`CancellationToken`] is the Rust stand-in for interrupting a thread:
//! whoever holds a clone can cancel it, and blocking queue operations that
//! were given the token abandon their wait as soon as it fires. Tokens stay
//! cancelled afterwards, so the interrupted code can still observe why it
//! stopped.
//!
//! # Features
//!
//! - **Hierarchical cancellation**: child tokens are cancelled with their parent,
//!   which is how the pipeline driver stops every worker at once
//! - **Cancellation callbacks**: used by the queue to wake parked waiters
//! - **Cancellation reasons**: track why a token was cancelled
//!
//! # Example
//!
//! ```rust
//! use rust_producer_consumer::CancellationToken;
//!
//! let pipeline = CancellationToken::new();
//! let producer = pipeline.child();
//! let consumer = pipeline.child();
//!
//! pipeline.cancel();
//!
//! assert!(producer.is_cancelled());
//! assert!(consumer.is_cancelled());
//! ```

use crate::core::{PipelineError, Result};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

static NEXT_CALLBACK_ID: AtomicUsize = AtomicUsize::new(1);

fn next_callback_id() -> usize {
    NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed)
}

/// Reason for cancellation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancellationReason {
    /// Explicitly cancelled via `cancel()`
    Manual,
    /// Cancelled because a deadline elapsed
    Deadline(Duration),
    /// Cancelled because the parent token was cancelled
    ParentCancelled,
    /// Custom cancellation reason
    Custom(String),
}

impl std::fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CancellationReason::Manual => write!(f, "manually cancelled"),
            CancellationReason::Deadline(d) => write!(f, "deadline of {:?} exceeded", d),
            CancellationReason::ParentCancelled => write!(f, "parent was cancelled"),
            CancellationReason::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

struct StoredCallback {
    id: usize,
    callback: Box<dyn FnOnce() + Send + Sync>,
}

struct TokenState {
    cancelled: AtomicBool,
    /// Weak so that dropped children do not accumulate strong references
    children: RwLock<Vec<Weak<TokenState>>>,
    callbacks: RwLock<Vec<StoredCallback>>,
    reason: RwLock<Option<CancellationReason>>,
}

impl TokenState {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            children: RwLock::new(Vec::new()),
            callbacks: RwLock::new(Vec::new()),
            reason: RwLock::new(None),
        }
    }
}

/// A thread-safe cancellation flag shared between a worker and whoever may stop it
///
/// Cloning a token yields another handle to the same flag.
///
/// # Example
///
/// ```rust
/// use rust_producer_consumer::{BoundedQueue, CancellationToken, PipelineError};
/// use std::sync::Arc;
/// use std::thread;
/// use std::time::Duration;
///
/// let queue: Arc<BoundedQueue<u32>> = Arc::new(BoundedQueue::new(1).unwrap());
/// let token = CancellationToken::new();
///
/// let q = Arc::clone(&queue);
/// let t = token.clone();
/// let consumer = thread::spawn(move || q.get_cancellable(&t));
///
/// thread::sleep(Duration::from_millis(20));
/// token.cancel();
///
/// let result = consumer.join().unwrap();
/// assert!(matches!(result, Err(PipelineError::Cancelled { .. })));
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

impl CancellationToken {
    /// Create a new cancellation token (not cancelled)
    pub fn new() -> Self {
        Self {
            state: Arc::new(TokenState::new()),
        }
    }

    /// Creates a child token linked to this parent
    ///
    /// The child is cancelled when the parent is. If the parent is already
    /// cancelled, the child starts out cancelled.
    pub fn child(&self) -> Self {
        let child = CancellationToken {
            state: Arc::new(TokenState::new()),
        };

        self.state
            .children
            .write()
            .push(Arc::downgrade(&child.state));

        if self.is_cancelled() {
            child.cancel_with_reason(CancellationReason::ParentCancelled);
        }

        child
    }

    /// Cancel this token with the default reason (`Manual`)
    ///
    /// Idempotent; only the first call records a reason.
    pub fn cancel(&self) {
        self.cancel_with_reason(CancellationReason::Manual);
    }

    /// Cancel this token with a specific reason
    ///
    /// Runs the registered callbacks, then cancels every live child.
    pub fn cancel_with_reason(&self, reason: CancellationReason) {
        {
            // The reason is visible before the flag, so anyone observing
            // the cancellation can also read why.
            let mut slot = self.state.reason.write();
            if self.state.cancelled.load(Ordering::Acquire) {
                return;
            }
            *slot = Some(reason);
            self.state.cancelled.store(true, Ordering::Release);
        }

        // Drain first so no callback runs while the callback list is locked
        let callbacks: Vec<_> = self.state.callbacks.write().drain(..).collect();
        for stored in callbacks {
            (stored.callback)();
        }

        let children = self.state.children.read();
        for child in children.iter().filter_map(Weak::upgrade) {
            CancellationToken { state: child }
                .cancel_with_reason(CancellationReason::ParentCancelled);
        }
    }

    /// Check if this token has been cancelled
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Returns the cancellation reason, `None` while not cancelled
    pub fn reason(&self) -> Option<CancellationReason> {
        self.state.reason.read().clone()
    }

    /// Returns a `Cancelled` error tagged with `context` if cancelled
    ///
    /// ```rust
    /// use rust_producer_consumer::{CancellationToken, Result};
    ///
    /// fn drain(token: &CancellationToken) -> Result<()> {
    ///     for _ in 0..100 {
    ///         token.check("drain")?;
    ///     }
    ///     Ok(())
    /// }
    /// # assert!(drain(&CancellationToken::new()).is_ok());
    /// ```
    pub fn check(&self, context: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(self.to_error(context))
        } else {
            Ok(())
        }
    }

    /// Builds the `Cancelled` error describing this token's reason
    pub(crate) fn to_error(&self, context: &str) -> PipelineError {
        let reason = self
            .reason()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        PipelineError::cancelled(context, reason)
    }

    /// Registers a callback to run when cancelled
    ///
    /// The returned guard unregisters the callback when dropped. If the token
    /// is already cancelled the callback runs immediately on this thread, so
    /// callers must not hold any lock the callback takes.
    pub fn on_cancel<F>(&self, callback: F) -> CancellationCallbackGuard
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        let id = next_callback_id();

        if self.is_cancelled() {
            callback();
        } else {
            self.state.callbacks.write().push(StoredCallback {
                id,
                callback: Box::new(callback),
            });
            // cancel_with_reason may have drained the list between the check
            // and the push; run anything it missed.
            if self.is_cancelled() {
                let missed: Vec<_> = {
                    let mut callbacks = self.state.callbacks.write();
                    let (missed, kept) = callbacks.drain(..).partition(|c| c.id == id);
                    *callbacks = kept;
                    missed
                };
                for stored in missed {
                    (stored.callback)();
                }
            }
        }

        CancellationCallbackGuard {
            token: Some(self.clone()),
            callback_id: id,
        }
    }

    fn remove_callback(&self, callback_id: usize) {
        self.state.callbacks.write().retain(|c| c.id != callback_id);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard that unregisters a cancellation callback when dropped
pub struct CancellationCallbackGuard {
    token: Option<CancellationToken>,
    callback_id: usize,
}

impl Drop for CancellationCallbackGuard {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if !token.is_cancelled() {
                token.remove_callback(self.callback_id);
            }
        }
    }
}
