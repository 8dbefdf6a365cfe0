use super::{panic_message, StateCell, WorkerReport, WorkerRole, WorkerState};
use crate::core::{CancellationToken, PipelineError, Result};
use crossbeam_channel::Sender;
use std::fmt;
use std::sync::Arc;
use std::thread;

/// A worker running on its own named thread.
///
/// Dropping the handle detaches the thread; the worker keeps running until
/// its loop ends.
pub struct WorkerHandle {
    name: String,
    role: WorkerRole,
    token: CancellationToken,
    state: Arc<StateCell>,
    thread: Option<thread::JoinHandle<WorkerReport>>,
}

impl WorkerHandle {
    /// Starts `run` on a thread named `name`.
    ///
    /// If `notify` is given, the report is also sent there when the thread
    /// finishes. On spawn failure `run` is dropped without being called.
    pub(crate) fn spawn<F>(
        name: String,
        role: WorkerRole,
        token: CancellationToken,
        state: Arc<StateCell>,
        notify: Option<Sender<WorkerReport>>,
        run: F,
    ) -> Result<Self>
    where
        F: FnOnce() -> WorkerReport + Send + 'static,
    {
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let report = run();
                if let Some(tx) = notify {
                    // The receiver may already be gone
                    let _ = tx.send(report.clone());
                }
                report
            })
            .map_err(|e| PipelineError::spawn_with_source(name.clone(), e.to_string(), e))?;

        Ok(Self {
            name,
            role,
            token,
            state,
            thread: Some(thread),
        })
    }

    /// Worker name, also the thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Producer or consumer
    pub fn role(&self) -> WorkerRole {
        self.role
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Requests cancellation. A worker parked on the queue wakes up and
    /// ends as `Interrupted`.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once [`cancel`](Self::cancel) or a parent token has fired
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The token this worker observes
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True once the thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Waits for the thread and returns the worker's report.
    ///
    /// # Errors
    ///
    /// `JoinError` if the thread itself panicked outside the worker loop.
    pub fn join(mut self) -> Result<WorkerReport> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| PipelineError::join(self.name.clone(), "already joined"))?;

        thread.join().map_err(|panic_info| {
            PipelineError::join(self.name.clone(), panic_message(panic_info.as_ref()))
        })
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("state", &self.state())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
