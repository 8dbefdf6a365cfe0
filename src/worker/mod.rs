//! Producer and consumer workers.
//!
//! A worker owns one loop over the shared [`BoundedQueue`](crate::queue::BoundedQueue):
//! producers drain an [`ItemSource`](crate::store::ItemSource) into it, consumers
//! move a fixed number of items out of it into an [`ItemSink`](crate::store::ItemSink).
//! Either kind can run on the calling thread via `run()` or on a named thread
//! via `spawn()`, which returns a [`WorkerHandle`].
//!
//! Faults never cross the worker boundary. Cancellation ends a worker as
//! [`WorkerState::Interrupted`]; any other error, panics included, ends it as
//! [`WorkerState::Failed`]. Both are logged and recorded in the
//! [`WorkerReport`].

mod consumer;
mod handle;
mod producer;
mod state;

pub use consumer::ConsumerWorker;
pub use handle::WorkerHandle;
pub use producer::ProducerWorker;
pub use state::{
    delay_from_millis, target_from_i64, WorkerReport, WorkerRole, WorkerState,
};

pub(crate) use state::{validate_name, StateCell};

use crate::core::{CancellationToken, Result};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use tracing::{span, Level};

/// Runs one worker loop with panic protection and turns its outcome into a report.
///
/// `body` receives the item counter and returns `Ok(())` when its loop
/// condition is exhausted.
pub(crate) fn execute<F>(
    name: &str,
    role: WorkerRole,
    state: &StateCell,
    body: F,
) -> WorkerReport
where
    F: FnOnce(&mut u64) -> Result<()>,
{
    #[cfg(feature = "tracing")]
    let worker_span = span!(Level::DEBUG, "worker", name = name, role = %role);
    #[cfg(feature = "tracing")]
    let _guard = worker_span.enter();
    #[cfg(feature = "tracing")]
    crate::tracing::metrics::record_worker_started(name, role);

    state.set(WorkerState::Running);
    log::info!("[{}] Started", name);

    let start = Instant::now();
    let mut items = 0u64;
    let outcome = catch_unwind(AssertUnwindSafe(|| body(&mut items)));
    let elapsed = start.elapsed();

    let verb = match role {
        WorkerRole::Producer => "produced",
        WorkerRole::Consumer => "consumed",
    };

    let (final_state, error) = match outcome {
        Ok(Ok(())) => {
            log::info!("[{}] Finished - {} {} items", name, verb, items);
            (WorkerState::Finished, None)
        }
        Ok(Err(e)) if e.is_cancelled() => {
            log::warn!("[{}] Interrupted after {} {} items: {}", name, verb, items, e);
            (WorkerState::Interrupted, Some(e.to_string()))
        }
        Ok(Err(e)) => {
            log::error!("[{}] Error: {}", name, e);
            (WorkerState::Failed, Some(e.to_string()))
        }
        Err(panic_info) => {
            let panic_msg = panic_message(panic_info.as_ref());
            log::error!("[{}] Panicked: {}", name, panic_msg);
            (WorkerState::Failed, Some(format!("panicked: {}", panic_msg)))
        }
    };

    state.set(final_state);

    #[cfg(feature = "tracing")]
    crate::tracing::metrics::record_worker_finished(name, role, final_state, items, elapsed);

    WorkerReport {
        name: name.to_string(),
        role,
        items,
        state: final_state,
        elapsed,
        error,
    }
}

/// Waits `delay` between items, returning early with `Cancelled` once the
/// token fires. A zero delay does not yield.
pub(crate) fn pause(delay: Duration, token: &CancellationToken, context: &str) -> Result<()> {
    if !delay.is_zero() {
        let (wake_tx, wake_rx) = crossbeam_channel::bounded::<()>(1);
        let _wake = token.on_cancel(move || {
            let _ = wake_tx.try_send(());
        });
        // Times out on a normal delay, receives on cancellation
        let _ = wake_rx.recv_timeout(delay);
    }
    token.check(context)
}

pub(crate) fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PipelineError;

    #[test]
    fn test_execute_finished() {
        let state = StateCell::new();
        let report = execute("P1", WorkerRole::Producer, &state, |items| {
            *items = 4;
            Ok(())
        });

        assert_eq!(report.state, WorkerState::Finished);
        assert_eq!(report.items, 4);
        assert!(report.error.is_none());
        assert_eq!(state.get(), WorkerState::Finished);
    }

    #[test]
    fn test_execute_cancelled_is_interrupted() {
        let state = StateCell::new();
        let report = execute("C1", WorkerRole::Consumer, &state, |items| {
            *items = 2;
            Err(PipelineError::cancelled("get", "manually cancelled"))
        });

        assert_eq!(report.state, WorkerState::Interrupted);
        assert_eq!(report.items, 2);
        assert!(report.error.unwrap().contains("manually cancelled"));
    }

    #[test]
    fn test_execute_error_is_failed() {
        let state = StateCell::new();
        let report = execute("P1", WorkerRole::Producer, &state, |_| {
            Err(PipelineError::illegal_state("queue is closed"))
        });

        assert_eq!(report.state, WorkerState::Failed);
        assert_eq!(state.get(), WorkerState::Failed);
    }

    #[test]
    fn test_execute_catches_panic() {
        let state = StateCell::new();
        let report = execute("C1", WorkerRole::Consumer, &state, |items| {
            *items = 1;
            panic!("sink exploded");
        });

        assert_eq!(report.state, WorkerState::Failed);
        assert_eq!(report.items, 1);
        assert_eq!(report.error.as_deref(), Some("panicked: sink exploded"));
    }

    #[test]
    fn test_pause_reports_cancellation() {
        let token = CancellationToken::new();
        assert!(pause(Duration::ZERO, &token, "sleep").is_ok());

        token.cancel();
        let err = pause(Duration::from_millis(1), &token, "sleep").unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_pause_wakes_on_cancel() {
        let token = CancellationToken::new();
        let t = token.clone();
        let sleeper = std::thread::spawn(move || {
            let start = Instant::now();
            let result = pause(Duration::from_secs(5), &t, "sleep");
            (result, start.elapsed())
        });

        std::thread::sleep(Duration::from_millis(50));
        token.cancel();

        let (result, elapsed) = sleeper.join().unwrap();
        assert!(result.unwrap_err().is_cancelled());
        assert!(elapsed < Duration::from_secs(1), "pause took {:?}", elapsed);
    }

    #[test]
    fn test_pause_runs_full_delay_when_not_cancelled() {
        let token = CancellationToken::new();
        let start = Instant::now();

        assert!(pause(Duration::from_millis(30), &token, "sleep").is_ok());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
