//! Worker lifecycle and the report a finished worker hands back.

use crate::core::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

/// Lifecycle of a producer or consumer.
///
/// `Created → Running → {Finished | Interrupted | Failed}`. The last three
/// are terminal. `Interrupted` means the worker was cancelled while parked
/// on the queue; `Failed` means any other fault ended its loop. Neither is
/// escalated beyond a log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerState {
    /// Constructed but not started
    Created,
    /// Inside its transfer loop
    Running,
    /// Loop condition exhausted
    Finished,
    /// Cancelled while waiting on the queue
    Interrupted,
    /// Ended by an unexpected error or panic
    Failed,
}

impl WorkerState {
    /// True for `Finished`, `Interrupted` and `Failed`
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkerState::Finished | WorkerState::Interrupted | WorkerState::Failed
        )
    }
}

impl From<u8> for WorkerState {
    fn from(value: u8) -> Self {
        match value {
            0 => WorkerState::Created,
            1 => WorkerState::Running,
            2 => WorkerState::Finished,
            3 => WorkerState::Interrupted,
            _ => WorkerState::Failed,
        }
    }
}

impl From<WorkerState> for u8 {
    fn from(value: WorkerState) -> Self {
        match value {
            WorkerState::Created => 0,
            WorkerState::Running => 1,
            WorkerState::Finished => 2,
            WorkerState::Interrupted => 3,
            WorkerState::Failed => 4,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Created => "created",
            WorkerState::Running => "running",
            WorkerState::Finished => "finished",
            WorkerState::Interrupted => "interrupted",
            WorkerState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A worker state readable from other threads.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(WorkerState::Created.into()))
    }

    pub(crate) fn get(&self) -> WorkerState {
        self.0.load(Ordering::Acquire).into()
    }

    pub(crate) fn set(&self, state: WorkerState) {
        self.0.store(state.into(), Ordering::Release);
    }
}

/// Which side of the queue a worker serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerRole {
    /// Moves items from a source into the queue
    Producer,
    /// Moves items from the queue into a destination
    Consumer,
}

impl fmt::Display for WorkerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerRole::Producer => f.write_str("producer"),
            WorkerRole::Consumer => f.write_str("consumer"),
        }
    }
}

/// Outcome of one worker run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    /// Worker name
    pub name: String,
    /// Producer or consumer
    pub role: WorkerRole,
    /// Items moved: inserted for producers, removed for consumers
    pub items: u64,
    /// Terminal state reached
    pub state: WorkerState,
    /// Time spent in the loop
    pub elapsed: Duration,
    /// What ended the loop, for `Interrupted` and `Failed`
    pub error: Option<String>,
}

impl fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} - {} items in {}ms",
            self.name,
            self.role,
            self.state,
            self.items,
            self.elapsed.as_millis()
        )?;
        if let Some(error) = &self.error {
            write!(f, " ({})", error)?;
        }
        Ok(())
    }
}

/// Converts a signed millisecond count into a delay.
///
/// # Errors
///
/// `InvalidArgument` if `millis` is negative.
pub fn delay_from_millis(millis: i64) -> Result<Duration> {
    u64::try_from(millis)
        .map(Duration::from_millis)
        .map_err(|_| {
            PipelineError::invalid_argument(
                "delay",
                format!("delay must be non-negative, but was: {}", millis),
            )
        })
}

/// Converts a signed item budget into a count.
///
/// # Errors
///
/// `InvalidArgument` if `count` is negative.
pub fn target_from_i64(count: i64) -> Result<u64> {
    u64::try_from(count).map_err(|_| {
        PipelineError::invalid_argument(
            "target_count",
            format!("items to consume must be non-negative, but was: {}", count),
        )
    })
}

pub(crate) fn validate_name(role: WorkerRole, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::invalid_argument(
            "name",
            format!("{} name cannot be empty", role),
        ));
    }
    Ok(trimmed.to_string())
}
