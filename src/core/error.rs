//! Error types for the producer/consumer pipeline

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur in the queue, the workers or the pipeline driver
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// A required argument was missing or out of range
    #[error("Invalid argument '{parameter}': {message}")]
    InvalidArgument {
        /// Name of the offending argument
        parameter: String,
        /// Error message
        message: String,
    },

    /// Invalid configuration with parameter
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfig {
        /// Configuration parameter name
        parameter: String,
        /// Error message
        message: String,
    },

    /// The operation is not allowed in the queue's current state
    #[error("Illegal state: {message}")]
    IllegalState {
        /// Error message
        message: String,
    },

    /// A blocking operation was cancelled while waiting
    #[error("Cancelled ({context}): {reason}")]
    Cancelled {
        /// Where the cancellation was observed
        context: String,
        /// Reason for cancellation
        reason: String,
    },

    /// Queue is full with capacity details
    #[error("Queue is full: {current}/{max} items queued")]
    QueueFull {
        /// Current queue size
        current: usize,
        /// Maximum queue size
        max: usize,
    },

    /// Failed to spawn a worker thread with details
    #[error("Failed to spawn worker thread '{name}': {message}")]
    SpawnError {
        /// Name of the worker that failed to spawn
        name: String,
        /// Error message
        message: String,
        /// Source IO error
        #[source]
        source: Option<std::io::Error>,
    },

    /// Failed to join a worker thread
    #[error("Failed to join worker thread '{name}': {message}")]
    JoinError {
        /// Name of the worker that failed to join
        name: String,
        /// Error message
        message: String,
    },

    /// Reading or writing a configuration file failed
    #[error("Configuration I/O failed: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// A configuration document could not be parsed or rendered
    #[error("Configuration format error: {0}")]
    ConfigFormat(#[from] serde_json::Error),
}

impl PipelineError {
    /// Create an invalid argument error
    pub fn invalid_argument(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::InvalidArgument {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::InvalidConfig {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create an illegal state error
    pub fn illegal_state(message: impl Into<String>) -> Self {
        PipelineError::IllegalState {
            message: message.into(),
        }
    }

    /// Create a cancelled error
    pub fn cancelled(context: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Cancelled {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Create a queue full error
    pub fn queue_full(current: usize, max: usize) -> Self {
        PipelineError::QueueFull { current, max }
    }

    /// Create a spawn error with source
    pub fn spawn_with_source(
        name: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        PipelineError::SpawnError {
            name: name.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a join error
    pub fn join(name: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::JoinError {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error reports an observed cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled { .. })
    }
}
