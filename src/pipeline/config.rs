//! Pipeline configuration.

use crate::core::{PipelineError, Result};
use crate::queue::MAX_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings for one [`Pipeline`](super::Pipeline) run.
///
/// Defaults reproduce the classic demo: 20 items through a queue of 5 with
/// one producer pausing 50ms per item and one slower consumer pausing
/// 100ms, so the queue fills up.
///
/// Durations are stored in JSON as whole milliseconds:
///
/// ```json
/// {
///   "num_items": 20,
///   "queue_capacity": 5,
///   "producers": 1,
///   "consumers": 1,
///   "producer_delay_ms": 50,
///   "consumer_delay_ms": 100,
///   "thread_name_prefix": "worker",
///   "deadline_ms": null
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Items generated, ids `1..=num_items`
    pub num_items: u64,
    /// Queue capacity
    pub queue_capacity: usize,
    /// Number of producer threads
    pub producers: usize,
    /// Number of consumer threads
    pub consumers: usize,
    /// Pause after each produced item
    #[serde(rename = "producer_delay_ms", with = "millis")]
    pub producer_delay: Duration,
    /// Pause after each consumed item
    #[serde(rename = "consumer_delay_ms", with = "millis")]
    pub consumer_delay: Duration,
    /// Prefix for worker and thread names
    pub thread_name_prefix: String,
    /// Cancel every worker if the run takes longer than this
    #[serde(rename = "deadline_ms", with = "optional_millis")]
    pub deadline: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_items: 20,
            queue_capacity: 5,
            producers: 1,
            consumers: 1,
            producer_delay: Duration::from_millis(50),
            consumer_delay: Duration::from_millis(100),
            thread_name_prefix: "worker".to_string(),
            deadline: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration moving `num_items` items through a queue of
    /// `queue_capacity` with no delays.
    #[must_use]
    pub fn new(num_items: u64, queue_capacity: usize) -> Self {
        Self {
            num_items,
            queue_capacity,
            producer_delay: Duration::ZERO,
            consumer_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    /// Set number of items
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_num_items(mut self, num_items: u64) -> Self {
        self.num_items = num_items;
        self
    }

    /// Set queue capacity
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set number of producers
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_producers(mut self, producers: usize) -> Self {
        self.producers = producers;
        self
    }

    /// Set number of consumers
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_consumers(mut self, consumers: usize) -> Self {
        self.consumers = consumers;
        self
    }

    /// Set per-item producer pause
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_producer_delay(mut self, delay: Duration) -> Self {
        self.producer_delay = delay;
        self
    }

    /// Set per-item consumer pause
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_consumer_delay(mut self, delay: Duration) -> Self {
        self.consumer_delay = delay;
        self
    }

    /// Set thread name prefix
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the run deadline.
    ///
    /// When it passes, every worker is cancelled; the run still returns a
    /// report with `deadline_exceeded` set.
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Checks every field.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 || self.queue_capacity > MAX_CAPACITY {
            return Err(PipelineError::invalid_config(
                "queue_capacity",
                format!(
                    "must be between 1 and {}, but was {}",
                    MAX_CAPACITY, self.queue_capacity
                ),
            ));
        }
        if self.producers == 0 {
            return Err(PipelineError::invalid_config(
                "producers",
                "at least one producer is required to close the queue",
            ));
        }
        if self.consumers == 0 {
            return Err(PipelineError::invalid_config(
                "consumers",
                "at least one consumer is required",
            ));
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err(PipelineError::invalid_config(
                "thread_name_prefix",
                "thread name prefix cannot be empty",
            ));
        }
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Err(PipelineError::invalid_config(
                "deadline",
                "deadline must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take
    /// their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Pretty-printed JSON form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the pretty-printed JSON form to `path`.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}
