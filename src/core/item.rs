//! The unit of work moved through the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;

/// An immutable work item travelling from a producer to a consumer.
///
/// Identity is the `id` alone: two items with the same id compare equal and
/// hash identically even if their payloads or timestamps differ, so lookups
/// and de-duplication can key on the id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkItem {
    id: u64,
    payload: String,
    created_at: DateTime<Utc>,
}

impl WorkItem {
    /// Creates an item stamped with the current time
    pub fn new(id: u64, payload: impl Into<String>) -> Self {
        Self {
            id,
            payload: payload.into(),
            created_at: Utc::now(),
        }
    }

    /// Builds one item per id, with payload `Data-{id}`
    pub fn sequence(ids: RangeInclusive<u64>) -> Vec<WorkItem> {
        ids.map(|id| WorkItem::new(id, format!("Data-{}", id)))
            .collect()
    }

    /// Item identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Item payload
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// When the item was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WorkItem {}

impl Hash for WorkItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WorkItem #{} ({})", self.id, self.payload)
    }
}
