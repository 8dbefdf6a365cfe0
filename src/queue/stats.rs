//! Point-in-time queue statistics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A consistent snapshot of a queue's counters.
///
/// Every field is read inside one critical section, so the fields always
/// reconcile with each other: `in_transit == produced - consumed ==
/// current_size`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Maximum number of buffered items
    pub capacity: usize,
    /// Total items ever inserted
    pub produced: u64,
    /// Total items ever removed
    pub consumed: u64,
    /// Items buffered at snapshot time
    pub current_size: usize,
    /// Items accepted but not yet removed
    pub in_transit: u64,
    /// Whether every registered producer has finished
    pub closed: bool,
}

impl QueueStats {
    /// True once the queue is closed and everything produced was consumed
    pub fn is_drained(&self) -> bool {
        self.closed && self.produced == self.consumed && self.current_size == 0
    }

    /// Fraction of capacity in use, between 0.0 and 1.0
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.current_size as f64 / self.capacity as f64
        }
    }
}

impl fmt::Display for QueueStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Queue Statistics ===")?;
        writeln!(f, "Capacity: {}", self.capacity)?;
        writeln!(f, "Items produced: {}", self.produced)?;
        writeln!(f, "Items consumed: {}", self.consumed)?;
        writeln!(f, "Current size: {}", self.current_size)?;
        writeln!(f, "Items in transit: {}", self.in_transit)?;
        write!(f, "Closed: {}", self.closed)
    }
}
