use super::{ItemSink, ItemSource};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

/// A thread-safe ordered collection used as pipeline source and destination.
///
/// # Example
///
/// ```rust
/// use rust_producer_consumer::store::Container;
///
/// let container: Container<u32> = (1..=3).collect();
/// assert_eq!(container.remove_first(), Some(1));
/// container.add(4);
/// assert_eq!(container.snapshot(), vec![2, 3, 4]);
/// ```
pub struct Container<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> Container<T> {
    /// Creates an empty container
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends an item at the back
    pub fn add(&self, item: T) {
        self.items.lock().push_back(item);
    }

    /// Removes and returns the front item, `None` if empty
    pub fn remove_first(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// True if there are no items
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T: Clone> Container<T> {
    /// Clone of the item at `index`, `None` if out of range
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.lock().get(index).cloned()
    }

    /// Copy of every item, front to back
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }
}

impl<T> Default for Container<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for Container<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}

impl<T> fmt::Debug for Container<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("len", &self.len())
            .finish()
    }
}

impl<T: Send> ItemSource<T> for Container<T> {
    fn remove_first(&self) -> Option<T> {
        Container::remove_first(self)
    }

    fn len(&self) -> usize {
        Container::len(self)
    }
}

impl<T: Send> ItemSink<T> for Container<T> {
    fn add(&self, item: T) {
        Container::add(self, item)
    }

    fn len(&self) -> usize {
        Container::len(self)
    }
}
