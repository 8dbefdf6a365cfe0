//! Item stores that workers read from and write to.
//!
//! Workers only see the [`ItemSource`] and [`ItemSink`] traits, so any
//! thread-safe collection can feed or receive a pipeline. [`Container`] is
//! the built-in implementation of both.
//!
//! Each call is atomic on its own; a sequence such as "check `is_empty`,
//! then `remove_first`" is not. Producers therefore treat a `None` from
//! `remove_first` as the normal end of their input.

mod container;

pub use container::Container;

/// A store producers drain from.
pub trait ItemSource<T>: Send + Sync {
    /// Removes and returns the first item, or `None` if the store is empty
    fn remove_first(&self) -> Option<T>;

    /// Number of items left
    fn len(&self) -> usize;

    /// True if no items are left
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A store consumers append to.
pub trait ItemSink<T>: Send + Sync {
    /// Appends an item
    fn add(&self, item: T);

    /// Number of items stored
    fn len(&self) -> usize;

    /// True if nothing has been stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
