//! Generation-checked handles into slot tables.
//!
//! A [`Handle`] is an opaque `{index, generation}` pair identifying one slot in
//! a [`SlotTable`](crate::SlotTable). Handles are plain values: freely copyable,
//! comparable and hashable, carrying no ownership. A handle stays valid until
//! the slot it points at is erased; erasing bumps the slot's generation, which
//! permanently invalidates every copy of the old handle.
//!
//! Handles are typed by the table's element type, so a handle into a material
//! table cannot be passed to a light table by accident.
//!
//! # Example
//!
//! ```ignore
//! let mut table = SlotTable::new();
//! let first = table.insert("alpha");
//! table.remove(first);
//! let second = table.insert("beta");
//!
//! // Same slot index, different generation: the old handle stays dead.
//! assert_ne!(first, second);
//! assert!(!table.contains(first));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Opaque identifier for one slot in a [`SlotTable`](crate::SlotTable).
///
/// The `PhantomData<fn() -> T>` marker ties the handle to its table's element
/// type without imposing any bounds on `T`; handles are always `Copy`, `Send`
/// and `Sync` regardless of what the table stores.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index inside the owning table.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation the slot had when this handle was issued.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

// Manual impls: the derives would add `T: Clone` etc. bounds that handles
// must not carry.

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_handle_equality() {
        let a: Handle<u32> = Handle::new(0, 0);
        let b: Handle<u32> = Handle::new(0, 0);
        let c: Handle<u32> = Handle::new(0, 1);
        let d: Handle<u32> = Handle::new(1, 0);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_handle_is_copy() {
        // A non-Clone element type must not stop handles from being copied.
        struct NotClone;

        let a: Handle<NotClone> = Handle::new(3, 7);
        let b = a;
        assert_eq!(a.index(), b.index());
        assert_eq!(a.generation(), b.generation());
    }

    #[test]
    fn test_handle_as_map_key() {
        let mut set: HashSet<Handle<String>> = HashSet::new();
        set.insert(Handle::new(0, 0));
        set.insert(Handle::new(0, 0));
        set.insert(Handle::new(0, 1));

        assert_eq!(set.len(), 2);
        assert!(set.contains(&Handle::new(0, 1)));
    }
}
