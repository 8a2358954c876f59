//! Growable slot storage with generation-checked access.
//!
//! [`SlotTable`] is the storage layer under
//! [`ResourceTable`](crate::ResourceTable): a vector of slots, each either empty
//! or holding one boxed value together with the slot's current generation.
//! Lookups validate the handle's generation against the slot, so a handle issued
//! before an erase can never reach the value that later reuses the slot.
//!
//! Two properties matter to callers:
//!
//! - **Stable addresses.** Values are boxed, so growing the slot vector never
//!   moves a stored value. A reference obtained under a lock stays valid for the
//!   whole lock scope no matter how many inserts happened before it.
//! - **Dense reuse.** [`insert`](SlotTable::insert) always fills the
//!   lowest-numbered free slot before growing, keeping tables compact across
//!   erase/insert churn.
//!
//! # Example
//!
//! ```ignore
//! let mut table = SlotTable::new();
//! let h1 = table.insert(10u32);
//! assert_eq!(table.get(h1), Some(&10));
//!
//! table.remove(h1);
//! let h2 = table.insert(20u32);
//! assert_eq!(h2.index(), h1.index());      // slot reused
//! assert_ne!(h2.generation(), h1.generation());
//! assert_eq!(table.get(h1), None);         // old handle is dead
//! ```

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::handle::Handle;

struct Slot<T> {
    generation: u32,
    value: Option<Box<T>>,
}

/// Generation-checked slot storage.
///
/// Not synchronized; [`ResourceTable`](crate::ResourceTable) wraps it in a lock
/// for shared use.
pub struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    // Min-heap of free slot indices, so reuse always picks the lowest.
    free: BinaryHeap<Reverse<u32>>,
    len: usize,
}

impl<T> SlotTable<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: BinaryHeap::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: BinaryHeap::new(),
            len: 0,
        }
    }

    /// Insert a value, returning a fresh handle to it.
    ///
    /// Reuses the lowest free slot if one exists, otherwise grows the table.
    ///
    /// # Panics
    ///
    /// Panics if the slot index space (`u32`) is exhausted.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;
        if let Some(Reverse(index)) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none(), "free list pointed at a live slot");
            slot.value = Some(Box::new(value));
            return Handle::new(index, slot.generation);
        }

        assert!(
            self.slots.len() <= u32::MAX as usize,
            "slot table exhausted the u32 index space"
        );
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(Box::new(value)),
        });
        Handle::new(index, 0)
    }

    /// Look up a value; `None` if the handle is stale or out of range.
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots
            .get(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_deref())
    }

    /// Mutable lookup; `None` if the handle is stale or out of range.
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|slot| slot.generation == handle.generation())
            .and_then(|slot| slot.value.as_deref_mut())
    }

    /// Remove the value at `handle`, bumping the slot's generation.
    ///
    /// Returns the stored value, or `None` if the handle was already stale.
    /// The bump permanently invalidates every copy of `handle`; the slot index
    /// becomes eligible for reuse by a later [`insert`](Self::insert).
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index() as usize)?;
        if slot.generation != handle.generation() || slot.value.is_none() {
            return None;
        }

        let value = slot.value.take().map(|boxed| *boxed);
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(Reverse(handle.index()));
        self.len -= 1;
        value
    }

    /// Whether `handle` refers to a live value.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total slot count including free slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Iterate over live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_deref()
                .map(|value| (Handle::new(index as u32, slot.generation), value))
        })
    }
}

impl<T> Default for SlotTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut table = SlotTable::new();
        let h = table.insert("hello".to_string());

        assert_eq!(table.get(h).map(String::as_str), Some("hello"));
        assert_eq!(table.len(), 1);
        assert!(table.contains(h));
    }

    #[test]
    fn test_erase_then_reuse_bumps_generation() {
        let mut table = SlotTable::new();

        let h1 = table.insert(1u32);
        assert_eq!(h1.index(), 0);
        assert_eq!(h1.generation(), 0);

        assert_eq!(table.remove(h1), Some(1));

        let h2 = table.insert(2u32);
        assert_eq!(h2.index(), 0);
        assert_eq!(h2.generation(), 1);

        assert_ne!(h1, h2);
        assert!(!table.contains(h1));
        assert!(table.contains(h2));
        assert_eq!(table.get(h1), None);
        assert_eq!(table.get(h2), Some(&2));
    }

    #[test]
    fn test_remove_twice_returns_none() {
        let mut table = SlotTable::new();
        let h = table.insert(5u32);

        assert_eq!(table.remove(h), Some(5));
        assert_eq!(table.remove(h), None);
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn test_reuse_picks_lowest_free_slot() {
        let mut table = SlotTable::new();
        let h0 = table.insert(0u32);
        let h1 = table.insert(1u32);
        let h2 = table.insert(2u32);

        table.remove(h2);
        table.remove(h0);
        table.remove(h1);

        // Freed in order 2, 0, 1; reuse must go 0, 1, 2.
        assert_eq!(table.insert(10u32).index(), 0);
        assert_eq!(table.insert(11u32).index(), 1);
        assert_eq!(table.insert(12u32).index(), 2);
        assert_eq!(table.slot_count(), 3);
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut table = SlotTable::new();
        let h = table.insert(vec![1u8, 2, 3]);

        table.get_mut(h).unwrap().push(4);
        assert_eq!(table.get(h).unwrap().len(), 4);
    }

    #[test]
    fn test_stale_handle_never_reaches_new_value() {
        let mut table = SlotTable::new();
        let old = table.insert(1u32);
        table.remove(old);
        let new = table.insert(2u32);

        assert_eq!(table.get(old), None);
        assert_eq!(table.get_mut(old), None);
        assert_eq!(table.remove(old), None);
        // The new value is untouched by all of the above.
        assert_eq!(table.get(new), Some(&2));
    }

    #[test]
    fn test_iter_visits_live_entries_in_slot_order() {
        let mut table = SlotTable::new();
        let a = table.insert("a");
        let b = table.insert("b");
        let c = table.insert("c");
        table.remove(b);

        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![(a, &"a"), (c, &"c")]);
    }
}
