//! Per-frame slot rotation.
//!
//! Targets written by render passes exist once per frame slot so that a
//! frame being recorded never touches the targets a previous frame may
//! still be reading. [`FrameSlots`] holds the per-slot copies of one
//! logical object; [`FrameCursor`] names the slot the current cycle uses
//! and advances once per successful cycle.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Default number of frame slots: one being recorded, one in flight.
pub const DEFAULT_FRAME_SLOTS: usize = 2;

/// One value per frame slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSlots<T> {
    slots: Vec<T>,
}

impl<T> FrameSlots<T> {
    /// Wraps per-slot values.
    ///
    /// # Panics
    ///
    /// Panics if `slots` is empty.
    pub fn new(slots: Vec<T>) -> Self {
        assert!(!slots.is_empty(), "frame slots must not be empty");
        Self { slots }
    }

    /// Builds one value per slot from the slot index.
    pub fn per_slot(count: usize, mut build: impl FnMut(usize) -> T) -> Self {
        Self::new((0..count).map(&mut build).collect())
    }

    /// Value for a slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn get(&self, slot: usize) -> &T {
        assert!(
            slot < self.slots.len(),
            "frame slot {} out of range ({} slots)",
            slot,
            self.slots.len()
        );
        &self.slots[slot]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}

/// Names the frame slot the open cycle records into.
///
/// The drain thread is the only writer; producers read the current slot
/// lock-free through the service view.
#[derive(Debug)]
pub struct FrameCursor {
    slot: AtomicUsize,
    count: usize,
}

impl FrameCursor {
    /// # Panics
    ///
    /// Panics if `count` is zero.
    pub fn new(count: usize) -> Self {
        assert!(count > 0, "frame slot count must be non-zero");
        Self {
            slot: AtomicUsize::new(0),
            count,
        }
    }

    /// Slot used by the cycle currently recording.
    pub fn current(&self) -> usize {
        self.slot.load(Ordering::Acquire)
    }

    /// Number of slots in rotation.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Moves to the next slot. Called once per successful cycle.
    pub fn advance(&self) -> usize {
        let next = (self.slot.load(Ordering::Relaxed) + 1) % self.count;
        self.slot.store(next, Ordering::Release);
        next
    }
}
