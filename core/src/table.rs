//! Lock-guarded resource tables with narrow access roles.
//!
//! [`ResourceTable`] wraps a [`SlotTable`](crate::SlotTable) in a
//! `parking_lot::RwLock` and splits its surface into deliberately narrow
//! pieces:
//!
//! | Surface                         | Capability                             |
//! |---------------------------------|----------------------------------------|
//! | [`ResourceAdder`]               | insert only                            |
//! | [`ResourceEraser`]              | erase only                             |
//! | [`TableReadGuard`] (`read()`)   | shared lookups                         |
//! | [`TableWriteGuard`] (`write()`) | lookups + token-gated mutable access   |
//!
//! Code that only needs to create resources is handed an adder and cannot
//! erase; a render pass gets a write guard and must present an
//! [`AccessToken`](crate::AccessToken) naming each handle it mutates.
//!
//! Every role method and guard acquisition takes the lock for a single call or
//! guard scope. Holding a guard while calling a role method on the same table
//! deadlocks; the lock is not reentrant.
//!
//! # Example
//!
//! ```ignore
//! let table: ResourceTable<Light> = ResourceTable::new();
//! let sun = table.adder().add(Light::directional());
//!
//! let mut token = AccessToken::new();
//! token.permit(sun);
//!
//! let mut guard = table.write();
//! guard.get_mut(sun, &token).intensity = 2.0;
//! ```

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::handle::Handle;
use crate::slots::SlotTable;
use crate::token::AccessToken;

/// A `SlotTable` behind a reader-writer lock, exposed through narrow roles.
pub struct ResourceTable<T> {
    slots: RwLock<SlotTable<T>>,
}

impl<T> ResourceTable<T> {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(SlotTable::new()),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(SlotTable::with_capacity(capacity)),
        }
    }

    /// Insert-only role.
    pub fn adder(&self) -> ResourceAdder<'_, T> {
        ResourceAdder { table: self }
    }

    /// Erase-only role.
    pub fn eraser(&self) -> ResourceEraser<'_, T> {
        ResourceEraser { table: self }
    }

    /// Take the shared lock for read-mostly lookups.
    pub fn read(&self) -> TableReadGuard<'_, T> {
        TableReadGuard {
            guard: self.slots.read(),
        }
    }

    /// Take the exclusive lock for mutable access.
    pub fn write(&self) -> TableWriteGuard<'_, T> {
        TableWriteGuard {
            guard: self.slots.write(),
        }
    }

    /// Whether `handle` is live. Takes the shared lock for this call only.
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slots.read().contains(handle)
    }

    /// Number of live resources. Takes the shared lock for this call only.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert-only view of a [`ResourceTable`].
pub struct ResourceAdder<'a, T> {
    table: &'a ResourceTable<T>,
}

impl<T> ResourceAdder<'_, T> {
    /// Insert `value`, taking the exclusive lock for this call only.
    pub fn add(&self, value: T) -> Handle<T> {
        let handle = self.table.slots.write().insert(value);
        log::trace!(
            "table add: slot {} generation {}",
            handle.index(),
            handle.generation()
        );
        handle
    }
}

/// Erase-only view of a [`ResourceTable`].
pub struct ResourceEraser<'a, T> {
    table: &'a ResourceTable<T>,
}

impl<T> ResourceEraser<'_, T> {
    /// Erase the resource behind `handle` and return it, taking the exclusive
    /// lock for this call only. The slot's generation is bumped, so every copy
    /// of `handle` is dead afterwards.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is stale; erasing twice is a contract violation.
    pub fn erase(&self, handle: Handle<T>) -> T {
        let value = self.table.slots.write().remove(handle);
        log::trace!(
            "table erase: slot {} generation {}",
            handle.index(),
            handle.generation()
        );
        match value {
            Some(value) => value,
            None => panic!("erase of a stale handle: {handle:?}"),
        }
    }

    /// Erase if `handle` is still live; `false` if it was already stale.
    pub fn try_erase(&self, handle: Handle<T>) -> bool {
        self.table.slots.write().remove(handle).is_some()
    }
}

/// Shared-lock view over a table's contents.
pub struct TableReadGuard<'a, T> {
    guard: RwLockReadGuard<'a, SlotTable<T>>,
}

impl<T> TableReadGuard<'_, T> {
    /// Look up a resource.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is stale.
    pub fn get(&self, handle: Handle<T>) -> &T {
        match self.guard.get(handle) {
            Some(value) => value,
            None => panic!("lookup of a stale handle: {handle:?}"),
        }
    }

    /// Look up a resource; `None` if `handle` is stale.
    pub fn try_get(&self, handle: Handle<T>) -> Option<&T> {
        self.guard.get(handle)
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.guard.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.is_empty()
    }

    /// Iterate over live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.guard.iter()
    }
}

/// Exclusive-lock view over a table's contents.
///
/// Plain lookups mirror [`TableReadGuard`]; mutable access additionally
/// requires an [`AccessToken`] naming the handle.
pub struct TableWriteGuard<'a, T> {
    guard: RwLockWriteGuard<'a, SlotTable<T>>,
}

impl<T> TableWriteGuard<'_, T> {
    /// Look up a resource.
    ///
    /// # Panics
    ///
    /// Panics if `handle` is stale.
    pub fn get(&self, handle: Handle<T>) -> &T {
        match self.guard.get(handle) {
            Some(value) => value,
            None => panic!("lookup of a stale handle: {handle:?}"),
        }
    }

    /// Look up a resource; `None` if `handle` is stale.
    pub fn try_get(&self, handle: Handle<T>) -> Option<&T> {
        self.guard.get(handle)
    }

    /// Mutable lookup, gated by `token`.
    ///
    /// # Panics
    ///
    /// Panics if `token` does not permit `handle`, or if `handle` is stale.
    pub fn get_mut(&mut self, handle: Handle<T>, token: &AccessToken<T>) -> &mut T {
        assert!(
            token.permits(handle),
            "mutable access to {handle:?} without a permitting token"
        );
        match self.guard.get_mut(handle) {
            Some(value) => value,
            None => panic!("mutable lookup of a stale handle: {handle:?}"),
        }
    }

    /// Mutable lookup, gated by `token`; `None` if `handle` is stale.
    ///
    /// # Panics
    ///
    /// Panics if `token` does not permit `handle`. Staleness is data-dependent
    /// and reported; a missing permission is a call-site bug and is not.
    pub fn try_get_mut(&mut self, handle: Handle<T>, token: &AccessToken<T>) -> Option<&mut T> {
        assert!(
            token.permits(handle),
            "mutable access to {handle:?} without a permitting token"
        );
        self.guard.get_mut(handle)
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.guard.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.guard.len()
    }
}
