//! Command lists and the service API contract.
//!
//! A [`CommandList`] is an ordered batch of deferred closures recorded by a
//! producer thread and executed later by the owning service's drain thread.
//! Each closure receives exclusive access to the service's API state, so
//! commands never need their own locking.
//!
//! Results that a producer wants back out of a command (typically handles to
//! objects the command creates) travel through an [`OutSlot`], which the
//! closure fulfills exactly once during execution.
//!
//! # Example
//!
//! ```ignore
//! let mut list = proxy.create_command_list();
//! let out = OutSlot::new();
//! let slot = out.clone();
//! list.push(move |api| {
//!     let handle = api.create_thing()?;
//!     slot.fulfill(handle);
//!     Ok(())
//! });
//! let ticket = proxy.submit_command_list(list);
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

/// State a service hands to its command closures.
///
/// Implementors bundle everything commands may touch: backend connections,
/// resource tables, staging buffers. The drain thread holds the API
/// exclusively while executing, which is what lets [`CommandList`] closures
/// take `&mut` access without further synchronization.
pub trait ServiceApi: 'static {
    /// Error produced by failing commands.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read-only snapshot handle cloned out to producer threads.
    type View: Clone + Send + Sync + 'static;
}

type CommandFn<A> = Box<dyn FnOnce(&mut A) -> Result<(), <A as ServiceApi>::Error> + Send>;

/// Ordered batch of deferred commands bound to one service instance.
///
/// Lists are cheap to create and are consumed on submission. Within a list,
/// commands execute in the order they were pushed; across lists, the service
/// preserves submission order.
pub struct CommandList<A: ServiceApi> {
    commands: Vec<CommandFn<A>>,
    service_id: u64,
}

impl<A: ServiceApi> CommandList<A> {
    pub(crate) fn new(service_id: u64) -> Self {
        Self {
            commands: Vec::new(),
            service_id,
        }
    }

    /// Appends a command to the end of the list.
    pub fn push(
        &mut self,
        command: impl FnOnce(&mut A) -> Result<(), A::Error> + Send + 'static,
    ) {
        self.commands.push(Box::new(command));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub(crate) fn service_id(&self) -> u64 {
        self.service_id
    }

    /// Runs every command in push order against the service API.
    ///
    /// Stops at the first failing command and returns its error; the
    /// remaining commands of this list are dropped unexecuted. Called by the
    /// owning service's drain phase.
    pub fn execute(self, api: &mut A) -> Result<(), A::Error> {
        for command in self.commands {
            command(api)?;
        }
        Ok(())
    }
}

impl<A: ServiceApi> fmt::Debug for CommandList<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandList")
            .field("commands", &self.commands.len())
            .field("service_id", &self.service_id)
            .finish()
    }
}

/// Single-assignment cell for passing a value out of a deferred command.
///
/// The producer keeps one clone and moves another into the closure. The
/// closure fulfills the slot during execution; the producer reads it after
/// the submission ticket has been reached. All clones share the same cell.
pub struct OutSlot<T> {
    cell: Arc<OnceLock<T>>,
}

impl<T> OutSlot<T> {
    pub fn new() -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
        }
    }

    /// Returns a slot that already holds `value`.
    ///
    /// Lets a value obtained outside the command stream feed an input that
    /// expects a slot.
    pub fn ready(value: T) -> Self {
        let slot = Self::new();
        slot.fulfill(value);
        slot
    }

    /// Stores the value.
    ///
    /// # Panics
    ///
    /// Panics if the slot was already fulfilled.
    pub fn fulfill(&self, value: T) {
        assert!(
            self.cell.set(value).is_ok(),
            "out slot fulfilled more than once"
        );
    }

    /// Returns a copy of the value, or `None` while unfulfilled.
    pub fn get(&self) -> Option<T>
    where
        T: Clone,
    {
        self.cell.get().cloned()
    }

    /// Borrows the value, or `None` while unfulfilled.
    pub fn peek(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Clone for OutSlot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Default for OutSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for OutSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutSlot").field("value", &self.cell.get()).finish()
    }
}
