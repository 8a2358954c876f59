//! Per-call access permissions for mutable table lookups.
//!
//! An [`AccessToken`] is a small set of handles a caller is about to mutate.
//! [`ResourceTable`](crate::ResourceTable) refuses to hand out a mutable
//! reference unless the presented token names the handle, turning "this pass
//! writes a resource it never declared" from silent data corruption into a
//! panic at the offending call site.
//!
//! This is an assertion layer, not a security boundary: any code that can reach
//! the table can build a token. Tokens are meant to be built fresh for one
//! operation (a pass scheduling itself into the graph, a single update command)
//! and dropped afterwards, never cached across frames.
//!
//! # Example
//!
//! ```ignore
//! let mut token = AccessToken::new();
//! token.permit(buffer);
//!
//! let mut guard = table.write();
//! guard.get_mut(buffer, &token).len = 64;   // fine
//! // guard.get_mut(other, &token)           // panics: `other` was never permitted
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::handle::Handle;

/// A set of handles permitted for mutable access in one operation.
pub struct AccessToken<T> {
    permitted: HashSet<Handle<T>>,
}

impl<T> AccessToken<T> {
    pub fn new() -> Self {
        Self {
            permitted: HashSet::new(),
        }
    }

    /// Record that the holder may mutate the resource behind `handle`.
    pub fn permit(&mut self, handle: Handle<T>) {
        self.permitted.insert(handle);
    }

    /// Whether `handle` has been permitted on this token.
    pub fn permits(&self, handle: Handle<T>) -> bool {
        self.permitted.contains(&handle)
    }

    /// Iterate over every permitted handle, in no particular order.
    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        self.permitted.iter().copied()
    }

    /// Number of permitted handles.
    pub fn len(&self) -> usize {
        self.permitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permitted.is_empty()
    }

    /// Drop every permission, returning the token to its empty state.
    pub fn clear(&mut self) {
        self.permitted.clear();
    }
}

// Manual impls keep `T` free of `Clone`/`Debug`/`Default` bounds.

impl<T> Default for AccessToken<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for AccessToken<T> {
    fn clone(&self) -> Self {
        Self {
            permitted: self.permitted.clone(),
        }
    }
}

impl<T> fmt::Debug for AccessToken<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.permitted.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permit_and_query() {
        let mut token: AccessToken<u32> = AccessToken::new();
        let a = Handle::new(0, 0);
        let b = Handle::new(1, 0);

        assert!(token.is_empty());
        token.permit(a);

        assert!(token.permits(a));
        assert!(!token.permits(b));
        assert_eq!(token.len(), 1);
    }

    #[test]
    fn test_stale_handle_is_a_different_permission() {
        let mut token: AccessToken<u32> = AccessToken::new();
        let live = Handle::new(0, 1);
        let stale = Handle::new(0, 0);

        token.permit(live);
        assert!(token.permits(live));
        assert!(!token.permits(stale));
    }

    #[test]
    fn test_clear_revokes_everything() {
        let mut token: AccessToken<u32> = AccessToken::new();
        token.permit(Handle::new(0, 0));
        token.permit(Handle::new(1, 0));

        token.clear();
        assert!(token.is_empty());
        assert!(!token.permits(Handle::new(0, 0)));
    }

    #[test]
    fn test_handles_lists_each_permission_once() {
        let mut token: AccessToken<u32> = AccessToken::new();
        let a = Handle::new(4, 0);
        token.permit(a);
        token.permit(a);

        let handles: Vec<_> = token.handles().collect();
        assert_eq!(handles, vec![a]);
    }
}
