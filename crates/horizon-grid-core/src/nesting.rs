//! Scoped nesting counters.
//!
//! Compound operations frequently trigger nested operations of the same kind
//! (changing the selected item moves the current cell, which updates the
//! selection, ...). Notifications for such operations must be raised exactly
//! once, when the outermost operation completes. A [`NestingCounter`] tracks
//! the depth and a [`NestingGuard`] increments it on creation and decrements
//! it on drop, calling back into its host when the depth returns to zero.
//!
//! Because the release runs from `Drop`, the flush also happens when the
//! scope is left early through `?` or a panic.
//!
//! # Example
//!
//! ```
//! use horizon_grid_core::{NestingCounter, NestingGuard, NestingHost};
//!
//! #[derive(Default)]
//! struct Batch {
//!     counter: NestingCounter,
//!     pending: Vec<u32>,
//!     flushed: Vec<Vec<u32>>,
//! }
//!
//! impl NestingHost for Batch {
//!     type Kind = ();
//!
//!     fn nesting_counter(&mut self, _kind: ()) -> &mut NestingCounter {
//!         &mut self.counter
//!     }
//!
//!     fn nesting_released(&mut self, _kind: ()) {
//!         let pending = std::mem::take(&mut self.pending);
//!         self.flushed.push(pending);
//!     }
//! }
//!
//! let mut batch = Batch::default();
//! {
//!     let mut outer = NestingGuard::enter(&mut batch, ());
//!     outer.pending.push(1);
//!     {
//!         let mut inner = NestingGuard::enter(&mut *outer, ());
//!         inner.pending.push(2);
//!     }
//!     assert!(outer.flushed.is_empty());
//! }
//! assert_eq!(batch.flushed, vec![vec![1, 2]]);
//! ```

use std::ops::{Deref, DerefMut};

/// A depth counter for nested suspensions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NestingCounter {
    depth: u32,
}

impl NestingCounter {
    /// Create a counter at depth zero.
    pub const fn new() -> Self {
        Self { depth: 0 }
    }

    /// Current nesting depth.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Whether at least one scope is open.
    pub fn is_active(&self) -> bool {
        self.depth > 0
    }

    /// Open a scope.
    pub fn enter(&mut self) {
        self.depth += 1;
    }

    /// Close a scope. Returns `true` when the outermost scope was closed.
    ///
    /// Closing a counter that is already at zero is a no-op returning `false`.
    pub fn exit(&mut self) -> bool {
        match self.depth {
            0 => {
                tracing::warn!(target: "horizon_grid_core::nesting", "unbalanced nesting exit");
                false
            }
            1 => {
                self.depth = 0;
                true
            }
            _ => {
                self.depth -= 1;
                false
            }
        }
    }
}

/// A type that owns one or more nesting counters and reacts when they reach
/// zero.
pub trait NestingHost {
    /// Identifies which counter a guard operates on.
    type Kind: Copy;

    /// The counter for `kind`.
    fn nesting_counter(&mut self, kind: Self::Kind) -> &mut NestingCounter;

    /// Called after the outermost guard of `kind` is released.
    fn nesting_released(&mut self, kind: Self::Kind);
}

/// RAII scope over a [`NestingHost`] counter.
///
/// The guard dereferences to the host so the guarded work is written against
/// the guard itself. Nested guards are created by reborrowing:
/// `NestingGuard::enter(&mut *outer, kind)`.
pub struct NestingGuard<'a, H: NestingHost> {
    host: &'a mut H,
    kind: H::Kind,
}

impl<'a, H: NestingHost> NestingGuard<'a, H> {
    /// Increment the counter for `kind` and return a guard that decrements it.
    pub fn enter(host: &'a mut H, kind: H::Kind) -> Self {
        host.nesting_counter(kind).enter();
        Self { host, kind }
    }

    /// The counter kind this guard holds open.
    pub fn kind(&self) -> H::Kind {
        self.kind
    }
}

impl<H: NestingHost> Deref for NestingGuard<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: NestingHost> DerefMut for NestingGuard<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: NestingHost> Drop for NestingGuard<'_, H> {
    fn drop(&mut self) {
        if self.host.nesting_counter(self.kind).exit() {
            self.host.nesting_released(self.kind);
        }
    }
}
