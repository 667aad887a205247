//! Signal/slot system for Horizon Grid.
//!
//! Signals are the public event surface of the grid engine. A grid raises a
//! signal whenever application code may want to observe or veto a state
//! transition (beginning an edit, a selection change, a column reorder, ...).
//!
//! A [`Signal<Args>`] hands out a [`ConnectionId`] per connected closure;
//! [`ConnectionGuard`] ties a connection to a scope instead.
//!
//! # Invocation
//!
//! The grid is driven synchronously from the host's dispatch thread, so every
//! slot is invoked directly in the emitting thread, in connection order. The
//! connection list is snapshotted before invocation: a slot may connect or
//! disconnect other slots (or itself) while the signal is being emitted, and
//! the change takes effect from the next emission.
//!
//! # Example
//!
//! ```
//! use horizon_grid_core::Signal;
//!
//! let selection_changed = Signal::<Vec<usize>>::new();
//!
//! let conn_id = selection_changed.connect(|slots| {
//!     println!("selected slots: {:?}", slots);
//! });
//!
//! selection_changed.emit(vec![2, 3, 4]);
//! selection_changed.disconnect(conn_id);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle for one connected closure, passed back to [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A list of closures invoked with a borrowed `Args` on every emission.
///
/// Event payloads are plain structs; cancellable events carry a shared flag
/// that handlers set. The type is `Send + Sync` so sources that own signals
/// can sit behind an `Arc`. Emission never holds the connection lock while a
/// handler runs.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
    /// Number of emissions that reached at least one slot.
    emission_count: AtomicU64,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connections.lock().len())
            .field("blocked", &self.blocked.load(Ordering::SeqCst))
            .finish()
    }
}

impl<Args: 'static> Signal<Args> {
    /// An unconnected signal.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
            emission_count: AtomicU64::new(0),
        }
    }

    /// Append `slot` to the handler list.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        self.connections.lock().insert(Arc::new(slot))
    }

    /// Connect a slot that is disconnected when the returned guard drops.
    ///
    /// ```
    /// use horizon_grid_core::Signal;
    ///
    /// let signal = Signal::<i32>::new();
    /// {
    ///     let _guard = signal.connect_scoped(|n| println!("{n}"));
    ///     assert_eq!(signal.connection_count(), 1);
    /// }
    /// assert_eq!(signal.connection_count(), 0);
    /// ```
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard { signal: self, id }
    }

    /// Drop the handler behind `id`. Returns `false` for a stale id.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Drop every handler.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of connected handlers.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Mute or unmute the signal. A muted `emit` is dropped, not queued.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether the signal is muted.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Number of emissions that were delivered to at least one slot.
    pub fn emission_count(&self) -> u64 {
        self.emission_count.load(Ordering::SeqCst)
    }

    /// Invoke every handler with `args`, oldest connection first.
    #[tracing::instrument(skip_all, target = "horizon_grid_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.blocked.load(Ordering::SeqCst) {
            tracing::trace!(target: "horizon_grid_core::signal", "muted, emission dropped");
            return;
        }
        let handlers: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        if handlers.is_empty() {
            return;
        }
        tracing::trace!(target: "horizon_grid_core::signal", handlers = handlers.len(), "emit");
        self.emission_count.fetch_add(1, Ordering::SeqCst);
        handlers.iter().for_each(|handler| handler(&args));
    }
}

/// RAII connection returned by [`Signal::connect_scoped`].
///
/// The borrow ties the guard to the signal's lifetime, so the connection can
/// never outlive the signal it was made on.
pub struct ConnectionGuard<'a, Args: 'static> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args: 'static> ConnectionGuard<'_, Args> {
    /// The underlying connection id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        let _ = self.signal.disconnect(self.id);
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, PartialEq)]
    struct RowMoved {
        from: usize,
        to: usize,
    }

    fn recorder() -> (Signal<RowMoved>, Arc<Mutex<Vec<(usize, usize)>>>) {
        let signal = Signal::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        signal.connect(move |moved: &RowMoved| sink.lock().push((moved.from, moved.to)));
        (signal, log)
    }

    #[test]
    fn test_handlers_receive_payloads() {
        let (signal, log) = recorder();
        signal.emit(RowMoved { from: 3, to: 0 });
        signal.emit(RowMoved { from: 0, to: 7 });
        assert_eq!(*log.lock(), vec![(3, 0), (0, 7)]);
        assert_eq!(signal.emission_count(), 2);
    }

    #[test]
    fn test_stale_id_is_rejected() {
        let signal = Signal::<usize>::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = signal.connect(move |slot| {
            counter.fetch_add(*slot, Ordering::SeqCst);
        });
        signal.emit(4);
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(9);
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_muted_emissions_are_dropped() {
        let (signal, log) = recorder();
        signal.set_blocked(true);
        assert!(signal.is_blocked());
        signal.emit(RowMoved { from: 1, to: 2 });
        signal.set_blocked(false);
        signal.emit(RowMoved { from: 2, to: 3 });
        assert_eq!(*log.lock(), vec![(2, 3)]);
        assert_eq!(signal.emission_count(), 1);
    }

    #[test]
    fn test_handlers_run_oldest_first() {
        let signal = Signal::<()>::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..4 {
            let order = order.clone();
            signal.connect(move |_| order.lock().push(n));
        }
        signal.emit(());
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_connection_made_during_emit_waits_for_next_emit() {
        let signal = Arc::new(Signal::<()>::new());
        let late = Arc::new(AtomicUsize::new(0));

        let inner = signal.clone();
        let counter = late.clone();
        signal.connect(move |_| {
            let counter = counter.clone();
            inner.connect(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        signal.emit(());
        assert_eq!(late.load(Ordering::SeqCst), 0);
        signal.emit(());
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_scoped_connection_ends_with_scope() {
        let signal = Signal::<bool>::new();
        let seen = Arc::new(AtomicUsize::new(0));
        {
            let counter = seen.clone();
            let _guard = signal.connect_scoped(move |&cancel| {
                if !cancel {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
            assert_eq!(signal.connection_count(), 1);
            signal.emit(false);
            signal.emit(true);
        }
        signal.emit(false);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(signal.connection_count(), 0);

        for _ in 0..3 {
            signal.connect(|_| {});
        }
        signal.disconnect_all();
        assert_eq!(signal.connection_count(), 0);
        signal.emit(false);
    }
}
