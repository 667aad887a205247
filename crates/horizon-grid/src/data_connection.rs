//! Adapter between the grid and its items source.
//!
//! [`DataConnection`] gives the grid uniform `count` / `get` / `index_of`
//! access over any [`ItemsSource`] through a snapshot of its items. The
//! snapshot advances only as queued changes are applied, so it always matches
//! the slot tables. It subscribes to the source's signals and
//! queues what they report; the grid drains the queue from its own `&mut`
//! context, so a source notification can never re-enter a grid operation.
//!
//! Notifications that arrive while the grid is loading or unloading rows are
//! not queued. They flip a rejection flag the grid turns into
//! [`GridError::CannotChangeItemsWhenLoadingRows`](crate::GridError).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use horizon_grid_core::logging::targets;
use horizon_grid_core::ConnectionId;
use parking_lot::Mutex;

use crate::item::{same_item, ItemRef, PropertyDescriptor};
use crate::source::{
    CollectionChange, CollectionView, CollectionViewGroup, CurrentChangingArgs, IndexedSource,
    ItemsSource, SortDescription,
};

#[derive(Debug, Clone, Copy)]
enum Subscription {
    CollectionChanged(ConnectionId),
    CurrentChanging(ConnectionId),
    CurrentChanged(ConnectionId),
}

/// Flags shared with the closures connected to the source.
#[derive(Debug, Default)]
struct SharedFlags {
    loading_rows: AtomicBool,
    rejected: AtomicBool,
    expecting_current_changed: AtomicBool,
    veto_current_changing: AtomicBool,
    current_changed: AtomicBool,
}

#[derive(Default)]
pub(crate) struct DataConnection {
    source: Option<Arc<dyn ItemsSource>>,
    snapshot: Vec<ItemRef>,
    properties: Vec<PropertyDescriptor>,
    pending: Arc<Mutex<VecDeque<CollectionChange>>>,
    flags: Arc<SharedFlags>,
    subscriptions: Vec<Subscription>,
}

impl std::fmt::Debug for DataConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataConnection")
            .field("has_source", &self.source.is_some())
            .field("count", &self.count())
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

impl DataConnection {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Binding
    // =========================================================================

    pub(crate) fn source(&self) -> Option<&Arc<dyn ItemsSource>> {
        self.source.as_ref()
    }

    pub(crate) fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Bind to `source`, dropping the previous subscriptions and any queued
    /// notifications.
    pub(crate) fn set_source(&mut self, source: Option<Arc<dyn ItemsSource>>) {
        self.unsubscribe();
        self.pending.lock().clear();
        self.flags.rejected.store(false, Ordering::SeqCst);
        self.flags.current_changed.store(false, Ordering::SeqCst);
        self.source = source;
        self.refresh_snapshot();
        self.subscribe();
    }

    fn subscribe(&mut self) {
        let Some(source) = self.source.clone() else {
            return;
        };
        if let Some(signal) = source.collection_changed() {
            let pending = self.pending.clone();
            let flags = self.flags.clone();
            let id = signal.connect(move |change: &CollectionChange| {
                if flags.loading_rows.load(Ordering::SeqCst) {
                    tracing::warn!(
                        target: targets::DATA,
                        action = change.action(),
                        "collection changed while rows were loading"
                    );
                    flags.rejected.store(true, Ordering::SeqCst);
                    return;
                }
                pending.lock().push_back(change.clone());
            });
            self.subscriptions.push(Subscription::CollectionChanged(id));
        }
        if let Some(view) = source.as_collection_view() {
            let flags = self.flags.clone();
            let id = view.current_changing().connect(move |args: &CurrentChangingArgs| {
                if flags.veto_current_changing.load(Ordering::SeqCst)
                    && !flags.expecting_current_changed.load(Ordering::SeqCst)
                {
                    tracing::debug!(target: targets::DATA, "vetoing external currency change");
                    args.cancel.set();
                }
            });
            self.subscriptions.push(Subscription::CurrentChanging(id));

            let flags = self.flags.clone();
            let id = view.current_changed().connect(move |_: &()| {
                if !flags.expecting_current_changed.load(Ordering::SeqCst) {
                    flags.current_changed.store(true, Ordering::SeqCst);
                }
            });
            self.subscriptions.push(Subscription::CurrentChanged(id));
        }
    }

    fn unsubscribe(&mut self) {
        let Some(source) = self.source.clone() else {
            self.subscriptions.clear();
            return;
        };
        for subscription in self.subscriptions.drain(..) {
            match subscription {
                Subscription::CollectionChanged(id) => {
                    if let Some(signal) = source.collection_changed() {
                        signal.disconnect(id);
                    }
                }
                Subscription::CurrentChanging(id) => {
                    if let Some(view) = source.as_collection_view() {
                        view.current_changing().disconnect(id);
                    }
                }
                Subscription::CurrentChanged(id) => {
                    if let Some(view) = source.as_collection_view() {
                        view.current_changed().disconnect(id);
                    }
                }
            }
        }
    }

    // =========================================================================
    // Item access
    // =========================================================================

    /// Number of items the grid has applied.
    pub(crate) fn count(&self) -> usize {
        self.snapshot.len()
    }

    /// Item at `index`; `None` when out of range.
    pub(crate) fn get_data_item(&self, index: usize) -> Option<ItemRef> {
        self.snapshot.get(index).cloned()
    }

    /// Position of `item`, by identity.
    pub(crate) fn index_of(&self, item: &ItemRef) -> Option<usize> {
        self.snapshot.iter().position(|candidate| same_item(candidate, item))
    }

    pub(crate) fn is_read_only(&self) -> bool {
        self.source
            .as_deref()
            .and_then(|source| source.as_list())
            .is_some_and(|list| list.is_read_only())
    }

    /// Re-read the items of the source.
    ///
    /// The snapshot only moves here and in [`apply_to_snapshot`](Self::apply_to_snapshot),
    /// so slots keep resolving to the items they were built from while source
    /// notifications sit in the queue.
    pub(crate) fn refresh_snapshot(&mut self) {
        self.snapshot = self
            .source
            .as_deref()
            .map(|source| source.items())
            .unwrap_or_default();
    }

    /// Apply a queued add or remove to the snapshot.
    ///
    /// Replace and Reset are left to the full refresh that follows them.
    pub(crate) fn apply_to_snapshot(&mut self, change: &CollectionChange) {
        match change {
            CollectionChange::Add { index, items } => {
                let at = (*index).min(self.snapshot.len());
                self.snapshot.splice(at..at, items.iter().cloned());
            }
            CollectionChange::Remove { index, items } => {
                let end = (index + items.len()).min(self.snapshot.len());
                if *index < end {
                    self.snapshot.drain(*index..end);
                }
            }
            CollectionChange::Replace { .. } | CollectionChange::Reset => {}
        }
    }

    // =========================================================================
    // Item type
    // =========================================================================

    /// Properties of the item type as last read.
    pub(crate) fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Re-read the item properties. Returns whether they changed.
    pub(crate) fn refresh_properties(&mut self) -> bool {
        let properties = self
            .source
            .as_deref()
            .map(|source| source.item_properties())
            .unwrap_or_default();
        let changed = properties != self.properties;
        self.properties = properties;
        changed
    }

    /// Whether `property` is known and cannot be written.
    pub(crate) fn is_property_read_only(&self, property: &str) -> bool {
        self.properties
            .iter()
            .find(|descriptor| descriptor.name == property)
            .is_some_and(|descriptor| descriptor.read_only)
    }

    // =========================================================================
    // Collection view passthrough
    // =========================================================================

    pub(crate) fn collection_view(&self) -> Option<&dyn CollectionView> {
        self.source.as_deref().and_then(|source| source.as_collection_view())
    }

    pub(crate) fn allow_sort(&self) -> bool {
        self.collection_view().is_some_and(|view| view.can_sort())
    }

    pub(crate) fn sort_descriptions(&self) -> Vec<SortDescription> {
        self.collection_view()
            .map(|view| view.sort_descriptions())
            .unwrap_or_default()
    }

    pub(crate) fn group_descriptions(&self) -> Vec<String> {
        self.collection_view()
            .map(|view| view.group_descriptions())
            .unwrap_or_default()
    }

    pub(crate) fn groups(&self) -> Vec<Arc<CollectionViewGroup>> {
        self.collection_view()
            .map(|view| view.groups())
            .unwrap_or_default()
    }

    /// The view's current item as a snapshot index.
    pub(crate) fn current_position(&self) -> Option<usize> {
        let view = self.collection_view()?;
        let position = view.current_position()?;
        let current = view.current_item()?;
        match self.snapshot.get(position) {
            Some(candidate) if same_item(candidate, &current) => Some(position),
            _ => self.index_of(&current),
        }
    }

    /// Move the view's current pointer on the grid's behalf.
    ///
    /// `position` is a snapshot index. It is translated to the item's live
    /// position first; an item the view no longer holds leaves the pointer
    /// where it is.
    pub(crate) fn move_current_to_position(&self, position: Option<usize>) -> bool {
        let Some(view) = self.collection_view() else {
            return true;
        };
        let target = match position {
            Some(position) => {
                let live = self
                    .snapshot
                    .get(position)
                    .and_then(|item| view.index_of(item));
                if live.is_none() {
                    tracing::trace!(
                        target: targets::DATA,
                        position,
                        "item left the view before its removal was applied"
                    );
                    return true;
                }
                live
            }
            None => None,
        };
        self.flags.expecting_current_changed.store(true, Ordering::SeqCst);
        let moved = view.move_current_to_position(target);
        self.flags.expecting_current_changed.store(false, Ordering::SeqCst);
        moved
    }

    /// Whether the view moved its current pointer without the grid asking.
    pub(crate) fn take_current_changed(&self) -> bool {
        self.flags.current_changed.swap(false, Ordering::SeqCst)
    }

    /// Veto external currency moves while the grid cannot give up its edit.
    pub(crate) fn set_veto_current_changing(&self, veto: bool) {
        self.flags.veto_current_changing.store(veto, Ordering::SeqCst);
    }

    // =========================================================================
    // Edit delegation
    // =========================================================================

    /// Begin an item-level edit. Items without the capability succeed.
    pub(crate) fn begin_edit(&self, item: &ItemRef) -> bool {
        if !item.try_begin_edit() {
            tracing::trace!(target: targets::EDITING, "item is not editable, begin is a no-op");
        }
        true
    }

    /// Commit an item-level edit. Items without the capability succeed.
    pub(crate) fn end_edit(&self, item: &ItemRef) -> bool {
        if !item.try_end_edit() {
            tracing::trace!(target: targets::EDITING, "item is not editable, end is a no-op");
        }
        true
    }

    /// Roll back an item-level edit. Fails without the capability.
    pub(crate) fn cancel_edit(&self, item: &ItemRef) -> bool {
        let supported = item.try_cancel_edit();
        if !supported {
            tracing::debug!(target: targets::EDITING, "item cannot roll back, cancel not supported");
        }
        supported
    }

    // =========================================================================
    // Notification queue
    // =========================================================================

    pub(crate) fn drain_changes(&self) -> Vec<CollectionChange> {
        self.pending.lock().drain(..).collect()
    }

    pub(crate) fn has_pending_changes(&self) -> bool {
        !self.pending.lock().is_empty() || self.flags.rejected.load(Ordering::SeqCst)
    }

    /// Whether a notification was rejected since the last call.
    pub(crate) fn take_rejected(&self) -> bool {
        self.flags.rejected.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn set_loading_rows(&self, loading: bool) {
        self.flags.loading_rows.store(loading, Ordering::SeqCst);
    }

    pub(crate) fn is_loading_rows(&self) -> bool {
        self.flags.loading_rows.load(Ordering::SeqCst)
    }
}

impl Drop for DataConnection {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Record;
    use crate::source::{EnumerableSource, ItemList, ListCollectionView};
    use crate::value::CellValue;

    fn item(n: i64) -> ItemRef {
        Record::new().with("N", n).into_item()
    }

    #[test]
    fn test_enumerable_fallback() {
        let items = vec![item(0), item(1), item(2)];
        let mut connection = DataConnection::new();
        connection.set_source(Some(Arc::new(EnumerableSource::new(items.clone()))));
        assert_eq!(connection.count(), 3);
        assert_eq!(connection.index_of(&items[2]), Some(2));
        assert!(connection.get_data_item(3).is_none());
        assert!(connection.collection_view().is_none());
    }

    #[test]
    fn test_changes_are_queued() {
        let list = Arc::new(ItemList::from_items([item(0)]));
        let mut connection = DataConnection::new();
        connection.set_source(Some(list.clone()));
        list.push(item(1));
        list.remove(0);
        let changes = connection.drain_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].action(), "Add");

        // Nothing moves until the grid applies the queue.
        let first = connection.get_data_item(0);
        assert!(first.is_some_and(|first| first.value("N") == CellValue::Int(0)));
        assert_eq!(connection.count(), 1);

        for change in &changes {
            connection.apply_to_snapshot(change);
        }
        assert_eq!(connection.count(), 1);
        let first = connection.get_data_item(0);
        assert!(first.is_some_and(|first| first.value("N") == CellValue::Int(1)));
    }

    #[test]
    fn test_properties_change_only_on_refresh() {
        let list = Arc::new(ItemList::from_items([item(0)]));
        let mut connection = DataConnection::new();
        connection.set_source(Some(list.clone()));
        assert!(connection.properties().is_empty());
        assert!(connection.refresh_properties());
        assert_eq!(connection.properties().len(), 1);

        connection.set_source(None);
        connection.refresh_snapshot();
        assert_eq!(connection.properties().len(), 1);
        assert!(connection.refresh_properties());
        assert!(connection.properties().is_empty());
    }

    #[test]
    fn test_current_position_follows_snapshot() {
        let items = [item(0), item(1), item(2)];
        let view = Arc::new(ListCollectionView::new(items.clone()));
        let mut connection = DataConnection::new();
        connection.set_source(Some(view.clone()));
        assert!(connection.move_current_to_position(Some(2)));

        // The view already dropped row 0, the grid has not.
        assert!(view.remove(&items[0]));
        assert_eq!(connection.current_position(), Some(2));
        assert!(connection.move_current_to_position(Some(1)));
        assert!(view.current_item().is_some_and(|current| same_item(&current, &items[1])));

        // Moving onto the departed row leaves the view alone.
        assert!(connection.move_current_to_position(Some(0)));
        assert!(view.current_item().is_some_and(|current| same_item(&current, &items[1])));
    }

    #[test]
    fn test_changes_while_loading_are_rejected() {
        let list = Arc::new(ItemList::from_items([item(0)]));
        let mut connection = DataConnection::new();
        connection.set_source(Some(list.clone()));
        connection.set_loading_rows(true);
        list.push(item(1));
        connection.set_loading_rows(false);
        assert!(connection.drain_changes().is_empty());
        assert!(connection.take_rejected());
        assert!(!connection.take_rejected());
    }

    #[test]
    fn test_rebinding_disconnects_old_source() {
        let list = Arc::new(ItemList::from_items([item(0)]));
        let mut connection = DataConnection::new();
        connection.set_source(Some(list.clone()));
        connection.set_source(None);
        list.push(item(1));
        assert!(!connection.has_pending_changes());
    }

    #[test]
    fn test_cancel_requires_capability() {
        let connection = DataConnection::new();
        let plain = item(0);
        let editable = Record::new().with("N", 1).editable().into_item();
        assert!(connection.begin_edit(&plain));
        assert!(!connection.cancel_edit(&plain));
        assert!(connection.begin_edit(&editable));
        assert!(connection.cancel_edit(&editable));
    }

    #[test]
    fn test_external_currency_change_is_flagged() {
        let view = Arc::new(ListCollectionView::new([item(0), item(1)]));
        let mut connection = DataConnection::new();
        connection.set_source(Some(view.clone()));

        assert!(connection.move_current_to_position(Some(1)));
        assert!(!connection.take_current_changed());

        assert!(view.move_current_to_position(Some(0)));
        assert!(connection.take_current_changed());

        connection.set_veto_current_changing(true);
        assert!(!view.move_current_to_position(Some(1)));
        assert!(connection.move_current_to_position(Some(1)));
    }
}
