//! Selected-slot bookkeeping and change diffing.
//!
//! [`SelectionTable`] records which slots are selected and keeps a snapshot of
//! the selection as it was at the last flush. A flush diffs the two tables and
//! produces one [`SelectionChangedArgs`] with the net added and removed items.
//! Items that left the source while selected cannot be looked up by slot any
//! more, so they are parked in a removed-items cache until the next flush.
//!
//! Group-header slots are never selected.

use std::fmt;

use crate::events::SelectionChangedArgs;
use crate::index_table::IndexToValueTable;
use crate::item::{same_item, ItemRef};
use crate::slots::SlotTables;

/// Resolves the bound item of a data-row slot.
pub(crate) type ItemAt<'a> = &'a dyn Fn(usize) -> Option<ItemRef>;

/// How a currency move affects the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionAction {
    /// Leave the selection alone.
    None,
    /// Select the new current row in addition to the existing selection.
    AddCurrent,
    /// Deselect the new current row.
    RemoveCurrent,
    /// Select exactly the range between the anchor and the new current row.
    SelectFromAnchorToCurrent,
    /// Select only the new current row.
    SelectCurrent,
}

#[derive(Default)]
pub(crate) struct SelectionTable {
    selected: IndexToValueTable<bool>,
    old_selected: IndexToValueTable<bool>,
    items_cache: Vec<ItemRef>,
    removed_cache: Vec<ItemRef>,
    pub(crate) has_changed: bool,
}

impl fmt::Debug for SelectionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionTable")
            .field("selected", &self.selected)
            .field("old_selected", &self.old_selected)
            .field("cached_items", &self.items_cache.len())
            .field("removed_items", &self.removed_cache.len())
            .field("has_changed", &self.has_changed)
            .finish()
    }
}

impl SelectionTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn count(&self) -> usize {
        self.selected.index_count()
    }

    pub(crate) fn contains_slot(&self, slot: usize) -> bool {
        self.selected.contains(slot)
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.indexes()
    }

    pub(crate) fn slots_from(&self, start: usize) -> impl Iterator<Item = usize> + '_ {
        self.selected.indexes_from(start)
    }

    pub(crate) fn nth_slot(&self, n: usize) -> Option<usize> {
        self.selected.get_nth_index(n)
    }

    pub(crate) fn ordinal_of_slot(&self, slot: usize) -> Option<usize> {
        self.selected.index_of(slot)
    }

    pub(crate) fn index_count(&self, start: usize, end: usize) -> usize {
        self.selected.get_index_count(start, end)
    }

    /// Whether every data-row slot in `[start, end]` is selected.
    pub(crate) fn contains_all(&self, slots: &SlotTables, start: usize, end: usize) -> bool {
        (start..=end)
            .filter(|&slot| !slots.is_group_header(slot))
            .all(|slot| self.selected.contains(slot))
    }

    pub(crate) fn select_slot(&mut self, slots: &SlotTables, slot: usize, select: bool, item_at: ItemAt<'_>) {
        if slots.is_group_header(slot) {
            return;
        }
        if select == self.selected.contains(slot) {
            return;
        }
        if select {
            if let Some(item) = item_at(slot) {
                self.items_cache.push(item);
            }
            self.selected.add_value(slot, true);
        } else {
            if let Some(item) = item_at(slot) {
                self.remove_cached(&item);
            }
            self.selected.remove_value(slot);
        }
        self.has_changed = true;
    }

    /// Select or deselect the data-row slots in `[start, end]`.
    pub(crate) fn select_slots(
        &mut self,
        slots: &SlotTables,
        start: usize,
        end: usize,
        select: bool,
        item_at: ItemAt<'_>,
    ) {
        let mut run_start = None;
        for slot in start..=end.saturating_add(1) {
            let in_run = slot <= end && !slots.is_group_header(slot);
            match (in_run, run_start) {
                (true, None) => run_start = Some(slot),
                (false, Some(first)) => {
                    self.apply_run(first, slot - 1, select, item_at);
                    run_start = None;
                }
                _ => {}
            }
        }
    }

    fn apply_run(&mut self, first: usize, last: usize, select: bool, item_at: ItemAt<'_>) {
        for slot in first..=last {
            match (select, self.selected.contains(slot)) {
                (true, false) => {
                    if let Some(item) = item_at(slot) {
                        self.items_cache.push(item);
                    }
                    self.has_changed = true;
                }
                (false, true) => {
                    if let Some(item) = item_at(slot) {
                        self.remove_cached(&item);
                    }
                    self.has_changed = true;
                }
                _ => {}
            }
        }
        let count = last - first + 1;
        if select {
            self.selected.add_values(first, count, true);
        } else {
            self.selected.remove_values(first, count);
        }
    }

    fn remove_cached(&mut self, item: &ItemRef) {
        if let Some(position) = self.items_cache.iter().position(|cached| same_item(cached, item)) {
            self.items_cache.remove(position);
        }
    }

    /// Forget a row that left the source.
    pub(crate) fn delete(&mut self, slot: usize, item: &ItemRef) {
        if self.old_selected.contains(slot) {
            self.removed_cache.push(item.clone());
            self.has_changed = true;
        }
        self.selected.remove_index(slot);
        self.old_selected.remove_index(slot);
        self.remove_cached(item);
    }

    pub(crate) fn insert_slot(&mut self, slot: usize) {
        self.selected.insert_index(slot);
        self.old_selected.insert_index(slot);
    }

    /// Drop every selected slot, keeping the flush snapshot.
    pub(crate) fn clear_rows(&mut self) {
        if self.selected.index_count() > 0 {
            self.has_changed = true;
        }
        self.selected.clear();
        self.items_cache.clear();
    }

    /// Selected items in selection order.
    pub(crate) fn items(&self) -> &[ItemRef] {
        &self.items_cache
    }

    /// Net change since the last flush; the snapshot catches up.
    pub(crate) fn take_changes(&mut self, item_at: ItemAt<'_>) -> SelectionChangedArgs {
        let mut added = Vec::new();
        let mut removed = Vec::new();
        for slot in self.selected.indexes() {
            if self.old_selected.contains(slot) {
                self.old_selected.remove_value(slot);
            } else if let Some(item) = item_at(slot) {
                added.push(item);
            }
        }
        removed.extend(self.old_selected.indexes().filter_map(item_at));
        removed.append(&mut self.removed_cache);
        self.old_selected = self.selected.copy();
        self.has_changed = false;
        SelectionChangedArgs { added, removed }
    }

    /// Re-locate the selected items after the source was reset.
    ///
    /// `locate` maps an item to its new slot; items it cannot find are
    /// reported as removed on the next flush.
    pub(crate) fn update_indexes(&mut self, locate: &dyn Fn(&ItemRef) -> Option<usize>) {
        self.old_selected.clear();
        self.selected.clear();
        let mut kept = Vec::with_capacity(self.items_cache.len());
        for item in std::mem::take(&mut self.items_cache) {
            match locate(&item) {
                Some(slot) => {
                    self.selected.add_value(slot, true);
                    kept.push(item);
                }
                None => self.removed_cache.push(item),
            }
        }
        self.old_selected = self.selected.copy();
        self.items_cache = kept;
        if !self.removed_cache.is_empty() {
            self.has_changed = true;
        }
    }
}
