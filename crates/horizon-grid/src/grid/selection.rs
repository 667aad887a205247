//! Row selection.
//!
//! The low-level helpers mutate the [`SelectionTable`](crate::selection) and
//! push row visual states; they never flush. Flushing happens when the
//! outermost suspension closes.

use horizon_grid_core::logging::targets;

use super::{item_at, DataGrid};
use crate::config::SelectionMode;
use crate::error::{GridError, Result};
use crate::events::EditingUnit;
use crate::item::{same_item, ItemRef};
use crate::selection::SelectionAction;

/// Read-only view of the selected items, in slot order.
pub struct SelectedItems<'a> {
    grid: &'a DataGrid,
}

impl<'a> SelectedItems<'a> {
    pub fn len(&self) -> usize {
        self.grid.selection.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `n`-th selected item.
    pub fn get(&self, n: usize) -> Option<ItemRef> {
        self.grid
            .selection
            .nth_slot(n)
            .and_then(|slot| self.grid.item_at_slot(slot))
    }

    /// Position of `item` among the selected items.
    pub fn index_of(&self, item: &ItemRef) -> Option<usize> {
        let row_index = self.grid.data.index_of(item)?;
        if row_index >= self.grid.slots.row_count() {
            return None;
        }
        let slot = self.grid.slots.slot_from_row_index(row_index);
        self.grid.selection.ordinal_of_slot(slot)
    }

    pub fn contains(&self, item: &ItemRef) -> bool {
        self.index_of(item).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = ItemRef> + 'a {
        let grid = self.grid;
        grid.selection.slots().filter_map(move |slot| grid.item_at_slot(slot))
    }

    /// Slots of the selected rows.
    pub fn slots(&self) -> impl Iterator<Item = usize> + 'a {
        self.grid.selection.slots()
    }
}

impl std::fmt::Debug for SelectedItems<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.slots()).finish()
    }
}

impl DataGrid {
    // =========================================================================
    // Public API
    // =========================================================================

    /// The selected items.
    pub fn selected_items(&self) -> SelectedItems<'_> {
        SelectedItems { grid: self }
    }

    /// The selected item; the current row wins when it is selected.
    pub fn selected_item(&self) -> Option<ItemRef> {
        self.selected_item.clone()
    }

    /// Row index of [`selected_item`](Self::selected_item).
    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    /// Whether the row at `slot` is selected.
    pub fn is_slot_selected(&self, slot: usize) -> bool {
        self.selection.contains_slot(slot)
    }

    /// Anchor of the range selection.
    pub fn anchor_slot(&self) -> Option<usize> {
        self.anchor_slot
    }

    /// Make `item` the only selected item and move currency to it.
    ///
    /// `None`, or an item that is not in the source, clears the selection.
    /// Returns `false` when the open edit blocked the change.
    pub fn set_selected_item(&mut self, item: Option<ItemRef>) -> bool {
        let row_index = item.as_ref().and_then(|item| self.data.index_of(item));
        self.set_selected_row(row_index)
    }

    /// Index based variant of [`set_selected_item`](Self::set_selected_item).
    pub fn set_selected_index(&mut self, index: Option<usize>) -> bool {
        let index = index.filter(|&index| index < self.slots.row_count());
        self.set_selected_row(index)
    }

    fn set_selected_row(&mut self, row_index: Option<usize>) -> bool {
        let Some(row_index) = row_index.filter(|&index| index < self.slots.row_count()) else {
            if !self.commit_edit(EditingUnit::Row, true) {
                return false;
            }
            self.with_selection_suspended(|grid| grid.clear_row_selection(true));
            return true;
        };
        let slot = self.slots.slot_from_row_index(row_index);
        if Some(slot) != self.current_slot && !self.commit_edit(EditingUnit::Row, true) {
            return false;
        }
        if self.slots.is_slot_out_of_bounds(slot) {
            // Hidden inside a collapsed group: select without moving currency.
            self.with_selection_suspended(|grid| grid.clear_row_selection_except(slot, true));
            return true;
        }
        let column = self.current_column.or_else(|| self.columns.first_visible());
        self.with_selection_suspended(|grid| {
            grid.update_selection_and_currency(column, slot, SelectionAction::SelectCurrent, false);
        });
        self.successfully_updated_selection
    }

    /// Select every data row. A no-op in single selection mode.
    pub fn select_all(&mut self) {
        if self.settings.selection_mode != SelectionMode::Extended {
            return;
        }
        let count = self.slots.slot_count();
        if count == 0 {
            return;
        }
        self.with_selection_suspended(|grid| grid.set_rows_selection(0, count - 1));
    }

    /// Add `item` to the selection without moving currency.
    pub fn add_selected_item(&mut self, item: ItemRef) -> Result<()> {
        if self.settings.selection_mode == SelectionMode::Single {
            return Err(GridError::SelectionModeIsSingle);
        }
        let row_index = self
            .data
            .index_of(&item)
            .filter(|&index| index < self.slots.row_count())
            .ok_or(GridError::ItemNotInSource)?;
        if self.selection.count() == 0 {
            self.set_selected_item(Some(item));
            return Ok(());
        }
        let slot = self.slots.slot_from_row_index(row_index);
        self.with_selection_suspended(|grid| grid.set_row_selection(slot, true, false));
        Ok(())
    }

    /// Deselect `item`. Returns whether it was selected.
    pub fn remove_selected_item(&mut self, item: &ItemRef) -> Result<bool> {
        if self.settings.selection_mode == SelectionMode::Single {
            return Err(GridError::SelectionModeIsSingle);
        }
        let Some(row_index) = self
            .data
            .index_of(item)
            .filter(|&index| index < self.slots.row_count())
        else {
            return Ok(false);
        };
        let slot = self.slots.slot_from_row_index(row_index);
        if !self.selection.contains_slot(slot) {
            return Ok(false);
        }
        self.deselect_slot(slot);
        Ok(true)
    }

    /// Deselect the `n`-th selected item.
    pub fn remove_selected_item_at(&mut self, n: usize) -> Result<()> {
        if self.settings.selection_mode == SelectionMode::Single {
            return Err(GridError::SelectionModeIsSingle);
        }
        let count = self.selection.count();
        let slot = self
            .selection
            .nth_slot(n)
            .ok_or_else(|| GridError::out_of_range("index", n as f64, 0.0, count as f64 - 1.0))?;
        self.deselect_slot(slot);
        Ok(())
    }

    /// Deselect every row.
    pub fn clear_selected_items(&mut self) -> Result<()> {
        if self.settings.selection_mode == SelectionMode::Single {
            return Err(GridError::SelectionModeIsSingle);
        }
        self.set_selected_item(None);
        Ok(())
    }

    /// Positional insertion into the selection is meaningless.
    pub fn insert_selected_item(&mut self, _index: usize, _item: ItemRef) -> Result<()> {
        Err(GridError::not_supported("inserting into the selected items"))
    }

    fn deselect_slot(&mut self, slot: usize) {
        if Some(slot) == self.current_slot && !self.commit_edit(EditingUnit::Row, true) {
            self.cancel_edit_core(EditingUnit::Row, false);
        }
        self.with_selection_suspended(|grid| grid.set_row_selection(slot, false, false));
    }

    // =========================================================================
    // Selection primitives
    // =========================================================================

    pub(crate) fn set_row_selection(&mut self, slot: usize, selected: bool, set_anchor: bool) {
        if self.slots.is_group_header(slot) || slot >= self.slots.slot_count() {
            return;
        }
        if selected && self.settings.selection_mode == SelectionMode::Single {
            self.clear_row_selection_except(slot, set_anchor);
            return;
        }
        let (data, slots) = (&self.data, &self.slots);
        self.selection
            .select_slot(slots, slot, selected, &|s| item_at(data, slots, s));
        if set_anchor {
            self.anchor_slot = Some(slot);
        }
        tracing::trace!(target: targets::SELECTION, slot, selected, "row selection");
        self.notify_row(slot);
    }

    pub(crate) fn set_rows_selection(&mut self, start: usize, end: usize) {
        let end = end.min(self.slots.slot_count().saturating_sub(1));
        if start > end || self.slots.slot_count() == 0 {
            return;
        }
        let (data, slots) = (&self.data, &self.slots);
        self.selection
            .select_slots(slots, start, end, true, &|s| item_at(data, slots, s));
        tracing::trace!(target: targets::SELECTION, start, end, "range selection");
        self.notify_loaded_rows_in(start, end);
    }

    pub(crate) fn clear_row_selection(&mut self, reset_anchor: bool) {
        if reset_anchor {
            self.anchor_slot = None;
        }
        let selected: Vec<usize> = self.selection.slots().collect();
        self.selection.clear_rows();
        for slot in selected {
            self.notify_row(slot);
        }
    }

    /// Deselect everything except `slot`, which ends up selected.
    pub(crate) fn clear_row_selection_except(&mut self, slot: usize, set_anchor: bool) {
        let others: Vec<usize> = self.selection.slots().filter(|&s| s != slot).collect();
        let (data, slots) = (&self.data, &self.slots);
        for &other in &others {
            self.selection
                .select_slot(slots, other, false, &|s| item_at(data, slots, s));
        }
        self.selection
            .select_slot(slots, slot, true, &|s| item_at(data, slots, s));
        if set_anchor {
            self.anchor_slot = Some(slot);
        }
        for other in others {
            self.notify_row(other);
        }
        self.notify_row(slot);
    }

    /// Whether `item` is among the selected items.
    pub(crate) fn selection_contains_item(&self, item: &ItemRef) -> bool {
        self.selection
            .items()
            .iter()
            .any(|selected| same_item(selected, item))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::super::test_support::{grid_with, item};
    use crate::config::SelectionMode;
    use crate::error::GridError;
    use crate::events::SelectionChangedArgs;
    use crate::item::same_item;

    #[test]
    fn test_select_twice_is_idempotent() {
        let (mut grid, _list) = grid_with(10);
        grid.set_selected_index(Some(4));
        let first: Vec<usize> = grid.selected_items().slots().collect();
        grid.set_selected_index(Some(4));
        let second: Vec<usize> = grid.selected_items().slots().collect();
        assert_eq!(first, vec![4]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_add_and_remove_selected_items() {
        let (mut grid, _list) = grid_with(10);
        let third = item(&grid, 3);
        let seventh = item(&grid, 7);
        grid.add_selected_item(third.clone()).unwrap();
        grid.add_selected_item(seventh.clone()).unwrap();
        let selected = grid.selected_items();
        assert_eq!(selected.len(), 3);
        assert_eq!(selected.index_of(&third), Some(1));
        assert!(selected.contains(&seventh));
        assert!(same_item(&selected.get(2).unwrap(), &seventh));

        assert_eq!(grid.remove_selected_item(&third), Ok(true));
        assert_eq!(grid.remove_selected_item(&third), Ok(false));
        grid.remove_selected_item_at(0).unwrap();
        assert_eq!(grid.selected_items().len(), 1);
        assert!(matches!(
            grid.remove_selected_item_at(5),
            Err(GridError::ValueOutOfRange { .. })
        ));
        grid.clear_selected_items().unwrap();
        assert!(grid.selected_items().is_empty());
        assert_eq!(grid.selected_index(), None);
    }

    #[test]
    fn test_single_mode_rejects_list_mutation() {
        let (mut grid, _list) = grid_with(5);
        grid.set_selection_mode(SelectionMode::Single);
        assert!(grid.selected_items().is_empty());
        let second = item(&grid, 1);
        assert_eq!(grid.add_selected_item(second), Err(GridError::SelectionModeIsSingle));
        grid.select_all();
        assert!(grid.selected_items().is_empty());
        assert!(matches!(
            grid.insert_selected_item(0, item(&grid, 0)),
            Err(GridError::NotSupported(_))
        ));
    }

    #[test]
    fn test_foreign_item_is_rejected() {
        let (mut grid, _list) = grid_with(5);
        let stranger = crate::item::Record::new().with("Name", "Nobody").into_item();
        assert_eq!(grid.add_selected_item(stranger.clone()), Err(GridError::ItemNotInSource));
        assert!(grid.set_selected_item(Some(stranger)));
        assert!(grid.selected_items().is_empty());
    }

    #[test]
    fn test_selection_changed_reports_net_difference() {
        let (mut grid, _list) = grid_with(8);
        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = events.clone();
        grid.signals()
            .selection_changed
            .connect(move |args: &SelectionChangedArgs| {
                events_clone.lock().push((args.added.len(), args.removed.len()));
            });
        {
            let mut scope = grid.selection_scope();
            scope.select_all();
            scope.set_selected_index(Some(0));
        }
        // Row 0 was selected before and after: nothing net changed.
        assert!(events.lock().is_empty());
        grid.select_all();
        assert_eq!(*events.lock(), vec![(7, 0)]);
    }
}
