//! Current-cell state machine.
//!
//! Every currency move funnels through [`DataGrid::set_current_cell_core`],
//! which ends the open cell edit (and the row edit when the row changes)
//! before the coordinate is reassigned. A failed commit leaves currency where
//! it was.

use horizon_grid_core::logging::targets;
use horizon_grid_core::NestingGuard;

use super::{item_at, DataGrid, Suspension};
use crate::config::SelectionMode;
use crate::error::{GridError, Result};
use crate::events::{EditAction, EditingUnit};
use crate::item::{same_item_opt, ItemRef};
use crate::selection::SelectionAction;

impl DataGrid {
    // =========================================================================
    // Public API
    // =========================================================================

    /// Index of the current column.
    pub fn current_column(&self) -> Option<usize> {
        self.current_column
    }

    /// Slot of the current row, which may be a group header.
    pub fn current_slot(&self) -> Option<usize> {
        self.current_slot
    }

    /// Item of the current row; `None` on a group header.
    pub fn current_item(&self) -> Option<ItemRef> {
        self.current_slot
            .and_then(|slot| item_at(&self.data, &self.slots, slot))
    }

    /// Move the current cell without changing the selection.
    ///
    /// Returns `false` when the target is out of bounds or the open edit
    /// could not be committed.
    pub fn set_current_cell(&mut self, column: usize, row_index: usize) -> bool {
        if row_index >= self.slots.row_count() {
            return false;
        }
        let slot = self.slots.slot_from_row_index(row_index);
        self.update_selection_and_currency(Some(column), slot, SelectionAction::None, false)
    }

    /// Move the current cell to `column` on the current row.
    ///
    /// Returns `Ok(false)` when there is no current row or the open cell edit
    /// could not be committed.
    pub fn set_current_column(&mut self, column: usize) -> Result<bool> {
        let Some(col) = self.columns.get(column) else {
            return Err(GridError::ColumnOutOfBounds {
                index: column,
                count: self.columns.len(),
            });
        };
        if !col.is_visible() {
            return Err(GridError::ColumnCannotBeCollapsed);
        }
        let Some(slot) = self.current_slot else {
            return Ok(false);
        };
        if self.current_column == Some(column) {
            return Ok(true);
        }
        if self.slots.is_slot_out_of_bounds(slot) {
            return Ok(false);
        }
        Ok(self.set_current_cell_core(Some(column), Some(slot), true, false))
    }

    /// Apply a currency change the bound collection view made on its own.
    ///
    /// The open edit is committed, or cancelled when the commit fails, and the
    /// view's current item becomes the only selected row.
    pub fn on_source_current_changed(&mut self) {
        self.data.take_current_changed();
        if self.data.collection_view().is_none() {
            return;
        }
        let position = self.data.current_position();
        let item = position.and_then(|position| self.data.get_data_item(position));
        self.update_state_on_current_changed(item, position);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// The single chokepoint for moving currency.
    pub(crate) fn set_current_cell_core(
        &mut self,
        column: Option<usize>,
        slot: Option<usize>,
        commit_edit: bool,
        end_row_edit: bool,
    ) -> bool {
        let mut grid = NestingGuard::enter(self, Suspension::CurrentCellChange);
        grid.move_current_cell(column, slot, commit_edit, end_row_edit)
    }

    fn move_current_cell(
        &mut self,
        column: Option<usize>,
        slot: Option<usize>,
        commit_edit: bool,
        end_row_edit: bool,
    ) -> bool {
        if column == self.current_column && slot == self.current_slot {
            return true;
        }
        let (old_column, old_slot) = (self.current_column, self.current_slot);
        if let (Some(_), Some(old)) = (old_column, old_slot) {
            if !self.slots.is_group_header(old) {
                if commit_edit {
                    if !self.end_cell_edit(EditAction::Commit, true, true) {
                        tracing::debug!(target: targets::EDITING, "currency move blocked by cell commit");
                        return false;
                    }
                    if let (Some(c), Some(s)) = (column, slot) {
                        if c >= self.columns.len() || self.slots.is_slot_out_of_bounds(s) {
                            return false;
                        }
                    }
                    if end_row_edit && !self.end_row_edit(EditAction::Commit, true, true) {
                        tracing::debug!(target: targets::EDITING, "currency move blocked by row commit");
                        return false;
                    }
                } else {
                    self.cancel_edit_core(EditingUnit::Row, false);
                    self.exit_edit();
                }
            }
        }

        self.current_column = column;
        self.current_slot = slot;
        tracing::trace!(target: targets::EDITING, ?column, ?slot, "current cell assigned");

        if let (Some(c), Some(s)) = (old_column, old_slot) {
            self.notify_cell(c, s);
            if Some(s) != slot {
                self.notify_row(s);
            }
        }
        if let (Some(c), Some(s)) = (column, slot) {
            self.notify_cell(c, s);
            self.notify_row(s);
        }
        true
    }

    /// Move the selection and the current cell together.
    ///
    /// Returns whether the whole update went through.
    pub(crate) fn update_selection_and_currency(
        &mut self,
        column: Option<usize>,
        slot: usize,
        action: SelectionAction,
        scroll_into_view: bool,
    ) -> bool {
        self.successfully_updated_selection = false;
        if self.slots.is_slot_out_of_bounds(slot) {
            tracing::trace!(target: targets::SELECTION, slot, "ignoring out-of-bounds slot");
            return false;
        }
        if column.is_some_and(|c| !self.is_column_visible(c)) {
            tracing::trace!(target: targets::SELECTION, ?column, "ignoring unavailable column");
            return false;
        }
        if self.editing_row.as_ref().is_some_and(|row| row.slot != slot)
            && !self.commit_edit(EditingUnit::Row, true)
        {
            return false;
        }

        let new_position = self.slots.row_index_from_slot(slot);
        self.with_suspended(|grid| {
            let view_moves = grid.data.collection_view().is_some()
                && grid.data.current_position() != new_position;
            if view_moves {
                if grid.data.move_current_to_position(new_position) {
                    grid.process_selection_and_currency(column, slot, action, scroll_into_view);
                } else {
                    tracing::debug!(target: targets::DATA, ?new_position, "view refused currency move");
                }
            } else {
                grid.process_selection_and_currency(column, slot, action, scroll_into_view);
            }
        });
        self.successfully_updated_selection
    }

    fn process_selection_and_currency(
        &mut self,
        column: Option<usize>,
        slot: usize,
        action: SelectionAction,
        scroll_into_view: bool,
    ) {
        self.with_suspended(|grid| {
            grid.apply_selection_action(slot, action);

            let column_changes = column.is_some_and(|c| Some(c) != grid.current_column);
            if grid.current_slot != Some(slot) || column_changes {
                let column = column
                    .or(grid.current_column)
                    .or_else(|| grid.columns.first_visible());
                if let Some(column) = column {
                    let end_row_edit = grid
                        .selected_index
                        .map(|index| grid.slots.slot_from_row_index(index))
                        != Some(slot);
                    if !grid.set_current_cell_core(Some(column), Some(slot), true, end_row_edit) {
                        return;
                    }
                    if scroll_into_view && !grid.scroll_slot_into_view(column, slot) {
                        return;
                    }
                }
            }
            grid.successfully_updated_selection = true;
        });
    }

    fn apply_selection_action(&mut self, slot: usize, action: SelectionAction) {
        match action {
            SelectionAction::None => {}
            SelectionAction::AddCurrent => self.set_row_selection(slot, true, true),
            SelectionAction::RemoveCurrent => self.set_row_selection(slot, false, false),
            SelectionAction::SelectFromAnchorToCurrent => {
                match (self.settings.selection_mode, self.anchor_slot) {
                    (SelectionMode::Extended, Some(anchor)) => {
                        self.clear_row_selection_except(slot, false);
                        self.set_rows_selection(slot.min(anchor), slot.max(anchor));
                    }
                    _ => self.clear_row_selection_except(slot, true),
                }
            }
            SelectionAction::SelectCurrent => self.clear_row_selection_except(slot, true),
        }
    }

    /// Move currency and optionally make the target the only selected row.
    pub(crate) fn set_and_select_current_cell(
        &mut self,
        column: usize,
        slot: usize,
        force_current_cell_selection: bool,
    ) -> bool {
        let action = if force_current_cell_selection {
            SelectionAction::SelectCurrent
        } else {
            SelectionAction::None
        };
        self.update_selection_and_currency(Some(column), slot, action, false)
    }

    pub(crate) fn update_state_on_current_changed(
        &mut self,
        item: Option<ItemRef>,
        position: Option<usize>,
    ) {
        if same_item_opt(item.as_ref(), self.current_item().as_ref()) {
            return;
        }
        let column = self.current_column.or_else(|| self.columns.first_visible());
        tracing::debug!(target: targets::DATA, ?position, "applying external currency change");
        self.with_suspended(|grid| {
            if !grid.commit_edit(EditingUnit::Row, true) {
                grid.cancel_edit_core(EditingUnit::Row, false);
            }
            grid.clear_row_selection(true);
            match (item, position) {
                (Some(_), Some(position)) if position < grid.slots.row_count() => {
                    let slot = grid.slots.slot_from_row_index(position);
                    if grid.slots.is_slot_out_of_bounds(slot) {
                        return;
                    }
                    grid.process_selection_and_currency(
                        column,
                        slot,
                        SelectionAction::SelectCurrent,
                        false,
                    );
                }
                _ => {
                    grid.set_current_cell_core(None, None, true, true);
                }
            }
        });
    }

    /// Make the first displayed cell current once the display window exists.
    pub(crate) fn make_first_displayed_cell_current(&mut self) {
        if self.current_column.is_some() {
            self.make_first_displayed_cell_current = false;
            return;
        }
        if self.display.first_scrolling_slot.is_none() {
            self.make_first_displayed_cell_current = true;
            return;
        }
        let slot = if let Some(position) = self.data.current_position() {
            if position >= self.slots.row_count() {
                self.make_first_displayed_cell_current = true;
                return;
            }
            Some(self.slots.slot_from_row_index(position))
        } else {
            match self.selected_index {
                Some(index) => Some(self.slots.slot_from_row_index(index)),
                None => Some(self.slots.slot_from_row_index(0))
                    .filter(|&slot| !self.slots.is_slot_out_of_bounds(slot)),
            }
        };
        match (self.columns.first_visible(), slot) {
            (Some(column), Some(slot)) if self.slots.slot_count() > 0 => {
                tracing::debug!(target: targets::EDITING, column, slot, "making first displayed cell current");
                self.set_and_select_current_cell(column, slot, true);
                self.anchor_slot = Some(slot);
                self.make_first_displayed_cell_current = false;
            }
            _ => self.make_first_displayed_cell_current = true,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::super::test_support::grid_with;
    use crate::display::Size;
    use crate::error::GridError;
    use crate::events::CurrentCellChangedArgs;
    use crate::item::Record;
    use crate::source::{CollectionView, ListCollectionView};
    use crate::DataGrid;

    #[test]
    fn test_first_displayed_cell_becomes_current_on_layout() {
        let (grid, _list) = grid_with(5);
        assert_eq!(grid.current_column(), Some(0));
        assert_eq!(grid.current_slot(), Some(0));
        assert_eq!(grid.selected_index(), Some(0));
    }

    #[test]
    fn test_set_current_cell_keeps_selection() {
        let (mut grid, _list) = grid_with(5);
        assert!(grid.set_current_cell(1, 3));
        assert_eq!(grid.current_slot(), Some(3));
        assert_eq!(grid.current_column(), Some(1));
        assert_eq!(grid.selected_index(), Some(0));
        assert!(!grid.set_current_cell(0, 99));
        assert!(!grid.set_current_cell(42, 1));
    }

    #[test]
    fn test_current_cell_changed_raised_once_per_move() {
        let (mut grid, _list) = grid_with(5);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        grid.signals()
            .current_cell_changed
            .connect(move |args: &CurrentCellChangedArgs| seen_clone.lock().push(*args));
        grid.set_selected_index(Some(2));
        grid.set_current_cell(1, 2);
        assert_eq!(
            *seen.lock(),
            vec![
                CurrentCellChangedArgs { column: Some(0), slot: Some(2) },
                CurrentCellChangedArgs { column: Some(1), slot: Some(2) },
            ]
        );
    }

    #[test]
    fn test_set_current_column_errors() {
        let (mut grid, _list) = grid_with(3);
        assert!(matches!(
            grid.set_current_column(9),
            Err(GridError::ColumnOutOfBounds { index: 9, .. })
        ));
        assert_eq!(grid.set_current_column(2), Ok(true));
        assert_eq!(grid.current_column(), Some(2));

        let mut empty = DataGrid::new();
        empty.add_column(crate::Column::text("Name", "Name"));
        assert_eq!(empty.set_current_column(0), Ok(false));
    }

    #[test]
    fn test_currency_follows_collection_view() {
        let items: Vec<_> = (0..6).map(|n| Record::new().with("N", n).into_item()).collect();
        let view = Arc::new(ListCollectionView::new(items.clone()));
        let mut grid = DataGrid::new();
        grid.set_items_source(Some(view.clone())).unwrap();
        grid.layout(Size::new(300.0, 300.0)).unwrap();
        assert_eq!(grid.current_slot(), Some(0));

        // Grid-driven moves update the view.
        grid.set_selected_index(Some(3));
        assert_eq!(view.current_position(), Some(3));

        // View-driven moves update the grid.
        assert!(view.move_current_to(&items[5]));
        grid.process_collection_changes().unwrap();
        assert_eq!(grid.current_slot(), Some(5));
        assert_eq!(grid.selected_index(), Some(5));
        assert_eq!(grid.selected_items().len(), 1);
    }
}
