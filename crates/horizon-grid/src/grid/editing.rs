//! The edit transaction.
//!
//! A cell edit is always nested inside a row edit on the current row. Ending
//! runs inside out: the cell edit ends before the row edit, and both end
//! before currency moves. Every entry point reports failure with `false`.

use std::collections::BTreeSet;

use horizon_grid_core::logging::targets;

use super::{item_at, DataGrid, EditingCell, EditingRow};
use crate::events::{
    BeginningEditArgs, Cancel, CellEditEndedArgs, CellEditEndingArgs, EditAction, EditingUnit,
    RowEditEndedArgs, RowEditEndingArgs,
};
use crate::value::{CellValue, ValidationResult};

impl DataGrid {
    // =========================================================================
    // Public API
    // =========================================================================

    /// Put the current cell into edit mode.
    ///
    /// Requires a current cell on a selected data row and a writable column.
    /// Returns `false` when a `beginning_edit` handler cancelled.
    pub fn begin_edit(&mut self) -> bool {
        let Some(slot) = self.current_slot else {
            return false;
        };
        if self.current_column.is_none() || !self.selection.contains_slot(slot) {
            return false;
        }
        self.begin_cell_edit()
    }

    /// Commit the open edit.
    ///
    /// With [`EditingUnit::Row`] the cell edit always exits and the row edit
    /// is committed as well. `exit_editing_mode` decides whether the
    /// committed unit stays in edit mode.
    pub fn commit_edit(&mut self, unit: EditingUnit, exit_editing_mode: bool) -> bool {
        let exit_cell = unit == EditingUnit::Row || exit_editing_mode;
        if !self.end_cell_edit(EditAction::Commit, exit_cell, true) {
            return false;
        }
        match unit {
            EditingUnit::Cell => true,
            EditingUnit::Row => self.end_row_edit(EditAction::Commit, exit_editing_mode, true),
        }
    }

    /// Cancel the open edit, restoring pre-edit values.
    ///
    /// A row cancel fails when the item cannot roll back.
    pub fn cancel_edit(&mut self, unit: EditingUnit) -> bool {
        self.cancel_edit_core(unit, true)
    }

    /// Value held by the cell in edit mode.
    pub fn editing_value(&self) -> Option<&CellValue> {
        self.editing_cell.as_ref().map(|cell| &cell.value)
    }

    /// Replace the value held by the cell in edit mode.
    ///
    /// The item is untouched until the cell edit commits. Returns `false`
    /// when no cell is in edit mode.
    pub fn set_editing_value(&mut self, value: impl Into<CellValue>) -> bool {
        match self.editing_cell.as_mut() {
            Some(cell) => {
                cell.value = value.into();
                true
            }
            None => false,
        }
    }

    /// Slot of the row with an open edit transaction.
    pub fn editing_row(&self) -> Option<usize> {
        self.editing_row.as_ref().map(|row| row.slot)
    }

    /// Column of the cell in edit mode.
    pub fn editing_column(&self) -> Option<usize> {
        self.editing_cell.as_ref().map(|cell| cell.column)
    }

    // =========================================================================
    // Transaction internals
    // =========================================================================

    pub(crate) fn begin_cell_edit(&mut self) -> bool {
        let (Some(column), Some(slot)) = (self.current_column, self.current_slot) else {
            return false;
        };
        if let Some(cell) = &self.editing_cell {
            return cell.column == column;
        }
        if self.slots.is_group_header(slot)
            || !self.selection.contains_slot(slot)
            || self.is_column_read_only(column)
        {
            return false;
        }

        let cancel = Cancel::default();
        self.signals.beginning_edit.emit(BeginningEditArgs {
            column,
            slot,
            cancel: cancel.clone(),
        });
        if cancel.is_set() {
            tracing::debug!(target: targets::EDITING, column, slot, "begin edit cancelled by handler");
            return false;
        }

        if self.editing_row.is_none() && !self.begin_row_edit(slot) {
            return false;
        }
        let Some(row) = &self.editing_row else {
            return false;
        };
        let value = self
            .columns
            .get(column)
            .and_then(|col| col.binding())
            .map(|property| row.item.value(property))
            .unwrap_or_default();
        self.editing_cell = Some(EditingCell {
            column,
            unedited_value: value.clone(),
            value,
        });
        tracing::debug!(target: targets::EDITING, column, slot, "cell edit begun");
        self.observer.editing_state_changed(column, slot, true);
        self.notify_cell(column, slot);
        true
    }

    fn begin_row_edit(&mut self, slot: usize) -> bool {
        let Some(item) = item_at(&self.data, &self.slots, slot) else {
            return false;
        };
        if !self.data.begin_edit(&item) {
            return false;
        }
        self.editing_row = Some(EditingRow {
            slot,
            item,
            is_valid: true,
            invalid_columns: BTreeSet::new(),
        });
        tracing::debug!(target: targets::EDITING, slot, "row edit begun");
        self.notify_row(slot);
        true
    }

    /// End the cell edit. A successful commit writes the value through the
    /// column binding; a conversion error keeps the cell in edit mode.
    pub(crate) fn end_cell_edit(&mut self, action: EditAction, exit: bool, raise_events: bool) -> bool {
        let Some(column) = self.editing_column() else {
            return true;
        };
        let Some(slot) = self.editing_row() else {
            return true;
        };

        if raise_events {
            let cancel = Cancel::default();
            self.signals.cell_edit_ending.emit(CellEditEndingArgs {
                column,
                slot,
                action,
                cancel: cancel.clone(),
            });
            if cancel.is_set() {
                tracing::debug!(target: targets::EDITING, column, slot, "cell edit end cancelled by handler");
                return false;
            }
        }

        match action {
            EditAction::Cancel => {
                if let Some(cell) = self.editing_cell.as_mut() {
                    cell.value = cell.unedited_value.clone();
                }
                self.set_cell_valid(column, true);
            }
            EditAction::Commit => {
                if !self.push_editing_value(column) {
                    return false;
                }
            }
        }

        if exit {
            self.editing_cell = None;
            self.observer.editing_state_changed(column, slot, false);
            self.notify_cell(column, slot);
        }
        tracing::debug!(target: targets::EDITING, column, slot, ?action, exit, "cell edit ended");
        if raise_events {
            self.signals
                .cell_edit_ended
                .emit(CellEditEndedArgs { column, slot, action });
        }
        true
    }

    fn push_editing_value(&mut self, column: usize) -> bool {
        let (Some(cell), Some(row)) = (&self.editing_cell, &self.editing_row) else {
            return true;
        };
        if cell.value == cell.unedited_value {
            return true;
        }
        let Some(property) = self.columns.get(column).and_then(|col| col.binding()) else {
            return true;
        };
        let value = cell.value.clone();
        match row.item.set_value(property, value.clone()) {
            Ok(()) => {
                if let Some(cell) = self.editing_cell.as_mut() {
                    cell.unedited_value = value;
                }
                self.refresh_validity_after_commit(column);
                true
            }
            Err(message) => {
                tracing::debug!(target: targets::EDITING, column, %message, "cell commit rejected");
                let result = ValidationResult::new(message, [property]);
                if !self.validation_results.contains(&result) {
                    self.validation_results.push(result);
                }
                self.set_cell_valid(column, false);
                self.set_row_valid(false);
                self.set_grid_valid(false);
                false
            }
        }
    }

    /// End the row edit. The cell edit must already be over.
    pub(crate) fn end_row_edit(&mut self, action: EditAction, exit: bool, raise_events: bool) -> bool {
        let Some(row) = self.editing_row.clone() else {
            return true;
        };
        if self.editing_cell.is_some() {
            return false;
        }
        if action == EditAction::Cancel && raise_events && row.item.as_editable().is_none() {
            tracing::debug!(target: targets::EDITING, slot = row.slot, "row cancel needs an editable item");
            return false;
        }

        if raise_events {
            let cancel = Cancel::default();
            self.signals.row_edit_ending.emit(RowEditEndingArgs {
                slot: row.slot,
                action,
                cancel: cancel.clone(),
            });
            if cancel.is_set() {
                tracing::debug!(target: targets::EDITING, slot = row.slot, "row edit end cancelled by handler");
                return false;
            }
        }

        match action {
            EditAction::Commit => {
                if !self.validate_editing_row(true) {
                    return false;
                }
                self.data.end_edit(&row.item);
                if !exit {
                    self.data.begin_edit(&row.item);
                }
            }
            EditAction::Cancel => {
                self.data.cancel_edit(&row.item);
            }
        }

        self.reset_validation_status();
        if exit {
            self.editing_row = None;
            self.notify_row(row.slot);
        }
        tracing::debug!(target: targets::EDITING, slot = row.slot, ?action, exit, "row edit ended");
        if raise_events {
            self.signals.row_edit_ended.emit(RowEditEndedArgs {
                slot: row.slot,
                action,
            });
        }
        true
    }

    /// Cancel the open edit. With `raise_events` off the row edit is dropped
    /// even when the item cannot roll back.
    pub(crate) fn cancel_edit_core(&mut self, unit: EditingUnit, raise_events: bool) -> bool {
        if !self.end_cell_edit(EditAction::Cancel, true, raise_events) {
            return false;
        }
        match unit {
            EditingUnit::Cell => true,
            EditingUnit::Row => self.end_row_edit(EditAction::Cancel, true, raise_events),
        }
    }

    /// Leave cell edit mode without pushing or restoring anything.
    pub(crate) fn exit_edit(&mut self) {
        let Some(cell) = self.editing_cell.take() else {
            return;
        };
        if let Some(slot) = self.editing_row() {
            self.observer.editing_state_changed(cell.column, slot, false);
            self.notify_cell(cell.column, slot);
        }
    }

    /// Drop the whole transaction. Used when the edited row disappears.
    pub(crate) fn force_clear_editing(&mut self) {
        self.exit_edit();
        if self.editing_row.is_some() {
            self.reset_validation_status();
        }
        if let Some(row) = self.editing_row.take() {
            tracing::debug!(target: targets::EDITING, slot = row.slot, "edit transaction dropped");
            self.notify_row(row.slot);
        }
    }

    /// Commit before an operation that moves away from the current cell.
    pub(crate) fn commit_edit_for_operation(&mut self, column: usize, slot: usize) -> bool {
        if self.current_column == Some(column) && self.current_slot == Some(slot) {
            return true;
        }
        let unit = if self.current_slot == Some(slot) {
            EditingUnit::Cell
        } else {
            EditingUnit::Row
        };
        self.commit_edit(unit, true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::super::test_support::{grid_with, item};
    use crate::events::{BeginningEditArgs, EditingUnit, RowEditEndingArgs};
    use crate::item::Record;
    use crate::source::ItemList;
    use crate::value::CellValue;
    use crate::{DataGrid, Size};

    #[test]
    fn test_commit_writes_through_binding() {
        let (mut grid, _list) = grid_with(5);
        assert!(grid.begin_edit());
        assert_eq!(grid.editing_column(), Some(0));
        assert_eq!(grid.editing_row(), Some(0));
        assert_eq!(grid.editing_value(), Some(&CellValue::from("Person 0")));
        assert!(grid.set_editing_value("Renamed"));
        assert!(grid.commit_edit(EditingUnit::Row, true));
        assert_eq!(grid.editing_row(), None);
        assert_eq!(item(&grid, 0).value("Name"), CellValue::from("Renamed"));
    }

    #[test]
    fn test_failed_cell_commit_keeps_edit_mode() {
        let (mut grid, _list) = grid_with(5);
        grid.set_current_column(1).unwrap();
        assert!(grid.begin_edit());
        grid.set_editing_value("not a number");
        assert!(!grid.commit_edit(EditingUnit::Cell, true));
        assert_eq!(grid.editing_column(), Some(1));
        assert_eq!(item(&grid, 0).value("Age"), CellValue::Int(20));
        assert!(!grid.is_valid());
        assert!(!grid.is_cell_valid(1, 0));
        assert_eq!(grid.validation_results().len(), 1);

        // Currency cannot move away while the cell is invalid.
        assert!(!grid.set_current_cell(0, 3));
        assert_eq!(grid.current_slot(), Some(0));

        grid.set_editing_value(33);
        assert!(grid.commit_edit(EditingUnit::Row, true));
        assert!(grid.is_valid());
        assert!(grid.validation_results().is_empty());
        assert_eq!(item(&grid, 0).value("Age"), CellValue::Int(33));
    }

    #[test]
    fn test_cancel_row_restores_editable_item() {
        let (mut grid, _list) = grid_with(5);
        assert!(grid.begin_edit());
        grid.set_editing_value("Changed");
        assert!(grid.commit_edit(EditingUnit::Cell, true));
        assert_eq!(grid.editing_row(), Some(0));
        assert_eq!(item(&grid, 0).value("Name"), CellValue::from("Changed"));
        assert!(grid.cancel_edit(EditingUnit::Row));
        assert_eq!(grid.editing_row(), None);
        assert_eq!(item(&grid, 0).value("Name"), CellValue::from("Person 0"));
    }

    #[test]
    fn test_row_cancel_fails_without_capability() {
        let list = Arc::new(ItemList::from_items(
            (0..3).map(|n| Record::new().with("Name", format!("N{n}")).into_item()),
        ));
        let mut grid = DataGrid::new();
        grid.set_items_source(Some(list)).unwrap();
        grid.layout(Size::new(200.0, 200.0)).unwrap();
        assert!(grid.begin_edit());
        assert!(grid.cancel_edit(EditingUnit::Cell));
        assert_eq!(grid.editing_column(), None);
        assert!(!grid.cancel_edit(EditingUnit::Row));
        assert_eq!(grid.editing_row(), Some(0));
        assert!(grid.commit_edit(EditingUnit::Row, true));
        assert_eq!(grid.editing_row(), None);
    }

    #[test]
    fn test_beginning_edit_handler_can_veto() {
        let (mut grid, _list) = grid_with(3);
        grid.signals()
            .beginning_edit
            .connect(|args: &BeginningEditArgs| {
                if args.column == 0 {
                    args.cancel.set();
                }
            });
        assert!(!grid.begin_edit());
        assert_eq!(grid.editing_row(), None);
        grid.set_current_column(1).unwrap();
        assert!(grid.begin_edit());
    }

    #[test]
    fn test_row_edit_ending_handler_can_veto() {
        let (mut grid, _list) = grid_with(3);
        let vetoes = Arc::new(AtomicUsize::new(0));
        let vetoes_clone = vetoes.clone();
        grid.signals()
            .row_edit_ending
            .connect(move |args: &RowEditEndingArgs| {
                vetoes_clone.fetch_add(1, Ordering::SeqCst);
                args.cancel.set();
            });
        assert!(grid.begin_edit());
        assert!(!grid.commit_edit(EditingUnit::Row, true));
        assert_eq!(grid.editing_row(), Some(0));
        assert_eq!(grid.editing_column(), None);
        assert_eq!(vetoes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_only_column_refuses_edit() {
        let (mut grid, _list) = grid_with(3);
        grid.set_column_read_only(0, true).unwrap();
        assert!(!grid.begin_edit());
        grid.set_is_read_only(true);
        grid.set_current_column(1).unwrap();
        assert!(!grid.begin_edit());
    }

    #[test]
    fn test_begin_edit_requires_selected_current_row() {
        let (mut grid, _list) = grid_with(5);
        assert!(grid.set_current_cell(0, 2));
        assert!(!grid.begin_edit());
    }
}
