//! Row structure: incremental inserts and removals, full refreshes and the
//! loading lifecycle of displayed rows.

use std::collections::BTreeMap;

use horizon_grid_core::logging::{span_names, targets};
use horizon_grid_core::PerfSpan;

use super::{item_at, DataGrid, DeferredAction};
use crate::error::{GridError, Result};
use crate::events::{EditingUnit, RowEventArgs};
use crate::item::ItemRef;
use crate::selection::SelectionAction;

/// Shift a slot coordinate for a row inserted at `at`.
fn shifted_for_insert(slot: Option<usize>, at: usize) -> Option<usize> {
    slot.map(|slot| if slot >= at { slot + 1 } else { slot })
}

/// Shift a slot coordinate for the row removed at `at`. The removed slot
/// itself maps to `None`.
fn shifted_for_remove(slot: Option<usize>, at: usize) -> Option<usize> {
    match slot {
        Some(slot) if slot == at => None,
        Some(slot) if slot > at => Some(slot - 1),
        other => other,
    }
}

impl DataGrid {
    /// Override the details visibility of one row; `None` follows the mode.
    pub fn set_details_visible_for_row(&mut self, row_index: usize, visible: Option<bool>) {
        if row_index >= self.slots.row_count() {
            return;
        }
        let slot = self.slots.slot_from_row_index(row_index);
        self.slots.set_details_override(slot, visible);
        self.notify_row(slot);
        self.invalidate_layout();
    }

    // =========================================================================
    // Incremental changes
    // =========================================================================

    pub(crate) fn insert_row(&mut self, row_index: usize) {
        let slot = self.slots.slot_from_row_index(row_index.min(self.slots.row_count()));
        tracing::trace!(target: targets::DATA, row_index, slot, "inserting row");
        self.with_suspended(|grid| {
            grid.slots.insert_row_slot(slot);
            grid.selection.insert_slot(slot);
            grid.loaded_rows = std::mem::take(&mut grid.loaded_rows)
                .into_iter()
                .map(|(s, item)| (if s >= slot { s + 1 } else { s }, item))
                .collect();

            grid.current_slot = shifted_for_insert(grid.current_slot, slot);
            grid.previous_current_slot = shifted_for_insert(grid.previous_current_slot, slot);
            grid.anchor_slot = shifted_for_insert(grid.anchor_slot, slot);
            if let Some(row) = grid.editing_row.as_mut() {
                row.slot = shifted_for_insert(Some(row.slot), slot).unwrap_or(row.slot);
            }
            grid.shift_deferred(|s| shifted_for_insert(Some(s), slot));

            if grid.current_slot.is_none() {
                grid.make_first_displayed_cell_current = true;
            }
            grid.coerce_selected_item();
        });
        self.invalidate_layout();
    }

    pub(crate) fn remove_row(&mut self, row_index: usize, item: &ItemRef) {
        if row_index >= self.slots.row_count() {
            return;
        }
        let slot = self.slots.slot_from_row_index(row_index);
        tracing::trace!(target: targets::DATA, row_index, slot, "removing row");
        self.with_suspended(|grid| {
            if grid.editing_row.as_ref().is_some_and(|row| row.slot == slot) {
                tracing::debug!(target: targets::EDITING, slot, "edited row removed, cancelling");
                grid.cancel_edit_core(EditingUnit::Row, false);
                grid.force_clear_editing();
            }
            let was_current = grid.current_slot == Some(slot);
            let was_selected = grid.selection.contains_slot(slot);

            grid.unload_row(slot);
            grid.selection.delete(slot, item);
            grid.slots.remove_row_slot(slot);
            grid.loaded_rows = std::mem::take(&mut grid.loaded_rows)
                .into_iter()
                .map(|(s, item)| (if s > slot { s - 1 } else { s }, item))
                .collect();

            grid.anchor_slot = shifted_for_remove(grid.anchor_slot, slot);
            grid.previous_current_slot = shifted_for_remove(grid.previous_current_slot, slot);
            if let Some(row) = grid.editing_row.as_mut() {
                row.slot = shifted_for_remove(Some(row.slot), slot).unwrap_or(row.slot);
            }
            grid.shift_deferred(|s| shifted_for_remove(Some(s), slot));

            if was_current {
                grid.current_slot = None;
                grid.move_currency_after_removal(slot, was_selected);
            } else {
                grid.current_slot = shifted_for_remove(grid.current_slot, slot);
            }
            grid.coerce_selected_item();
        });
        self.invalidate_layout();
    }

    /// Currency lands on the row that took the removed row's place, or on the
    /// previous visible row at the end.
    fn move_currency_after_removal(&mut self, slot: usize, reselect: bool) {
        let target = if slot < self.slots.slot_count() && !self.slots.is_slot_out_of_bounds(slot) {
            Some(slot)
        } else {
            self.slots.last_visible_slot()
        };
        let column = self.current_column.or_else(|| self.columns.first_visible());
        match (column, target) {
            (Some(column), Some(target)) if reselect => {
                self.update_selection_and_currency(
                    Some(column),
                    target,
                    SelectionAction::SelectCurrent,
                    false,
                );
            }
            (Some(column), Some(target)) => {
                self.set_current_cell_core(Some(column), Some(target), false, false);
                if self.data.collection_view().is_some() {
                    self.data
                        .move_current_to_position(self.slots.row_index_from_slot(target));
                }
            }
            _ => {
                self.set_current_cell_core(None, None, false, false);
            }
        }
    }

    fn shift_deferred(&mut self, shift: impl Fn(usize) -> Option<usize>) {
        self.deferred = std::mem::take(&mut self.deferred)
            .into_iter()
            .filter_map(|action| match action {
                DeferredAction::ScrollIntoView { column, slot } => {
                    shift(slot).map(|slot| DeferredAction::ScrollIntoView { column, slot })
                }
            })
            .collect();
    }

    // =========================================================================
    // Full refresh
    // =========================================================================

    /// Rebuild every row table from the source.
    ///
    /// The open edit is dropped, selected items are re-located by identity
    /// and the current item keeps currency when it is still present.
    /// Collapsed groups are matched by name and per-row details overrides by
    /// item, so both survive the rebuild.
    pub(crate) fn refresh_rows(&mut self) {
        let _span = PerfSpan::new(span_names::REFRESH_ROWS);
        let current_item = self.current_item();
        let collapsed_paths = self.slots.collapsed_group_paths();
        let details_overrides: Vec<(ItemRef, bool)> = self
            .slots
            .details_overrides()
            .filter_map(|(slot, visible)| {
                item_at(&self.data, &self.slots, slot).map(|item| (item, visible))
            })
            .collect();
        self.with_suspended(|grid| {
            grid.cancel_edit_core(EditingUnit::Row, false);
            grid.force_clear_editing();
            grid.unload_all_rows();

            grid.data.refresh_snapshot();
            let properties_changed = grid.data.refresh_properties();
            let row_count = grid.data.count();
            let groups = grid.data.groups();
            if groups.is_empty() {
                grid.slots.reset_rows(row_count);
            } else {
                grid.slots.reset_groups(&groups, row_count);
                grid.slots.restore_collapsed_groups(&collapsed_paths);
            }
            for (item, visible) in &details_overrides {
                if let Some(row_index) = grid.data.index_of(item).filter(|&row| row < row_count) {
                    let slot = grid.slots.slot_from_row_index(row_index);
                    grid.slots.set_details_override(slot, Some(*visible));
                }
            }
            grid.display.clear_rows();
            grid.deferred.clear();
            tracing::debug!(
                target: targets::DATA,
                row_count,
                groups = grid.slots.group_header_count(),
                "rows refreshed"
            );

            let has_auto_columns = grid.columns.iter().any(|column| column.is_auto_generated());
            if grid.settings.auto_generate_columns && (properties_changed || !has_auto_columns) {
                grid.remove_auto_generated_columns();
                grid.generate_columns();
            }

            let (data, slots) = (&grid.data, &grid.slots);
            grid.selection.update_indexes(&|item| {
                data.index_of(item)
                    .filter(|&row_index| row_index < slots.row_count())
                    .map(|row_index| slots.slot_from_row_index(row_index))
            });
            grid.anchor_slot = None;

            let kept = current_item.and_then(|item| grid.data.index_of(&item)).and_then(|row_index| {
                (row_index < grid.slots.row_count())
                    .then(|| grid.slots.slot_from_row_index(row_index))
                    .filter(|&slot| !grid.slots.is_slot_out_of_bounds(slot))
            });
            let column = grid.current_column.filter(|&c| grid.is_column_visible(c));
            match (column, kept) {
                (Some(column), Some(slot)) => {
                    grid.current_column = Some(column);
                    grid.current_slot = Some(slot);
                }
                _ => {
                    grid.current_column = None;
                    grid.current_slot = None;
                    grid.make_first_displayed_cell_current = true;
                }
            }
            grid.coerce_selected_item();
        });
        self.invalidate_layout();
    }

    // =========================================================================
    // Loading lifecycle
    // =========================================================================

    /// Bring the loaded rows in line with the display window.
    ///
    /// Structural changes made by `loading_row` or `unloading_row` handlers
    /// are rejected; the grid resynchronises with the source and reports
    /// [`GridError::CannotChangeItemsWhenLoadingRows`].
    pub(crate) fn load_rows(&mut self, wanted: &[usize]) -> Result<()> {
        self.data.set_loading_rows(true);
        let stale: Vec<usize> = self
            .loaded_rows
            .keys()
            .copied()
            .filter(|slot| wanted.binary_search(slot).is_err())
            .collect();
        for slot in stale {
            self.unload_row(slot);
        }
        for &slot in wanted {
            if self.loaded_rows.contains_key(&slot) {
                continue;
            }
            let (Some(row_index), Some(item)) = (
                self.slots.row_index_from_slot(slot),
                item_at(&self.data, &self.slots, slot),
            ) else {
                continue;
            };
            self.loaded_rows.insert(slot, item.clone());
            self.signals.loading_row.emit(RowEventArgs { slot, row_index, item });
            self.notify_row(slot);
        }
        self.data.set_loading_rows(false);

        if self.data.take_rejected() {
            horizon_grid_core::grid_warn!("items source changed while loading rows, resynchronising");
            self.data.drain_changes();
            self.refresh_rows();
            return Err(GridError::CannotChangeItemsWhenLoadingRows);
        }
        Ok(())
    }

    fn unload_row(&mut self, slot: usize) {
        let Some(item) = self.loaded_rows.remove(&slot) else {
            return;
        };
        if let Some(row_index) = self.slots.row_index_from_slot(slot) {
            self.signals.unloading_row.emit(RowEventArgs { slot, row_index, item });
        }
    }

    pub(crate) fn unload_all_rows(&mut self) {
        let loaded: BTreeMap<usize, ItemRef> = std::mem::take(&mut self.loaded_rows);
        for (slot, item) in loaded {
            if let Some(row_index) = self.slots.row_index_from_slot(slot) {
                self.signals.unloading_row.emit(RowEventArgs { slot, row_index, item });
            }
        }
    }

    /// Slots of the rows currently loaded.
    pub fn loaded_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.loaded_rows.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::super::test_support::{grid_with, item, people};
    use super::{shifted_for_insert, shifted_for_remove};
    use crate::events::{EditingUnit, RowEventArgs, SelectionChangedArgs};
    use crate::item::{same_item, Record};
    use crate::value::CellValue;
    use crate::{DataGrid, GridError, Size};

    #[test]
    fn test_slot_shifting() {
        assert_eq!(shifted_for_insert(Some(3), 3), Some(4));
        assert_eq!(shifted_for_insert(Some(2), 3), Some(2));
        assert_eq!(shifted_for_remove(Some(3), 3), None);
        assert_eq!(shifted_for_remove(Some(5), 3), Some(4));
        assert_eq!(shifted_for_remove(None, 3), None);
    }

    #[test]
    fn test_insert_shifts_selection_and_currency() {
        let (mut grid, list) = grid_with(10);
        grid.set_selected_index(Some(4));
        let selected = item(&grid, 4);
        list.insert(0, Record::new().with("Name", "New").into_item());
        grid.process_collection_changes().unwrap();
        assert_eq!(grid.row_count(), 11);
        assert_eq!(grid.current_slot(), Some(5));
        assert_eq!(grid.selected_index(), Some(5));
        assert!(same_item(&grid.selected_item().unwrap(), &selected));
    }

    #[test]
    fn test_removing_edited_row_cancels_edit() {
        let (mut grid, list) = grid_with(10);
        grid.set_selected_index(Some(3));
        grid.set_current_column(1).unwrap();
        assert!(grid.begin_edit());
        grid.set_editing_value(77);
        let edited = item(&grid, 3);
        list.remove(3);
        grid.process_collection_changes().unwrap();
        assert_eq!(grid.editing_row(), None);
        assert_eq!(grid.editing_column(), None);
        assert_eq!(edited.value("Age"), CellValue::Int(23));
        assert_eq!(grid.row_count(), 9);
        // The next row took its place and is current and selected.
        assert_eq!(grid.current_slot(), Some(3));
        assert_eq!(grid.selected_index(), Some(3));
    }

    #[test]
    fn test_removing_last_row_moves_currency_back() {
        let (mut grid, list) = grid_with(4);
        grid.set_selected_index(Some(3));
        list.remove(3);
        grid.process_collection_changes().unwrap();
        assert_eq!(grid.current_slot(), Some(2));
        assert_eq!(grid.selected_index(), Some(2));

        list.clear();
        grid.process_collection_changes().unwrap();
        assert_eq!(grid.current_slot(), None);
        assert_eq!(grid.selected_index(), None);
        assert!(grid.selected_items().is_empty());
    }

    #[test]
    fn test_rows_load_and_unload_with_window() {
        let list = people(100);
        let mut grid = DataGrid::new();
        let loaded = Arc::new(AtomicUsize::new(0));
        let unloaded = Arc::new(AtomicUsize::new(0));
        let (l, u) = (loaded.clone(), unloaded.clone());
        grid.signals().loading_row.connect(move |_: &RowEventArgs| {
            l.fetch_add(1, Ordering::SeqCst);
        });
        grid.signals().unloading_row.connect(move |_: &RowEventArgs| {
            u.fetch_add(1, Ordering::SeqCst);
        });
        grid.set_items_source(Some(list)).unwrap();
        grid.layout(Size::new(400.0, 220.0)).unwrap();
        let first_window = grid.loaded_slots().count();
        assert!(first_window > 0 && first_window < 100);
        assert_eq!(loaded.load(Ordering::SeqCst), first_window);

        grid.set_vertical_offset(22.0 * 50.0);
        grid.layout(Size::new(400.0, 220.0)).unwrap();
        assert!(unloaded.load(Ordering::SeqCst) > 0);
        assert!(grid.loaded_slots().all(|slot| slot >= 49));
    }

    #[test]
    fn test_changes_while_loading_rows_are_rejected() {
        let list = people(20);
        let mut grid = DataGrid::new();
        let list_clone = list.clone();
        grid.signals().loading_row.connect(move |args: &RowEventArgs| {
            if args.row_index == 2 {
                list_clone.push(Record::new().with("Name", "Sneaky").into_item());
            }
        });
        grid.set_items_source(Some(list)).unwrap();
        let err = grid.layout(Size::new(400.0, 300.0)).unwrap_err();
        assert_eq!(err, GridError::CannotChangeItemsWhenLoadingRows);
        // The grid resynchronised with the source.
        assert_eq!(grid.row_count(), 21);
        assert_eq!(grid.editing_row(), None);
    }

    #[test]
    fn test_refresh_keeps_current_item() {
        let (mut grid, list) = grid_with(6);
        grid.set_selected_index(Some(4));
        let current = item(&grid, 4);
        let mut items: Vec<_> = (0..6).map(|n| item(&grid, n)).collect();
        items.reverse();
        list.reset(items);
        grid.process_collection_changes().unwrap();
        assert_eq!(grid.current_slot(), Some(1));
        assert!(same_item(&grid.current_item().unwrap(), &current));
        assert_eq!(grid.selected_index(), Some(1));
        assert!(grid.commit_edit(EditingUnit::Row, true));
    }

    #[test]
    fn test_selection_before_processing_reports_the_selected_item() {
        let (mut grid, list) = grid_with(10);
        let added = Arc::new(Mutex::new(Vec::new()));
        let sink = added.clone();
        grid.signals().selection_changed.connect(move |args: &SelectionChangedArgs| {
            sink.lock().extend(args.added.iter().cloned());
        });

        list.remove(0);
        grid.set_selected_index(Some(2));
        let reported = added.lock().last().cloned().unwrap();
        assert_eq!(reported.value("Name"), CellValue::from("Person 2"));

        grid.process_collection_changes().unwrap();
        assert_eq!(grid.selected_index(), Some(1));
        assert!(same_item(&grid.selected_item().unwrap(), &reported));
        assert!(same_item(&grid.current_item().unwrap(), &reported));
    }

    #[test]
    fn test_edit_survives_removal_above_it() {
        let (mut grid, list) = grid_with(10);
        grid.set_selected_index(Some(5));
        grid.set_current_column(1).unwrap();
        assert!(grid.begin_edit());
        let edited = item(&grid, 5);

        list.remove(0);
        assert!(grid.set_editing_value(99));
        grid.process_collection_changes().unwrap();
        assert_eq!(grid.editing_row(), Some(4));
        assert_eq!(grid.current_slot(), Some(4));

        assert!(grid.commit_edit(EditingUnit::Row, true));
        assert_eq!(edited.value("Age"), CellValue::Int(99));
        assert_eq!(item(&grid, 4).value("Age"), CellValue::Int(99));
    }

    #[test]
    fn test_refresh_keeps_details_overrides() {
        let (mut grid, list) = grid_with(6);
        grid.set_details_visible_for_row(3, Some(true));
        let mut items: Vec<_> = (0..6).map(|n| item(&grid, n)).collect();
        items.reverse();
        list.reset(items);
        grid.process_collection_changes().unwrap();
        assert_eq!(grid.slot_tables().details_override(2), Some(true));
        assert_eq!(grid.slot_tables().details_override(3), None);
    }
}
