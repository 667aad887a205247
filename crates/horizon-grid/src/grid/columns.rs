//! Column management and header gestures.

use horizon_grid_core::logging::targets;

use super::{DataGrid, DeferredAction};
use crate::column_drag::{reorder_target, DragMode};
use crate::columns::{Column, ColumnCollection};
use crate::config::{check_range, MAX_LENGTH};
use crate::error::{GridError, Result};
use crate::events::{Cancel, ColumnEventArgs, ColumnReorderingArgs, EditingUnit};
use crate::input::KeyboardModifiers;
use crate::source::SortDescription;

/// Re-map a column coordinate after a structural change.
fn remap(column: Option<usize>, map: impl Fn(usize) -> Option<usize>) -> Option<usize> {
    column.and_then(map)
}

impl DataGrid {
    // =========================================================================
    // Queries
    // =========================================================================

    pub fn columns(&self) -> &ColumnCollection {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// The header drag session.
    pub fn column_drag(&self) -> &crate::column_drag::ColumnDragState {
        &self.drag
    }

    fn check_column(&self, index: usize) -> Result<()> {
        if index < self.columns.len() {
            Ok(())
        } else {
            Err(GridError::ColumnOutOfBounds {
                index,
                count: self.columns.len(),
            })
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Append a column. Returns its index.
    pub fn add_column(&mut self, column: Column) -> usize {
        let at = self.columns.len();
        self.insert_column_core(at, column)
    }

    /// Insert a column at authoring index `index`.
    pub fn insert_column(&mut self, index: usize, column: Column) -> Result<usize> {
        if index > self.columns.len() {
            return Err(GridError::ColumnOutOfBounds {
                index,
                count: self.columns.len(),
            });
        }
        Ok(self.insert_column_core(index, column))
    }

    fn insert_column_core(&mut self, index: usize, column: Column) -> usize {
        let index = self.columns.insert(index, column);
        self.remap_columns(|c| Some(if c >= index { c + 1 } else { c }));
        self.columns.update_frozen(self.settings.frozen_column_count);
        if self.current_column.is_none() && self.slots.slot_count() > 0 {
            self.make_first_displayed_cell_current = true;
        }
        tracing::debug!(target: targets::COLUMNS, index, count = self.columns.len(), "column inserted");
        self.invalidate_layout();
        index
    }

    /// Remove the column at `index`.
    ///
    /// When it is the current column, currency moves to the next visible
    /// column, or the previous one, or is cleared.
    pub fn remove_column(&mut self, index: usize) -> Result<Column> {
        self.check_column(index)?;
        if self.current_column == Some(index) {
            if !self.commit_edit(EditingUnit::Cell, true) {
                self.cancel_edit_core(EditingUnit::Cell, false);
            }
            let neighbour = self
                .columns
                .next_visible(index)
                .or_else(|| self.columns.previous_visible(index));
            match neighbour {
                Some(neighbour) => {
                    let slot = self.current_slot;
                    self.set_current_cell_core(Some(neighbour), slot, false, false);
                }
                None => {
                    self.set_current_cell_core(None, None, false, false);
                }
            }
        }
        let column = self
            .columns
            .remove(index)
            .ok_or(GridError::ColumnOutOfBounds { index, count: self.columns.len() })?;
        self.remap_columns(|c| match c {
            c if c == index => None,
            c if c > index => Some(c - 1),
            c => Some(c),
        });
        self.columns.update_frozen(self.settings.frozen_column_count);
        self.drag.reset();
        tracing::debug!(target: targets::COLUMNS, index, count = self.columns.len(), "column removed");
        self.invalidate_layout();
        Ok(column)
    }

    /// Remove every column. Currency is cleared.
    pub fn clear_columns(&mut self) {
        if !self.commit_edit(EditingUnit::Cell, true) {
            self.cancel_edit_core(EditingUnit::Cell, false);
        }
        self.set_current_cell_core(None, None, false, false);
        self.columns.clear();
        self.remap_columns(|_| None);
        self.drag.reset();
        self.invalidate_layout();
    }

    fn remap_columns(&mut self, map: impl Fn(usize) -> Option<usize>) {
        self.current_column = remap(self.current_column, &map);
        self.previous_current_column = remap(self.previous_current_column, &map);
        if let Some(cell) = self.editing_cell.as_mut() {
            if let Some(column) = map(cell.column) {
                cell.column = column;
            }
        }
        if let Some(row) = self.editing_row.as_mut() {
            row.invalid_columns = row.invalid_columns.iter().filter_map(|&c| map(c)).collect();
        }
        self.error_columns = self.error_columns.iter().filter_map(|&c| map(c)).collect();
        self.deferred = self
            .deferred
            .iter()
            .map(|action| match *action {
                DeferredAction::ScrollIntoView { column, slot } => DeferredAction::ScrollIntoView {
                    column: remap(column, &map),
                    slot,
                },
            })
            .collect();
    }

    // =========================================================================
    // Column properties
    // =========================================================================

    /// Move `column` to `display_index`, shifting the columns in between.
    pub fn set_column_display_index(&mut self, column: usize, display_index: usize) -> Result<()> {
        self.check_column(column)?;
        if display_index >= self.columns.len() {
            return Err(GridError::out_of_range(
                "DisplayIndex",
                display_index as f64,
                0.0,
                self.columns.len() as f64 - 1.0,
            ));
        }
        let shifted = self.columns.move_to_display_index(column, display_index);
        self.columns.update_frozen(self.settings.frozen_column_count);
        for index in shifted {
            let display_index = self.columns.get(index).map_or(0, Column::display_index);
            self.signals
                .column_display_index_changed
                .emit(ColumnEventArgs { column: index, display_index });
        }
        self.invalidate_layout();
        Ok(())
    }

    /// Show or hide a column. The current column cannot be hidden.
    pub fn set_column_visible(&mut self, column: usize, visible: bool) -> Result<()> {
        self.check_column(column)?;
        if !visible && self.current_column == Some(column) {
            return Err(GridError::ColumnCannotBeCollapsed);
        }
        if let Some(col) = self.columns.get_mut(column) {
            col.set_visible(visible);
        }
        if visible && self.current_column.is_none() && self.slots.slot_count() > 0 {
            self.make_first_displayed_cell_current = true;
        }
        self.invalidate_layout();
        Ok(())
    }

    pub fn set_column_width(&mut self, column: usize, width: f64) -> Result<()> {
        self.check_column(column)?;
        check_range("Width", width, 0.0, MAX_LENGTH)?;
        if let Some(col) = self.columns.get_mut(column) {
            col.set_width(width);
        }
        self.invalidate_layout();
        Ok(())
    }

    /// Mark a column read-only. An edit open on it is committed first.
    pub fn set_column_read_only(&mut self, column: usize, read_only: bool) -> Result<()> {
        self.check_column(column)?;
        if read_only
            && self.editing_column() == Some(column)
            && !self.commit_edit(EditingUnit::Cell, true)
        {
            self.cancel_edit_core(EditingUnit::Cell, false);
        }
        if let Some(col) = self.columns.get_mut(column) {
            col.set_read_only(read_only);
        }
        self.refresh_current_cell_state();
        Ok(())
    }

    pub fn set_column_header(&mut self, column: usize, header: impl Into<String>) -> Result<()> {
        self.check_column(column)?;
        if let Some(col) = self.columns.get_mut(column) {
            col.set_header(header);
        }
        self.invalidate_layout();
        Ok(())
    }

    // =========================================================================
    // Header gestures
    // =========================================================================

    /// Press on the header of `column` at horizontal position `x`.
    pub fn handle_header_mouse_down(&mut self, column: usize, x: f64) -> bool {
        if !self.is_column_visible(column) {
            return false;
        }
        self.drag.press(column, x);
        true
    }

    /// Pointer moved to `x` while a header is pressed.
    pub fn handle_header_mouse_move(&mut self, x: f64) -> bool {
        let Some(column) = self.drag.column() else {
            return false;
        };
        if self.drag.track(x, self.settings.column_drag_threshold) {
            let can_reorder = self
                .columns
                .get(column)
                .and_then(Column::can_user_reorder)
                .unwrap_or(self.settings.can_user_reorder_columns);
            let mode = if can_reorder { DragMode::Reorder } else { DragMode::Drag };
            tracing::trace!(target: targets::COLUMNS, column, ?mode, "header drag started");
            self.drag.enter(mode);
        }
        if self.drag.mode() == DragMode::Reorder {
            let target = self.clamped_reorder_target(column, x);
            self.drag.set_target(target);
        }
        true
    }

    /// Release the pressed header at `x`.
    ///
    /// A release without a drag is a click and sorts by the column; a
    /// reorder drag moves the column unless `column_reordering` is cancelled.
    pub fn handle_header_mouse_up(&mut self, x: f64, modifiers: KeyboardModifiers) -> bool {
        let Some(column) = self.drag.column() else {
            return false;
        };
        let handled = match self.drag.mode() {
            DragMode::None => false,
            DragMode::MouseDown => self.sort_by_header_click(column, modifiers),
            DragMode::Drag => true,
            DragMode::Reorder => {
                match self.clamped_reorder_target(column, x) {
                    Some(target) => self.finish_reorder(column, target),
                    None => true,
                }
            }
        };
        self.drag.reset();
        handled
    }

    fn clamped_reorder_target(&self, column: usize, x: f64) -> Option<usize> {
        let from = self.columns.get(column)?.display_index();
        let frozen = self.columns.get(column)?.is_frozen();
        let target = reorder_target(&self.displayed_columns, from, self.columns.len(), x)?;
        let frozen_count = self.settings.frozen_column_count.min(self.columns.len());
        Some(if frozen {
            target.min(frozen_count.saturating_sub(1))
        } else {
            target.max(frozen_count)
        })
    }

    fn finish_reorder(&mut self, column: usize, target: usize) -> bool {
        if self.columns.get(column).is_some_and(|c| c.display_index() == target) {
            return true;
        }
        let cancel = Cancel::default();
        self.signals.column_reordering.emit(ColumnReorderingArgs {
            column,
            display_index: target,
            cancel: cancel.clone(),
        });
        if cancel.is_set() {
            tracing::debug!(target: targets::COLUMNS, column, target, "reorder cancelled by handler");
            return true;
        }
        if self.set_column_display_index(column, target).is_err() {
            return false;
        }
        self.signals.column_reordered.emit(ColumnEventArgs {
            column,
            display_index: target,
        });
        true
    }

    /// Sort the bound view by `column`. Shift adds a secondary sort; clicking
    /// the primary sort column again flips its direction.
    fn sort_by_header_click(&mut self, column: usize, modifiers: KeyboardModifiers) -> bool {
        if !self.data.allow_sort() || self.editing_row.is_some() {
            return false;
        }
        let Some(property) = self.columns.get(column).and_then(Column::binding).map(str::to_owned) else {
            return false;
        };
        let mut sorts = self.data.sort_descriptions();
        let existing = sorts.iter().position(|sort| sort.property == property);
        match (modifiers.shift, existing) {
            (true, Some(position)) => sorts[position].direction = sorts[position].direction.reversed(),
            (true, None) => sorts.push(SortDescription::ascending(property)),
            (false, Some(position)) => {
                let direction = sorts[position].direction.reversed();
                sorts = vec![SortDescription { property, direction }];
            }
            (false, None) => sorts = vec![SortDescription::ascending(property)],
        }
        tracing::debug!(target: targets::COLUMNS, column, sorts = sorts.len(), "sorting by header click");
        if let Err(err) = self.set_sort_descriptions(sorts) {
            tracing::warn!(target: targets::COLUMNS, %err, "header sort failed");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::super::test_support::grid_with;
    use crate::error::GridError;
    use crate::events::{ColumnEventArgs, ColumnReorderingArgs};
    use crate::input::KeyboardModifiers;
    use crate::item::Record;
    use crate::source::{ListCollectionView, SortDirection};
    use crate::{Column, DataGrid, DragMode, Size};

    #[test]
    fn test_insert_and_remove_shift_current_column() {
        let (mut grid, _list) = grid_with(3);
        grid.set_current_column(1).unwrap();
        grid.insert_column(0, Column::unbound("Row")).unwrap();
        assert_eq!(grid.current_column(), Some(2));
        assert!(matches!(
            grid.insert_column(9, Column::unbound("Far")),
            Err(GridError::ColumnOutOfBounds { index: 9, .. })
        ));
        let removed = grid.remove_column(0).unwrap();
        assert_eq!(removed.header(), "Row");
        assert_eq!(grid.current_column(), Some(1));
    }

    #[test]
    fn test_removing_current_column_moves_to_neighbour() {
        let (mut grid, _list) = grid_with(3);
        grid.set_current_column(2).unwrap();
        grid.remove_column(2).unwrap();
        assert_eq!(grid.current_column(), Some(1));
        assert_eq!(grid.current_slot(), Some(0));
        grid.remove_column(0).unwrap();
        assert_eq!(grid.current_column(), Some(0));
        grid.remove_column(0).unwrap();
        assert_eq!(grid.current_column(), None);
        assert_eq!(grid.current_slot(), None);
    }

    #[test]
    fn test_current_column_cannot_be_hidden() {
        let (mut grid, _list) = grid_with(3);
        assert_eq!(grid.set_column_visible(0, false), Err(GridError::ColumnCannotBeCollapsed));
        grid.set_column_visible(2, false).unwrap();
        assert!(!grid.column(2).unwrap().is_visible());
        assert!(grid.set_column_width(1, -3.0).is_err());
        grid.set_column_width(1, 150.0).unwrap();
        assert_eq!(grid.column(1).unwrap().width(), Some(150.0));
    }

    #[test]
    fn test_display_index_changes_are_reported() {
        let (mut grid, _list) = grid_with(3);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        grid.signals()
            .column_display_index_changed
            .connect(move |args: &ColumnEventArgs| seen_clone.lock().push((args.column, args.display_index)));
        grid.set_column_display_index(0, 2).unwrap();
        assert_eq!(grid.columns().display_order(), &[1, 2, 0]);
        assert_eq!(*seen.lock(), vec![(1, 0), (2, 1), (0, 2)]);
        assert!(grid.set_column_display_index(0, 3).is_err());
    }

    #[test]
    fn test_header_drag_reorders_columns() {
        let (mut grid, _list) = grid_with(3);
        let reordered = Arc::new(Mutex::new(Vec::new()));
        let reordered_clone = reordered.clone();
        grid.signals()
            .column_reordered
            .connect(move |args: &ColumnEventArgs| reordered_clone.lock().push(args.column));

        assert!(grid.handle_header_mouse_down(0, 50.0));
        assert!(grid.handle_header_mouse_move(60.0));
        assert_eq!(grid.column_drag().mode(), DragMode::Reorder);
        assert!(grid.handle_header_mouse_move(230.0));
        assert_eq!(grid.column_drag().target_display_index(), Some(1));
        assert!(grid.handle_header_mouse_up(230.0, KeyboardModifiers::NONE));
        assert_eq!(grid.columns().display_order(), &[1, 0, 2]);
        assert_eq!(*reordered.lock(), vec![0]);
        assert_eq!(grid.column_drag().mode(), DragMode::None);
    }

    #[test]
    fn test_reordering_can_be_cancelled_and_respects_frozen_boundary() {
        let (mut grid, _list) = grid_with(3);
        grid.signals()
            .column_reordering
            .connect(|args: &ColumnReorderingArgs| args.cancel.set());
        grid.handle_header_mouse_down(2, 250.0);
        grid.handle_header_mouse_move(10.0);
        grid.handle_header_mouse_up(10.0, KeyboardModifiers::NONE);
        assert_eq!(grid.columns().display_order(), &[0, 1, 2]);

        let (mut grid, _list) = grid_with(3);
        grid.set_frozen_column_count(1);
        grid.layout(Size::new(400.0, 300.0)).unwrap();
        grid.handle_header_mouse_down(2, 250.0);
        grid.handle_header_mouse_move(10.0);
        assert_eq!(grid.column_drag().target_display_index(), Some(1));
    }

    #[test]
    fn test_column_without_reorder_permission_only_drags() {
        let mut grid = DataGrid::new();
        grid.set_auto_generate_columns(false);
        grid.add_column(Column::text("A", "A").with_can_user_reorder(false));
        grid.add_column(Column::text("B", "B"));
        grid.handle_header_mouse_down(0, 10.0);
        grid.handle_header_mouse_move(150.0);
        assert_eq!(grid.column_drag().mode(), DragMode::Drag);
        assert!(grid.handle_header_mouse_up(150.0, KeyboardModifiers::NONE));
        assert_eq!(grid.columns().display_order(), &[0, 1]);
    }

    #[test]
    fn test_header_click_sorts_view() {
        let items: Vec<_> = (0..4)
            .map(|n| Record::new().with("N", n).with("M", 3 - n).into_item())
            .collect();
        let mut grid = DataGrid::new();
        grid.set_items_source(Some(Arc::new(ListCollectionView::new(items)))).unwrap();
        grid.layout(Size::new(300.0, 200.0)).unwrap();

        grid.handle_header_mouse_down(0, 20.0);
        assert!(grid.handle_header_mouse_up(20.0, KeyboardModifiers::NONE));
        assert_eq!(grid.sort_descriptions()[0].direction, SortDirection::Ascending);

        grid.handle_header_mouse_down(0, 20.0);
        grid.handle_header_mouse_up(20.0, KeyboardModifiers::NONE);
        assert_eq!(grid.sort_descriptions()[0].direction, SortDirection::Descending);

        grid.handle_header_mouse_down(1, 120.0);
        grid.handle_header_mouse_up(120.0, KeyboardModifiers::SHIFT);
        let sorts = grid.sort_descriptions();
        assert_eq!(sorts.len(), 2);
        assert_eq!(sorts[1].property, "M");
    }
}
