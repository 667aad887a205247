//! Pointer presses on cells, row headers and group headers.

use horizon_grid_core::logging::targets;

use super::DataGrid;
use crate::config::SelectionMode;
use crate::input::KeyboardModifiers;
use crate::selection::SelectionAction;

impl DataGrid {
    /// Left button pressed on the cell at (`column`, `slot`).
    ///
    /// `column` is `None` for a row header or a group header. A plain press
    /// selects the row alone; Shift extends from the anchor and Ctrl toggles
    /// the row in extended mode. Pressing the current cell of a selected row
    /// again opens edit on it.
    pub fn handle_cell_mouse_down(
        &mut self,
        column: Option<usize>,
        slot: usize,
        modifiers: KeyboardModifiers,
    ) -> bool {
        if self.slots.is_slot_out_of_bounds(slot) {
            return false;
        }
        if column.is_some_and(|c| !self.is_column_visible(c)) {
            return false;
        }
        let extended = self.settings.selection_mode == SelectionMode::Extended;
        let column = column.or(self.current_column).or_else(|| self.columns.first_visible());
        let begin_edit = !modifiers.shift
            && !modifiers.control
            && column.is_some()
            && column == self.current_column
            && self.current_slot == Some(slot)
            && self.selection.contains_slot(slot);

        let action = match (extended, modifiers.shift, modifiers.control) {
            (true, true, _) => SelectionAction::SelectFromAnchorToCurrent,
            (true, false, true) if self.selection.contains_slot(slot) => SelectionAction::RemoveCurrent,
            (true, false, true) => SelectionAction::AddCurrent,
            _ => SelectionAction::SelectCurrent,
        };
        tracing::trace!(target: targets::INPUT, ?column, slot, ?action, "cell pressed");

        if !self.update_selection_and_currency(column, slot, action, false) {
            return true;
        }
        if begin_edit && !self.slots.is_group_header(slot) {
            self.begin_cell_edit();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::grid_with;
    use crate::config::SelectionMode;
    use crate::input::KeyboardModifiers;

    fn selected_slots(grid: &crate::DataGrid) -> Vec<usize> {
        grid.selected_items().slots().collect()
    }

    #[test]
    fn test_shift_click_selects_range_from_anchor() {
        let (mut grid, _list) = grid_with(100);
        assert!(grid.handle_cell_mouse_down(Some(0), 5, KeyboardModifiers::NONE));
        assert!(grid.handle_cell_mouse_down(Some(0), 2, KeyboardModifiers::SHIFT));
        assert_eq!(selected_slots(&grid), vec![2, 3, 4, 5]);
        assert_eq!(grid.selected_index(), Some(2));
        assert_eq!(grid.anchor_slot(), Some(5));
    }

    #[test]
    fn test_ctrl_click_toggles_rows() {
        let (mut grid, _list) = grid_with(10);
        grid.handle_cell_mouse_down(Some(1), 3, KeyboardModifiers::CTRL);
        assert_eq!(selected_slots(&grid), vec![0, 3]);
        grid.handle_cell_mouse_down(Some(1), 0, KeyboardModifiers::CTRL);
        assert_eq!(selected_slots(&grid), vec![3]);
        assert_eq!(grid.current_slot(), Some(0));
        grid.set_selection_mode(SelectionMode::Single);
        grid.handle_cell_mouse_down(Some(1), 4, KeyboardModifiers::CTRL);
        grid.handle_cell_mouse_down(Some(1), 6, KeyboardModifiers::CTRL);
        assert_eq!(selected_slots(&grid), vec![6]);
    }

    #[test]
    fn test_second_press_on_current_cell_begins_edit() {
        let (mut grid, _list) = grid_with(5);
        grid.handle_cell_mouse_down(Some(1), 2, KeyboardModifiers::NONE);
        assert_eq!(grid.editing_column(), None);
        grid.handle_cell_mouse_down(Some(1), 2, KeyboardModifiers::NONE);
        assert_eq!(grid.editing_column(), Some(1));
        assert_eq!(grid.editing_row(), Some(2));
    }

    #[test]
    fn test_press_outside_rows_is_ignored() {
        let (mut grid, _list) = grid_with(5);
        assert!(!grid.handle_cell_mouse_down(Some(0), 9, KeyboardModifiers::NONE));
        assert!(!grid.handle_cell_mouse_down(Some(7), 1, KeyboardModifiers::NONE));
        assert_eq!(grid.current_slot(), Some(0));
    }
}
