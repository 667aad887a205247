//! Keyboard navigation and editing keys.

use horizon_grid_core::logging::{span_names, targets};
use horizon_grid_core::PerfSpan;

use super::DataGrid;
use crate::columns::Column;
use crate::config::SelectionMode;
use crate::events::EditingUnit;
use crate::input::{Key, KeyContext, KeyboardModifiers};
use crate::selection::SelectionAction;

impl DataGrid {
    /// Route a key press. Returns whether the grid handled it.
    pub fn handle_key(&mut self, key: Key, modifiers: KeyboardModifiers, context: KeyContext) -> bool {
        let _span = PerfSpan::new(span_names::KEY);
        let handled = match key {
            Key::ArrowUp => self.process_vertical_key(false, modifiers),
            Key::ArrowDown => self.process_vertical_key(true, modifiers),
            Key::ArrowLeft => self.process_horizontal_key(false, modifiers),
            Key::ArrowRight => self.process_horizontal_key(true, modifiers),
            Key::Home => self.process_home_end(false, modifiers),
            Key::End => self.process_home_end(true, modifiers),
            Key::PageUp => self.process_page_key(false, modifiers),
            Key::PageDown => self.process_page_key(true, modifiers),
            Key::Tab => self.process_tab_key(modifiers),
            Key::Enter => self.process_enter_key(modifiers, context),
            Key::Escape => self.process_escape_key(),
            Key::F2 => self.process_f2_key(modifiers),
            Key::A if modifiers.control && !modifiers.shift && !modifiers.alt => {
                if self.settings.selection_mode != SelectionMode::Extended {
                    return false;
                }
                self.select_all();
                true
            }
            Key::A | Key::Other => false,
        };
        tracing::trace!(target: targets::INPUT, ?key, ?modifiers, handled, "key processed");
        handled
    }

    /// Selection effect of a row move, given the modifiers.
    fn row_move_action(&self, modifiers: KeyboardModifiers) -> SelectionAction {
        if modifiers.shift && self.settings.selection_mode == SelectionMode::Extended {
            SelectionAction::SelectFromAnchorToCurrent
        } else {
            SelectionAction::SelectCurrent
        }
    }

    fn move_to_row(&mut self, slot: usize, modifiers: KeyboardModifiers) -> bool {
        let action = self.row_move_action(modifiers);
        let column = self.current_column.or_else(|| self.columns.first_visible());
        self.update_selection_and_currency(column, slot, action, true);
        true
    }

    fn process_vertical_key(&mut self, down: bool, modifiers: KeyboardModifiers) -> bool {
        let Some(current) = self.current_slot else {
            return false;
        };
        let target = match (down, modifiers.control) {
            (true, true) => self.slots.last_visible_slot(),
            (false, true) => self.slots.first_visible_slot(),
            (true, false) => self.slots.next_visible_slot(current),
            (false, false) => self.slots.previous_visible_slot(current),
        };
        match target {
            Some(slot) if slot != current => self.move_to_row(slot, modifiers),
            _ => true,
        }
    }

    fn process_horizontal_key(&mut self, right: bool, modifiers: KeyboardModifiers) -> bool {
        let Some(slot) = self.current_slot else {
            return false;
        };
        if let Some(info) = self.slots.group_info(slot) {
            return match (right, info.is_visible) {
                (true, false) => self.expand_header(slot, false),
                (false, true) => self.collapse_header(slot, false),
                _ => true,
            };
        }
        let Some(current) = self.current_column else {
            return false;
        };
        let target = match (right, modifiers.control) {
            (true, true) => self.columns.last_visible(),
            (false, true) => self.columns.first_visible(),
            (true, false) => self.columns.next_visible(current),
            (false, false) => self.columns.previous_visible(current),
        };
        if let Some(column) = target.filter(|&column| column != current) {
            self.update_selection_and_currency(Some(column), slot, SelectionAction::None, true);
        }
        true
    }

    fn process_home_end(&mut self, end: bool, modifiers: KeyboardModifiers) -> bool {
        let column = if end {
            self.columns.last_visible()
        } else {
            self.columns.first_visible()
        };
        let Some(column) = column else {
            return false;
        };
        if modifiers.control {
            let slot = if end {
                self.slots.last_visible_slot()
            } else {
                self.slots.first_visible_slot()
            };
            let Some(slot) = slot else {
                return false;
            };
            let action = self.row_move_action(modifiers);
            self.update_selection_and_currency(Some(column), slot, action, true);
            return true;
        }
        let Some(slot) = self.current_slot else {
            return false;
        };
        self.update_selection_and_currency(Some(column), slot, SelectionAction::None, true);
        true
    }

    fn process_page_key(&mut self, down: bool, modifiers: KeyboardModifiers) -> bool {
        let Some(current) = self.current_slot else {
            return false;
        };
        let step = self.display.num_totally_displayed_scrolling_elements.max(1);
        let mut target = current;
        for _ in 0..step {
            let next = if down {
                self.slots.next_visible_slot(target)
            } else {
                self.slots.previous_visible_slot(target)
            };
            match next {
                Some(slot) => target = slot,
                None => break,
            }
        }
        if target == current {
            return true;
        }
        self.move_to_row(target, modifiers)
    }

    /// Tab and Shift+Tab walk the writable cells of the editing row and wrap
    /// to the next or previous data row, opening edit on arrival.
    fn process_tab_key(&mut self, modifiers: KeyboardModifiers) -> bool {
        if modifiers.control || modifiers.alt {
            return false;
        }
        let (Some(column), Some(slot)) = (self.current_column, self.current_slot) else {
            return false;
        };
        if self.editing_cell.is_none() {
            return false;
        }
        let backwards = modifiers.shift;
        let in_row = {
            let grid: &DataGrid = self;
            let writable = |c: &Column| !grid.is_column_read_only(c.index());
            if backwards {
                grid.columns.previous_visible_where(column, writable)
            } else {
                grid.columns.next_visible_where(column, writable)
            }
        };
        if let Some(next) = in_row {
            if !self.set_current_cell_core(Some(next), Some(slot), true, false) {
                return true;
            }
            self.scroll_slot_into_view(next, slot);
            self.begin_cell_edit();
            return true;
        }

        let mut candidate = slot;
        let target_slot = loop {
            let next = if backwards {
                self.slots.previous_visible_slot(candidate)
            } else {
                self.slots.next_visible_slot(candidate)
            };
            match next {
                Some(next) if self.slots.is_group_header(next) => candidate = next,
                other => break other,
            }
        };
        let target_column = {
            let grid: &DataGrid = self;
            let writable = |c: &Column| !grid.is_column_read_only(c.index());
            if backwards {
                grid.columns.last_visible_where(writable)
            } else {
                grid.columns.first_visible_where(writable)
            }
        };
        let (Some(target_slot), Some(target_column)) = (target_slot, target_column) else {
            // Leaving the grid: the edit is committed, focus moves on.
            if !self.commit_edit(EditingUnit::Row, true) {
                return true;
            }
            return false;
        };
        tracing::debug!(target: targets::INPUT, target_column, target_slot, backwards, "tab wraps row");
        if self.update_selection_and_currency(
            Some(target_column),
            target_slot,
            SelectionAction::SelectCurrent,
            true,
        ) {
            self.begin_cell_edit();
        }
        true
    }

    fn process_enter_key(&mut self, modifiers: KeyboardModifiers, context: KeyContext) -> bool {
        if context.consumes_return() && !modifiers.control {
            return false;
        }
        let Some(current) = self.current_slot else {
            return false;
        };
        if !self.commit_edit(EditingUnit::Row, true) {
            return true;
        }
        if modifiers.control {
            return true;
        }
        if let Some(next) = self.slots.next_visible_slot(current) {
            let column = self.current_column;
            self.update_selection_and_currency(column, next, SelectionAction::SelectCurrent, true);
        }
        true
    }

    fn process_escape_key(&mut self) -> bool {
        if self.editing_cell.is_some() {
            return self.cancel_edit(EditingUnit::Cell);
        }
        if self.editing_row.is_some() {
            return self.cancel_edit(EditingUnit::Row);
        }
        false
    }

    fn process_f2_key(&mut self, modifiers: KeyboardModifiers) -> bool {
        if modifiers.any() || self.current_column.is_none() {
            return false;
        }
        if self.editing_cell.is_some() {
            return true;
        }
        if let Some(column) = self.current_column {
            if let Some(slot) = self.current_slot {
                self.scroll_slot_into_view(column, slot);
            }
        }
        self.begin_edit()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::grid_with;
    use crate::config::SelectionMode;
    use crate::events::EditingUnit;
    use crate::input::{Key, KeyContext, KeyboardModifiers};
    use crate::value::CellValue;

    const NONE: KeyboardModifiers = KeyboardModifiers::NONE;
    const SHIFT: KeyboardModifiers = KeyboardModifiers::SHIFT;
    const CTRL: KeyboardModifiers = KeyboardModifiers::CTRL;

    fn selected_slots(grid: &crate::DataGrid) -> Vec<usize> {
        grid.selected_items().slots().collect()
    }

    #[test]
    fn test_arrow_keys_move_and_select() {
        let (mut grid, _list) = grid_with(10);
        assert!(grid.handle_key(Key::ArrowDown, NONE, KeyContext::Grid));
        assert_eq!(grid.current_slot(), Some(1));
        assert_eq!(selected_slots(&grid), vec![1]);
        assert!(grid.handle_key(Key::ArrowRight, NONE, KeyContext::Grid));
        assert_eq!(grid.current_column(), Some(1));
        assert!(grid.handle_key(Key::ArrowUp, NONE, KeyContext::Grid));
        assert_eq!(grid.current_slot(), Some(0));
        assert_eq!(grid.current_column(), Some(1));
        // At the top edge nothing moves but the key is consumed.
        assert!(grid.handle_key(Key::ArrowUp, NONE, KeyContext::Grid));
        assert_eq!(grid.current_slot(), Some(0));
    }

    #[test]
    fn test_shift_extension_keeps_anchor() {
        let (mut grid, _list) = grid_with(10);
        grid.set_selected_index(Some(3));
        grid.handle_key(Key::ArrowDown, SHIFT, KeyContext::Grid);
        grid.handle_key(Key::ArrowDown, SHIFT, KeyContext::Grid);
        assert_eq!(selected_slots(&grid), vec![3, 4, 5]);
        for _ in 0..4 {
            grid.handle_key(Key::ArrowUp, SHIFT, KeyContext::Grid);
        }
        assert_eq!(selected_slots(&grid), vec![1, 2, 3]);
        assert_eq!(grid.anchor_slot(), Some(3));
    }

    #[test]
    fn test_single_mode_ignores_shift() {
        let (mut grid, _list) = grid_with(10);
        grid.set_selection_mode(SelectionMode::Single);
        grid.set_selected_index(Some(2));
        grid.handle_key(Key::ArrowDown, SHIFT, KeyContext::Grid);
        assert_eq!(selected_slots(&grid), vec![3]);
        assert!(!grid.handle_key(Key::A, CTRL, KeyContext::Grid));
    }

    #[test]
    fn test_ctrl_jumps_and_home_end() {
        let (mut grid, _list) = grid_with(50);
        grid.handle_key(Key::End, CTRL, KeyContext::Grid);
        assert_eq!(grid.current_slot(), Some(49));
        assert_eq!(grid.current_column(), Some(2));
        assert!(grid.display_data().vertical_offset() > 0.0);
        grid.handle_key(Key::Home, NONE, KeyContext::Grid);
        assert_eq!(grid.current_column(), Some(0));
        assert_eq!(grid.current_slot(), Some(49));
        grid.handle_key(Key::ArrowUp, CTRL, KeyContext::Grid);
        assert_eq!(grid.current_slot(), Some(0));
    }

    #[test]
    fn test_page_down_moves_by_displayed_rows() {
        let (mut grid, _list) = grid_with(50);
        let page = grid.display_data().num_totally_displayed_scrolling_elements();
        grid.handle_key(Key::PageDown, NONE, KeyContext::Grid);
        assert_eq!(grid.current_slot(), Some(page));
        grid.handle_key(Key::PageUp, NONE, KeyContext::Grid);
        assert_eq!(grid.current_slot(), Some(0));
    }

    #[test]
    fn test_tab_walks_writable_cells_and_wraps() {
        let (mut grid, _list) = grid_with(3);
        grid.set_column_read_only(1, true).unwrap();
        assert!(grid.begin_edit());
        assert!(grid.handle_key(Key::Tab, NONE, KeyContext::Grid));
        assert_eq!(grid.editing_column(), Some(2));
        assert!(grid.handle_key(Key::Tab, NONE, KeyContext::Grid));
        assert_eq!(grid.current_slot(), Some(1));
        assert_eq!(grid.editing_column(), Some(0));
        assert_eq!(grid.selected_index(), Some(1));
        assert!(grid.handle_key(Key::Tab, SHIFT, KeyContext::Grid));
        assert_eq!(grid.current_slot(), Some(0));
        assert_eq!(grid.editing_column(), Some(2));
        // Tab does nothing without an open cell edit.
        grid.cancel_edit(EditingUnit::Row);
        assert!(!grid.handle_key(Key::Tab, NONE, KeyContext::Grid));
    }

    #[test]
    fn test_enter_commits_and_moves_down() {
        let (mut grid, _list) = grid_with(3);
        assert!(grid.handle_key(Key::F2, NONE, KeyContext::Grid));
        grid.set_editing_value("Renamed");
        assert!(!grid.handle_key(
            Key::Enter,
            NONE,
            KeyContext::Editor { accepts_return: true }
        ));
        assert_eq!(grid.editing_column(), Some(0));
        assert!(grid.handle_key(Key::Enter, NONE, KeyContext::Editor { accepts_return: false }));
        assert_eq!(grid.editing_row(), None);
        assert_eq!(grid.current_slot(), Some(1));
        assert_eq!(
            grid.item_at_row(0).unwrap().value("Name"),
            CellValue::from("Renamed")
        );
    }

    #[test]
    fn test_escape_cancels_cell_then_row() {
        let (mut grid, _list) = grid_with(3);
        assert!(grid.begin_edit());
        grid.set_editing_value("Changed");
        assert!(grid.handle_key(Key::Escape, NONE, KeyContext::Grid));
        assert_eq!(grid.editing_column(), None);
        assert_eq!(grid.editing_row(), Some(0));
        assert!(grid.handle_key(Key::Escape, NONE, KeyContext::Grid));
        assert_eq!(grid.editing_row(), None);
        assert!(!grid.handle_key(Key::Escape, NONE, KeyContext::Grid));
        assert_eq!(
            grid.item_at_row(0).unwrap().value("Name"),
            CellValue::from("Person 0")
        );
    }

    #[test]
    fn test_ctrl_a_selects_every_row() {
        let (mut grid, _list) = grid_with(7);
        assert!(grid.handle_key(Key::A, CTRL, KeyContext::Grid));
        assert_eq!(grid.selected_items().len(), 7);
        assert!(!grid.handle_key(Key::A, NONE, KeyContext::Grid));
        assert!(!grid.handle_key(Key::Other, NONE, KeyContext::Grid));
    }
}
