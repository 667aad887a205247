//! Row-group collapse and expand.

use std::sync::Arc;

use horizon_grid_core::logging::targets;

use super::DataGrid;
use crate::events::{EditingUnit, RowGroupEventArgs};
use crate::item::ItemRef;
use crate::selection::SelectionAction;
use crate::source::CollectionViewGroup;

impl DataGrid {
    /// Collapse the header of `group`, optionally collapsing every subgroup.
    ///
    /// A current row inside the group gives up currency to the header first.
    /// Returns `false` when the group has no header or the open edit blocks
    /// the currency move.
    pub fn collapse_row_group(
        &mut self,
        group: &Arc<CollectionViewGroup>,
        collapse_all_subgroups: bool,
    ) -> bool {
        match self.slots.header_slot_of(group) {
            Some(header) => self.collapse_header(header, collapse_all_subgroups),
            None => false,
        }
    }

    /// Expand the header of `group`, optionally expanding every subgroup.
    ///
    /// Member rows stay hidden while a parent group is collapsed.
    pub fn expand_row_group(&mut self, group: &Arc<CollectionViewGroup>, expand_all_subgroups: bool) -> bool {
        match self.slots.header_slot_of(group) {
            Some(header) => self.expand_header(header, expand_all_subgroups),
            None => false,
        }
    }

    /// The group at `level` that contains `item`.
    pub fn get_group_from_item(&self, item: &ItemRef, level: usize) -> Option<Arc<CollectionViewGroup>> {
        let row_index = self
            .data
            .index_of(item)
            .filter(|&row_index| row_index < self.slots.row_count())?;
        let slot = self.slots.slot_from_row_index(row_index);
        let header = self.slots.enclosing_header(slot, level)?;
        self.slots.group_info(header).map(|info| info.group.clone())
    }

    pub(crate) fn collapse_header(&mut self, header: usize, all: bool) -> bool {
        let Some(info) = self.slots.group_info(header).cloned() else {
            return false;
        };
        let end = self.slots.group_end_slot(header);

        if self.current_slot.is_some_and(|slot| slot > header && slot <= end) {
            if !self.commit_edit(EditingUnit::Row, true) {
                self.cancel_edit_core(EditingUnit::Row, false);
            }
            let column = self.current_column;
            if !self.update_selection_and_currency(column, header, SelectionAction::None, false) {
                tracing::debug!(target: targets::SELECTION, header, "collapse blocked by currency");
                return false;
            }
        }

        if all {
            let nested: Vec<usize> = self
                .slots
                .group_headers()
                .filter(|&(slot, _)| slot > header && slot <= end)
                .map(|(slot, _)| slot)
                .collect();
            for sub in nested {
                self.slots.set_group_visible(sub, false);
            }
        }
        self.slots.set_group_visible(header, false);
        self.slots.collapse_range(header);
        tracing::debug!(target: targets::SELECTION, header, end, "row group collapsed");

        self.signals.row_group_collapsed.emit(RowGroupEventArgs {
            slot: header,
            level: info.level,
            group: info.group,
        });
        self.observer.row_group_visibility_changed(header, false);
        self.invalidate_layout();
        true
    }

    pub(crate) fn expand_header(&mut self, header: usize, all: bool) -> bool {
        let Some(info) = self.slots.group_info(header).cloned() else {
            return false;
        };
        if info.is_visible && !all {
            return true;
        }
        if all {
            let end = self.slots.group_end_slot(header);
            let nested: Vec<usize> = self
                .slots
                .group_headers()
                .filter(|&(slot, _)| slot > header && slot <= end)
                .map(|(slot, _)| slot)
                .collect();
            for sub in nested {
                self.slots.set_group_visible(sub, true);
            }
        }
        self.slots.set_group_visible(header, true);
        if !self.slots.is_collapsed(header) {
            self.slots.expand_range(header);
        }
        tracing::debug!(target: targets::SELECTION, header, "row group expanded");

        self.signals.row_group_expanded.emit(RowGroupEventArgs {
            slot: header,
            level: info.level,
            group: info.group,
        });
        self.observer.row_group_visibility_changed(header, true);
        self.invalidate_layout();
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::item::{same_item, Record};
    use crate::source::{CollectionView, IndexedSource, ListCollectionView};
    use crate::{DataGrid, Size};

    fn grouped_grid() -> (DataGrid, Arc<ListCollectionView>) {
        let view = Arc::new(ListCollectionView::new((0..12).map(|n| {
            Record::new()
                .with("Team", if n < 4 { "A" } else { "B" })
                .with("Id", n)
                .into_item()
        })));
        view.set_group_descriptions(vec!["Team".to_string()]);
        let mut grid = DataGrid::new();
        grid.set_items_source(Some(view.clone())).unwrap();
        grid.layout(Size::new(300.0, 400.0)).unwrap();
        (grid, view)
    }

    #[test]
    fn test_group_headers_take_slots() {
        let (grid, _view) = grouped_grid();
        assert_eq!(grid.row_count(), 12);
        assert_eq!(grid.slot_count(), 14);
        assert!(grid.slot_tables().is_group_header(0));
        assert!(grid.slot_tables().is_group_header(5));
        assert_eq!(grid.slot_tables().slot_from_row_index(4), 6);
    }

    #[test]
    fn test_collapse_and_expand_restore_slots() {
        let (mut grid, _view) = grouped_grid();
        let second = grid.slot_tables().group_info(5).unwrap().group.clone();
        let before: Vec<usize> = (0..12).map(|r| grid.slot_tables().slot_from_row_index(r)).collect();

        assert!(grid.collapse_row_group(&second, false));
        for slot in 6..14 {
            assert!(grid.slot_tables().is_slot_out_of_bounds(slot));
        }
        assert!(!grid.slot_tables().is_slot_out_of_bounds(5));

        assert!(grid.expand_row_group(&second, false));
        let after: Vec<usize> = (0..12).map(|r| grid.slot_tables().slot_from_row_index(r)).collect();
        assert_eq!(before, after);
        assert!((0..14).all(|slot| !grid.slot_tables().is_collapsed(slot)));
    }

    #[test]
    fn test_collapse_moves_currency_to_header() {
        let (mut grid, _view) = grouped_grid();
        assert!(grid.set_selected_index(Some(6)));
        assert_eq!(grid.current_slot(), Some(8));
        let second = grid.slot_tables().group_info(5).unwrap().group.clone();
        assert!(grid.collapse_row_group(&second, false));
        assert_eq!(grid.current_slot(), Some(5));
        assert!(grid.current_item().is_none());
    }

    #[test]
    fn test_group_from_item() {
        let (grid, view) = grouped_grid();
        let item = view.get(7).unwrap();
        let group = grid.get_group_from_item(&item, 0).unwrap();
        assert!(group.leaf_items().iter().any(|candidate| same_item(candidate, &item)));
        assert!(grid.get_group_from_item(&item, 1).is_none());
    }

    #[test]
    fn test_collapsed_group_stays_collapsed_when_another_group_grows() {
        let (mut grid, view) = grouped_grid();
        let second = grid.slot_tables().group_info(5).unwrap().group.clone();
        assert!(grid.collapse_row_group(&second, false));

        view.add(Record::new().with("Team", "A").with("Id", 12).into_item());
        grid.process_collection_changes().unwrap();

        // header A, five rows, header B, eight hidden rows
        assert_eq!(grid.slot_count(), 15);
        let tables = grid.slot_tables();
        assert!(tables.group_info(0).is_some_and(|info| info.is_visible));
        assert!(tables.group_info(6).is_some_and(|info| !info.is_visible));
        assert!(!tables.is_slot_out_of_bounds(6));
        assert!((7..15).all(|slot| tables.is_slot_out_of_bounds(slot)));
        assert!((1..6).all(|slot| !tables.is_collapsed(slot)));
    }
}
