//! Slot bookkeeping and row-index translation.
//!
//! A *slot* is a position in the rendered sequence: every data row plus one
//! slot per row-group header. Collapsed slots still exist (they keep their
//! numbers) but are not rendered. [`SlotTables`] owns the slot-keyed tables
//! for group headers, collapsed slots and row-details overrides, and answers
//! every slot/row question the grid asks.
//!
//! ```
//! use horizon_grid::SlotTables;
//!
//! let mut slots = SlotTables::new();
//! slots.reset_rows(4);
//! assert_eq!(slots.slot_count(), 4);
//! assert_eq!(slots.slot_from_row_index(2), 2);
//! assert_eq!(slots.row_index_from_slot(2), Some(2));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::index_table::IndexToValueTable;
use crate::source::CollectionViewGroup;
use crate::value::CellValue;

/// Metadata for one row-group header slot.
#[derive(Debug, Clone)]
pub struct RowGroupInfo {
    /// The collection-view group the header represents.
    pub group: Arc<CollectionViewGroup>,
    /// Nesting depth, 0 for top-level groups.
    pub level: usize,
    /// Whether the group is expanded.
    pub is_visible: bool,
}

impl PartialEq for RowGroupInfo {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.group, &other.group)
            && self.level == other.level
            && self.is_visible == other.is_visible
    }
}

/// Slot-keyed tables shared by translation, layout and navigation.
#[derive(Debug, Clone, Default)]
pub struct SlotTables {
    row_groups: IndexToValueTable<RowGroupInfo>,
    collapsed: IndexToValueTable<()>,
    details: IndexToValueTable<bool>,
    row_count: usize,
}

impl SlotTables {
    /// Empty tables with no rows.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Counts
    // =========================================================================

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of group-header slots.
    pub fn group_header_count(&self) -> usize {
        self.row_groups.index_count()
    }

    /// Rows plus group headers, collapsed slots included.
    pub fn slot_count(&self) -> usize {
        self.row_count + self.row_groups.index_count()
    }

    /// Slots that are not collapsed.
    pub fn visible_slot_count(&self) -> usize {
        self.slot_count() - self.collapsed.index_count()
    }

    // =========================================================================
    // Translation
    // =========================================================================

    /// Slot of the data row at `row_index`.
    ///
    /// Indices at or past the row count map past the last slot, which is where
    /// an appended row lands.
    pub fn slot_from_row_index(&self, row_index: usize) -> usize {
        let mut slot = row_index;
        loop {
            let next = row_index + self.row_groups.get_index_count(0, slot);
            if next == slot {
                return slot;
            }
            slot = next;
        }
    }

    /// Row index of `slot`, `None` for a group header or a slot past the end.
    pub fn row_index_from_slot(&self, slot: usize) -> Option<usize> {
        if slot >= self.slot_count() || self.row_groups.contains(slot) {
            return None;
        }
        Some(slot - self.row_groups.get_index_count(0, slot))
    }

    /// Whether `slot` is a row-group header.
    pub fn is_group_header(&self, slot: usize) -> bool {
        self.row_groups.contains(slot)
    }

    /// Group metadata of the header at `slot`.
    pub fn group_info(&self, slot: usize) -> Option<&RowGroupInfo> {
        self.row_groups.get_value_at(slot)
    }

    /// Whether `slot` is hidden inside a collapsed group.
    pub fn is_collapsed(&self, slot: usize) -> bool {
        self.collapsed.contains(slot)
    }

    /// Past the end or collapsed.
    pub fn is_slot_out_of_bounds(&self, slot: usize) -> bool {
        slot >= self.slot_count() || self.collapsed.contains(slot)
    }

    // =========================================================================
    // Visible-slot navigation
    // =========================================================================

    /// First slot that is not collapsed.
    pub fn first_visible_slot(&self) -> Option<usize> {
        let slot = self.collapsed.first_gap_from(0);
        (slot < self.slot_count()).then_some(slot)
    }

    /// Last slot that is not collapsed.
    pub fn last_visible_slot(&self) -> Option<usize> {
        let count = self.slot_count();
        if count == 0 {
            return None;
        }
        if !self.collapsed.contains(count - 1) {
            return Some(count - 1);
        }
        self.collapsed.get_previous_gap(count - 1)
    }

    /// Nearest visible slot after `slot`.
    pub fn next_visible_slot(&self, slot: usize) -> Option<usize> {
        let next = self.collapsed.get_next_gap(slot);
        (next < self.slot_count()).then_some(next)
    }

    /// Nearest visible slot before `slot`.
    pub fn previous_visible_slot(&self, slot: usize) -> Option<usize> {
        self.collapsed.get_previous_gap(slot.min(self.slot_count()))
    }

    /// Visible slots from `start` on, in order.
    pub fn visible_slots_from(&self, start: usize) -> impl Iterator<Item = usize> + '_ {
        let count = self.slot_count();
        let first = self.collapsed.first_gap_from(start);
        std::iter::successors((first < count).then_some(first), move |&slot| {
            self.next_visible_slot(slot)
        })
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Group header slots with their metadata, in slot order.
    pub fn group_headers(&self) -> impl Iterator<Item = (usize, &RowGroupInfo)> + '_ {
        self.row_groups.iter()
    }

    /// Slot of the header whose group is `group`.
    pub fn header_slot_of(&self, group: &Arc<CollectionViewGroup>) -> Option<usize> {
        self.row_groups
            .iter()
            .find(|(_, info)| Arc::ptr_eq(&info.group, group))
            .map(|(slot, _)| slot)
    }

    /// Last slot covered by the group whose header is at `header_slot`.
    pub fn group_end_slot(&self, header_slot: usize) -> usize {
        let Some(level) = self.row_groups.get_value_at(header_slot).map(|info| info.level) else {
            return header_slot;
        };
        let mut candidate = header_slot;
        while let Some(next) = self.row_groups.get_next_index(candidate) {
            if self
                .row_groups
                .get_value_at(next)
                .is_some_and(|info| info.level <= level)
            {
                return next - 1;
            }
            candidate = next;
        }
        self.slot_count().saturating_sub(1)
    }

    /// Header slot of the nearest enclosing group of `slot` at `level`.
    pub fn enclosing_header(&self, slot: usize, level: usize) -> Option<usize> {
        let mut candidate = if self.row_groups.contains(slot) {
            Some(slot)
        } else {
            self.row_groups.get_previous_index(slot)
        };
        while let Some(header) = candidate {
            match self.row_groups.get_value_at(header) {
                Some(info) if info.level == level => return Some(header),
                Some(info) if info.level < level => return None,
                _ => candidate = self.row_groups.get_previous_index(header),
            }
        }
        None
    }

    /// Headers enclosing `slot`, innermost first.
    pub fn parent_headers(&self, slot: usize) -> Vec<usize> {
        let mut parents = Vec::new();
        let mut bound = self
            .row_groups
            .get_value_at(slot)
            .map_or(usize::MAX, |info| info.level);
        let mut candidate = self.row_groups.get_previous_index(slot);
        while let Some(header) = candidate {
            if let Some(info) = self.row_groups.get_value_at(header) {
                if info.level < bound {
                    parents.push(header);
                    bound = info.level;
                    if bound == 0 {
                        break;
                    }
                }
            }
            candidate = self.row_groups.get_previous_index(header);
        }
        parents
    }

    /// Group names from the outermost group down to the header at `header_slot`.
    pub fn group_path(&self, header_slot: usize) -> Vec<CellValue> {
        self.parent_headers(header_slot)
            .into_iter()
            .rev()
            .chain(std::iter::once(header_slot))
            .filter_map(|header| self.row_groups.get_value_at(header))
            .map(|info| info.group.name().clone())
            .collect()
    }

    /// Paths of the collapsed groups, see [`group_path`](Self::group_path).
    pub(crate) fn collapsed_group_paths(&self) -> Vec<Vec<CellValue>> {
        self.row_groups
            .iter()
            .filter(|(_, info)| !info.is_visible)
            .map(|(slot, _)| self.group_path(slot))
            .collect()
    }

    /// Collapse the groups found at `paths` again after a rebuild.
    pub(crate) fn restore_collapsed_groups(&mut self, paths: &[Vec<CellValue>]) {
        if paths.is_empty() {
            return;
        }
        let headers: Vec<usize> = self
            .row_groups
            .indexes()
            .filter(|&header| paths.contains(&self.group_path(header)))
            .collect();
        for &header in &headers {
            self.set_group_visible(header, false);
        }
        for header in headers {
            if !self.collapsed.contains(header) {
                self.collapse_range(header);
            }
        }
    }

    pub(crate) fn set_group_visible(&mut self, header_slot: usize, visible: bool) {
        if let Some(mut info) = self.row_groups.get_value_at(header_slot).cloned() {
            info.is_visible = visible;
            self.row_groups.add_value(header_slot, info);
        }
    }

    /// Hide every slot of the group at `header_slot`, the header itself stays.
    pub(crate) fn collapse_range(&mut self, header_slot: usize) {
        let end = self.group_end_slot(header_slot);
        if end > header_slot {
            self.collapsed.add_values(header_slot + 1, end - header_slot, ());
        }
    }

    /// Reveal the group at `header_slot`, keeping collapsed subgroups hidden.
    pub(crate) fn expand_range(&mut self, header_slot: usize) {
        let end = self.group_end_slot(header_slot);
        if end <= header_slot {
            return;
        }
        self.collapsed.remove_values(header_slot + 1, end - header_slot);
        let nested: Vec<usize> = self
            .row_groups
            .iter()
            .filter(|&(slot, info)| slot > header_slot && slot <= end && !info.is_visible)
            .map(|(slot, _)| slot)
            .collect();
        for sub in nested {
            if !self.collapsed.contains(sub) {
                self.collapse_range(sub);
            }
        }
    }

    // =========================================================================
    // Row details
    // =========================================================================

    /// Per-row details override at `slot`.
    pub fn details_override(&self, slot: usize) -> Option<bool> {
        self.details.get_value_at(slot).copied()
    }

    /// Slots carrying a details override, in slot order.
    pub(crate) fn details_overrides(&self) -> impl Iterator<Item = (usize, bool)> + '_ {
        self.details.iter().map(|(slot, &visible)| (slot, visible))
    }

    pub(crate) fn set_details_override(&mut self, slot: usize, visible: Option<bool>) {
        match visible {
            Some(visible) => self.details.add_value(slot, visible),
            None => self.details.remove_value(slot),
        }
    }

    pub(crate) fn fill_details(&mut self, visible: Option<bool>) {
        self.details.clear();
        if let Some(visible) = visible {
            let count = self.slot_count();
            if count > 0 {
                self.details.add_values(0, count, visible);
            }
        }
    }

    // =========================================================================
    // Structural changes
    // =========================================================================

    /// Drop all bookkeeping and set a flat row count.
    pub fn reset_rows(&mut self, row_count: usize) {
        self.row_groups.clear();
        self.collapsed.clear();
        self.details.clear();
        self.row_count = row_count;
    }

    /// Rebuild with group headers laid out depth-first over `groups`.
    pub fn reset_groups(&mut self, groups: &[Arc<CollectionViewGroup>], row_count: usize) {
        self.reset_rows(row_count);
        let mut slot = 0;
        for group in groups {
            self.add_group(group, 0, &mut slot);
        }
    }

    fn add_group(&mut self, group: &Arc<CollectionViewGroup>, level: usize, slot: &mut usize) {
        self.row_groups.add_value(
            *slot,
            RowGroupInfo {
                group: group.clone(),
                level,
                is_visible: true,
            },
        );
        *slot += 1;
        if group.is_bottom_level() {
            *slot += group.item_count();
        } else {
            for entry in group.entries() {
                if let crate::source::GroupEntry::Group(sub) = entry {
                    self.add_group(sub, level + 1, slot);
                }
            }
        }
    }

    /// Make room for a data row at `slot`.
    pub(crate) fn insert_row_slot(&mut self, slot: usize) {
        self.row_groups.insert_index(slot);
        self.collapsed.insert_index(slot);
        self.details.insert_index(slot);
        self.row_count += 1;
    }

    /// Remove the data row at `slot`.
    pub(crate) fn remove_row_slot(&mut self, slot: usize) {
        self.row_groups.remove_index(slot);
        self.collapsed.remove_index(slot);
        self.details.remove_index(slot);
        self.row_count = self.row_count.saturating_sub(1);
    }
}

/// Text rendering of the slot sequence for diagnostics.
///
/// ```
/// use horizon_grid::{SlotTableDebug, SlotTables};
///
/// let mut slots = SlotTables::new();
/// slots.reset_rows(2);
/// let text = SlotTableDebug::new(&slots).to_string();
/// assert!(text.lines().count() == 3);
/// ```
pub struct SlotTableDebug<'a> {
    slots: &'a SlotTables,
    selected: Option<&'a dyn Fn(usize) -> bool>,
}

impl<'a> SlotTableDebug<'a> {
    /// Render `slots` without selection information.
    pub fn new(slots: &'a SlotTables) -> Self {
        Self {
            slots,
            selected: None,
        }
    }

    /// Add a selection column driven by `is_selected`.
    pub fn with_selection(mut self, is_selected: &'a dyn Fn(usize) -> bool) -> Self {
        self.selected = Some(is_selected);
        self
    }
}

impl fmt::Display for SlotTableDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>6} {:<10} {:>6} {:>9} {:>8} {:>7}",
            "slot", "kind", "row", "collapsed", "selected", "details"
        )?;
        for slot in 0..self.slots.slot_count() {
            let (kind, row) = match self.slots.group_info(slot) {
                Some(info) => (format!("header:{}", info.level), String::from("-")),
                None => (
                    String::from("row"),
                    self.slots
                        .row_index_from_slot(slot)
                        .map_or_else(|| String::from("-"), |row| row.to_string()),
                ),
            };
            let selected = self.selected.map_or("-", |is_selected| {
                if is_selected(slot) { "yes" } else { "no" }
            });
            let details = match self.slots.details_override(slot) {
                Some(true) => "shown",
                Some(false) => "hidden",
                None => "-",
            };
            writeln!(
                f,
                "{:>6} {:<10} {:>6} {:>9} {:>8} {:>7}",
                slot,
                kind,
                row,
                if self.slots.is_collapsed(slot) { "yes" } else { "no" },
                selected,
                details
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemRef, Record};
    use crate::source::{CollectionView, ListCollectionView};

    fn grouped(teams: &[(&str, usize)]) -> (SlotTables, ListCollectionView) {
        let items: Vec<ItemRef> = teams
            .iter()
            .flat_map(|&(team, count)| {
                (0..count).map(move |n| Record::new().with("Team", team).with("N", n as i64).into_item())
            })
            .collect();
        let row_count = items.len();
        let view = ListCollectionView::new(items);
        view.set_group_descriptions(vec!["Team".to_string()]);
        let mut slots = SlotTables::new();
        slots.reset_groups(&view.groups(), row_count);
        (slots, view)
    }

    #[test]
    fn test_flat_translation_is_identity() {
        let mut slots = SlotTables::new();
        slots.reset_rows(5);
        for row in 0..5 {
            assert_eq!(slots.slot_from_row_index(row), row);
            assert_eq!(slots.row_index_from_slot(row), Some(row));
        }
        assert_eq!(slots.row_index_from_slot(5), None);
        assert!(slots.is_slot_out_of_bounds(5));
    }

    #[test]
    fn test_grouped_translation_round_trips() {
        let (slots, _view) = grouped(&[("a", 3), ("b", 2)]);
        // header(0) r0 r1 r2 header(4) r3 r4
        assert_eq!(slots.slot_count(), 7);
        assert!(slots.is_group_header(0));
        assert!(slots.is_group_header(4));
        assert_eq!(slots.slot_from_row_index(0), 1);
        assert_eq!(slots.slot_from_row_index(3), 5);
        for row in 0..5 {
            let slot = slots.slot_from_row_index(row);
            assert!(slot >= row);
            assert_eq!(slots.row_index_from_slot(slot), Some(row));
        }
        assert_eq!(slots.row_index_from_slot(4), None);
    }

    #[test]
    fn test_group_end_and_parents() {
        let (slots, _view) = grouped(&[("a", 3), ("b", 2)]);
        assert_eq!(slots.group_end_slot(0), 3);
        assert_eq!(slots.group_end_slot(4), 6);
        assert_eq!(slots.parent_headers(2), vec![0]);
        assert_eq!(slots.enclosing_header(6, 0), Some(4));
    }

    #[test]
    fn test_collapse_keeps_slot_numbers() {
        let (mut slots, _view) = grouped(&[("a", 3), ("b", 2)]);
        slots.set_group_visible(0, false);
        slots.collapse_range(0);
        assert_eq!(slots.slot_count(), 7);
        assert_eq!(slots.visible_slot_count(), 4);
        for slot in 1..=3 {
            assert!(slots.is_slot_out_of_bounds(slot));
        }
        assert_eq!(slots.next_visible_slot(0), Some(4));
        assert_eq!(slots.previous_visible_slot(4), Some(0));
        assert_eq!(slots.visible_slots_from(0).collect::<Vec<_>>(), vec![0, 4, 5, 6]);

        slots.set_group_visible(0, true);
        slots.expand_range(0);
        assert_eq!(slots.visible_slot_count(), 7);
        assert_eq!(slots.slot_from_row_index(2), 3);
    }

    #[test]
    fn test_row_insert_and_remove_shift_headers() {
        let (mut slots, _view) = grouped(&[("a", 2), ("b", 2)]);
        // header(0) r0 r1 header(3) r2 r3
        slots.insert_row_slot(1);
        assert_eq!(slots.slot_count(), 7);
        assert!(slots.is_group_header(4));
        slots.remove_row_slot(1);
        assert!(slots.is_group_header(3));
        assert_eq!(slots.row_count(), 4);
    }

    #[test]
    fn test_last_visible_slot_skips_collapsed_tail() {
        let (mut slots, _view) = grouped(&[("a", 1), ("b", 2)]);
        slots.set_group_visible(2, false);
        slots.collapse_range(2);
        assert_eq!(slots.last_visible_slot(), Some(2));
        assert_eq!(slots.next_visible_slot(2), None);
    }

    #[test]
    fn test_collapsed_groups_are_found_again_by_name() {
        let (mut slots, _view) = grouped(&[("a", 3), ("b", 2)]);
        slots.set_group_visible(4, false);
        slots.collapse_range(4);
        let paths = slots.collapsed_group_paths();
        assert_eq!(paths, vec![slots.group_path(4)]);

        // Group "a" grew by one row, so "b" now starts one slot later.
        let (mut rebuilt, _view) = grouped(&[("a", 4), ("b", 2)]);
        rebuilt.restore_collapsed_groups(&paths);
        assert!(rebuilt.group_info(0).is_some_and(|info| info.is_visible));
        assert!(rebuilt.group_info(5).is_some_and(|info| !info.is_visible));
        assert!(!rebuilt.is_collapsed(5));
        assert!(rebuilt.is_collapsed(6) && rebuilt.is_collapsed(7));
        assert_eq!(rebuilt.last_visible_slot(), Some(5));
    }

    #[test]
    fn test_debug_table_lists_every_slot() {
        let (slots, _view) = grouped(&[("a", 1)]);
        let is_selected = |slot: usize| slot == 1;
        let text = SlotTableDebug::new(&slots).with_selection(&is_selected).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("header:0"));
        assert!(lines[2].contains("yes"));
    }
}
