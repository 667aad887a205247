//! Columns and the column collection.
//!
//! Every column has two positions: its `index` in the authoring order and its
//! `display_index` in the visual left-to-right order. [`ColumnCollection`]
//! keeps both dense and bijective. A synthetic filler column always sits at
//! the last display position (`display_index == len()`) and absorbs the width
//! left over when the columns do not fill the viewport.

use crate::config::{GridSettings, MAX_LENGTH};
use crate::value::ValueKind;

/// How a column presents its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnKind {
    /// Text cells.
    #[default]
    Text,
    /// Check-box cells bound to boolean values.
    CheckBox,
}

impl ColumnKind {
    /// The kind generated for a property of `kind`.
    pub fn for_value_kind(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Bool => ColumnKind::CheckBox,
            _ => ColumnKind::Text,
        }
    }
}

/// A grid column.
///
/// ```
/// use horizon_grid::{Column, ColumnKind};
///
/// let column = Column::text("Name", "Name").with_width(120.0).read_only();
/// assert_eq!(column.kind(), ColumnKind::Text);
/// assert!(column.is_read_only());
/// ```
#[derive(Debug, Clone)]
pub struct Column {
    header: String,
    binding: Option<String>,
    kind: ColumnKind,
    width: Option<f64>,
    min_width: Option<f64>,
    max_width: Option<f64>,
    is_read_only: bool,
    is_visible: bool,
    can_user_reorder: Option<bool>,
    pub(crate) is_auto_generated: bool,
    pub(crate) index: usize,
    pub(crate) display_index: usize,
    pub(crate) is_frozen: bool,
}

impl Column {
    fn new(kind: ColumnKind, header: impl Into<String>, binding: Option<String>) -> Self {
        Self {
            header: header.into(),
            binding,
            kind,
            width: None,
            min_width: None,
            max_width: None,
            is_read_only: false,
            is_visible: true,
            can_user_reorder: None,
            is_auto_generated: false,
            index: 0,
            display_index: 0,
            is_frozen: false,
        }
    }

    /// A text column bound to `property`.
    pub fn text(header: impl Into<String>, property: impl Into<String>) -> Self {
        Self::new(ColumnKind::Text, header, Some(property.into()))
    }

    /// A check-box column bound to `property`.
    pub fn check_box(header: impl Into<String>, property: impl Into<String>) -> Self {
        Self::new(ColumnKind::CheckBox, header, Some(property.into()))
    }

    /// A column without a binding. Its cells can never be edited.
    pub fn unbound(header: impl Into<String>) -> Self {
        Self::new(ColumnKind::Text, header, None)
    }

    /// Fixed width.
    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Lower bound for the width.
    pub fn with_min_width(mut self, width: f64) -> Self {
        self.min_width = Some(width);
        self
    }

    /// Upper bound for the width.
    pub fn with_max_width(mut self, width: f64) -> Self {
        self.max_width = Some(width);
        self
    }

    /// Mark the column read-only.
    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    /// Start hidden.
    pub fn hidden(mut self) -> Self {
        self.is_visible = false;
        self
    }

    /// Override the grid's reorder permission for this column.
    pub fn with_can_user_reorder(mut self, can_reorder: bool) -> Self {
        self.can_user_reorder = Some(can_reorder);
        self
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn set_header(&mut self, header: impl Into<String>) {
        self.header = header.into();
    }

    /// Bound property name.
    pub fn binding(&self) -> Option<&str> {
        self.binding.as_deref()
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// The column's own read-only flag. See
    /// [`DataGrid::is_column_read_only`](crate::DataGrid::is_column_read_only)
    /// for the effective state.
    pub fn is_read_only(&self) -> bool {
        self.is_read_only
    }

    pub(crate) fn set_read_only(&mut self, read_only: bool) {
        self.is_read_only = read_only;
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.is_visible = visible;
    }

    /// Position in the authoring order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Position in the visual order.
    pub fn display_index(&self) -> usize {
        self.display_index
    }

    /// Whether the column is pinned to the left edge.
    pub fn is_frozen(&self) -> bool {
        self.is_frozen
    }

    /// Whether the column was generated from an item property.
    pub fn is_auto_generated(&self) -> bool {
        self.is_auto_generated
    }

    pub(crate) fn can_user_reorder(&self) -> Option<bool> {
        self.can_user_reorder
    }

    /// Requested width, if any.
    pub fn width(&self) -> Option<f64> {
        self.width
    }

    pub(crate) fn set_width(&mut self, width: f64) {
        self.width = Some(width);
    }

    /// Width after applying defaults and bounds from `settings`.
    pub fn actual_width(&self, settings: &GridSettings) -> f64 {
        let min = self.min_width.unwrap_or(settings.min_column_width);
        let max = self.max_width.unwrap_or(settings.max_column_width).min(MAX_LENGTH);
        self.width
            .unwrap_or(settings.column_width)
            .clamp(min, max.max(min))
    }
}

/// The ordered set of grid columns.
#[derive(Debug, Clone, Default)]
pub struct ColumnCollection {
    columns: Vec<Column>,
    display_order: Vec<usize>,
    pub(crate) filler_width: f64,
}

impl ColumnCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column at authoring index `index`.
    pub fn get(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    /// Columns in authoring order.
    pub fn iter(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter()
    }

    /// Column indices in display order.
    pub fn display_order(&self) -> &[usize] {
        &self.display_order
    }

    /// Display index of the filler column.
    pub fn filler_display_index(&self) -> usize {
        self.columns.len()
    }

    /// Width the filler column currently absorbs.
    pub fn filler_width(&self) -> f64 {
        self.filler_width
    }

    /// Column shown at `display_index`.
    pub fn column_at_display_index(&self, display_index: usize) -> Option<usize> {
        self.display_order.get(display_index).copied()
    }

    // =========================================================================
    // Structural changes
    // =========================================================================

    /// Insert at authoring `index`; the column lands at the same display
    /// position. Returns the clamped index.
    pub(crate) fn insert(&mut self, index: usize, mut column: Column) -> usize {
        let index = index.min(self.columns.len());
        let display_index = index.min(self.display_order.len());
        for position in &mut self.display_order {
            if *position >= index {
                *position += 1;
            }
        }
        column.index = index;
        self.columns.insert(index, column);
        self.display_order.insert(display_index, index);
        self.renumber();
        index
    }

    /// Remove the column at authoring `index`.
    pub(crate) fn remove(&mut self, index: usize) -> Option<Column> {
        if index >= self.columns.len() {
            return None;
        }
        let column = self.columns.remove(index);
        self.display_order.retain(|&position| position != index);
        for position in &mut self.display_order {
            if *position > index {
                *position -= 1;
            }
        }
        self.renumber();
        Some(column)
    }

    pub(crate) fn clear(&mut self) {
        self.columns.clear();
        self.display_order.clear();
    }

    /// Move `column` to `display_index`. Returns the columns whose display
    /// index changed, in display order.
    pub(crate) fn move_to_display_index(&mut self, column: usize, display_index: usize) -> Vec<usize> {
        let Some(from) = self.columns.get(column).map(|c| c.display_index) else {
            return Vec::new();
        };
        let to = display_index.min(self.display_order.len().saturating_sub(1));
        if from == to {
            return Vec::new();
        }
        let moved = self.display_order.remove(from);
        self.display_order.insert(to, moved);
        self.renumber();
        let (low, high) = (from.min(to), from.max(to));
        self.display_order[low..=high].to_vec()
    }

    fn renumber(&mut self) {
        for (index, column) in self.columns.iter_mut().enumerate() {
            column.index = index;
        }
        for (display_index, &index) in self.display_order.iter().enumerate() {
            if let Some(column) = self.columns.get_mut(index) {
                column.display_index = display_index;
            }
        }
    }

    /// Recompute frozen states for `frozen_count` leading display positions.
    pub(crate) fn update_frozen(&mut self, frozen_count: usize) {
        for column in &mut self.columns {
            column.is_frozen = column.display_index < frozen_count;
        }
    }

    // =========================================================================
    // Visible-column navigation
    // =========================================================================

    /// Visible columns in display order.
    pub fn visible_in_display_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.display_order
            .iter()
            .copied()
            .filter(|&index| self.columns[index].is_visible)
    }

    pub fn visible_count(&self) -> usize {
        self.columns.iter().filter(|column| column.is_visible).count()
    }

    pub fn first_visible(&self) -> Option<usize> {
        self.visible_in_display_order().next()
    }

    pub fn last_visible(&self) -> Option<usize> {
        self.visible_in_display_order().last()
    }

    /// First visible column passing `accept`, in display order.
    pub(crate) fn first_visible_where(&self, accept: impl Fn(&Column) -> bool) -> Option<usize> {
        self.visible_in_display_order()
            .find(|&index| accept(&self.columns[index]))
    }

    /// Last visible column passing `accept`, in display order.
    pub(crate) fn last_visible_where(&self, accept: impl Fn(&Column) -> bool) -> Option<usize> {
        self.visible_in_display_order()
            .filter(|&index| accept(&self.columns[index]))
            .last()
    }

    /// Next visible column after `column` in display order passing `accept`.
    pub(crate) fn next_visible_where(&self, column: usize, accept: impl Fn(&Column) -> bool) -> Option<usize> {
        let from = self.columns.get(column)?.display_index;
        self.display_order[from + 1..]
            .iter()
            .copied()
            .find(|&index| self.columns[index].is_visible && accept(&self.columns[index]))
    }

    /// Previous visible column before `column` in display order passing `accept`.
    pub(crate) fn previous_visible_where(&self, column: usize, accept: impl Fn(&Column) -> bool) -> Option<usize> {
        let from = self.columns.get(column)?.display_index;
        self.display_order[..from]
            .iter()
            .rev()
            .copied()
            .find(|&index| self.columns[index].is_visible && accept(&self.columns[index]))
    }

    pub fn next_visible(&self, column: usize) -> Option<usize> {
        self.next_visible_where(column, |_| true)
    }

    pub fn previous_visible(&self, column: usize) -> Option<usize> {
        self.previous_visible_where(column, |_| true)
    }

    /// First visible column that is not frozen.
    pub fn first_visible_scrolling(&self) -> Option<usize> {
        self.first_visible_where(|column| !column.is_frozen)
    }

    // =========================================================================
    // Widths
    // =========================================================================

    /// Sum of visible column widths.
    pub fn visible_width(&self, settings: &GridSettings) -> f64 {
        self.columns
            .iter()
            .filter(|column| column.is_visible)
            .map(|column| column.actual_width(settings))
            .sum()
    }

    /// Sum of visible frozen column widths.
    pub fn visible_frozen_width(&self, settings: &GridSettings) -> f64 {
        self.columns
            .iter()
            .filter(|column| column.is_visible && column.is_frozen)
            .map(|column| column.actual_width(settings))
            .sum()
    }

    /// Offset of `column`'s left edge among the visible scrolling columns.
    pub(crate) fn scrolling_left_edge(&self, column: usize, settings: &GridSettings) -> f64 {
        self.visible_in_display_order()
            .filter(|&index| !self.columns[index].is_frozen)
            .take_while(|&index| index != column)
            .map(|index| self.columns[index].actual_width(settings))
            .sum()
    }

    /// Offset of `column`'s left edge among the visible frozen columns.
    pub(crate) fn frozen_left_edge(&self, column: usize, settings: &GridSettings) -> f64 {
        self.visible_in_display_order()
            .filter(|&index| self.columns[index].is_frozen)
            .take_while(|&index| index != column)
            .map(|index| self.columns[index].actual_width(settings))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(names: &[&str]) -> ColumnCollection {
        let mut columns = ColumnCollection::new();
        for (n, name) in names.iter().enumerate() {
            columns.insert(n, Column::text(*name, *name));
        }
        columns
    }

    fn assert_bijective(columns: &ColumnCollection) {
        let mut seen: Vec<usize> = columns.iter().map(Column::display_index).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..columns.len()).collect::<Vec<_>>());
        assert_eq!(columns.filler_display_index(), columns.len());
        for (display_index, &index) in columns.display_order().iter().enumerate() {
            assert_eq!(columns.get(index).map(Column::display_index), Some(display_index));
        }
    }

    #[test]
    fn test_insert_keeps_positions_dense() {
        let mut columns = collection(&["a", "b", "c"]);
        columns.insert(1, Column::text("x", "x"));
        assert_eq!(columns.get(1).map(Column::header), Some("x"));
        assert_eq!(columns.get(2).map(Column::header), Some("b"));
        assert_bijective(&columns);
    }

    #[test]
    fn test_move_reports_shifted_columns() {
        let mut columns = collection(&["a", "b", "c", "d"]);
        let shifted = columns.move_to_display_index(0, 2);
        assert_eq!(columns.display_order(), &[1, 2, 0, 3]);
        assert_eq!(shifted, vec![1, 2, 0]);
        assert_bijective(&columns);

        let removed = columns.remove(1);
        assert_eq!(removed.map(|c| c.header().to_string()), Some("b".to_string()));
        assert_eq!(columns.display_order(), &[1, 0, 2]);
        assert_bijective(&columns);
    }

    #[test]
    fn test_visible_navigation_skips_hidden() {
        let mut columns = collection(&["a", "b", "c"]);
        if let Some(b) = columns.get_mut(1) {
            b.set_visible(false);
        }
        assert_eq!(columns.next_visible(0), Some(2));
        assert_eq!(columns.previous_visible(2), Some(0));
        assert_eq!(columns.visible_count(), 2);
        assert_eq!(columns.last_visible(), Some(2));
    }

    #[test]
    fn test_frozen_follows_display_index() {
        let mut columns = collection(&["a", "b", "c"]);
        columns.move_to_display_index(2, 0);
        columns.update_frozen(1);
        assert!(columns.get(2).is_some_and(Column::is_frozen));
        assert!(!columns.get(0).is_some_and(Column::is_frozen));
        assert_eq!(columns.first_visible_scrolling(), Some(0));
    }

    #[test]
    fn test_widths_use_settings_and_bounds() {
        let settings = GridSettings::default();
        let columns = {
            let mut columns = ColumnCollection::new();
            columns.insert(0, Column::text("a", "a"));
            columns.insert(1, Column::text("b", "b").with_width(5.0));
            columns.insert(2, Column::text("c", "c").with_width(50.0));
            columns.update_frozen(1);
            columns
        };
        assert_eq!(columns.get(1).map(|c| c.actual_width(&settings)), Some(settings.min_column_width));
        assert_eq!(columns.visible_frozen_width(&settings), settings.column_width);
        assert_eq!(columns.scrolling_left_edge(2, &settings), settings.min_column_width);
    }

    #[test]
    fn test_check_box_for_bool_properties() {
        assert_eq!(ColumnKind::for_value_kind(ValueKind::Bool), ColumnKind::CheckBox);
        assert_eq!(ColumnKind::for_value_kind(ValueKind::Int), ColumnKind::Text);
    }
}
