//! The grid engine.
//!
//! [`DataGrid`] owns every table the grid keeps: the slot tables, the
//! selection, the current cell, the edit transaction and the display window.
//! It is driven entirely through `&mut self` calls, so a host owns one grid
//! per view and serialises access to it.
//!
//! Compound operations (moving the current cell selects a row, which commits
//! an edit, which ...) run inside scoped suspensions of the
//! `SelectionChanged` and `CurrentCellChanged` notifications. The events are
//! flushed once, when the outermost scope closes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_grid::{DataGrid, ItemList, Record, Size};
//!
//! let list = Arc::new(ItemList::from_items(
//!     (0..10).map(|n| Record::new().with("Id", n).into_item()),
//! ));
//! let mut grid = DataGrid::new();
//! grid.set_items_source(Some(list)).unwrap();
//! grid.layout(Size::new(200.0, 120.0)).unwrap();
//!
//! {
//!     // One SelectionChanged for the whole scope.
//!     let mut scope = grid.selection_scope();
//!     scope.set_selected_index(Some(3));
//!     let sixth = scope.item_at_row(5).unwrap();
//!     scope.add_selected_item(sixth).unwrap();
//! }
//! assert_eq!(grid.selected_items().len(), 2);
//! ```

mod columns;
mod currency;
mod data;
mod editing;
mod groups;
mod keyboard;
mod layout;
mod mouse;
mod rows;
mod scrolling;
mod selection;
mod validation;

pub use selection::SelectedItems;

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use horizon_grid_core::logging::targets;
use horizon_grid_core::{NestingCounter, NestingGuard, NestingHost};

use crate::column_drag::ColumnDragState;
use crate::columns::{Column, ColumnCollection};
use crate::config::{check_range, GridSettings, RowDetailsVisibilityMode, SelectionMode, MAX_LENGTH};
use crate::data_connection::DataConnection;
use crate::display::{DisplayData, DisplayedColumn, ScrollBarState, Size};
use crate::error::Result;
use crate::events::{CurrentCellChangedArgs, EditingUnit, GridSignals};
use crate::item::{same_item_opt, ItemRef};
use crate::observer::{
    CellVisualState, NullObserver, PresentationObserver, RowVisualState, ValidityScope,
};
use crate::selection::SelectionTable;
use crate::slots::SlotTables;
use crate::value::{CellValue, ValidationResult};

/// The notifications a [`NestingGuard`] over a grid can hold back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspension {
    /// `selection_changed` is flushed when the outermost scope closes.
    SelectionChange,
    /// `current_cell_changed` is flushed when the outermost scope closes.
    CurrentCellChange,
}

/// A scope that coalesces selection changes into one notification.
///
/// Obtained from [`DataGrid::selection_scope`]; dereferences to the grid.
pub type SelectionScope<'a> = NestingGuard<'a, DataGrid>;

/// The row that has an open edit transaction.
#[derive(Clone)]
pub(crate) struct EditingRow {
    pub(crate) slot: usize,
    pub(crate) item: ItemRef,
    pub(crate) is_valid: bool,
    pub(crate) invalid_columns: BTreeSet<usize>,
}

/// The cell in edit mode inside the editing row.
#[derive(Debug, Clone)]
pub(crate) struct EditingCell {
    pub(crate) column: usize,
    pub(crate) value: CellValue,
    pub(crate) unedited_value: CellValue,
}

/// Follow-up work run at the end of the next layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeferredAction {
    ScrollIntoView { column: Option<usize>, slot: usize },
}

/// A headless, virtualized data grid.
pub struct DataGrid {
    // Settings
    settings: GridSettings,

    // Data
    data: DataConnection,
    columns: ColumnCollection,
    slots: SlotTables,

    // Selection
    selection: SelectionTable,
    anchor_slot: Option<usize>,
    selected_index: Option<usize>,
    selected_item: Option<ItemRef>,
    successfully_updated_selection: bool,
    no_selection_change: NestingCounter,

    // Currency
    current_column: Option<usize>,
    current_slot: Option<usize>,
    previous_current_column: Option<usize>,
    previous_current_slot: Option<usize>,
    previous_current_item: Option<ItemRef>,
    no_current_cell_change: NestingCounter,
    current_cell_change_pending: bool,
    make_first_displayed_cell_current: bool,

    // Editing
    editing_row: Option<EditingRow>,
    editing_cell: Option<EditingCell>,

    // Validation
    validation_results: Vec<ValidationResult>,
    is_valid: bool,
    error_columns: VecDeque<usize>,
    selected_validation_error: Option<usize>,

    // Display
    display: DisplayData,
    available_size: Size,
    horizontal_scroll_bar: ScrollBarState,
    vertical_scroll_bar: ScrollBarState,
    displayed_columns: Vec<DisplayedColumn>,
    loaded_rows: BTreeMap<usize, ItemRef>,
    deferred: VecDeque<DeferredAction>,
    drag: ColumnDragState,

    // Presentation
    observer: Box<dyn PresentationObserver>,
    signals: GridSignals,
}

impl fmt::Debug for DataGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataGrid")
            .field("data", &self.data)
            .field("columns", &self.columns.len())
            .field("slot_count", &self.slots.slot_count())
            .field("selected", &self.selection.count())
            .field("current_column", &self.current_column)
            .field("current_slot", &self.current_slot)
            .field("editing_row", &self.editing_row.as_ref().map(|row| row.slot))
            .field("editing_column", &self.editing_cell.as_ref().map(|cell| cell.column))
            .field("is_valid", &self.is_valid)
            .finish_non_exhaustive()
    }
}

impl Default for DataGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl NestingHost for DataGrid {
    type Kind = Suspension;

    fn nesting_counter(&mut self, kind: Suspension) -> &mut NestingCounter {
        match kind {
            Suspension::SelectionChange => &mut self.no_selection_change,
            Suspension::CurrentCellChange => &mut self.no_current_cell_change,
        }
    }

    fn nesting_released(&mut self, kind: Suspension) {
        match kind {
            Suspension::SelectionChange => self.flush_selection_changed(),
            Suspension::CurrentCellChange => self.flush_current_cell_changed(),
        }
    }
}

/// Bound item of a data-row slot.
pub(crate) fn item_at(data: &DataConnection, slots: &SlotTables, slot: usize) -> Option<ItemRef> {
    slots
        .row_index_from_slot(slot)
        .and_then(|row_index| data.get_data_item(row_index))
}

impl DataGrid {
    /// Create an empty grid with default settings.
    pub fn new() -> Self {
        Self {
            settings: GridSettings::default(),
            data: DataConnection::new(),
            columns: ColumnCollection::new(),
            slots: SlotTables::new(),
            selection: SelectionTable::new(),
            anchor_slot: None,
            selected_index: None,
            selected_item: None,
            successfully_updated_selection: false,
            no_selection_change: NestingCounter::new(),
            current_column: None,
            current_slot: None,
            previous_current_column: None,
            previous_current_slot: None,
            previous_current_item: None,
            no_current_cell_change: NestingCounter::new(),
            current_cell_change_pending: false,
            make_first_displayed_cell_current: false,
            editing_row: None,
            editing_cell: None,
            validation_results: Vec::new(),
            is_valid: true,
            error_columns: VecDeque::new(),
            selected_validation_error: None,
            display: DisplayData::default(),
            available_size: Size::default(),
            horizontal_scroll_bar: ScrollBarState::default(),
            vertical_scroll_bar: ScrollBarState::default(),
            displayed_columns: Vec::new(),
            loaded_rows: BTreeMap::new(),
            deferred: VecDeque::new(),
            drag: ColumnDragState::default(),
            observer: Box::new(NullObserver),
            signals: GridSignals::default(),
        }
    }

    /// Create a grid from validated `settings`.
    pub fn with_settings(settings: GridSettings) -> Result<Self> {
        settings.validate()?;
        let mut grid = Self::new();
        grid.settings = settings;
        Ok(grid)
    }

    /// Current settings.
    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    /// The grid's events.
    pub fn signals(&self) -> &GridSignals {
        &self.signals
    }

    /// Install the observer that receives visual-state changes.
    pub fn set_observer(&mut self, observer: Box<dyn PresentationObserver>) {
        self.observer = observer;
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        if self.settings.selection_mode == mode {
            return;
        }
        self.with_selection_suspended(|grid| {
            grid.settings.selection_mode = mode;
            grid.clear_row_selection(true);
        });
    }

    /// Make the whole grid read-only or writable again.
    ///
    /// Turning read-only on ends the open edit, committing if possible.
    pub fn set_is_read_only(&mut self, read_only: bool) {
        if read_only && !self.commit_edit(EditingUnit::Row, true) {
            self.cancel_edit_core(EditingUnit::Row, false);
        }
        self.settings.is_read_only = read_only;
        self.refresh_current_cell_state();
    }

    pub fn set_row_height(&mut self, height: f64) -> Result<()> {
        check_range("RowHeight", height, self.settings.min_row_height, MAX_LENGTH)?;
        self.settings.row_height = height;
        self.invalidate_layout();
        Ok(())
    }

    pub fn set_row_details_visibility_mode(&mut self, mode: RowDetailsVisibilityMode) {
        if self.settings.row_details_visibility_mode == mode {
            return;
        }
        self.settings.row_details_visibility_mode = mode;
        self.slots.fill_details(None);
        self.notify_loaded_rows();
        self.invalidate_layout();
    }

    /// Pin the first `count` columns in display order to the left edge.
    pub fn set_frozen_column_count(&mut self, count: usize) {
        self.settings.frozen_column_count = count;
        self.columns.update_frozen(count);
        self.invalidate_layout();
    }

    pub fn set_auto_generate_columns(&mut self, auto_generate: bool) {
        if self.settings.auto_generate_columns == auto_generate {
            return;
        }
        self.settings.auto_generate_columns = auto_generate;
        if auto_generate {
            self.generate_columns();
        } else {
            self.remove_auto_generated_columns();
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Slot bookkeeping, read-only.
    pub fn slot_tables(&self) -> &SlotTables {
        &self.slots
    }

    /// The display window computed by the last layout pass.
    pub fn display_data(&self) -> &DisplayData {
        &self.display
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.slots.row_count()
    }

    /// Data rows plus group headers.
    pub fn slot_count(&self) -> usize {
        self.slots.slot_count()
    }

    /// Item bound to the data row at `row_index`.
    pub fn item_at_row(&self, row_index: usize) -> Option<ItemRef> {
        if row_index >= self.slots.row_count() {
            return None;
        }
        self.data.get_data_item(row_index)
    }

    /// Item bound to the data row at `slot`.
    pub fn item_at_slot(&self, slot: usize) -> Option<ItemRef> {
        item_at(&self.data, &self.slots, slot)
    }

    /// Whether the grid has no validation errors.
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Whether the row at `slot` has no validation errors.
    pub fn is_row_valid(&self, slot: usize) -> bool {
        self.editing_row
            .as_ref()
            .filter(|row| row.slot == slot)
            .is_none_or(|row| row.is_valid)
    }

    /// Whether the cell at (`column`, `slot`) has no validation errors.
    pub fn is_cell_valid(&self, column: usize, slot: usize) -> bool {
        self.editing_row
            .as_ref()
            .filter(|row| row.slot == slot)
            .is_none_or(|row| !row.invalid_columns.contains(&column))
    }

    /// Effective read-only state of `column`.
    ///
    /// A column is read-only when the grid is, when the column itself is,
    /// when it is unbound or its property cannot be written, or when the
    /// source is read-only.
    pub fn is_column_read_only(&self, column: usize) -> bool {
        let Some(col) = self.columns.get(column) else {
            return true;
        };
        self.settings.is_read_only
            || col.is_read_only()
            || self.data.is_read_only()
            || col
                .binding()
                .is_none_or(|property| self.data.is_property_read_only(property))
    }

    /// Whether the details section of the row at `slot` is shown.
    pub fn row_details_visible(&self, slot: usize) -> bool {
        if slot >= self.slots.slot_count() || self.slots.is_group_header(slot) {
            return false;
        }
        self.slots
            .details_override(slot)
            .unwrap_or(match self.settings.row_details_visibility_mode {
                RowDetailsVisibilityMode::Visible => true,
                RowDetailsVisibilityMode::Collapsed => false,
                RowDetailsVisibilityMode::VisibleWhenSelected => self.selection.contains_slot(slot),
            })
    }

    // =========================================================================
    // Suspensions
    // =========================================================================

    /// Open a scope that coalesces selection changes.
    ///
    /// Every selection change made through the returned guard is reported by
    /// a single `selection_changed` emission when the guard is dropped.
    pub fn selection_scope(&mut self) -> SelectionScope<'_> {
        NestingGuard::enter(self, Suspension::SelectionChange)
    }

    pub(crate) fn with_selection_suspended<R>(&mut self, f: impl FnOnce(&mut DataGrid) -> R) -> R {
        let mut grid = NestingGuard::enter(self, Suspension::SelectionChange);
        f(&mut grid)
    }

    /// Run `f` with both notifications suspended.
    pub(crate) fn with_suspended<R>(&mut self, f: impl FnOnce(&mut DataGrid) -> R) -> R {
        let mut selection = NestingGuard::enter(self, Suspension::SelectionChange);
        let mut currency = NestingGuard::enter(&mut *selection, Suspension::CurrentCellChange);
        f(&mut currency)
    }

    fn flush_selection_changed(&mut self) {
        if !self.selection.has_changed || self.no_selection_change.is_active() {
            return;
        }
        self.coerce_selected_item();
        if self.no_current_cell_change.is_active() {
            return;
        }
        self.selection.has_changed = false;
        if self.current_cell_change_pending {
            self.flush_current_cell_changed();
        }
        let (data, slots) = (&self.data, &self.slots);
        let args = self
            .selection
            .take_changes(&|slot| item_at(data, slots, slot));
        if args.added.is_empty() && args.removed.is_empty() {
            return;
        }
        tracing::debug!(
            target: targets::SELECTION,
            added = args.added.len(),
            removed = args.removed.len(),
            "selection changed"
        );
        self.observer.selection_changed(args.added.len(), args.removed.len());
        self.signals.selection_changed.emit(args);
    }

    fn flush_current_cell_changed(&mut self) {
        if self.no_current_cell_change.is_active() {
            return;
        }
        if self.selection.has_changed {
            self.current_cell_change_pending = true;
            self.flush_selection_changed();
            return;
        }
        let current_item = self.current_item();
        if self.current_column != self.previous_current_column
            || self.current_slot != self.previous_current_slot
            || !same_item_opt(current_item.as_ref(), self.previous_current_item.as_ref())
        {
            self.coerce_selected_item();
            self.previous_current_column = self.current_column;
            self.previous_current_slot = self.current_slot;
            self.previous_current_item = current_item;
            tracing::debug!(
                target: targets::EDITING,
                column = ?self.current_column,
                slot = ?self.current_slot,
                "current cell changed"
            );
            self.observer
                .current_cell_changed(self.current_column, self.current_slot);
            self.signals.current_cell_changed.emit(CurrentCellChangedArgs {
                column: self.current_column,
                slot: self.current_slot,
            });
        }
        self.current_cell_change_pending = false;
    }

    /// Derive `selected_item` / `selected_index` from the selection table.
    fn coerce_selected_item(&mut self) {
        let slot = match (self.settings.selection_mode, self.current_slot) {
            (SelectionMode::Extended, Some(current)) if self.selection.contains_slot(current) => {
                Some(current)
            }
            _ => self.selection.nth_slot(0),
        };
        self.selected_item = slot.and_then(|slot| item_at(&self.data, &self.slots, slot));
        self.selected_index = slot
            .filter(|_| self.selected_item.is_some())
            .and_then(|slot| self.slots.row_index_from_slot(slot));
    }

    // =========================================================================
    // Presentation
    // =========================================================================

    pub(crate) fn invalidate_layout(&mut self) {
        self.observer.layout_invalidated();
    }

    fn row_visual_state(&self, slot: usize) -> RowVisualState {
        let editing = self.editing_row.as_ref().filter(|row| row.slot == slot);
        RowVisualState {
            is_current: self.current_slot == Some(slot),
            is_selected: self.selection.contains_slot(slot),
            is_editing: editing.is_some(),
            is_valid: editing.is_none_or(|row| row.is_valid),
            details_visible: self.row_details_visible(slot),
        }
    }

    fn cell_visual_state(&self, column: usize, slot: usize) -> CellVisualState {
        let editing_row = self.editing_row.as_ref().filter(|row| row.slot == slot);
        CellVisualState {
            is_current: self.current_column == Some(column) && self.current_slot == Some(slot),
            is_editing: editing_row.is_some()
                && self.editing_cell.as_ref().is_some_and(|cell| cell.column == column),
            is_valid: editing_row.is_none_or(|row| !row.invalid_columns.contains(&column)),
        }
    }

    /// Push the visual state of a loaded row to the observer.
    pub(crate) fn notify_row(&mut self, slot: usize) {
        if self.loaded_rows.contains_key(&slot) {
            let state = self.row_visual_state(slot);
            self.observer.row_state_changed(slot, state);
        }
    }

    pub(crate) fn notify_cell(&mut self, column: usize, slot: usize) {
        if self.loaded_rows.contains_key(&slot) && column < self.columns.len() {
            let state = self.cell_visual_state(column, slot);
            self.observer.cell_state_changed(column, slot, state);
        }
    }

    pub(crate) fn notify_loaded_rows(&mut self) {
        let slots: Vec<usize> = self.loaded_rows.keys().copied().collect();
        for slot in slots {
            self.notify_row(slot);
        }
    }

    pub(crate) fn notify_loaded_rows_in(&mut self, start: usize, end: usize) {
        let slots: Vec<usize> = self.loaded_rows.range(start..=end).map(|(&slot, _)| slot).collect();
        for slot in slots {
            self.notify_row(slot);
        }
    }

    fn refresh_current_cell_state(&mut self) {
        if let (Some(column), Some(slot)) = (self.current_column, self.current_slot) {
            self.notify_cell(column, slot);
            self.notify_row(slot);
        }
    }

    // =========================================================================
    // Validity
    // =========================================================================

    pub(crate) fn set_grid_valid(&mut self, valid: bool) {
        if self.is_valid == valid {
            return;
        }
        self.is_valid = valid;
        self.data.set_veto_current_changing(!valid);
        self.observer.validity_changed(ValidityScope::Grid, valid);
    }

    pub(crate) fn set_row_valid(&mut self, valid: bool) {
        let Some(row) = self.editing_row.as_mut() else {
            return;
        };
        if row.is_valid == valid {
            return;
        }
        row.is_valid = valid;
        let slot = row.slot;
        self.observer.validity_changed(ValidityScope::Row(slot), valid);
        self.notify_row(slot);
    }

    pub(crate) fn set_cell_valid(&mut self, column: usize, valid: bool) {
        let Some(row) = self.editing_row.as_mut() else {
            return;
        };
        let changed = if valid {
            row.invalid_columns.remove(&column)
        } else {
            row.invalid_columns.insert(column)
        };
        if changed {
            let slot = row.slot;
            self.observer.validity_changed(ValidityScope::Cell(column, slot), valid);
            self.notify_cell(column, slot);
        }
    }

    // =========================================================================
    // Column helpers
    // =========================================================================

    pub(crate) fn is_column_visible(&self, column: usize) -> bool {
        self.columns.get(column).is_some_and(Column::is_visible)
    }
}

static_assertions::assert_impl_all!(DataGrid: Send);

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use super::DataGrid;
    use crate::display::Size;
    use crate::item::{ItemRef, Record};
    use crate::source::ItemList;

    pub(crate) fn people(count: usize) -> Arc<ItemList> {
        Arc::new(ItemList::from_items((0..count).map(|n| {
            Record::new()
                .with("Name", format!("Person {n}"))
                .with("Age", 20 + n as i64)
                .with("Active", n % 2 == 0)
                .editable()
                .into_item()
        })))
    }

    /// A grid over `count` people, laid out in a viewport of 400x300.
    pub(crate) fn grid_with(count: usize) -> (DataGrid, Arc<ItemList>) {
        let list = people(count);
        let mut grid = DataGrid::new();
        grid.set_items_source(Some(list.clone())).unwrap();
        grid.layout(Size::new(400.0, 300.0)).unwrap();
        (grid, list)
    }

    pub(crate) fn item(grid: &DataGrid, row_index: usize) -> ItemRef {
        grid.item_at_row(row_index).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::test_support::grid_with;
    use super::*;
    use crate::config::RowDetailsVisibilityMode;
    use crate::error::GridError;

    #[test]
    fn test_with_settings_validates() {
        let settings = GridSettings {
            row_height: -1.0,
            ..GridSettings::default()
        };
        assert!(DataGrid::with_settings(settings).is_err());
        assert!(DataGrid::with_settings(GridSettings::default()).is_ok());
    }

    #[test]
    fn test_row_height_out_of_range_keeps_old_value() {
        let mut grid = DataGrid::new();
        let err = grid.set_row_height(-5.0).unwrap_err();
        assert!(matches!(err, GridError::ValueOutOfRange { name: "RowHeight", .. }));
        assert_eq!(grid.settings().row_height, 22.0);
        grid.set_row_height(30.0).unwrap();
        assert_eq!(grid.settings().row_height, 30.0);
    }

    #[test]
    fn test_scope_coalesces_selection_changed() {
        let (mut grid, _list) = grid_with(10);
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        grid.signals().selection_changed.connect(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        {
            let mut scope = grid.selection_scope();
            scope.set_selected_index(Some(2));
            scope.set_selected_index(Some(4));
            scope.select_all();
            assert_eq!(hits.load(Ordering::SeqCst), 0);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(grid.selected_items().len(), 10);
    }

    #[test]
    fn test_column_read_only_combines_sources() {
        let (mut grid, _list) = grid_with(3);
        assert!(!grid.is_column_read_only(0));
        grid.set_is_read_only(true);
        assert!(grid.is_column_read_only(0));
        grid.set_is_read_only(false);
        grid.add_column(Column::unbound("Notes"));
        let notes = grid.columns().len() - 1;
        assert!(grid.is_column_read_only(notes));
        assert!(grid.is_column_read_only(99));
    }

    #[test]
    fn test_details_follow_mode_and_overrides() {
        let (mut grid, _list) = grid_with(3);
        assert_eq!(
            grid.settings().row_details_visibility_mode,
            RowDetailsVisibilityMode::VisibleWhenSelected
        );
        assert!(grid.row_details_visible(0));
        assert!(!grid.row_details_visible(1));
        grid.set_details_visible_for_row(1, Some(true));
        assert!(grid.row_details_visible(1));
        grid.set_row_details_visibility_mode(RowDetailsVisibilityMode::Collapsed);
        assert!(!grid.row_details_visible(0));
        assert!(!grid.row_details_visible(1));
    }
}
