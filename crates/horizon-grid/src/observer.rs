//! Presentation observer.
//!
//! The grid engine is headless. Whatever draws it (a widget layer, an
//! accessibility bridge, a test harness) learns about visual-state changes
//! through a [`PresentationObserver`] installed with
//! [`DataGrid::set_observer`](crate::DataGrid::set_observer). Every callback
//! has a no-op default, so implementors override only what they render.
//!
//! Callbacks run after the grid's internal state is consistent again, from
//! inside the grid call that caused the change.

use std::sync::Arc;

use parking_lot::Mutex;

/// Visual state of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellVisualState {
    /// The cell is the current cell.
    pub is_current: bool,
    /// The cell is in edit mode.
    pub is_editing: bool,
    /// The cell has no validation errors.
    pub is_valid: bool,
}

/// Visual state of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowVisualState {
    /// The row holds the current cell.
    pub is_current: bool,
    /// The row is selected.
    pub is_selected: bool,
    /// The row is in edit mode.
    pub is_editing: bool,
    /// The row has no validation errors.
    pub is_valid: bool,
    /// The details section is shown.
    pub details_visible: bool,
}

/// What a validity change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityScope {
    /// The whole grid.
    Grid,
    /// The row at the slot.
    Row(usize),
    /// The cell at column and slot.
    Cell(usize, usize),
}

/// Receives visual-state notifications from a grid.
pub trait PresentationObserver: Send {
    /// The selection changed by `added` and `removed` items.
    fn selection_changed(&mut self, _added: usize, _removed: usize) {}

    /// The current cell moved.
    fn current_cell_changed(&mut self, _column: Option<usize>, _slot: Option<usize>) {}

    /// A cell's visual state should be refreshed.
    fn cell_state_changed(&mut self, _column: usize, _slot: usize, _state: CellVisualState) {}

    /// A row's visual state should be refreshed.
    fn row_state_changed(&mut self, _slot: usize, _state: RowVisualState) {}

    /// A cell entered or left edit mode.
    fn editing_state_changed(&mut self, _column: usize, _slot: usize, _editing: bool) {}

    /// The validity of the grid, a row or a cell changed.
    fn validity_changed(&mut self, _scope: ValidityScope, _is_valid: bool) {}

    /// Something that affects measurement changed; the host should lay out again.
    fn layout_invalidated(&mut self) {}

    /// Scroll offsets changed.
    fn scroll_offsets_changed(&mut self, _horizontal: f64, _vertical: f64) {}

    /// A group header was collapsed or expanded.
    fn row_group_visibility_changed(&mut self, _slot: usize, _expanded: bool) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl PresentationObserver for NullObserver {}

/// One recorded observer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    SelectionChanged { added: usize, removed: usize },
    CurrentCellChanged { column: Option<usize>, slot: Option<usize> },
    CellStateChanged { column: usize, slot: usize, state: CellVisualState },
    RowStateChanged { slot: usize, state: RowVisualState },
    EditingStateChanged { column: usize, slot: usize, editing: bool },
    ValidityChanged { scope: ValidityScope, is_valid: bool },
    LayoutInvalidated,
    ScrollOffsetsChanged { horizontal: f64, vertical: f64 },
    RowGroupVisibilityChanged { slot: usize, expanded: bool },
}

/// Observer that records every callback.
///
/// Clones share the same log, so a test keeps one clone and hands the other
/// to the grid.
///
/// ```
/// use horizon_grid::{DataGrid, ObserverEvent, RecordingObserver};
///
/// let recorder = RecordingObserver::new();
/// let mut grid = DataGrid::new();
/// grid.set_observer(Box::new(recorder.clone()));
/// grid.set_horizontal_offset(0.0);
/// assert!(recorder.events().iter().all(|e| !matches!(e, ObserverEvent::SelectionChanged { .. })));
/// ```
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ObserverEvent>>>,
}

impl RecordingObserver {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().clone()
    }

    /// Remove and return the recorded events.
    pub fn take(&self) -> Vec<ObserverEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&ObserverEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|event| predicate(event)).count()
    }

    fn push(&self, event: ObserverEvent) {
        self.events.lock().push(event);
    }
}

impl PresentationObserver for RecordingObserver {
    fn selection_changed(&mut self, added: usize, removed: usize) {
        self.push(ObserverEvent::SelectionChanged { added, removed });
    }

    fn current_cell_changed(&mut self, column: Option<usize>, slot: Option<usize>) {
        self.push(ObserverEvent::CurrentCellChanged { column, slot });
    }

    fn cell_state_changed(&mut self, column: usize, slot: usize, state: CellVisualState) {
        self.push(ObserverEvent::CellStateChanged { column, slot, state });
    }

    fn row_state_changed(&mut self, slot: usize, state: RowVisualState) {
        self.push(ObserverEvent::RowStateChanged { slot, state });
    }

    fn editing_state_changed(&mut self, column: usize, slot: usize, editing: bool) {
        self.push(ObserverEvent::EditingStateChanged { column, slot, editing });
    }

    fn validity_changed(&mut self, scope: ValidityScope, is_valid: bool) {
        self.push(ObserverEvent::ValidityChanged { scope, is_valid });
    }

    fn layout_invalidated(&mut self) {
        self.push(ObserverEvent::LayoutInvalidated);
    }

    fn scroll_offsets_changed(&mut self, horizontal: f64, vertical: f64) {
        self.push(ObserverEvent::ScrollOffsetsChanged { horizontal, vertical });
    }

    fn row_group_visibility_changed(&mut self, slot: usize, expanded: bool) {
        self.push(ObserverEvent::RowGroupVisibilityChanged { slot, expanded });
    }
}

static_assertions::assert_impl_all!(RecordingObserver: Send, Sync, Clone);
