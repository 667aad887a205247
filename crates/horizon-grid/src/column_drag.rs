//! Column header drag state.
//!
//! A header press starts a drag session owned by the grid that received it.
//! Moving past the drag threshold turns the session into a reorder (when the
//! column may be reordered) or a plain drag. Releasing a reorder drops the
//! column at the display position under the pointer; releasing without
//! moving is a click.

use crate::display::DisplayedColumn;

/// Phase of a header drag session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragMode {
    /// No button is down on a header.
    #[default]
    None,
    /// Pressed, not moved past the threshold yet.
    MouseDown,
    /// Moved, but the column cannot be reordered.
    Drag,
    /// Moving a column to a new display position.
    Reorder,
}

/// Per-grid drag session.
#[derive(Debug, Clone, Default)]
pub struct ColumnDragState {
    mode: DragMode,
    column: Option<usize>,
    start_x: f64,
    last_x: f64,
    target_display_index: Option<usize>,
}

impl ColumnDragState {
    pub fn mode(&self) -> DragMode {
        self.mode
    }

    /// The pressed column.
    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// Display index the column would drop at, while reordering.
    pub fn target_display_index(&self) -> Option<usize> {
        self.target_display_index
    }

    /// Horizontal distance travelled since the press.
    pub fn distance(&self) -> f64 {
        self.last_x - self.start_x
    }

    pub(crate) fn press(&mut self, column: usize, x: f64) {
        *self = Self {
            mode: DragMode::MouseDown,
            column: Some(column),
            start_x: x,
            last_x: x,
            target_display_index: None,
        };
    }

    /// Record a move. Returns `true` when the threshold was crossed by this
    /// move, so the caller decides between reorder and drag.
    pub(crate) fn track(&mut self, x: f64, threshold: f64) -> bool {
        self.last_x = x;
        self.mode == DragMode::MouseDown && (x - self.start_x).abs() > threshold
    }

    pub(crate) fn enter(&mut self, mode: DragMode) {
        self.mode = mode;
    }

    pub(crate) fn set_target(&mut self, target: Option<usize>) {
        self.target_display_index = target;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Display index a column dragged from `from_display_index` lands at when
/// released at `x`.
///
/// The first displayed header whose left half (or anything left of it)
/// contains `x` is the target. Dropping past every header targets the last
/// position. A later target is shifted by one to account for the dragged
/// column leaving its old position.
pub(crate) fn reorder_target(
    displayed: &[DisplayedColumn],
    from_display_index: usize,
    column_count: usize,
    x: f64,
) -> Option<usize> {
    if column_count == 0 {
        return None;
    }
    let mut headers: Vec<&DisplayedColumn> = displayed.iter().collect();
    headers.sort_by_key(|column| column.display_index);
    let hit = headers
        .into_iter()
        .find(|column| x <= column.left + column.width / 2.0);
    Some(match hit {
        Some(column) if column.display_index > from_display_index => column.display_index - 1,
        Some(column) => column.display_index,
        None => column_count - 1,
    })
}
