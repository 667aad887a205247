//! Grid events.
//!
//! Every public event of the grid is a [`Signal`] on [`GridSignals`].
//! Cancelable events carry a [`Cancel`] flag that handlers set to veto the
//! operation; the grid checks the flag after emission returns.
//!
//! Handlers receive shared references only and cannot reach back into the
//! grid, so no handler can re-enter a grid operation in progress.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use horizon_grid_core::Signal;
use parking_lot::Mutex;

use crate::item::{ItemRef, PropertyDescriptor};
use crate::source::CollectionViewGroup;

/// A veto flag shared between the grid and the handlers of one emission.
#[derive(Debug, Clone, Default)]
pub struct Cancel(Arc<AtomicBool>);

impl Cancel {
    /// Veto the operation.
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a handler vetoed the operation.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Granularity of an edit commit or cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditingUnit {
    /// The current cell only.
    Cell,
    /// The current cell and then the whole row.
    Row,
}

/// How an edit ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Push edited values into the item.
    Commit,
    /// Restore pre-edit values.
    Cancel,
}

/// Raised per generated column, before it is added.
#[derive(Debug, Clone)]
pub struct AutoGeneratingColumnArgs {
    /// The property the column is generated for.
    pub property: PropertyDescriptor,
    header: Arc<Mutex<String>>,
    /// Set to skip the column.
    pub cancel: Cancel,
}

impl AutoGeneratingColumnArgs {
    pub(crate) fn new(property: PropertyDescriptor) -> Self {
        let header = Arc::new(Mutex::new(property.name.clone()));
        Self {
            property,
            header,
            cancel: Cancel::default(),
        }
    }

    /// The header the column will get.
    pub fn header(&self) -> String {
        self.header.lock().clone()
    }

    /// Replace the header.
    pub fn set_header(&self, header: impl Into<String>) {
        *self.header.lock() = header.into();
    }
}

/// Raised before a cell enters edit mode.
#[derive(Debug, Clone)]
pub struct BeginningEditArgs {
    /// Column index of the cell.
    pub column: usize,
    /// Slot of the cell's row.
    pub slot: usize,
    /// Set to keep the cell out of edit mode.
    pub cancel: Cancel,
}

/// Raised before a cell edit is committed or canceled.
#[derive(Debug, Clone)]
pub struct CellEditEndingArgs {
    /// Column index of the cell.
    pub column: usize,
    /// Slot of the cell's row.
    pub slot: usize,
    /// How the edit ends.
    pub action: EditAction,
    /// Set to keep the cell in edit mode.
    pub cancel: Cancel,
}

/// Raised after a cell edit ended.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEditEndedArgs {
    /// Column index of the cell.
    pub column: usize,
    /// Slot of the cell's row.
    pub slot: usize,
    /// How the edit ended.
    pub action: EditAction,
}

/// Raised before a row edit is committed or canceled.
#[derive(Debug, Clone)]
pub struct RowEditEndingArgs {
    /// Slot of the row.
    pub slot: usize,
    /// How the edit ends.
    pub action: EditAction,
    /// Set to keep the row in edit mode.
    pub cancel: Cancel,
}

/// Raised after a row edit ended.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEditEndedArgs {
    /// Slot of the row.
    pub slot: usize,
    /// How the edit ended.
    pub action: EditAction,
}

/// The net selection change of one coalesced operation.
#[derive(Clone, Default)]
pub struct SelectionChangedArgs {
    /// Items that became selected.
    pub added: Vec<ItemRef>,
    /// Items that are no longer selected, including removed items.
    pub removed: Vec<ItemRef>,
}

impl fmt::Debug for SelectionChangedArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionChangedArgs")
            .field("added", &self.added.len())
            .field("removed", &self.removed.len())
            .finish()
    }
}

/// The current cell after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentCellChangedArgs {
    /// Current column index.
    pub column: Option<usize>,
    /// Current slot.
    pub slot: Option<usize>,
}

/// Raised before a dragged column is dropped at a new position.
#[derive(Debug, Clone)]
pub struct ColumnReorderingArgs {
    /// Index of the dragged column.
    pub column: usize,
    /// Target display index.
    pub display_index: usize,
    /// Set to abort the reorder.
    pub cancel: Cancel,
}

/// A column event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnEventArgs {
    /// Column index.
    pub column: usize,
    /// Display index at emission time.
    pub display_index: usize,
}

/// A row entering or leaving the display window.
#[derive(Clone)]
pub struct RowEventArgs {
    /// Slot of the row.
    pub slot: usize,
    /// Row index in the source.
    pub row_index: usize,
    /// The bound item.
    pub item: ItemRef,
}

impl fmt::Debug for RowEventArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowEventArgs")
            .field("slot", &self.slot)
            .field("row_index", &self.row_index)
            .finish_non_exhaustive()
    }
}

/// A group header that was collapsed or expanded.
#[derive(Debug, Clone)]
pub struct RowGroupEventArgs {
    /// Slot of the header.
    pub slot: usize,
    /// Nesting level, 0 for top-level groups.
    pub level: usize,
    /// The group.
    pub group: Arc<CollectionViewGroup>,
}

/// Every event the grid raises.
#[derive(Default)]
pub struct GridSignals {
    /// A column is about to be generated; cancelable.
    pub auto_generating_column: Signal<AutoGeneratingColumnArgs>,
    /// A cell is about to enter edit mode; cancelable.
    pub beginning_edit: Signal<BeginningEditArgs>,
    /// A cell edit is about to end; cancelable.
    pub cell_edit_ending: Signal<CellEditEndingArgs>,
    /// A cell edit ended.
    pub cell_edit_ended: Signal<CellEditEndedArgs>,
    /// A row edit is about to end; cancelable.
    pub row_edit_ending: Signal<RowEditEndingArgs>,
    /// A row edit ended.
    pub row_edit_ended: Signal<RowEditEndedArgs>,
    /// The selection changed.
    pub selection_changed: Signal<SelectionChangedArgs>,
    /// The current cell changed.
    pub current_cell_changed: Signal<CurrentCellChangedArgs>,
    /// A column is about to be reordered by drag; cancelable.
    pub column_reordering: Signal<ColumnReorderingArgs>,
    /// A column was reordered by drag.
    pub column_reordered: Signal<ColumnEventArgs>,
    /// A column's display index changed.
    pub column_display_index_changed: Signal<ColumnEventArgs>,
    /// A row entered the display window.
    pub loading_row: Signal<RowEventArgs>,
    /// A row left the display window.
    pub unloading_row: Signal<RowEventArgs>,
    /// A row group was collapsed.
    pub row_group_collapsed: Signal<RowGroupEventArgs>,
    /// A row group was expanded.
    pub row_group_expanded: Signal<RowGroupEventArgs>,
}

impl fmt::Debug for GridSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridSignals").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let cancel = Cancel::default();
        let seen_by_handler = cancel.clone();
        assert!(!cancel.is_set());
        seen_by_handler.set();
        assert!(cancel.is_set());
    }

    #[test]
    fn test_auto_generating_header_can_be_replaced() {
        let signals = GridSignals::default();
        signals
            .auto_generating_column
            .connect(|args: &AutoGeneratingColumnArgs| args.set_header("Full name"));

        let args = AutoGeneratingColumnArgs::new(PropertyDescriptor::new("Name", ValueKind::String));
        assert_eq!(args.header(), "Name");
        signals.auto_generating_column.emit(args.clone());
        assert_eq!(args.header(), "Full name");
        assert!(!args.cancel.is_set());
    }
}
