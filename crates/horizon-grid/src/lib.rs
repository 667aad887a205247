//! Horizon Grid - a headless, virtualized data grid engine.
//!
//! The crate maps a logically large items source onto a small window of
//! displayed rows and columns while keeping the current cell, the row
//! selection, row groups, in-place editing and scroll offsets consistent with
//! each other. Rendering is left to the host: it calls [`DataGrid::layout`]
//! with a viewport size, draws the returned [`LayoutSnapshot`], forwards
//! keyboard and mouse input, and optionally installs a
//! [`PresentationObserver`] to learn about visual-state changes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_grid::{DataGrid, ItemList, Key, KeyContext, KeyboardModifiers, Record, Size};
//!
//! fn main() -> horizon_grid::Result<()> {
//!     let people = Arc::new(ItemList::from_items((0..50).map(|n| {
//!         Record::new().with("Name", format!("Person {n}")).with("Age", 20 + n).into_item()
//!     })));
//!
//!     let mut grid = DataGrid::new();
//!     grid.set_items_source(Some(people.clone()))?;
//!     let snapshot = grid.layout(Size::new(400.0, 300.0))?;
//!     assert_eq!(snapshot.columns.len(), 2);
//!
//!     // The first displayed cell became current and selected.
//!     assert_eq!(grid.selected_index(), Some(0));
//!     grid.handle_key(Key::ArrowDown, KeyboardModifiers::SHIFT, KeyContext::Grid);
//!     assert_eq!(grid.selected_items().len(), 2);
//!     Ok(())
//! }
//! ```

mod column_drag;
mod columns;
mod config;
mod data_connection;
mod display;
mod error;
mod events;
mod grid;
mod index_table;
mod input;
mod item;
mod observer;
mod selection;
mod slots;
mod source;
mod value;

pub use column_drag::{ColumnDragState, DragMode};
pub use columns::{Column, ColumnCollection, ColumnKind};
pub use config::{
    GridSettings, MAX_LENGTH, MIN_COLUMN_HEADER_HEIGHT, MIN_COLUMN_WIDTH, RowDetailsVisibilityMode,
    ScrollBarVisibility, SelectionMode,
};
pub use display::{
    DisplayData, DisplayedColumn, DisplayedRow, LayoutSnapshot, ScrollBarState, Size, SlotKind,
};
pub use error::{GridError, Result};
pub use events::{
    AutoGeneratingColumnArgs, BeginningEditArgs, Cancel, CellEditEndedArgs, CellEditEndingArgs,
    ColumnEventArgs, ColumnReorderingArgs, CurrentCellChangedArgs, EditAction, EditingUnit,
    GridSignals, RowEditEndedArgs, RowEditEndingArgs, RowEventArgs, RowGroupEventArgs,
    SelectionChangedArgs,
};
pub use grid::{DataGrid, SelectedItems, SelectionScope, Suspension};
pub use index_table::IndexToValueTable;
pub use input::{Key, KeyContext, KeyboardModifiers};
pub use item::{
    same_item, same_item_opt, DataItem, EditableObject, ItemRef, PropertyDescriptor, Record,
};
pub use observer::{
    CellVisualState, NullObserver, ObserverEvent, PresentationObserver, RecordingObserver,
    RowVisualState, ValidityScope,
};
pub use selection::SelectionAction;
pub use slots::{RowGroupInfo, SlotTableDebug, SlotTables};
pub use source::{
    CollectionChange, CollectionView, CollectionViewGroup, CurrentChangingArgs, EnumerableSource,
    GroupEntry, IndexedSource, ItemList, ItemsSource, ListCollectionView, SortDescription,
    SortDirection,
};
pub use value::{CellValue, ValidationResult, ValueKind};

pub use horizon_grid_core::{ConnectionId, NestingGuard, Signal};
