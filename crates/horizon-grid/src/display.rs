//! Display window state and layout results.
//!
//! [`DisplayData`] is the grid's memory of the last computed window: scroll
//! offsets, the first scrolling slot and column, and how many rows fit.
//! [`LayoutSnapshot`] is what [`DataGrid::layout`](crate::DataGrid::layout)
//! hands back to the host for rendering.

use serde::{Deserialize, Serialize};

/// A width and height in device-independent units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Computed state of one scroll bar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollBarState {
    /// Whether the bar is shown.
    pub visible: bool,
    /// Maximum travel distance, not the content extent.
    pub maximum: f64,
    /// Extent of the scrollable viewport.
    pub viewport: f64,
    /// Current offset.
    pub value: f64,
}

/// A column inside the display window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayedColumn {
    /// Authoring index.
    pub column: usize,
    /// Visual position.
    pub display_index: usize,
    /// Left edge relative to the cells area, after scrolling.
    pub left: f64,
    pub width: f64,
    pub is_frozen: bool,
}

/// What a displayed slot shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// A data row.
    Row { row_index: usize },
    /// A row-group header.
    GroupHeader { level: usize, expanded: bool },
}

/// A slot inside the display window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayedRow {
    pub slot: usize,
    pub kind: SlotKind,
    /// Top edge relative to the cells area, after scrolling.
    pub top: f64,
    pub height: f64,
    pub is_selected: bool,
    pub is_current: bool,
    pub is_editing: bool,
    pub details_visible: bool,
}

/// Result of one layout pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutSnapshot {
    /// Size the grid wants, never larger than the available size.
    pub desired_size: Size,
    /// Size of the area left for cells after headers and scroll bars.
    pub cells_size: Size,
    pub column_header_height: f64,
    /// Columns to render, frozen first, then scrolling in display order.
    pub columns: Vec<DisplayedColumn>,
    /// Width of the trailing filler column.
    pub filler_width: f64,
    /// Slots to render, top to bottom.
    pub rows: Vec<DisplayedRow>,
    pub horizontal_scroll_bar: ScrollBarState,
    pub vertical_scroll_bar: ScrollBarState,
}

/// Window bookkeeping kept between layout passes.
#[derive(Debug, Clone, Default)]
pub struct DisplayData {
    pub(crate) first_scrolling_slot: Option<usize>,
    pub(crate) last_scrolling_slot: Option<usize>,
    pub(crate) num_displayed_scrolling_elements: usize,
    pub(crate) num_totally_displayed_scrolling_elements: usize,
    pub(crate) first_displayed_scrolling_column: Option<usize>,
    pub(crate) last_totally_displayed_scrolling_column: Option<usize>,
    pub(crate) horizontal_offset: f64,
    pub(crate) neg_horizontal_offset: f64,
    pub(crate) vertical_offset: f64,
    pub(crate) neg_vertical_offset: f64,
    pub(crate) cells_width: f64,
    pub(crate) cells_height: f64,
    pub(crate) rows_height: f64,
    pub(crate) measured: bool,
}

impl DisplayData {
    /// First slot of the window, `None` before the first layout.
    pub fn first_scrolling_slot(&self) -> Option<usize> {
        self.first_scrolling_slot
    }

    pub fn last_scrolling_slot(&self) -> Option<usize> {
        self.last_scrolling_slot
    }

    /// Slots at least partially inside the window.
    pub fn num_displayed_scrolling_elements(&self) -> usize {
        self.num_displayed_scrolling_elements
    }

    /// Slots entirely inside the window.
    pub fn num_totally_displayed_scrolling_elements(&self) -> usize {
        self.num_totally_displayed_scrolling_elements
    }

    pub fn first_displayed_scrolling_column(&self) -> Option<usize> {
        self.first_displayed_scrolling_column
    }

    pub fn last_totally_displayed_scrolling_column(&self) -> Option<usize> {
        self.last_totally_displayed_scrolling_column
    }

    pub fn horizontal_offset(&self) -> f64 {
        self.horizontal_offset
    }

    /// Pixels of the first scrolling column scrolled out of view.
    pub fn neg_horizontal_offset(&self) -> f64 {
        self.neg_horizontal_offset
    }

    pub fn vertical_offset(&self) -> f64 {
        self.vertical_offset
    }

    /// Pixels of the first scrolling slot scrolled out of view.
    pub fn neg_vertical_offset(&self) -> f64 {
        self.neg_vertical_offset
    }

    pub fn cells_width(&self) -> f64 {
        self.cells_width
    }

    pub fn cells_height(&self) -> f64 {
        self.cells_height
    }

    /// Whether at least one layout pass ran.
    pub fn is_measured(&self) -> bool {
        self.measured
    }

    /// Total height of every visible slot.
    pub fn rows_height(&self) -> f64 {
        self.rows_height
    }

    pub(crate) fn clear_rows(&mut self) {
        self.first_scrolling_slot = None;
        self.last_scrolling_slot = None;
        self.num_displayed_scrolling_elements = 0;
        self.num_totally_displayed_scrolling_elements = 0;
        self.vertical_offset = 0.0;
        self.neg_vertical_offset = 0.0;
    }
}
