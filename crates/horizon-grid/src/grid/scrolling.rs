//! Scroll offsets, slot geometry and scroll-into-view.

use horizon_grid_core::logging::targets;

use super::{DataGrid, DeferredAction};
use crate::item::ItemRef;

impl DataGrid {
    // =========================================================================
    // Geometry
    // =========================================================================

    /// Rendered height of `slot`, details included.
    pub(crate) fn slot_height(&self, slot: usize) -> f64 {
        if self.slots.is_group_header(slot) {
            return self.settings.row_group_header_height;
        }
        let details = if self.row_details_visible(slot) {
            self.settings.row_details_height
        } else {
            0.0
        };
        self.settings.row_height + details
    }

    /// Height of every visible slot.
    pub(crate) fn rows_height(&self) -> f64 {
        self.slots
            .visible_slots_from(0)
            .map(|slot| self.slot_height(slot))
            .sum()
    }

    /// Top edge of `slot` in content coordinates.
    pub(crate) fn slot_top(&self, slot: usize) -> f64 {
        self.slots
            .visible_slots_from(0)
            .take_while(|&visible| visible < slot)
            .map(|visible| self.slot_height(visible))
            .sum()
    }

    /// The visible slot under content offset `offset`, with the part of it
    /// that lies above the offset.
    pub(crate) fn slot_at_offset(&self, offset: f64) -> Option<(usize, f64)> {
        let mut top = 0.0;
        let mut last = None;
        for slot in self.slots.visible_slots_from(0) {
            let height = self.slot_height(slot);
            if top + height > offset {
                return Some((slot, offset - top));
            }
            top += height;
            last = Some(slot);
        }
        last.map(|slot| (slot, 0.0))
    }

    fn max_vertical_offset(&self) -> f64 {
        (self.rows_height() - self.display.cells_height).max(0.0)
    }

    fn max_horizontal_offset(&self) -> f64 {
        (self.columns.visible_width(&self.settings) - self.display.cells_width).max(0.0)
    }

    // =========================================================================
    // Offsets
    // =========================================================================

    /// Scroll horizontally. The offset is clamped to the scrollable range;
    /// frozen columns never move.
    pub fn set_horizontal_offset(&mut self, offset: f64) {
        let offset = if self.settings.horizontal_scroll_bar_visibility.scrolls() {
            offset.clamp(0.0, self.max_horizontal_offset())
        } else {
            0.0
        };
        if offset == self.display.horizontal_offset {
            return;
        }
        self.display.horizontal_offset = offset;
        self.compute_first_visible_scrolling_column();
        tracing::trace!(target: targets::SCROLL, offset, "horizontal offset changed");
        self.observer
            .scroll_offsets_changed(offset, self.display.vertical_offset);
        self.invalidate_layout();
    }

    /// Scroll vertically. The offset is clamped to the scrollable range.
    pub fn set_vertical_offset(&mut self, offset: f64) {
        let offset = if self.settings.vertical_scroll_bar_visibility.scrolls() {
            offset.clamp(0.0, self.max_vertical_offset())
        } else {
            0.0
        };
        if offset == self.display.vertical_offset {
            return;
        }
        self.display.vertical_offset = offset;
        match self.slot_at_offset(offset) {
            Some((slot, neg)) => {
                self.display.first_scrolling_slot = Some(slot);
                self.display.neg_vertical_offset = neg;
            }
            None => {
                self.display.first_scrolling_slot = None;
                self.display.neg_vertical_offset = 0.0;
            }
        }
        tracing::trace!(target: targets::SCROLL, offset, "vertical offset changed");
        self.observer
            .scroll_offsets_changed(self.display.horizontal_offset, offset);
        self.invalidate_layout();
    }

    /// Derive the first scrolling column and its hidden part from the raw
    /// horizontal offset.
    pub(crate) fn compute_first_visible_scrolling_column(&mut self) {
        let mut left = 0.0;
        let mut first = None;
        let mut neg = 0.0;
        let scrolling: Vec<usize> = self
            .columns
            .visible_in_display_order()
            .filter(|&column| self.columns.get(column).is_some_and(|c| !c.is_frozen()))
            .collect();
        for column in scrolling {
            let width = self
                .columns
                .get(column)
                .map_or(0.0, |c| c.actual_width(&self.settings));
            if left + width > self.display.horizontal_offset {
                first = Some(column);
                neg = self.display.horizontal_offset - left;
                break;
            }
            left += width;
        }
        self.display.first_displayed_scrolling_column = first;
        self.display.neg_horizontal_offset = neg;
    }

    // =========================================================================
    // Scroll into view
    // =========================================================================

    /// Bring `item` and/or `column` into view.
    ///
    /// Collapsed groups around the item are expanded, outermost first. Before
    /// the first layout the request is queued and runs at the end of the next
    /// pass.
    pub fn scroll_into_view(&mut self, item: Option<&ItemRef>, column: Option<usize>) -> bool {
        if column.is_some_and(|c| !self.is_column_visible(c)) {
            return false;
        }
        let Some(item) = item else {
            return match column {
                Some(column) => self.scroll_column_into_view(column),
                None => true,
            };
        };
        let Some(row_index) = self
            .data
            .index_of(item)
            .filter(|&row_index| row_index < self.slots.row_count())
        else {
            return false;
        };
        let slot = self.slots.slot_from_row_index(row_index);

        for header in self.slots.parent_headers(slot).into_iter().rev() {
            if self.slots.group_info(header).is_some_and(|info| !info.is_visible) {
                self.expand_header(header, false);
            }
        }

        if !self.display.measured {
            self.deferred.push_back(DeferredAction::ScrollIntoView { column, slot });
            return true;
        }
        match column {
            Some(column) => self.scroll_slot_into_view(column, slot),
            None => self.scroll_slot_vertically(slot),
        }
    }

    /// Scroll so the cell at (`column`, `slot`) is fully visible.
    ///
    /// A pending edit elsewhere is committed first; a failed commit aborts
    /// the scroll.
    pub(crate) fn scroll_slot_into_view(&mut self, column: usize, slot: usize) -> bool {
        if !self.commit_edit_for_operation(column, slot) {
            tracing::debug!(target: targets::SCROLL, column, slot, "scroll aborted by pending edit");
            return false;
        }
        if column >= self.columns.len() || self.slots.is_slot_out_of_bounds(slot) {
            return false;
        }
        if !self.display.measured {
            return true;
        }
        self.scroll_column_into_view(column) && self.scroll_slot_vertically(slot)
    }

    pub(crate) fn scroll_slot_vertically(&mut self, slot: usize) -> bool {
        if self.slots.is_slot_out_of_bounds(slot) {
            return false;
        }
        if !self.display.measured {
            return true;
        }
        let top = self.slot_top(slot);
        let bottom = top + self.slot_height(slot);
        let viewport = self.display.cells_height;
        let offset = self.display.vertical_offset;
        if top < offset {
            self.set_vertical_offset(top);
        } else if bottom > offset + viewport {
            self.set_vertical_offset((bottom - viewport).min(top));
        }
        true
    }

    /// Scroll so `column` is fully visible. Frozen columns always are.
    pub(crate) fn scroll_column_into_view(&mut self, column: usize) -> bool {
        let Some(col) = self.columns.get(column) else {
            return false;
        };
        if !col.is_visible() {
            return false;
        }
        if col.is_frozen() || !self.display.measured {
            return true;
        }
        let width = col.actual_width(&self.settings);
        let left = self.columns.scrolling_left_edge(column, &self.settings);
        let viewport =
            (self.display.cells_width - self.columns.visible_frozen_width(&self.settings)).max(0.0);
        let offset = self.display.horizontal_offset;
        if left < offset {
            self.set_horizontal_offset(left);
        } else if left + width > offset + viewport {
            self.set_horizontal_offset((left + width - viewport).min(left));
        }
        true
    }
}
