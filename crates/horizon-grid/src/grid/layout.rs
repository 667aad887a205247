//! The layout pass.
//!
//! [`DataGrid::layout`] is the grid's only measure/arrange entry point. It
//! applies pending source changes, computes the display window for the
//! given viewport, runs the follow-up work queued since the last pass, loads
//! the rows that entered the window and returns a [`LayoutSnapshot`].

use horizon_grid_core::logging::{span_names, targets};
use horizon_grid_core::PerfSpan;

use super::{DataGrid, DeferredAction};
use crate::display::{DisplayedColumn, DisplayedRow, LayoutSnapshot, ScrollBarState, Size, SlotKind};
use crate::error::Result;

/// Outcome of fitting content into the viewport.
#[derive(Debug, Clone, Copy)]
struct Fit {
    cells: Size,
    show_horizontal: bool,
    show_vertical: bool,
}

impl DataGrid {
    /// Lay the grid out in `available` space.
    ///
    /// Errors from applying source changes or from row loading are returned
    /// after the grid has resynchronised; the next pass starts clean.
    pub fn layout(&mut self, available: Size) -> Result<LayoutSnapshot> {
        let _span = PerfSpan::new(span_names::LAYOUT);
        self.process_collection_changes()?;

        self.available_size = available;
        self.display.measured = true;
        let offsets_before = (self.display.horizontal_offset, self.display.vertical_offset);
        self.compute_window();

        let mut dirty = false;
        if self.make_first_displayed_cell_current {
            self.make_first_displayed_cell_current();
            dirty = true;
        }
        let deferred: Vec<DeferredAction> = self.deferred.drain(..).collect();
        for action in deferred {
            self.run_deferred(action);
            dirty = true;
        }
        if dirty {
            self.compute_window();
        }

        let wanted: Vec<usize> = self.displayed_slots();
        self.load_rows(&wanted)?;

        let offsets = (self.display.horizontal_offset, self.display.vertical_offset);
        if offsets != offsets_before {
            self.observer.scroll_offsets_changed(offsets.0, offsets.1);
        }
        let snapshot = self.snapshot();
        tracing::trace!(
            target: targets::LAYOUT,
            rows = snapshot.rows.len(),
            columns = snapshot.columns.len(),
            "layout pass finished"
        );
        Ok(snapshot)
    }

    fn run_deferred(&mut self, action: DeferredAction) {
        match action {
            DeferredAction::ScrollIntoView { column, slot } => {
                let done = match column.filter(|&c| self.is_column_visible(c)) {
                    Some(column) => self.scroll_slot_into_view(column, slot),
                    None => self.scroll_slot_vertically(slot),
                };
                tracing::trace!(target: targets::LAYOUT, slot, done, "deferred scroll");
            }
        }
    }

    // =========================================================================
    // Window
    // =========================================================================

    /// Decide the scroll bars. Showing one bar shrinks the other axis, so the
    /// check repeats until neither decision changes.
    fn fit(&self, content_width: f64, content_height: f64) -> Fit {
        let settings = &self.settings;
        let h = settings.horizontal_scroll_bar_visibility;
        let v = settings.vertical_scroll_bar_visibility;
        let thickness = settings.scroll_bar_thickness;
        let width = self.available_size.width.max(0.0);
        let height = (self.available_size.height - settings.column_header_height).max(0.0);

        let mut show_horizontal = h.forces();
        let mut show_vertical = v.forces();
        let cells = |show_h: bool, show_v: bool| {
            Size::new(
                (width - if show_v { thickness } else { 0.0 }).max(0.0),
                (height - if show_h { thickness } else { 0.0 }).max(0.0),
            )
        };
        for _ in 0..3 {
            let size = cells(show_horizontal, show_vertical);
            let need_h = show_horizontal || (h.allows() && content_width > size.width);
            let need_v = show_vertical || (v.allows() && content_height > size.height);
            if need_h == show_horizontal && need_v == show_vertical {
                break;
            }
            show_horizontal = need_h;
            show_vertical = need_v;
        }
        Fit {
            cells: cells(show_horizontal, show_vertical),
            show_horizontal,
            show_vertical,
        }
    }

    fn compute_window(&mut self) {
        let total_width = self.columns.visible_width(&self.settings);
        let frozen_width = self.columns.visible_frozen_width(&self.settings);
        let rows_height = self.rows_height();
        let fit = self.fit(total_width, rows_height);

        self.display.cells_width = fit.cells.width;
        self.display.cells_height = fit.cells.height;
        self.display.rows_height = rows_height;
        self.columns.filler_width = (fit.cells.width - total_width).max(0.0);

        // Offsets may be stale after the content or the viewport shrank.
        let max_h = (total_width - fit.cells.width).max(0.0);
        let max_v = (rows_height - fit.cells.height).max(0.0);
        self.display.horizontal_offset = if self.settings.horizontal_scroll_bar_visibility.scrolls() {
            self.display.horizontal_offset.clamp(0.0, max_h)
        } else {
            0.0
        };
        self.display.vertical_offset = if self.settings.vertical_scroll_bar_visibility.scrolls() {
            self.display.vertical_offset.clamp(0.0, max_v)
        } else {
            0.0
        };

        self.compute_rows_window();
        self.compute_columns_window(frozen_width);

        self.horizontal_scroll_bar = ScrollBarState {
            visible: fit.show_horizontal,
            maximum: max_h,
            viewport: (fit.cells.width - frozen_width).max(0.0),
            value: self.display.horizontal_offset,
        };
        self.vertical_scroll_bar = ScrollBarState {
            visible: fit.show_vertical,
            maximum: max_v,
            viewport: fit.cells.height,
            value: self.display.vertical_offset,
        };
    }

    fn compute_rows_window(&mut self) {
        let Some((first, neg)) = self.slot_at_offset(self.display.vertical_offset) else {
            self.display.clear_rows();
            return;
        };
        let viewport = self.display.cells_height;
        let mut bottom = -neg;
        let mut displayed = 0;
        let mut totally = 0;
        let mut last = first;
        for slot in self.slots.visible_slots_from(first) {
            if bottom >= viewport && displayed > 0 {
                break;
            }
            bottom += self.slot_height(slot);
            displayed += 1;
            if bottom <= viewport && (displayed > 1 || neg == 0.0) {
                totally += 1;
            }
            last = slot;
        }
        self.display.first_scrolling_slot = Some(first);
        self.display.last_scrolling_slot = Some(last);
        self.display.neg_vertical_offset = neg;
        self.display.num_displayed_scrolling_elements = displayed;
        self.display.num_totally_displayed_scrolling_elements = totally;
    }

    fn compute_columns_window(&mut self, frozen_width: f64) {
        self.compute_first_visible_scrolling_column();
        let cells_width = self.display.cells_width;
        let offset = self.display.horizontal_offset;

        let mut frozen = Vec::new();
        let mut scrolling = Vec::new();
        let mut last_totally = None;
        for column in self.columns.visible_in_display_order() {
            let Some(col) = self.columns.get(column) else {
                continue;
            };
            let width = col.actual_width(&self.settings);
            if col.is_frozen() {
                let left = self.columns.frozen_left_edge(column, &self.settings);
                frozen.push(DisplayedColumn {
                    column,
                    display_index: col.display_index(),
                    left,
                    width,
                    is_frozen: true,
                });
                continue;
            }
            let left = frozen_width + self.columns.scrolling_left_edge(column, &self.settings) - offset;
            if left + width <= frozen_width || left >= cells_width {
                continue;
            }
            if left >= frozen_width && left + width <= cells_width {
                last_totally = Some(column);
            }
            scrolling.push(DisplayedColumn {
                column,
                display_index: col.display_index(),
                left,
                width,
                is_frozen: false,
            });
        }
        frozen.extend(scrolling);
        self.displayed_columns = frozen;
        self.display.last_totally_displayed_scrolling_column = last_totally;
    }

    /// Visible slots inside the current window.
    fn displayed_slots(&self) -> Vec<usize> {
        match self.display.first_scrolling_slot {
            Some(first) => self
                .slots
                .visible_slots_from(first)
                .take(self.display.num_displayed_scrolling_elements)
                .collect(),
            None => Vec::new(),
        }
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    fn snapshot(&self) -> LayoutSnapshot {
        let mut top = -self.display.neg_vertical_offset;
        let rows = self
            .displayed_slots()
            .into_iter()
            .map(|slot| {
                let height = self.slot_height(slot);
                let kind = match self.slots.group_info(slot) {
                    Some(info) => SlotKind::GroupHeader {
                        level: info.level,
                        expanded: info.is_visible,
                    },
                    None => SlotKind::Row {
                        row_index: self.slots.row_index_from_slot(slot).unwrap_or_default(),
                    },
                };
                let state = self.row_visual_state(slot);
                let row = DisplayedRow {
                    slot,
                    kind,
                    top,
                    height,
                    is_selected: state.is_selected,
                    is_current: state.is_current,
                    is_editing: state.is_editing,
                    details_visible: state.details_visible,
                };
                top += height;
                row
            })
            .collect();

        let header_height = self.settings.column_header_height;
        let content = Size::new(
            self.columns.visible_width(&self.settings)
                + if self.vertical_scroll_bar.visible { self.settings.scroll_bar_thickness } else { 0.0 },
            header_height
                + self.display.rows_height
                + if self.horizontal_scroll_bar.visible { self.settings.scroll_bar_thickness } else { 0.0 },
        );
        LayoutSnapshot {
            desired_size: Size::new(
                content.width.min(self.available_size.width),
                content.height.min(self.available_size.height),
            ),
            cells_size: Size::new(self.display.cells_width, self.display.cells_height),
            column_header_height: header_height,
            columns: self.displayed_columns.clone(),
            filler_width: self.columns.filler_width,
            rows,
            horizontal_scroll_bar: self.horizontal_scroll_bar,
            vertical_scroll_bar: self.vertical_scroll_bar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::grid_with;
    use crate::config::ScrollBarVisibility;
    use crate::display::SlotKind;
    use crate::observer::{ObserverEvent, RecordingObserver};
    use crate::{DataGrid, GridSettings, Size};

    #[test]
    fn test_window_covers_viewport() {
        let (mut grid, _list) = grid_with(100);
        let snapshot = grid.layout(Size::new(400.0, 300.0)).unwrap();
        // 300 - 22 header = 278 of cells, 12.6 rows.
        assert_eq!(snapshot.rows.len(), 13);
        assert_eq!(grid.display_data().num_totally_displayed_scrolling_elements(), 12);
        assert_eq!(snapshot.rows[0].kind, SlotKind::Row { row_index: 0 });
        assert!(snapshot.rows[0].is_current && snapshot.rows[0].is_selected);
        assert!(snapshot.vertical_scroll_bar.visible);
        assert!(!snapshot.horizontal_scroll_bar.visible);
        assert_eq!(snapshot.vertical_scroll_bar.maximum, 2200.0 - 278.0);
        assert_eq!(snapshot.cells_size, Size::new(383.0, 278.0));
        assert_eq!(snapshot.filler_width, 83.0);
    }

    #[test]
    fn test_scroll_bars_settle_together() {
        // The rows overflow by one pixel, and the vertical bar then leaves
        // too little width for the columns.
        let (mut grid, _list) = grid_with(11);
        let snapshot = grid.layout(Size::new(310.0, 263.0)).unwrap();
        assert!(snapshot.vertical_scroll_bar.visible);
        assert!(snapshot.horizontal_scroll_bar.visible);

        let snapshot = grid.layout(Size::new(600.0, 600.0)).unwrap();
        assert!(!snapshot.vertical_scroll_bar.visible);
        assert!(!snapshot.horizontal_scroll_bar.visible);
        assert_eq!(snapshot.desired_size, Size::new(300.0, 22.0 + 11.0 * 22.0));
    }

    #[test]
    fn test_disabled_axis_never_scrolls() {
        let settings = GridSettings {
            vertical_scroll_bar_visibility: ScrollBarVisibility::Disabled,
            ..GridSettings::default()
        };
        let mut grid = DataGrid::with_settings(settings).unwrap();
        grid.set_items_source(Some(super::super::test_support::people(100))).unwrap();
        let snapshot = grid.layout(Size::new(400.0, 300.0)).unwrap();
        assert!(!snapshot.vertical_scroll_bar.visible);
        grid.set_vertical_offset(500.0);
        assert_eq!(grid.display_data().vertical_offset(), 0.0);
    }

    #[test]
    fn test_frozen_columns_ignore_horizontal_offset() {
        let (mut grid, _list) = grid_with(5);
        for n in 0..2 {
            grid.add_column(crate::Column::unbound(format!("Extra {n}")));
        }
        grid.set_frozen_column_count(2);
        grid.layout(Size::new(250.0, 300.0)).unwrap();
        grid.set_horizontal_offset(10_000.0);
        let snapshot = grid.layout(Size::new(250.0, 300.0)).unwrap();
        assert_eq!(grid.display_data().horizontal_offset(), 500.0 - 250.0);
        let frozen: Vec<_> = snapshot.columns.iter().filter(|c| c.is_frozen).collect();
        assert_eq!(frozen.len(), 2);
        assert_eq!(frozen[0].left, 0.0);
        assert_eq!(frozen[1].left, 100.0);
        assert!(snapshot.columns.iter().filter(|c| !c.is_frozen).all(|c| c.left + c.width > 200.0));
    }

    #[test]
    fn test_offset_change_reaches_observer() {
        let (mut grid, _list) = grid_with(100);
        let observer = RecordingObserver::new();
        grid.set_observer(Box::new(observer.clone()));
        grid.set_vertical_offset(44.0);
        grid.layout(Size::new(400.0, 300.0)).unwrap();
        assert_eq!(
            observer.count(|event| matches!(event, ObserverEvent::ScrollOffsetsChanged { .. })),
            1
        );
        assert_eq!(grid.display_data().first_scrolling_slot(), Some(2));
    }

    #[test]
    fn test_empty_grid_lays_out() {
        let mut grid = DataGrid::new();
        let snapshot = grid.layout(Size::new(200.0, 100.0)).unwrap();
        assert!(snapshot.rows.is_empty());
        assert!(snapshot.columns.is_empty());
        assert_eq!(snapshot.filler_width, 200.0);
        assert_eq!(grid.current_slot(), None);
    }
}
