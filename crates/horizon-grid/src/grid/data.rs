//! Items-source binding, collection changes and generated columns.

use std::sync::Arc;

use horizon_grid_core::logging::{span_names, targets};
use horizon_grid_core::{grid_debug, PerfSpan};

use super::DataGrid;
use crate::columns::Column;
use crate::error::{GridError, Result};
use crate::events::{AutoGeneratingColumnArgs, EditingUnit};
use crate::source::{CollectionChange, ItemsSource, SortDescription};
use crate::value::ValueKind;

impl DataGrid {
    // =========================================================================
    // Binding
    // =========================================================================

    /// The bound source.
    pub fn items_source(&self) -> Option<&Arc<dyn ItemsSource>> {
        self.data.source()
    }

    /// Bind to `source`, or unbind with `None`.
    ///
    /// The open edit is committed, or cancelled when the commit fails. The
    /// selection and the current cell are cleared; the first displayed cell
    /// becomes current on the next layout.
    pub fn set_items_source(&mut self, source: Option<Arc<dyn ItemsSource>>) -> Result<()> {
        if self.data.is_loading_rows() {
            return Err(GridError::CannotChangeItemsWhenLoadingRows);
        }
        if !self.commit_edit(EditingUnit::Row, true) {
            self.cancel_edit_core(EditingUnit::Row, false);
        }
        self.force_clear_editing();
        self.with_suspended(|grid| {
            grid.unload_all_rows();
            grid.selection.update_indexes(&|_| None);
            grid.anchor_slot = None;
            grid.set_current_cell_core(None, None, false, false);
            grid.slots.reset_rows(0);
            grid.data.set_source(source);
            grid.refresh_rows();
        });
        grid_debug!(row_count = self.slots.row_count(), "items source assigned");
        Ok(())
    }

    /// Apply every change the source reported since the last call.
    ///
    /// [`layout`](Self::layout) calls this first; hosts that react to changes
    /// between layouts call it directly. Returns the number of changes
    /// applied. An unsupported change resynchronises the grid with a reset
    /// and is reported as an error.
    ///
    /// A batch holding a reset, or any change to a grouped source, is applied
    /// as a single reset: the source already reflects the whole batch.
    pub fn process_collection_changes(&mut self) -> Result<usize> {
        if self.data.take_rejected() {
            self.data.drain_changes();
            self.refresh_rows();
            return Err(GridError::CannotChangeItemsWhenLoadingRows);
        }
        let changes = self.data.drain_changes();
        let count = changes.len();
        if changes
            .iter()
            .any(|change| matches!(change, CollectionChange::Replace { .. }))
        {
            let err = GridError::not_supported("Replace collection changes");
            tracing::warn!(target: targets::DATA, %err, "resynchronising after unsupported change");
            self.refresh_rows();
            return Err(err);
        }
        let needs_reset = !changes.is_empty()
            && (self.is_grouped()
                || changes
                    .iter()
                    .any(|change| matches!(change, CollectionChange::Reset)));
        if needs_reset {
            tracing::debug!(target: targets::DATA, count, "collection changes applied as a reset");
            self.on_collection_changed(CollectionChange::Reset)?;
        } else {
            for change in changes {
                self.on_collection_changed(change)?;
            }
        }
        if self.data.take_current_changed() {
            self.on_source_current_changed();
        }
        Ok(count)
    }

    /// Apply one structural change of the source.
    ///
    /// Grouped grids treat every change as a reset. `Replace` is not
    /// supported.
    pub fn on_collection_changed(&mut self, change: CollectionChange) -> Result<()> {
        let _span = PerfSpan::new(span_names::COLLECTION_CHANGE);
        if self.data.is_loading_rows() {
            return Err(GridError::CannotChangeItemsWhenLoadingRows);
        }
        tracing::debug!(target: targets::DATA, ?change, "collection changed");
        self.data.apply_to_snapshot(&change);
        let grouped = self.is_grouped();

        match change {
            CollectionChange::Reset => self.refresh_rows(),
            CollectionChange::Add { .. } | CollectionChange::Remove { .. } if grouped => {
                self.refresh_rows()
            }
            CollectionChange::Add { index, items } => {
                for offset in 0..items.len() {
                    self.insert_row(index + offset);
                }
                self.generate_columns_on_first_rows();
            }
            CollectionChange::Remove { index, items } => {
                for item in &items {
                    self.remove_row(index, item);
                }
            }
            CollectionChange::Replace { .. } => {
                self.refresh_rows();
                return Err(GridError::not_supported("Replace collection changes"));
            }
        }
        Ok(())
    }

    fn is_grouped(&self) -> bool {
        self.slots.group_header_count() > 0 || !self.data.groups().is_empty()
    }

    /// Generate columns for a source that gained its first rows.
    ///
    /// Existing generated columns stay put whatever the new items look like.
    fn generate_columns_on_first_rows(&mut self) {
        if !self.settings.auto_generate_columns
            || self.columns.iter().any(|column| column.is_auto_generated())
        {
            return;
        }
        if self.data.properties().is_empty() {
            self.data.refresh_properties();
        }
        self.generate_columns();
    }

    // =========================================================================
    // Sorting and grouping
    // =========================================================================

    pub fn sort_descriptions(&self) -> Vec<SortDescription> {
        self.data.sort_descriptions()
    }

    /// Sort the bound collection view.
    pub fn set_sort_descriptions(&mut self, descriptions: Vec<SortDescription>) -> Result<()> {
        self.ensure_collection_view()?;
        if !self.commit_edit(EditingUnit::Row, true) {
            self.cancel_edit_core(EditingUnit::Row, false);
        }
        if let Some(view) = self.data.collection_view() {
            view.set_sort_descriptions(descriptions);
        }
        self.process_collection_changes().map(|_| ())
    }

    pub fn group_descriptions(&self) -> Vec<String> {
        self.data.group_descriptions()
    }

    /// Group the bound collection view by property paths, outermost first.
    pub fn set_group_descriptions(&mut self, paths: Vec<String>) -> Result<()> {
        self.ensure_collection_view()?;
        if !self.commit_edit(EditingUnit::Row, true) {
            self.cancel_edit_core(EditingUnit::Row, false);
        }
        if let Some(view) = self.data.collection_view() {
            view.set_group_descriptions(paths);
        }
        self.process_collection_changes().map(|_| ())
    }

    fn ensure_collection_view(&self) -> Result<()> {
        if !self.data.has_source() {
            return Err(GridError::NoItemsSource);
        }
        if self.data.collection_view().is_none() {
            return Err(GridError::not_supported("sorting and grouping need a collection view"));
        }
        Ok(())
    }

    // =========================================================================
    // Generated columns
    // =========================================================================

    /// Generate one column per item property.
    pub(crate) fn generate_columns(&mut self) {
        if !self.settings.auto_generate_columns
            || self.columns.iter().any(|column| column.is_auto_generated())
        {
            return;
        }
        let properties = self.data.properties().to_vec();
        for property in properties {
            let args = AutoGeneratingColumnArgs::new(property.clone());
            self.signals.auto_generating_column.emit(args.clone());
            if args.cancel.is_set() {
                tracing::trace!(target: targets::COLUMNS, property = %property.name, "column generation cancelled");
                continue;
            }
            let mut column = match property.kind {
                ValueKind::Bool => Column::check_box(args.header(), property.name.as_str()),
                _ => Column::text(args.header(), property.name.as_str()),
            };
            column.is_auto_generated = true;
            self.add_column(column);
        }
        tracing::debug!(target: targets::COLUMNS, count = self.columns.len(), "columns generated");
    }

    pub(crate) fn remove_auto_generated_columns(&mut self) {
        let generated: Vec<usize> = self
            .columns
            .iter()
            .filter(|column| column.is_auto_generated())
            .map(|column| column.index())
            .collect();
        for index in generated.into_iter().rev() {
            if let Err(err) = self.remove_column(index) {
                tracing::warn!(target: targets::COLUMNS, %err, "failed to remove generated column");
            }
        }
    }
}
