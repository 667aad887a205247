//! Row validation and the validation-error cycle.

use std::collections::BTreeSet;

use horizon_grid_core::logging::targets;

use super::{DataGrid, DeferredAction};
use crate::value::ValidationResult;

impl DataGrid {
    /// Validation errors of the editing row.
    pub fn validation_results(&self) -> &[ValidationResult] {
        &self.validation_results
    }

    /// Focus the validation error at `index`.
    ///
    /// The cells it names become the round-robin queue walked by
    /// [`activate_validation_error`](Self::activate_validation_error).
    pub fn select_validation_error(&mut self, index: usize) -> bool {
        let Some(result) = self.validation_results.get(index) else {
            return false;
        };
        let columns = self.columns_concerned_by(std::slice::from_ref(result));
        for &column in &columns {
            self.set_cell_valid(column, false);
        }
        self.error_columns = columns.into_iter().collect();
        self.selected_validation_error = Some(index);
        true
    }

    /// Move to the next offending cell and re-open edit on it.
    ///
    /// The queue is cyclic: each activation takes the front column and puts
    /// it back at the end.
    pub fn activate_validation_error(&mut self) -> bool {
        let Some(slot) = self.editing_row() else {
            return false;
        };
        if self.error_columns.is_empty() {
            let columns = self.columns_concerned_by(&self.validation_results);
            self.error_columns = columns.into_iter().collect();
        }
        let Some(column) = self.error_columns.pop_front() else {
            return false;
        };
        self.error_columns.push_back(column);
        tracing::debug!(target: targets::EDITING, column, slot, "activating validation error");
        if !self.set_current_cell_core(Some(column), Some(slot), true, false) {
            return false;
        }
        self.begin_cell_edit()
    }

    fn columns_concerned_by(&self, results: &[ValidationResult]) -> BTreeSet<usize> {
        self.columns
            .iter()
            .filter(|column| column.is_visible())
            .filter_map(|column| {
                let property = column.binding()?;
                results
                    .iter()
                    .any(|result| result.concerns(property))
                    .then(|| column.index())
            })
            .collect()
    }

    /// Run object-level validation over the editing row.
    ///
    /// Marks the implicated cells, the row and the grid. Returns whether the
    /// item is valid.
    pub(crate) fn validate_editing_row(&mut self, scroll_into_view: bool) -> bool {
        let Some(row) = &self.editing_row else {
            return true;
        };
        let slot = row.slot;
        let results = row.item.validate();
        let invalid = self.columns_concerned_by(&results);

        if results != self.validation_results {
            tracing::debug!(target: targets::EDITING, slot, errors = results.len(), "validation results changed");
            self.validation_results = results;
            self.selected_validation_error = None;
            if scroll_into_view {
                self.deferred.push_back(DeferredAction::ScrollIntoView {
                    column: self.current_column,
                    slot,
                });
            }
            self.invalidate_layout();
        }

        for column in 0..self.columns.len() {
            self.set_cell_valid(column, !invalid.contains(&column));
        }
        let valid = self.validation_results.is_empty();
        self.set_row_valid(valid);
        self.set_grid_valid(valid);
        self.error_columns = invalid.into_iter().collect();
        valid
    }

    /// Re-evaluate validity after a cell value was written.
    pub(crate) fn refresh_validity_after_commit(&mut self, column: usize) {
        self.set_cell_valid(column, true);
        if !self.is_valid || !self.validation_results.is_empty() {
            self.validate_editing_row(false);
        }
    }

    /// Forget every validation error.
    pub(crate) fn reset_validation_status(&mut self) {
        let had_errors = !self.validation_results.is_empty() || !self.is_valid;
        let invalid: Vec<usize> = self
            .editing_row
            .as_ref()
            .map(|row| row.invalid_columns.iter().copied().collect())
            .unwrap_or_default();
        for column in invalid {
            self.set_cell_valid(column, true);
        }
        self.set_row_valid(true);
        self.set_grid_valid(true);
        self.validation_results.clear();
        self.error_columns.clear();
        self.selected_validation_error = None;

        if had_errors {
            // The error list collapses, which can push the editing row out of view.
            if let Some(row) = &self.editing_row {
                self.deferred.push_back(DeferredAction::ScrollIntoView {
                    column: self.current_column,
                    slot: row.slot,
                });
            }
            self.invalidate_layout();
        }
    }
}
