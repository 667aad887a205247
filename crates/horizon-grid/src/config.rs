//! Grid settings.
//!
//! [`GridSettings`] bundles every tunable of a grid so hosts can keep them in
//! a TOML or JSON file. Missing keys take their defaults.
//!
//! ```
//! use horizon_grid::{GridSettings, SelectionMode};
//!
//! let settings = GridSettings::from_toml_str(r#"
//! selection_mode = "single"
//! frozen_column_count = 1
//! row_height = 28.0
//! "#).unwrap();
//!
//! assert_eq!(settings.selection_mode, SelectionMode::Single);
//! assert_eq!(settings.column_width, 100.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Largest row height or column width accepted.
pub const MAX_LENGTH: f64 = 65536.0;
/// Smallest column width accepted.
pub const MIN_COLUMN_WIDTH: f64 = 20.0;
/// Smallest column header height accepted.
pub const MIN_COLUMN_HEADER_HEIGHT: f64 = 4.0;

/// How many rows can be selected at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// One row at a time.
    Single,
    /// Any number of rows, with Shift and Ctrl gestures.
    #[default]
    Extended,
}

/// When row details are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowDetailsVisibilityMode {
    /// Never, unless overridden per row.
    Collapsed,
    /// Always, unless overridden per row.
    Visible,
    /// For selected rows, unless overridden per row.
    #[default]
    VisibleWhenSelected,
}

/// Scroll bar policy of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBarVisibility {
    /// No scroll bar and no scrolling.
    Disabled,
    /// Shown when content overflows.
    #[default]
    Auto,
    /// Never shown, but the axis still scrolls.
    Hidden,
    /// Always shown.
    Visible,
}

impl ScrollBarVisibility {
    pub(crate) fn allows(self) -> bool {
        matches!(self, Self::Auto | Self::Visible)
    }

    pub(crate) fn forces(self) -> bool {
        matches!(self, Self::Visible)
    }

    pub(crate) fn scrolls(self) -> bool {
        self != Self::Disabled
    }
}

/// Every tunable of a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub selection_mode: SelectionMode,
    pub frozen_column_count: usize,
    pub is_read_only: bool,
    pub auto_generate_columns: bool,
    pub can_user_reorder_columns: bool,
    pub row_height: f64,
    pub min_row_height: f64,
    pub column_header_height: f64,
    pub row_group_header_height: f64,
    /// Height of an expanded details section. Zero when rows have no details.
    pub row_details_height: f64,
    pub row_details_visibility_mode: RowDetailsVisibilityMode,
    /// Width given to new columns that do not set one.
    pub column_width: f64,
    pub min_column_width: f64,
    pub max_column_width: f64,
    pub horizontal_scroll_bar_visibility: ScrollBarVisibility,
    pub vertical_scroll_bar_visibility: ScrollBarVisibility,
    pub scroll_bar_thickness: f64,
    /// Pointer travel before a header press turns into a drag.
    pub column_drag_threshold: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            selection_mode: SelectionMode::Extended,
            frozen_column_count: 0,
            is_read_only: false,
            auto_generate_columns: true,
            can_user_reorder_columns: true,
            row_height: 22.0,
            min_row_height: 0.0,
            column_header_height: 22.0,
            row_group_header_height: 22.0,
            row_details_height: 0.0,
            row_details_visibility_mode: RowDetailsVisibilityMode::VisibleWhenSelected,
            column_width: 100.0,
            min_column_width: MIN_COLUMN_WIDTH,
            max_column_width: MAX_LENGTH,
            horizontal_scroll_bar_visibility: ScrollBarVisibility::Auto,
            vertical_scroll_bar_visibility: ScrollBarVisibility::Auto,
            scroll_bar_thickness: 17.0,
            column_drag_threshold: 2.0,
        }
    }
}

impl GridSettings {
    /// Parse settings from TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text).map_err(GridError::settings)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(GridError::settings)
    }

    /// Parse settings from JSON.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(text).map_err(GridError::settings)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize settings to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(GridError::settings)
    }

    /// Check every value against its allowed range.
    pub fn validate(&self) -> Result<()> {
        check_range("MinRowHeight", self.min_row_height, 0.0, MAX_LENGTH)?;
        check_range("RowHeight", self.row_height, self.min_row_height, MAX_LENGTH)?;
        check_range(
            "ColumnHeaderHeight",
            self.column_header_height,
            MIN_COLUMN_HEADER_HEIGHT,
            MAX_LENGTH,
        )?;
        check_range("RowGroupHeaderHeight", self.row_group_header_height, 0.0, MAX_LENGTH)?;
        check_range("RowDetailsHeight", self.row_details_height, 0.0, MAX_LENGTH)?;
        check_range("MinColumnWidth", self.min_column_width, 0.0, MAX_LENGTH)?;
        check_range(
            "MaxColumnWidth",
            self.max_column_width,
            self.min_column_width,
            MAX_LENGTH,
        )?;
        check_range(
            "ColumnWidth",
            self.column_width,
            self.min_column_width,
            self.max_column_width,
        )?;
        check_range("ScrollBarThickness", self.scroll_bar_thickness, 0.0, MAX_LENGTH)?;
        check_range("ColumnDragThreshold", self.column_drag_threshold, 0.0, MAX_LENGTH)?;
        Ok(())
    }
}

pub(crate) fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_nan() || value < min || value > max {
        tracing::warn!(target: "horizon_grid", name, value, "rejected out-of-range setting");
        return Err(GridError::out_of_range(name, value, min, max));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = GridSettings::default();
        settings.validate().unwrap();
        assert_eq!(settings.row_height, 22.0);
        assert_eq!(settings.selection_mode, SelectionMode::Extended);
        assert_eq!(
            settings.row_details_visibility_mode,
            RowDetailsVisibilityMode::VisibleWhenSelected
        );
    }

    #[test]
    fn test_toml_round_trip() {
        let settings = GridSettings {
            frozen_column_count: 2,
            vertical_scroll_bar_visibility: ScrollBarVisibility::Hidden,
            ..GridSettings::default()
        };
        let text = settings.to_toml_string().unwrap();
        assert!(text.contains("vertical_scroll_bar_visibility = \"hidden\""));
        assert_eq!(GridSettings::from_toml_str(&text).unwrap(), settings);
    }

    #[test]
    fn test_json_partial_document() {
        let settings = GridSettings::from_json_str(r#"{ "is_read_only": true }"#).unwrap();
        assert!(settings.is_read_only);
        assert_eq!(settings.column_width, 100.0);
        assert_eq!(GridSettings::from_json_str(&settings.to_json_string().unwrap()).unwrap(), settings);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = GridSettings::from_toml_str("row_height = -1.0").unwrap_err();
        assert!(matches!(err, GridError::ValueOutOfRange { name: "RowHeight", .. }));

        let err = GridSettings::from_toml_str("column_width = 5.0").unwrap_err();
        assert!(matches!(err, GridError::ValueOutOfRange { name: "ColumnWidth", .. }));

        let err = GridSettings::from_toml_str("selection_mode = \"multiple\"").unwrap_err();
        assert!(matches!(err, GridError::Settings(_)));
    }
}
