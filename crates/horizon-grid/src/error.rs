//! Error types for the grid engine.
//!
//! Only misuse escalates to a [`GridError`]: invalid property values, wrong
//! ownership, or structural notifications the grid cannot reconcile. Edit
//! transactions report failure through `bool` returns, and out-of-range
//! navigation is a silent no-op.

/// Result type alias for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;

/// Errors raised by the grid engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    /// A numeric property was set outside its allowed range.
    #[error("{name} must be between {min} and {max}, got {value}")]
    ValueOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A property value was rejected for a non-numeric reason.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },

    /// The column index does not address a column of this grid.
    #[error("Column index {index} is out of bounds (column count {count})")]
    ColumnOutOfBounds { index: usize, count: usize },

    /// The item is not contained in the items source.
    #[error("The item is not contained in the items source")]
    ItemNotInSource,

    /// A structural change arrived while rows were being loaded or unloaded.
    #[error("Items cannot be added, removed or reset while rows are loading or unloading")]
    CannotChangeItemsWhenLoadingRows,

    /// The operation is not supported.
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// The selected items list cannot be changed in single selection mode.
    #[error("The selected items cannot be changed when the selection mode is Single")]
    SelectionModeIsSingle,

    /// An operation required an items source.
    #[error("No items source is assigned")]
    NoItemsSource,

    /// The current column cannot be hidden.
    #[error("The current column cannot be collapsed")]
    ColumnCannotBeCollapsed,

    /// Settings could not be parsed or serialized.
    #[error("Settings error: {0}")]
    Settings(String),
}

impl GridError {
    /// Create a range error.
    pub fn out_of_range(name: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::ValueOutOfRange {
            name,
            value,
            min,
            max,
        }
    }

    /// Create a value error.
    pub fn invalid_value(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name,
            reason: reason.into(),
        }
    }

    /// Create a not-supported error.
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported(operation.into())
    }

    /// Create a settings error.
    pub fn settings(message: impl std::fmt::Display) -> Self {
        Self::Settings(message.to_string())
    }
}
