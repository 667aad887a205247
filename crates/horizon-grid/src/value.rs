//! Cell values and validation results.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A value read from or written to a bound item property.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    /// No value.
    #[default]
    None,
    /// Text.
    String(String),
    /// Integer.
    Int(i64),
    /// Floating point.
    Float(f64),
    /// Boolean.
    Bool(bool),
}

impl CellValue {
    /// Returns `true` if this is `CellValue::None`.
    pub fn is_none(&self) -> bool {
        matches!(self, CellValue::None)
    }

    /// Returns the string value if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CellValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the float value, widening integers.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            CellValue::Float(n) => Some(*n),
            CellValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Returns the boolean value if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            CellValue::None => ValueKind::None,
            CellValue::String(_) => ValueKind::String,
            CellValue::Int(_) => ValueKind::Int,
            CellValue::Float(_) => ValueKind::Float,
            CellValue::Bool(_) => ValueKind::Bool,
        }
    }

    /// Total ordering used by sorting collection views.
    ///
    /// `None` sorts first; values of different kinds order by kind.
    pub fn sort_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::String(a), CellValue::String(b)) => a.cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.kind().cmp(&b.kind()),
            },
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::None => Ok(()),
            CellValue::String(s) => f.write_str(s),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Float(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(value as i64)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// Kind of a [`CellValue`], used to describe item properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Unknown or empty.
    None,
    /// Boolean.
    Bool,
    /// Integer.
    Int,
    /// Floating point.
    Float,
    /// Text.
    String,
}

/// The outcome of an object-level validation check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Human-readable message.
    pub message: String,
    /// Names of the properties the result applies to.
    pub member_names: Vec<String>,
}

impl ValidationResult {
    /// Create a result for the given members.
    pub fn new<I, S>(message: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message: message.into(),
            member_names: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the result names `member`.
    pub fn concerns(&self, member: &str) -> bool {
        self.member_names.iter().any(|name| name == member)
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_mixes_numbers() {
        assert_eq!(CellValue::Int(2).sort_cmp(&CellValue::Float(2.5)), Ordering::Less);
        assert_eq!(CellValue::None.sort_cmp(&CellValue::Int(0)), Ordering::Less);
        assert_eq!(
            CellValue::from("b").sort_cmp(&CellValue::from("a")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(CellValue::from(42).to_string(), "42");
        assert_eq!(CellValue::None.to_string(), "");
    }

    #[test]
    fn test_validation_result_members() {
        let result = ValidationResult::new("Age must be positive", ["Age"]);
        assert!(result.concerns("Age"));
        assert!(!result.concerns("Name"));
    }
}
