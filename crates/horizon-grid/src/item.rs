//! Bound data items.
//!
//! Rows are backed by [`DataItem`] trait objects shared with the host through
//! [`ItemRef`]. Item identity is reference identity: two `ItemRef`s address the
//! same row item only when they point at the same allocation.
//!
//! Items may optionally support an editable-object protocol
//! ([`EditableObject`]) so that a row edit can be rolled back. Items without
//! it can still be edited and committed, but a row-level cancel is impossible.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::value::{CellValue, ValidationResult, ValueKind};

/// Shared handle to a bound item.
pub type ItemRef = Arc<dyn DataItem>;

/// Whether two handles refer to the same item.
pub fn same_item(a: &ItemRef, b: &ItemRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// [`same_item`] lifted over optional handles.
pub fn same_item_opt(a: Option<&ItemRef>, b: Option<&ItemRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same_item(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Describes one public property of an item type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    /// Property name, used as the column binding path.
    pub name: String,
    /// Value kind of the property.
    pub kind: ValueKind,
    /// Whether the property can be written.
    pub read_only: bool,
}

impl PropertyDescriptor {
    /// A writable property.
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            read_only: false,
        }
    }

    /// A property that cannot be written.
    pub fn read_only(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            read_only: true,
            ..Self::new(name, kind)
        }
    }
}

/// Optional item capability: transactional edits.
pub trait EditableObject {
    /// Snapshot state before an edit.
    fn begin_edit(&self);
    /// Restore the snapshot taken by `begin_edit`.
    fn cancel_edit(&self);
    /// Accept the changes made since `begin_edit`.
    fn end_edit(&self);
}

/// An item that can be shown in a grid row.
pub trait DataItem: Send + Sync + 'static {
    /// The public properties of the item, in declaration order.
    fn property_descriptors(&self) -> Vec<PropertyDescriptor>;

    /// Read a property. Unknown properties read as [`CellValue::None`].
    fn value(&self, property: &str) -> CellValue;

    /// Write a property. An `Err` is a binding-level validation error.
    fn set_value(&self, property: &str, value: CellValue) -> Result<(), String>;

    /// Object-level validation over the whole item.
    fn validate(&self) -> Vec<ValidationResult> {
        Vec::new()
    }

    /// The editable-object capability, if supported.
    fn as_editable(&self) -> Option<&dyn EditableObject> {
        None
    }

    /// Begin an item-level edit. Returns whether the capability is supported.
    fn try_begin_edit(&self) -> bool {
        match self.as_editable() {
            Some(editable) => {
                editable.begin_edit();
                true
            }
            None => false,
        }
    }

    /// Cancel an item-level edit. Returns whether the capability is supported.
    fn try_cancel_edit(&self) -> bool {
        match self.as_editable() {
            Some(editable) => {
                editable.cancel_edit();
                true
            }
            None => false,
        }
    }

    /// End an item-level edit. Returns whether the capability is supported.
    fn try_end_edit(&self) -> bool {
        match self.as_editable() {
            Some(editable) => {
                editable.end_edit();
                true
            }
            None => false,
        }
    }
}

type Validator = Arc<dyn Fn(&Record) -> Vec<ValidationResult> + Send + Sync>;

#[derive(Debug, Clone)]
struct Field {
    descriptor: PropertyDescriptor,
    value: CellValue,
}

/// A property-bag item.
///
/// Records are built with `with_*` methods and converted into an [`ItemRef`]
/// with [`into_item`](Record::into_item).
///
/// ```
/// use horizon_grid::{CellValue, DataItem, Record};
///
/// let person = Record::new()
///     .with("Name", "Ada")
///     .with("Age", 36)
///     .editable()
///     .into_item();
///
/// assert!(person.try_begin_edit());
/// person.set_value("Age", CellValue::from(37)).unwrap();
/// assert!(person.try_cancel_edit());
/// assert_eq!(person.value("Age"), CellValue::Int(36));
/// ```
#[derive(Default)]
pub struct Record {
    fields: RwLock<Vec<Field>>,
    backup: Mutex<Option<Vec<CellValue>>>,
    editable: bool,
    validators: Vec<Validator>,
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("fields", &*self.fields.read())
            .field("editable", &self.editable)
            .finish()
    }
}

impl Record {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a writable field.
    pub fn with(self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        let value = value.into();
        let descriptor = PropertyDescriptor::new(name, value.kind());
        self.with_field(descriptor, value)
    }

    /// Add a read-only field.
    pub fn with_read_only(self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        let value = value.into();
        let descriptor = PropertyDescriptor::read_only(name, value.kind());
        self.with_field(descriptor, value)
    }

    fn with_field(self, descriptor: PropertyDescriptor, value: CellValue) -> Self {
        self.fields.write().push(Field { descriptor, value });
        self
    }

    /// Enable the editable-object capability.
    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    /// Add an object-level validator.
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Record) -> Vec<ValidationResult> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Wrap into a shared item handle.
    pub fn into_item(self) -> ItemRef {
        Arc::new(self)
    }

    /// Read a field.
    pub fn get(&self, name: &str) -> CellValue {
        self.fields
            .read()
            .iter()
            .find(|field| field.descriptor.name == name)
            .map(|field| field.value.clone())
            .unwrap_or_default()
    }

    /// Whether an item-level edit is open.
    pub fn is_editing(&self) -> bool {
        self.backup.lock().is_some()
    }

    fn convert(kind: ValueKind, value: CellValue) -> Result<CellValue, String> {
        let converted = match (kind, value) {
            (_, CellValue::None) => CellValue::None,
            (ValueKind::None, value) => value,
            (ValueKind::String, value) => CellValue::String(value.to_string()),
            (ValueKind::Int, CellValue::Int(n)) => CellValue::Int(n),
            (ValueKind::Int, CellValue::String(text)) => text
                .trim()
                .parse::<i64>()
                .map(CellValue::Int)
                .map_err(|_| format!("Value '{text}' could not be converted."))?,
            (ValueKind::Float, value @ (CellValue::Float(_) | CellValue::Int(_))) => {
                CellValue::Float(value.as_float().unwrap_or_default())
            }
            (ValueKind::Float, CellValue::String(text)) => text
                .trim()
                .parse::<f64>()
                .map(CellValue::Float)
                .map_err(|_| format!("Value '{text}' could not be converted."))?,
            (ValueKind::Bool, CellValue::Bool(b)) => CellValue::Bool(b),
            (ValueKind::Bool, CellValue::String(text)) => text
                .trim()
                .parse::<bool>()
                .map(CellValue::Bool)
                .map_err(|_| format!("Value '{text}' could not be converted."))?,
            (_, value) => return Err(format!("Value '{value}' could not be converted.")),
        };
        Ok(converted)
    }
}

impl DataItem for Record {
    fn property_descriptors(&self) -> Vec<PropertyDescriptor> {
        self.fields
            .read()
            .iter()
            .map(|field| field.descriptor.clone())
            .collect()
    }

    fn value(&self, property: &str) -> CellValue {
        self.get(property)
    }

    fn set_value(&self, property: &str, value: CellValue) -> Result<(), String> {
        let mut fields = self.fields.write();
        let field = fields
            .iter_mut()
            .find(|field| field.descriptor.name == property)
            .ok_or_else(|| format!("Property '{property}' not found."))?;
        if field.descriptor.read_only {
            return Err(format!("Property '{property}' is read-only."));
        }
        field.value = Self::convert(field.descriptor.kind, value)?;
        Ok(())
    }

    fn validate(&self) -> Vec<ValidationResult> {
        self.validators
            .iter()
            .flat_map(|validator| validator(self))
            .collect()
    }

    fn as_editable(&self) -> Option<&dyn EditableObject> {
        if self.editable { Some(self) } else { None }
    }
}

impl EditableObject for Record {
    fn begin_edit(&self) {
        let mut backup = self.backup.lock();
        if backup.is_none() {
            *backup = Some(self.fields.read().iter().map(|f| f.value.clone()).collect());
        }
    }

    fn cancel_edit(&self) {
        if let Some(values) = self.backup.lock().take() {
            for (field, value) in self.fields.write().iter_mut().zip(values) {
                field.value = value;
            }
        }
    }

    fn end_edit(&self) {
        self.backup.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_by_reference() {
        let a = Record::new().with("Name", "x").into_item();
        let b = Record::new().with("Name", "x").into_item();
        assert!(same_item(&a, &a.clone()));
        assert!(!same_item(&a, &b));
        assert!(same_item_opt(None, None));
        assert!(!same_item_opt(Some(&a), None));
    }

    #[test]
    fn test_set_value_converts_text() {
        let record = Record::new().with("Age", 3).with("Score", 1.5).with("Active", false);
        record.set_value("Age", CellValue::from(" 42 ")).unwrap();
        record.set_value("Score", CellValue::from(2)).unwrap();
        record.set_value("Active", CellValue::from("true")).unwrap();
        assert_eq!(record.get("Age"), CellValue::Int(42));
        assert_eq!(record.get("Score"), CellValue::Float(2.0));
        assert_eq!(record.get("Active"), CellValue::Bool(true));
    }

    #[test]
    fn test_set_value_reports_binding_errors() {
        let record = Record::new().with("Age", 3).with_read_only("Id", 1);
        assert!(record.set_value("Age", CellValue::from("abc")).is_err());
        assert!(record.set_value("Id", CellValue::from(2)).is_err());
        assert!(record.set_value("Missing", CellValue::None).is_err());
        assert_eq!(record.get("Age"), CellValue::Int(3));
    }

    #[test]
    fn test_non_editable_record_reports_unsupported() {
        let record = Record::new().with("Name", "x");
        assert!(!record.try_begin_edit());
        assert!(!record.try_cancel_edit());
        assert!(!record.try_end_edit());
    }

    #[test]
    fn test_editable_record_restores_on_cancel() {
        let record = Record::new().with("Name", "before").editable();
        assert!(record.try_begin_edit());
        assert!(record.is_editing());
        record.set_value("Name", CellValue::from("after")).unwrap();
        assert!(record.try_cancel_edit());
        assert_eq!(record.get("Name"), CellValue::from("before"));
        assert!(!record.is_editing());
    }

    #[test]
    fn test_validators_run_on_validate() {
        let record = Record::new().with("Age", -1).with_validator(|r| {
            match r.get("Age").as_int() {
                Some(age) if age < 0 => vec![ValidationResult::new("negative", ["Age"])],
                _ => Vec::new(),
            }
        });
        assert_eq!(record.validate().len(), 1);
        record.set_value("Age", CellValue::from(5)).unwrap();
        assert!(record.validate().is_empty());
    }
}
