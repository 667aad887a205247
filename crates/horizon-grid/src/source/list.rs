//! List-backed sources.

use horizon_grid_core::Signal;
use parking_lot::RwLock;

use super::{CollectionChange, IndexedSource, ItemsSource};
use crate::item::{same_item, ItemRef, PropertyDescriptor};

/// An observable, indexed list of items.
///
/// Every mutation raises [`collection_changed`](ItemsSource::collection_changed)
/// after the internal lock is released, so slots may read the list back.
#[derive(Default)]
pub struct ItemList {
    items: RwLock<Vec<ItemRef>>,
    read_only: bool,
    schema: Option<Vec<PropertyDescriptor>>,
    changed: Signal<CollectionChange>,
}

impl ItemList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// A list holding `items`.
    pub fn from_items(items: impl IntoIterator<Item = ItemRef>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Mark the list read-only for grid edits.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Declare the item properties instead of reading them off the first item.
    pub fn with_item_properties(mut self, properties: Vec<PropertyDescriptor>) -> Self {
        self.schema = Some(properties);
        self
    }

    /// Append an item.
    pub fn push(&self, item: ItemRef) {
        let index = {
            let mut items = self.items.write();
            items.push(item.clone());
            items.len() - 1
        };
        self.changed.emit(CollectionChange::Add {
            index,
            items: vec![item],
        });
    }

    /// Insert an item at `index`, clamped to the list length.
    pub fn insert(&self, index: usize, item: ItemRef) {
        let index = {
            let mut items = self.items.write();
            let index = index.min(items.len());
            items.insert(index, item.clone());
            index
        };
        self.changed.emit(CollectionChange::Add {
            index,
            items: vec![item],
        });
    }

    /// Remove the item at `index`.
    pub fn remove(&self, index: usize) -> Option<ItemRef> {
        let removed = {
            let mut items = self.items.write();
            (index < items.len()).then(|| items.remove(index))
        }?;
        self.changed.emit(CollectionChange::Remove {
            index,
            items: vec![removed.clone()],
        });
        Some(removed)
    }

    /// Remove `item`. Returns whether it was present.
    pub fn remove_item(&self, item: &ItemRef) -> bool {
        let index = self.items.read().iter().position(|i| same_item(i, item));
        index.and_then(|index| self.remove(index)).is_some()
    }

    /// Replace the item at `index`, returning the old one.
    pub fn replace(&self, index: usize, item: ItemRef) -> Option<ItemRef> {
        let old = {
            let mut items = self.items.write();
            let slot = items.get_mut(index)?;
            std::mem::replace(slot, item.clone())
        };
        self.changed.emit(CollectionChange::Replace {
            index,
            old_items: vec![old.clone()],
            new_items: vec![item],
        });
        Some(old)
    }

    /// Replace the whole contents.
    pub fn reset(&self, items: impl IntoIterator<Item = ItemRef>) {
        *self.items.write() = items.into_iter().collect();
        self.changed.emit(CollectionChange::Reset);
    }

    /// Remove every item.
    pub fn clear(&self) {
        self.reset(std::iter::empty());
    }
}

impl ItemsSource for ItemList {
    fn items(&self) -> Vec<ItemRef> {
        self.items.read().clone()
    }

    fn as_list(&self) -> Option<&dyn IndexedSource> {
        Some(self)
    }

    fn collection_changed(&self) -> Option<&Signal<CollectionChange>> {
        Some(&self.changed)
    }

    fn item_properties(&self) -> Vec<PropertyDescriptor> {
        match &self.schema {
            Some(schema) => schema.clone(),
            None => self
                .items
                .read()
                .first()
                .map(|item| item.property_descriptors())
                .unwrap_or_default(),
        }
    }
}

impl IndexedSource for ItemList {
    fn len(&self) -> usize {
        self.items.read().len()
    }

    fn get(&self, index: usize) -> Option<ItemRef> {
        self.items.read().get(index).cloned()
    }

    fn index_of(&self, item: &ItemRef) -> Option<usize> {
        self.items.read().iter().position(|i| same_item(i, item))
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

/// A source that can only be enumerated.
///
/// Counting and lookups against it are linear, and it never notifies changes.
pub struct EnumerableSource {
    items: Vec<ItemRef>,
}

impl EnumerableSource {
    /// Wrap `items`.
    pub fn new(items: impl IntoIterator<Item = ItemRef>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }
}

impl ItemsSource for EnumerableSource {
    fn items(&self) -> Vec<ItemRef> {
        self.items.clone()
    }
}
