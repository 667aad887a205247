//! Items sources.
//!
//! A grid binds to anything implementing [`ItemsSource`]. The only required
//! capability is enumeration; richer capabilities are discovered through the
//! `as_*` accessors and used when present:
//!
//! - [`IndexedSource`]: `O(1)` count, lookup and (usually) `index_of`
//! - [`CollectionView`]: sorting, grouping and a current-item pointer
//! - change notifications through a [`Signal<CollectionChange>`]
//!
//! Without indexed access the grid falls back to enumerating the source for
//! `count`, `get` and `index_of`. Without change notifications the grid only
//! reflects the source as it was when assigned.

mod list;
mod view;

pub use list::{EnumerableSource, ItemList};
pub use view::{CollectionViewGroup, GroupEntry, ListCollectionView};

use std::fmt;
use std::sync::Arc;

use horizon_grid_core::Signal;
use serde::{Deserialize, Serialize};

use crate::events::Cancel;
use crate::item::{same_item, ItemRef, PropertyDescriptor};

/// A structural change to an items source.
#[derive(Clone)]
pub enum CollectionChange {
    /// Items were inserted starting at `index`.
    Add { index: usize, items: Vec<ItemRef> },
    /// Items were removed starting at `index`.
    Remove { index: usize, items: Vec<ItemRef> },
    /// Items at `index` were replaced. Not supported by the grid.
    Replace {
        index: usize,
        old_items: Vec<ItemRef>,
        new_items: Vec<ItemRef>,
    },
    /// The source changed too much to describe incrementally.
    Reset,
}

impl CollectionChange {
    /// Short action name, used in logs and errors.
    pub fn action(&self) -> &'static str {
        match self {
            CollectionChange::Add { .. } => "Add",
            CollectionChange::Remove { .. } => "Remove",
            CollectionChange::Replace { .. } => "Replace",
            CollectionChange::Reset => "Reset",
        }
    }
}

impl fmt::Debug for CollectionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionChange::Add { index, items } | CollectionChange::Remove { index, items } => f
                .debug_struct(self.action())
                .field("index", index)
                .field("count", &items.len())
                .finish(),
            CollectionChange::Replace { index, new_items, .. } => f
                .debug_struct("Replace")
                .field("index", index)
                .field("count", &new_items.len())
                .finish(),
            CollectionChange::Reset => f.write_str("Reset"),
        }
    }
}

/// Sort direction of a [`SortDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Sort by one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescription {
    /// Property name.
    pub property: String,
    /// Direction.
    pub direction: SortDirection,
}

impl SortDescription {
    /// Ascending sort on `property`.
    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort on `property`.
    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Arguments of a collection view's `current_changing` signal.
#[derive(Debug, Clone, Default)]
pub struct CurrentChangingArgs {
    /// Set to veto the move.
    pub cancel: Cancel,
}

/// The minimum capability of a bindable source: enumeration.
pub trait ItemsSource: Send + Sync {
    /// Snapshot of the items in source order.
    fn items(&self) -> Vec<ItemRef>;

    /// Indexed access, if supported.
    fn as_list(&self) -> Option<&dyn IndexedSource> {
        None
    }

    /// Sorting, grouping and currency, if supported.
    fn as_collection_view(&self) -> Option<&dyn CollectionView> {
        None
    }

    /// Structural change notifications, if supported.
    fn collection_changed(&self) -> Option<&Signal<CollectionChange>> {
        None
    }

    /// Properties of the item type, used to generate columns.
    ///
    /// The default inspects the first item.
    fn item_properties(&self) -> Vec<PropertyDescriptor> {
        self.items()
            .first()
            .map(|item| item.property_descriptors())
            .unwrap_or_default()
    }
}

/// Indexed access to a source.
pub trait IndexedSource: Send + Sync {
    /// Number of items.
    fn len(&self) -> usize;

    /// Item at `index`, `None` when out of range.
    fn get(&self, index: usize) -> Option<ItemRef>;

    /// Whether the source is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Position of `item`; linear scan by default.
    fn index_of(&self, item: &ItemRef) -> Option<usize> {
        (0..self.len()).find(|&index| {
            self.get(index)
                .is_some_and(|candidate| same_item(&candidate, item))
        })
    }

    /// Whether items may be edited through the grid.
    fn is_read_only(&self) -> bool {
        false
    }
}

/// A sortable, groupable view with a current-item pointer.
pub trait CollectionView: IndexedSource {
    /// Whether sort descriptions are honoured.
    fn can_sort(&self) -> bool;

    /// Active sort descriptions.
    fn sort_descriptions(&self) -> Vec<SortDescription>;

    /// Replace the sort descriptions; the view resets.
    fn set_sort_descriptions(&self, descriptions: Vec<SortDescription>);

    /// Property paths items are grouped by, outermost first.
    fn group_descriptions(&self) -> Vec<String>;

    /// Replace the group descriptions; the view resets.
    fn set_group_descriptions(&self, paths: Vec<String>);

    /// Top-level groups. Empty when the view is not grouped.
    fn groups(&self) -> Vec<Arc<CollectionViewGroup>>;

    /// Position of the current item.
    fn current_position(&self) -> Option<usize>;

    /// The current item.
    fn current_item(&self) -> Option<ItemRef> {
        self.current_position().and_then(|position| self.get(position))
    }

    /// Move the current pointer. Returns `false` if a `current_changing`
    /// handler vetoed the move.
    fn move_current_to_position(&self, position: Option<usize>) -> bool;

    /// Raised before the current item changes; cancelable.
    fn current_changing(&self) -> &Signal<CurrentChangingArgs>;

    /// Raised after the current item changed.
    fn current_changed(&self) -> &Signal<()>;

    /// Whether an item edit is pending in the view.
    fn is_editing_item(&self) -> bool {
        false
    }
}
