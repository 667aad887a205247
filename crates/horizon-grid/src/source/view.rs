//! A sortable, groupable collection view over a list of items.

use std::cmp::Ordering;
use std::sync::Arc;

use horizon_grid_core::Signal;
use parking_lot::RwLock;

use super::{
    CollectionChange, CollectionView, CurrentChangingArgs, IndexedSource, ItemsSource,
    SortDescription, SortDirection,
};
use crate::item::{same_item, ItemRef, PropertyDescriptor};
use crate::value::CellValue;

/// One entry of a [`CollectionViewGroup`].
#[derive(Clone)]
pub enum GroupEntry {
    /// A nested group.
    Group(Arc<CollectionViewGroup>),
    /// A leaf item.
    Item(ItemRef),
}

/// A group produced by a [`ListCollectionView`].
///
/// Groups are compared by identity: the grid keeps `Arc` handles and matches
/// them with [`Arc::ptr_eq`].
pub struct CollectionViewGroup {
    name: CellValue,
    entries: Vec<GroupEntry>,
    item_count: usize,
}

impl CollectionViewGroup {
    /// The shared property value of the group's items.
    pub fn name(&self) -> &CellValue {
        &self.name
    }

    /// Direct children, subgroups or items.
    pub fn entries(&self) -> &[GroupEntry] {
        &self.entries
    }

    /// Number of leaf items below this group.
    pub fn item_count(&self) -> usize {
        self.item_count
    }

    /// Whether the children are items rather than subgroups.
    pub fn is_bottom_level(&self) -> bool {
        !matches!(self.entries.first(), Some(GroupEntry::Group(_)))
    }

    /// Leaf items in view order.
    pub fn leaf_items(&self) -> Vec<ItemRef> {
        let mut items = Vec::with_capacity(self.item_count);
        self.collect_leaves(&mut items);
        items
    }

    fn collect_leaves(&self, out: &mut Vec<ItemRef>) {
        for entry in &self.entries {
            match entry {
                GroupEntry::Group(group) => group.collect_leaves(out),
                GroupEntry::Item(item) => out.push(item.clone()),
            }
        }
    }
}

impl std::fmt::Debug for CollectionViewGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionViewGroup")
            .field("name", &self.name)
            .field("item_count", &self.item_count)
            .finish()
    }
}

#[derive(Default)]
struct ViewState {
    sort: Vec<SortDescription>,
    group_by: Vec<String>,
    items: Vec<ItemRef>,
    groups: Vec<Arc<CollectionViewGroup>>,
}

impl ViewState {
    fn is_shaped(&self) -> bool {
        !self.sort.is_empty() || !self.group_by.is_empty()
    }
}

/// A collection view over an owned list.
///
/// Sorting is stable. Grouping partitions the sorted items by property value,
/// in order of first appearance, one level per group description. The
/// flattened view order is a depth-first walk of the group tree.
pub struct ListCollectionView {
    source: RwLock<Vec<ItemRef>>,
    state: RwLock<ViewState>,
    current: RwLock<Option<usize>>,
    changed: Signal<CollectionChange>,
    current_changing: Signal<CurrentChangingArgs>,
    current_changed: Signal<()>,
}

impl ListCollectionView {
    /// A view over `items`, current on the first item.
    pub fn new(items: impl IntoIterator<Item = ItemRef>) -> Self {
        let view = Self {
            source: RwLock::new(items.into_iter().collect()),
            state: RwLock::new(ViewState::default()),
            current: RwLock::new(None),
            changed: Signal::new(),
            current_changing: Signal::new(),
            current_changed: Signal::new(),
        };
        view.rebuild();
        view
    }

    /// Add an item at the end of the source.
    ///
    /// An unshaped view reports an `Add`; a sorted or grouped one resets.
    pub fn add(&self, item: ItemRef) {
        self.source.write().push(item.clone());
        self.rebuild();
        let change = if self.state.read().is_shaped() {
            CollectionChange::Reset
        } else {
            CollectionChange::Add {
                index: self.len() - 1,
                items: vec![item],
            }
        };
        self.changed.emit(change);
    }

    /// Remove an item. Returns whether it was present.
    pub fn remove(&self, item: &ItemRef) -> bool {
        let Some(view_index) = IndexedSource::index_of(self, item) else {
            return false;
        };
        self.source.write().retain(|i| !same_item(i, item));
        let grouped = !self.state.read().group_by.is_empty();
        self.rebuild();
        let change = if grouped {
            CollectionChange::Reset
        } else {
            CollectionChange::Remove {
                index: view_index,
                items: vec![item.clone()],
            }
        };
        self.changed.emit(change);
        true
    }

    /// Re-apply sorting and grouping.
    pub fn refresh(&self) {
        self.rebuild();
        self.changed.emit(CollectionChange::Reset);
    }

    /// Move the current pointer to `item`.
    pub fn move_current_to(&self, item: &ItemRef) -> bool {
        match IndexedSource::index_of(self, item) {
            Some(position) => self.move_current_to_position(Some(position)),
            None => false,
        }
    }

    fn rebuild(&self) {
        let current_item = self.current_item();
        let mut sorted = self.source.read().clone();
        {
            let mut state = self.state.write();
            if !state.sort.is_empty() {
                let sort = state.sort.clone();
                sorted.sort_by(|a, b| compare_items(a, b, &sort));
            }
            if state.group_by.is_empty() {
                state.groups.clear();
                state.items = sorted;
            } else {
                let groups = build_groups(sorted, &state.group_by);
                state.items = groups.iter().flat_map(|g| g.leaf_items()).collect();
                state.groups = groups;
            }
        }
        let position = current_item
            .and_then(|item| IndexedSource::index_of(self, &item))
            .or_else(|| (!self.is_empty()).then_some(0));
        *self.current.write() = position;
        tracing::trace!(
            target: "horizon_grid::data",
            count = self.len(),
            ?position,
            "collection view rebuilt"
        );
    }
}

fn compare_items(a: &ItemRef, b: &ItemRef, sort: &[SortDescription]) -> Ordering {
    for description in sort {
        let ordering = a
            .value(&description.property)
            .sort_cmp(&b.value(&description.property));
        let ordering = match description.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn build_groups(items: Vec<ItemRef>, paths: &[String]) -> Vec<Arc<CollectionViewGroup>> {
    let Some((path, rest)) = paths.split_first() else {
        return Vec::new();
    };
    let mut buckets: Vec<(CellValue, Vec<ItemRef>)> = Vec::new();
    for item in items {
        let key = item.value(path);
        match buckets.iter_mut().find(|(name, _)| *name == key) {
            Some((_, members)) => members.push(item),
            None => buckets.push((key, vec![item])),
        }
    }
    buckets
        .into_iter()
        .map(|(name, members)| {
            let item_count = members.len();
            let entries = if rest.is_empty() {
                members.into_iter().map(GroupEntry::Item).collect()
            } else {
                build_groups(members, rest)
                    .into_iter()
                    .map(GroupEntry::Group)
                    .collect()
            };
            Arc::new(CollectionViewGroup {
                name,
                entries,
                item_count,
            })
        })
        .collect()
}

impl ItemsSource for ListCollectionView {
    fn items(&self) -> Vec<ItemRef> {
        self.state.read().items.clone()
    }

    fn as_list(&self) -> Option<&dyn IndexedSource> {
        Some(self)
    }

    fn as_collection_view(&self) -> Option<&dyn CollectionView> {
        Some(self)
    }

    fn collection_changed(&self) -> Option<&Signal<CollectionChange>> {
        Some(&self.changed)
    }

    fn item_properties(&self) -> Vec<PropertyDescriptor> {
        self.source
            .read()
            .first()
            .map(|item| item.property_descriptors())
            .unwrap_or_default()
    }
}

impl IndexedSource for ListCollectionView {
    fn len(&self) -> usize {
        self.state.read().items.len()
    }

    fn get(&self, index: usize) -> Option<ItemRef> {
        self.state.read().items.get(index).cloned()
    }

    fn index_of(&self, item: &ItemRef) -> Option<usize> {
        self.state.read().items.iter().position(|i| same_item(i, item))
    }
}

impl CollectionView for ListCollectionView {
    fn can_sort(&self) -> bool {
        true
    }

    fn sort_descriptions(&self) -> Vec<SortDescription> {
        self.state.read().sort.clone()
    }

    fn set_sort_descriptions(&self, descriptions: Vec<SortDescription>) {
        self.state.write().sort = descriptions;
        self.refresh();
    }

    fn group_descriptions(&self) -> Vec<String> {
        self.state.read().group_by.clone()
    }

    fn set_group_descriptions(&self, paths: Vec<String>) {
        self.state.write().group_by = paths;
        self.refresh();
    }

    fn groups(&self) -> Vec<Arc<CollectionViewGroup>> {
        self.state.read().groups.clone()
    }

    fn current_position(&self) -> Option<usize> {
        *self.current.read()
    }

    fn move_current_to_position(&self, position: Option<usize>) -> bool {
        if position.is_some_and(|p| p >= self.len()) {
            return false;
        }
        if self.current_position() == position {
            return true;
        }
        let args = CurrentChangingArgs::default();
        self.current_changing.emit(args.clone());
        if args.cancel.is_set() {
            tracing::debug!(target: "horizon_grid::data", ?position, "current change vetoed");
            return false;
        }
        *self.current.write() = position;
        self.current_changed.emit(());
        true
    }

    fn current_changing(&self) -> &Signal<CurrentChangingArgs> {
        &self.current_changing
    }

    fn current_changed(&self) -> &Signal<()> {
        &self.current_changed
    }
}
