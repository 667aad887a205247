//! Range-compressed index to value mapping.
//!
//! [`IndexToValueTable`] stores a sparse assignment of values to non-negative
//! integer indices as a sorted list of inclusive runs. Adjacent runs holding
//! equal values are merged, so large contiguous selections or collapsed
//! regions cost a single entry.
//!
//! The grid keys every piece of per-slot bookkeeping by slot through this
//! type: group headers, collapsed slots, row-details overrides and the
//! selected-slot set (plus its diff snapshot). Inserting or removing a data
//! row shifts every table with [`insert_index`](IndexToValueTable::insert_index)
//! and [`remove_index`](IndexToValueTable::remove_index) so existing entries
//! stay aligned with their rows.
//!
//! Lookups are `O(log runs)`, ordinal lookups included: each run carries the
//! number of assigned indices before it. Queries outside the assigned range return `None`
//! or `false` rather than panicking.

use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
struct Run<T> {
    lower: usize,
    upper: usize,
    value: T,
}

impl<T> Run<T> {
    fn len(&self) -> usize {
        self.upper - self.lower + 1
    }

    fn contains(&self, index: usize) -> bool {
        self.lower <= index && index <= self.upper
    }
}

/// A sparse, range-compressed ordered mapping from index to value.
///
/// # Example
///
/// ```
/// use horizon_grid::IndexToValueTable;
///
/// let mut selected = IndexToValueTable::new();
/// selected.add_values(2, 4, true);
/// assert!(selected.contains(5));
/// assert_eq!(selected.range_count(), 1);
///
/// // A row inserted at 3 shifts the tail and leaves a gap behind.
/// selected.insert_index(3);
/// assert_eq!(selected.indexes().collect::<Vec<_>>(), vec![2, 4, 5, 6]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IndexToValueTable<T> {
    runs: Vec<Run<T>>,
    /// `before[i]` is the number of assigned indices in `runs[..i]`.
    before: Vec<usize>,
}

impl<T> Default for IndexToValueTable<T> {
    fn default() -> Self {
        Self {
            runs: Vec::new(),
            before: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq> IndexToValueTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Whether no index is assigned.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Number of stored runs.
    pub fn range_count(&self) -> usize {
        self.runs.len()
    }

    /// Number of assigned indices.
    pub fn index_count(&self) -> usize {
        match (self.before.last(), self.runs.last()) {
            (Some(before), Some(run)) => before + run.len(),
            _ => 0,
        }
    }

    /// Whether `index` has a value.
    pub fn contains(&self, index: usize) -> bool {
        self.find_run(index).is_ok()
    }

    /// Whether every index in `[start, end]` has a value.
    ///
    /// Returns `false` for an inverted range.
    pub fn contains_all(&self, start: usize, end: usize) -> bool {
        if start > end {
            return false;
        }
        let Ok(mut position) = self.find_run(start) else {
            return false;
        };
        let mut covered = self.runs[position].upper;
        while covered < end {
            position += 1;
            match self.runs.get(position) {
                Some(run) if run.lower == covered + 1 => covered = run.upper,
                _ => return false,
            }
        }
        true
    }

    /// The value at `index`, if assigned.
    pub fn get_value_at(&self, index: usize) -> Option<&T> {
        self.find_run(index).ok().map(|position| &self.runs[position].value)
    }

    /// Ordinal position of `index` among all assigned indices.
    pub fn index_of(&self, index: usize) -> Option<usize> {
        let position = self.find_run(index).ok()?;
        Some(self.before[position] + index - self.runs[position].lower)
    }

    /// The `n`-th assigned index (inverse of [`index_of`](Self::index_of)).
    pub fn get_nth_index(&self, n: usize) -> Option<usize> {
        let position = self.before.partition_point(|&before| before <= n).checked_sub(1)?;
        let run = &self.runs[position];
        let offset = n - self.before[position];
        (offset < run.len()).then_some(run.lower + offset)
    }

    /// Nearest assigned index strictly below `index`.
    pub fn get_previous_index(&self, index: usize) -> Option<usize> {
        let candidate = index.checked_sub(1)?;
        match self.find_run(candidate) {
            Ok(_) => Some(candidate),
            Err(0) => None,
            Err(position) => Some(self.runs[position - 1].upper),
        }
    }

    /// Nearest assigned index strictly above `index`.
    pub fn get_next_index(&self, index: usize) -> Option<usize> {
        let candidate = index.checked_add(1)?;
        match self.find_run(candidate) {
            Ok(_) => Some(candidate),
            Err(position) => self.runs.get(position).map(|run| run.lower),
        }
    }

    /// Nearest unassigned index strictly below `index`.
    pub fn get_previous_gap(&self, index: usize) -> Option<usize> {
        let mut candidate = index.checked_sub(1)?;
        while let Ok(position) = self.find_run(candidate) {
            candidate = self.runs[position].lower.checked_sub(1)?;
        }
        Some(candidate)
    }

    /// Nearest unassigned index strictly above `index`.
    pub fn get_next_gap(&self, index: usize) -> usize {
        self.first_gap_from(index + 1)
    }

    /// `start` itself if unassigned, otherwise the next gap above it.
    pub fn first_gap_from(&self, start: usize) -> usize {
        let mut candidate = start;
        while let Ok(position) = self.find_run(candidate) {
            candidate = self.runs[position].upper + 1;
        }
        candidate
    }

    /// `start` itself if assigned, otherwise the next assigned index above it.
    pub fn first_index_from(&self, start: usize) -> Option<usize> {
        match self.find_run(start) {
            Ok(_) => Some(start),
            Err(position) => self.runs.get(position).map(|run| run.lower),
        }
    }

    /// Number of assigned indices in `[start, end]`.
    pub fn get_index_count(&self, start: usize, end: usize) -> usize {
        self.count_in_range(start, end, |_| true)
    }

    /// Number of indices in `[start, end]` assigned exactly `value`.
    pub fn get_index_count_with_value(&self, start: usize, end: usize, value: &T) -> usize {
        self.count_in_range(start, end, |candidate| candidate == value)
    }

    /// Lowest assigned index.
    pub fn first_index(&self) -> Option<usize> {
        self.runs.first().map(|run| run.lower)
    }

    /// Highest assigned index.
    pub fn last_index(&self) -> Option<usize> {
        self.runs.last().map(|run| run.upper)
    }

    /// All assigned indices in ascending order.
    pub fn indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.runs.iter().flat_map(|run| run.lower..=run.upper)
    }

    /// Assigned indices at or above `start` in ascending order.
    pub fn indexes_from(&self, start: usize) -> impl Iterator<Item = usize> + '_ {
        self.runs
            .iter()
            .filter(move |run| run.upper >= start)
            .flat_map(move |run| run.lower.max(start)..=run.upper)
    }

    /// `(index, value)` pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.runs
            .iter()
            .flat_map(|run| (run.lower..=run.upper).map(move |index| (index, &run.value)))
    }

    /// Deep copy of the table (used for selection snapshots).
    pub fn copy(&self) -> Self {
        self.clone()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.runs.clear();
        self.before.clear();
    }

    /// Assign `value` to `index`.
    pub fn add_value(&mut self, index: usize, value: T) {
        self.add_values(index, 1, value);
    }

    /// Assign `value` to `[start, start + count)`, merging equal neighbours.
    pub fn add_values(&mut self, start: usize, count: usize, value: T) {
        if count == 0 {
            return;
        }
        self.clear_range(start, count);
        let end = start + count - 1;
        let position = self.runs.partition_point(|run| run.upper < start);
        self.runs.insert(
            position,
            Run {
                lower: start,
                upper: end,
                value,
            },
        );
        self.merge_at(position + 1);
        self.merge_at(position);
        self.recount();
    }

    /// Clear the entry at `index` without shifting.
    pub fn remove_value(&mut self, index: usize) {
        self.remove_values(index, 1);
    }

    /// Clear the entries in `[start, start + count)` without shifting.
    pub fn remove_values(&mut self, start: usize, count: usize) {
        self.clear_range(start, count);
        self.recount();
    }

    fn clear_range(&mut self, start: usize, count: usize) {
        if count == 0 {
            return;
        }
        let end = start + count - 1;
        let mut position = self.runs.partition_point(|run| run.upper < start);
        while position < self.runs.len() && self.runs[position].lower <= end {
            let run = &mut self.runs[position];
            if run.lower < start && run.upper > end {
                let tail = Run {
                    lower: end + 1,
                    upper: run.upper,
                    value: run.value.clone(),
                };
                run.upper = start - 1;
                self.runs.insert(position + 1, tail);
                return;
            } else if run.lower < start {
                run.upper = start - 1;
                position += 1;
            } else if run.upper > end {
                run.lower = end + 1;
                return;
            } else {
                self.runs.remove(position);
            }
        }
    }

    /// Insert an unassigned index at `index`, shifting entries at or above it
    /// up by one.
    pub fn insert_index(&mut self, index: usize) {
        self.insert_indexes(index, 1);
    }

    /// Insert `count` unassigned indices at `index`.
    pub fn insert_indexes(&mut self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        let mut position = self.runs.partition_point(|run| run.upper < index);
        if let Some(run) = self.runs.get_mut(position)
            && run.lower < index
        {
            let tail = Run {
                lower: index,
                upper: run.upper,
                value: run.value.clone(),
            };
            run.upper = index - 1;
            self.runs.insert(position + 1, tail);
            position += 1;
        }
        for run in &mut self.runs[position..] {
            run.lower += count;
            run.upper += count;
        }
        self.recount();
    }

    /// Remove `index`, shifting entries above it down by one.
    pub fn remove_index(&mut self, index: usize) {
        self.remove_indexes(index, 1);
    }

    /// Remove `count` indices starting at `index`.
    pub fn remove_indexes(&mut self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        self.clear_range(index, count);
        let position = self.runs.partition_point(|run| run.upper < index);
        for run in &mut self.runs[position..] {
            run.lower -= count;
            run.upper -= count;
        }
        self.merge_at(position);
        self.recount();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn recount(&mut self) {
        self.before.clear();
        let mut total = 0;
        for run in &self.runs {
            self.before.push(total);
            total += run.len();
        }
    }

    fn find_run(&self, index: usize) -> Result<usize, usize> {
        self.runs.binary_search_by(|run| {
            if run.upper < index {
                Ordering::Less
            } else if run.lower > index {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
    }

    /// Merge `runs[position - 1]` and `runs[position]` when they touch and
    /// hold equal values.
    fn merge_at(&mut self, position: usize) {
        if position == 0 || position >= self.runs.len() {
            return;
        }
        let (left, right) = self.runs.split_at_mut(position);
        let previous = &mut left[position - 1];
        let next = &right[0];
        if previous.upper + 1 == next.lower && previous.value == next.value {
            previous.upper = next.upper;
            self.runs.remove(position);
        }
    }

    fn count_in_range(&self, start: usize, end: usize, matches: impl Fn(&T) -> bool) -> usize {
        if start > end {
            return 0;
        }
        let first = self.runs.partition_point(|run| run.upper < start);
        self.runs[first..]
            .iter()
            .take_while(|run| run.lower <= end)
            .filter(|run| matches(&run.value))
            .map(|run| run.upper.min(end) - run.lower.max(start) + 1)
            .sum()
    }
}
