//! A sequence that keeps itself sorted and duplicate-free.
//!
//! [`SortedContainer`] behaves like a `Vec` with two differences:
//!
//! - inserting a value equal (`==`) to one already present is a no-op, and
//! - after every mutating call the contents are ordered by the container's
//!   [`Comparator`], so index-based reads observe sorted order rather than
//!   insertion order.
//!
//! Sorting is stable: values the comparator considers equal keep their
//! relative insertion order.

use std::cmp::Ordering;
use std::ops::{Bound, RangeBounds};

/// Total order over `T` used by a [`SortedContainer`].
pub trait Comparator<T> {
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Orders values by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<T: Ord> Comparator<T> for NaturalOrder {
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

/// Ordered, duplicate-free sequence.
#[derive(Debug, Clone)]
pub struct SortedContainer<T, C = NaturalOrder> {
    items: Vec<T>,
    comparator: C,
}

impl<T: PartialEq, C: Comparator<T> + Default> SortedContainer<T, C> {
    /// Create an empty container using the comparator's default value.
    pub fn new() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<T: PartialEq, C: Comparator<T> + Default> Default for SortedContainer<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq, C: Comparator<T>> SortedContainer<T, C> {
    /// Create an empty container ordered by `comparator`.
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            items: Vec::new(),
            comparator,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item at `index` in sorted order.
    pub fn at(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// Smallest item.
    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    /// Largest item.
    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Iterate in sorted order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// The sorted contents as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// A sub-slice of the sorted contents.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> &[T] {
        let (start, end) = self.bounds(range);
        &self.items[start..end]
    }

    /// Whether an equal item is present.
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Index of the first item equal to `item`.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|x| x == item)
    }

    /// First item matching `predicate`.
    pub fn find(&self, predicate: impl FnMut(&&T) -> bool) -> Option<&T> {
        self.items.iter().find(predicate)
    }

    /// Index of the first item matching `predicate`.
    pub fn position(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.items.iter().position(predicate)
    }

    /// Consume the container, returning the sorted items.
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert one item at its sorted position.
    ///
    /// Returns `false` (and drops `item`) if an equal item is already present.
    pub fn push(&mut self, item: T) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        let cmp = &self.comparator;
        let index = self
            .items
            .partition_point(|x| cmp.compare(x, &item) != Ordering::Greater);
        self.items.insert(index, item);
        true
    }

    /// Append many items, dropping duplicates. Returns the new length.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) -> usize {
        for item in items {
            if !self.items.contains(&item) {
                self.items.push(item);
            }
        }
        self.sort();
        self.items.len()
    }

    /// Prepend many items, dropping duplicates. Returns the new length.
    ///
    /// Differs from [`extend`](Self::extend) only in how ties under the
    /// comparator are broken: prepended items sort before equal-ranked ones.
    pub fn unshift(&mut self, items: impl IntoIterator<Item = T>) -> usize {
        let mut unique: Vec<T> = Vec::new();
        for item in items {
            if !self.items.contains(&item) && !unique.contains(&item) {
                unique.push(item);
            }
        }
        unique.append(&mut self.items);
        self.items = unique;
        self.sort();
        self.items.len()
    }

    /// Remove and return the largest item.
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Remove and return the smallest item.
    pub fn shift(&mut self) -> Option<T> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    /// Remove the item at `index`.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Remove `delete_count` items starting at `start`, then insert `items`.
    ///
    /// Returns the removed items. Inserted items end up at their sorted
    /// positions, not at `start`.
    pub fn splice(
        &mut self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = T>,
    ) -> Vec<T> {
        let start = start.min(self.items.len());
        let end = start.saturating_add(delete_count).min(self.items.len());
        let removed: Vec<T> = self.items.drain(start..end).collect();
        self.extend(items);
        removed
    }

    /// Remove and return the items in `range`.
    pub fn drain(&mut self, range: impl RangeBounds<usize>) -> Vec<T> {
        let (start, end) = self.bounds(range);
        self.items.drain(start..end).collect()
    }

    /// Keep only the items matching `predicate`.
    pub fn retain(&mut self, predicate: impl FnMut(&T) -> bool) {
        self.items.retain(predicate);
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Overwrite `range` with clones of `value`, then re-sort and deduplicate.
    pub fn fill(&mut self, value: T, range: impl RangeBounds<usize>)
    where
        T: Clone,
    {
        let (start, end) = self.bounds(range);
        for slot in &mut self.items[start..end] {
            *slot = value.clone();
        }
        self.dedup();
        self.sort();
    }

    /// Copy the items in `src` over the items starting at `dest`, then
    /// re-sort and deduplicate.
    pub fn copy_within(&mut self, src: impl RangeBounds<usize>, dest: usize)
    where
        T: Clone,
    {
        let (start, end) = self.bounds(src);
        let len = self.items.len();
        let copied: Vec<T> = self.items[start..end]
            .iter()
            .take(len.saturating_sub(dest))
            .cloned()
            .collect();
        for (offset, item) in copied.into_iter().enumerate() {
            self.items[dest + offset] = item;
        }
        self.dedup();
        self.sort();
    }

    fn sort(&mut self) {
        let cmp = &self.comparator;
        self.items.sort_by(|a, b| cmp.compare(a, b));
    }

    /// Keep the first occurrence of every value.
    fn dedup(&mut self) {
        let mut unique: Vec<T> = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        self.items = unique;
    }

    fn bounds(&self, range: impl RangeBounds<usize>) -> (usize, usize) {
        let len = self.items.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        };
        let end = end.min(len);
        (start.min(end), end)
    }
}

impl<'a, T, C> IntoIterator for &'a SortedContainer<T, C> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: PartialEq, C: Comparator<T> + Default> FromIterator<T> for SortedContainer<T, C> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut container = Self::new();
        container.extend(iter);
        container
    }
}
