use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::mem;
use core::ops::Index;

use crate::cursor::{fresh_stamp, Cursor, RevCursor};
use crate::error::FlatMapError;
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::order::{Ascending, KeyOrder};
use crate::storage::Storage;

/// Sorted associative container backed by one contiguous buffer.
///
/// Entries `(K, V)` are kept strictly increasing by key under the order `O`.
/// Lookups are binary searches; insertion and removal shift the tail of the
/// buffer. When an insertion finds the buffer full, the capacity doubles
/// (starting at 1). Capacity never shrinks unless `shrink_to_fit` is called.
///
/// Keys are never handed out mutably: changing a key in place would break the
/// ordering.
pub struct FlatMap<K, V, O = Ascending> {
    storage: Storage<K, V>,
    order: O,
    stamp: usize,
}

impl<K, V> FlatMap<K, V> {
    /// Creates an empty map in ascending key order. Does not allocate.
    #[must_use]
    pub fn new() -> Self {
        Self::with_order(Ascending)
    }

    /// Creates an empty map with room for `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the buffer cannot be allocated.
    pub fn with_capacity(capacity: usize) -> Result<Self, FlatMapError> {
        Self::with_capacity_and_order(capacity, Ascending)
    }
}

impl<K, V, O> FlatMap<K, V, O> {
    /// Creates an empty map ordered by `order`. Does not allocate.
    pub fn with_order(order: O) -> Self {
        Self {
            storage: Storage::new(),
            order,
            stamp: fresh_stamp(),
        }
    }

    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the buffer cannot be allocated.
    pub fn with_capacity_and_order(capacity: usize, order: O) -> Result<Self, FlatMapError> {
        Ok(Self {
            storage: Storage::allocate(capacity)?,
            order,
            stamp: fresh_stamp(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.len() == 0
    }

    /// Number of entries the buffer holds before it has to grow.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    #[must_use]
    pub fn order(&self) -> &O {
        &self.order
    }

    /// Live entries in key order.
    ///
    /// Useful with slice algorithms such as `partition_point`.
    #[must_use]
    pub fn as_slice(&self) -> &[(K, V)] {
        self.storage.as_slice()
    }

    #[must_use]
    pub fn first(&self) -> Option<(&K, &V)> {
        self.as_slice().first().map(|(k, v)| (k, v))
    }

    #[must_use]
    pub fn last(&self) -> Option<(&K, &V)> {
        self.as_slice().last().map(|(k, v)| (k, v))
    }

    /// Removes every entry. The capacity is kept.
    pub fn clear(&mut self) {
        self.storage.clear();
        self.invalidate_cursors();
    }

    /// Ensures room for `additional` more entries, allocating exactly what is
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the buffer cannot grow; the map
    /// is unchanged.
    pub fn reserve(&mut self, additional: usize) -> Result<(), FlatMapError> {
        let needed = self
            .len()
            .checked_add(additional)
            .ok_or(FlatMapError::OutOfMemory {
                requested: usize::MAX,
            })?;
        if needed > self.capacity() {
            self.reallocate(needed)?;
        }
        Ok(())
    }

    /// Reduces the capacity to the number of live entries.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the smaller buffer cannot be
    /// allocated; the map is unchanged.
    pub fn shrink_to_fit(&mut self) -> Result<(), FlatMapError> {
        if self.capacity() > self.len() {
            self.reallocate(self.len())?;
        }
        Ok(())
    }

    /// Moves the contents out, leaving `self` empty with no buffer.
    #[must_use]
    pub fn take(&mut self) -> Self
    where
        O: Clone,
    {
        let empty = Self::with_order(self.order.clone());
        let mut taken = mem::replace(self, empty);
        taken.invalidate_cursors();
        taken
    }

    /// Deep copy into a buffer sized exactly for the live entries.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the copy cannot be allocated.
    pub fn try_clone(&self) -> Result<Self, FlatMapError>
    where
        K: Clone,
        V: Clone,
        O: Clone,
    {
        let mut storage = Storage::allocate(self.len())?;
        for (key, value) in self.as_slice() {
            storage.push((key.clone(), value.clone()));
        }
        Ok(Self {
            storage,
            order: self.order.clone(),
            stamp: fresh_stamp(),
        })
    }

    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.storage.as_slice())
    }

    /// Iterates from the greatest key to the smallest.
    #[must_use]
    pub fn iter_rev(&self) -> core::iter::Rev<Iter<'_, K, V>> {
        self.iter().rev()
    }

    /// Iterates with mutable access to the values. Keys stay read-only.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.storage.as_mut_slice())
    }

    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    #[must_use]
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// Cursor to the first entry, or the end marker of an empty map.
    #[must_use]
    pub fn begin(&self) -> Cursor {
        self.cursor_at(0)
    }

    /// Cursor one past the last entry.
    #[must_use]
    pub fn end(&self) -> Cursor {
        self.cursor_at(self.len())
    }

    /// Reverse cursor to the last entry.
    #[must_use]
    pub fn rbegin(&self) -> RevCursor {
        RevCursor::new(self.end())
    }

    /// Reverse cursor one before the first entry.
    #[must_use]
    pub fn rend(&self) -> RevCursor {
        RevCursor::new(self.begin())
    }

    /// Entry under `cursor`.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::InvalidCursor` for a stale or foreign cursor and
    /// `FlatMapError::OutOfRange` for the end marker.
    pub fn entry_at(&self, cursor: Cursor) -> Result<(&K, &V), FlatMapError> {
        let index = self.check_entry_cursor(cursor)?;
        let (key, value) = &self.as_slice()[index];
        Ok((key, value))
    }

    /// Mutable value under `cursor`. Does not invalidate cursors.
    ///
    /// # Errors
    ///
    /// Same as `entry_at`.
    pub fn value_at_mut(&mut self, cursor: Cursor) -> Result<&mut V, FlatMapError> {
        let index = self.check_entry_cursor(cursor)?;
        Ok(&mut self.storage.as_mut_slice()[index].1)
    }

    /// Removes the entry under `cursor`.
    ///
    /// Returns a cursor to the entry that followed it, valid for the new state.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::InvalidCursor` for a stale or foreign cursor and
    /// `FlatMapError::OutOfRange` for the end marker; the map is unchanged.
    pub fn erase_at(&mut self, cursor: Cursor) -> Result<Cursor, FlatMapError> {
        let index = self.check_entry_cursor(cursor)?;
        let removed = self.storage.remove_at(index);
        self.invalidate_cursors();
        let next = self.cursor_at(index);
        drop(removed);
        Ok(next)
    }

    /// Removes the entries in `[first, last)`.
    ///
    /// Returns a cursor to the entry that followed the range, valid for the
    /// new state.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::InvalidCursor` for a stale or foreign cursor and
    /// `FlatMapError::OutOfRange` if `first` is after `last`; the map is
    /// unchanged.
    pub fn erase_range(&mut self, first: Cursor, last: Cursor) -> Result<Cursor, FlatMapError> {
        self.check_cursor(first)?;
        self.check_cursor(last)?;
        if first.position() > last.position() {
            return Err(FlatMapError::OutOfRange {
                index: first.position(),
                length: self.len(),
            });
        }
        if first == last {
            return Ok(first);
        }

        self.storage.remove_range(first.position(), last.position());
        self.invalidate_cursors();
        Ok(self.cursor_at(first.position()))
    }

    fn cursor_at(&self, position: usize) -> Cursor {
        Cursor::new(self.stamp, position, self.len())
    }

    fn check_cursor(&self, cursor: Cursor) -> Result<usize, FlatMapError> {
        if cursor.stamp() != self.stamp {
            return Err(FlatMapError::InvalidCursor);
        }
        Ok(cursor.position())
    }

    fn check_entry_cursor(&self, cursor: Cursor) -> Result<usize, FlatMapError> {
        let index = self.check_cursor(cursor)?;
        if index >= self.len() {
            return Err(FlatMapError::OutOfRange {
                index,
                length: self.len(),
            });
        }
        Ok(index)
    }

    fn invalidate_cursors(&mut self) {
        self.stamp = fresh_stamp();
    }

    fn reallocate(&mut self, new_capacity: usize) -> Result<(), FlatMapError> {
        let old_capacity = self.capacity();
        self.storage.relocate(new_capacity)?;
        self.invalidate_cursors();
        log::trace!("flatmap: reallocated {old_capacity} -> {new_capacity} entries");
        Ok(())
    }

    /// Makes room for one more entry, doubling the capacity when full.
    fn grow_for_one(&mut self) -> Result<(), FlatMapError> {
        if !self.storage.is_full() {
            return Ok(());
        }
        let new_capacity = match self.capacity() {
            0 => 1,
            capacity => capacity
                .checked_mul(2)
                .ok_or(FlatMapError::OutOfMemory {
                    requested: usize::MAX,
                })?,
        };
        self.reallocate(new_capacity)
    }

    /// Constructs a new entry at `index`, which must be the insertion point
    /// of `key`.
    fn insert_new(&mut self, index: usize, key: K, value: V) -> Result<&mut V, FlatMapError> {
        self.grow_for_one()?;
        self.storage.insert_at(index, (key, value));
        self.invalidate_cursors();
        Ok(&mut self.storage.as_mut_slice()[index].1)
    }
}

impl<K, V, O: KeyOrder<K>> FlatMap<K, V, O> {
    /// Builds a map from pairs in any order.
    ///
    /// The buffer is reserved from the iterator's size hint and every pair
    /// goes through `insert`.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::DuplicateKey` on the first repeated key and
    /// `FlatMapError::OutOfMemory` if the buffer cannot be allocated.
    pub fn try_from_iter_with_order<I>(pairs: I, order: O) -> Result<Self, FlatMapError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let pairs = pairs.into_iter();
        let mut map = Self::with_capacity_and_order(pairs.size_hint().0, order)?;
        for (key, value) in pairs {
            map.insert(key, value)?;
        }
        Ok(map)
    }

    /// Same as `try_from_iter_with_order` with the default order.
    ///
    /// # Errors
    ///
    /// See `try_from_iter_with_order`.
    pub fn try_from_iter<I>(pairs: I) -> Result<Self, FlatMapError>
    where
        I: IntoIterator<Item = (K, V)>,
        O: Default,
    {
        Self::try_from_iter_with_order(pairs, O::default())
    }

    /// Inserts a new entry and returns its value.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::DuplicateKey` if the key is present, and
    /// `FlatMapError::OutOfMemory` if the buffer cannot grow. The map is
    /// unchanged on error.
    pub fn insert(&mut self, key: K, value: V) -> Result<&mut V, FlatMapError> {
        match self.search(&key) {
            Ok(_) => Err(FlatMapError::DuplicateKey),
            Err(index) => self.insert_new(index, key, value),
        }
    }

    /// Overwrites the value of an existing key, or inserts a new entry.
    ///
    /// Returns the previous value, if any. Overwriting is not a structural
    /// change and keeps cursors valid.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the buffer cannot grow.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> Result<Option<V>, FlatMapError> {
        match self.search(&key) {
            Ok(index) => Ok(Some(mem::replace(
                &mut self.storage.as_mut_slice()[index].1,
                value,
            ))),
            Err(index) => {
                self.insert_new(index, key, value)?;
                Ok(None)
            }
        }
    }

    /// Value of `key`, inserting `V::default()` first if absent.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the buffer cannot grow.
    pub fn get_or_insert_default(&mut self, key: K) -> Result<&mut V, FlatMapError>
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }

    /// Value of `key`, inserting `make()` first if absent.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the buffer cannot grow.
    pub fn get_or_insert_with<F>(&mut self, key: K, make: F) -> Result<&mut V, FlatMapError>
    where
        F: FnOnce() -> V,
    {
        match self.search(&key) {
            Ok(index) => Ok(&mut self.storage.as_mut_slice()[index].1),
            Err(index) => self.insert_new(index, key, make()),
        }
    }

    /// Inserts or overwrites every pair; the last value for a key wins.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the buffer cannot grow. Pairs
    /// consumed before the failure stay in the map.
    pub fn try_extend<I>(&mut self, pairs: I) -> Result<(), FlatMapError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in pairs {
            self.insert_or_assign(key, value)?;
        }
        Ok(())
    }
}

impl<K, V, O> FlatMap<K, V, O> {
    /// Binary search: `Ok(index)` of the equal key, or `Err(insertion point)`.
    fn search<Q>(&self, key: &Q) -> Result<usize, usize>
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        self.as_slice()
            .binary_search_by(|(probe, _)| self.order.compare(probe.borrow(), key))
    }

    /// Cursor to the entry with `key`, or `end()`.
    pub fn find<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        match self.search(key) {
            Ok(index) => self.cursor_at(index),
            Err(_) => self.end(),
        }
    }

    /// Cursor to the first entry whose key is not less than `key`.
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        let index = self
            .as_slice()
            .partition_point(|(probe, _)| self.order.compare(probe.borrow(), key) == Ordering::Less);
        self.cursor_at(index)
    }

    /// Cursor to the first entry whose key is greater than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        let index = self.as_slice().partition_point(|(probe, _)| {
            self.order.compare(probe.borrow(), key) != Ordering::Greater
        });
        self.cursor_at(index)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        self.search(key).is_ok()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        let index = self.search(key).ok()?;
        let (key, value) = &self.as_slice()[index];
        Some((key, value))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        let index = self.search(key).ok()?;
        Some(&mut self.storage.as_mut_slice()[index].1)
    }

    /// Value of `key`. Never inserts.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::KeyNotFound` if the key is absent.
    pub fn at<Q>(&self, key: &Q) -> Result<&V, FlatMapError>
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        self.get(key).ok_or(FlatMapError::KeyNotFound)
    }

    /// Mutable value of `key`. Never inserts.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::KeyNotFound` if the key is absent.
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V, FlatMapError>
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        self.get_mut(key).ok_or(FlatMapError::KeyNotFound)
    }

    /// Removes `key`. Returns `false`, leaving the map untouched, if it is
    /// absent.
    pub fn erase<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        self.remove_entry(key).is_some()
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        O: KeyOrder<Q>,
        Q: ?Sized,
    {
        let index = self.search(key).ok()?;
        let entry = self.storage.remove_at(index);
        self.invalidate_cursors();
        Some(entry)
    }
}

impl<K, V, O: Default> Default for FlatMap<K, V, O> {
    fn default() -> Self {
        Self::with_order(O::default())
    }
}

impl<K: Clone, V: Clone, O: Clone> Clone for FlatMap<K, V, O> {
    /// # Panics
    ///
    /// Panics if the copy cannot be allocated. Use `try_clone` to handle that.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(map) => map,
            Err(err) => panic!("FlatMap::clone: {err}"),
        }
    }
}

impl<K: PartialEq, V: PartialEq, O> PartialEq for FlatMap<K, V, O> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<K: Eq, V: Eq, O> Eq for FlatMap<K, V, O> {}

impl<K: fmt::Debug, V: fmt::Debug, O> fmt::Debug for FlatMap<K, V, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// One `key value` line per entry, in key order.
#[cfg(feature = "display")]
impl<K: fmt::Display, V: fmt::Display, O> fmt::Display for FlatMap<K, V, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in self {
            writeln!(f, "{key} {value}")?;
        }
        Ok(())
    }
}

impl<K, V, O, Q> Index<&Q> for FlatMap<K, V, O>
where
    K: Borrow<Q>,
    O: KeyOrder<Q>,
    Q: ?Sized,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is absent.
    #[allow(clippy::expect_used)]
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in FlatMap")
    }
}

impl<'a, K, V, O> IntoIterator for &'a FlatMap<K, V, O> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, O> IntoIterator for &'a mut FlatMap<K, V, O> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, O> IntoIterator for FlatMap<K, V, O> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.storage)
    }
}

impl<K, V, O: KeyOrder<K> + Default> TryFrom<Vec<(K, V)>> for FlatMap<K, V, O> {
    type Error = FlatMapError;

    fn try_from(pairs: Vec<(K, V)>) -> Result<Self, Self::Error> {
        Self::try_from_iter(pairs)
    }
}

impl<K, V, O: KeyOrder<K> + Default, const N: usize> TryFrom<[(K, V); N]> for FlatMap<K, V, O> {
    type Error = FlatMapError;

    fn try_from(pairs: [(K, V); N]) -> Result<Self, Self::Error> {
        Self::try_from_iter(pairs)
    }
}

impl<K, V, O: KeyOrder<K> + Default> TryFrom<BTreeMap<K, V>> for FlatMap<K, V, O> {
    type Error = FlatMapError;

    fn try_from(source: BTreeMap<K, V>) -> Result<Self, Self::Error> {
        Self::try_from_iter(source)
    }
}

#[cfg(feature = "std")]
impl<K, V, O, S> TryFrom<std::collections::HashMap<K, V, S>> for FlatMap<K, V, O>
where
    O: KeyOrder<K> + Default,
{
    type Error = FlatMapError;

    fn try_from(source: std::collections::HashMap<K, V, S>) -> Result<Self, Self::Error> {
        Self::try_from_iter(source)
    }
}
