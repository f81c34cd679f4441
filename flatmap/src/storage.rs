use alloc::alloc::{alloc, dealloc, Layout};
use core::marker::PhantomData;
use core::ptr::{self, NonNull};
use core::slice;

use crate::error::FlatMapError;

/// Owned, contiguous buffer of `(K, V)` entries.
///
/// Slots `[0, len)` are live; slots `[len, capacity)` are uninitialized memory.
/// The buffer knows nothing about ordering or uniqueness of keys.
///
/// The `unsafe` primitives (`construct_at`, `destroy_range`, `read_at`,
/// `move_range`, `move_range_from`, `set_len`) do not maintain `len`; the safe
/// operations built on top of them do.
pub(crate) struct Storage<K, V> {
    ptr: NonNull<(K, V)>,
    capacity: usize,
    len: usize,
    _marker: PhantomData<(K, V)>,
}

// The buffer owns its entries exactly like `Vec<(K, V)>` does.
#[allow(unsafe_code)]
unsafe impl<K: Send, V: Send> Send for Storage<K, V> {}
#[allow(unsafe_code)]
unsafe impl<K: Sync, V: Sync> Sync for Storage<K, V> {}

impl<K, V> Storage<K, V> {
    /// Empty storage, nothing allocated.
    pub(crate) const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: 0,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Reserves memory for `capacity` entries without constructing any.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the layout overflows or the
    /// allocator returns null.
    #[allow(unsafe_code)]
    pub(crate) fn allocate(capacity: usize) -> Result<Self, FlatMapError> {
        if capacity == 0 {
            return Ok(Self::new());
        }

        let layout = Layout::array::<(K, V)>(capacity).map_err(|_| {
            log::warn!("flatmap: layout for {capacity} entries overflows");
            FlatMapError::OutOfMemory {
                requested: capacity,
            }
        })?;

        let ptr = if layout.size() == 0 {
            NonNull::dangling()
        } else {
            // SAFETY: the layout has a non-zero size.
            let raw = unsafe { alloc(layout) };
            NonNull::new(raw.cast::<(K, V)>()).ok_or_else(|| {
                log::warn!(
                    "flatmap: allocator refused {} bytes for {capacity} entries",
                    layout.size()
                );
                FlatMapError::OutOfMemory {
                    requested: capacity,
                }
            })?
        };

        Ok(Self {
            ptr,
            capacity,
            len: 0,
            _marker: PhantomData,
        })
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub(crate) fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    #[allow(unsafe_code)]
    pub(crate) fn as_slice(&self) -> &[(K, V)] {
        // SAFETY: `[0, len)` are live and the pointer is aligned and non-null.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[allow(unsafe_code)]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [(K, V)] {
        // SAFETY: `[0, len)` are live and uniquely borrowed through `&mut self`.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Constructs an entry in place.
    ///
    /// # Safety
    ///
    /// `index < capacity` and the slot must be uninitialized.
    #[allow(unsafe_code)]
    pub(crate) unsafe fn construct_at(&mut self, index: usize, entry: (K, V)) {
        debug_assert!(index < self.capacity);
        self.ptr.as_ptr().add(index).write(entry);
    }

    /// Drops the entries `[start, end)` in place.
    ///
    /// # Safety
    ///
    /// Every slot in the range must be live, and must not be read or
    /// destroyed again.
    #[allow(unsafe_code)]
    pub(crate) unsafe fn destroy_range(&mut self, start: usize, end: usize) {
        debug_assert!(start <= end && end <= self.capacity);
        let run = ptr::slice_from_raw_parts_mut(self.ptr.as_ptr().add(start), end - start);
        ptr::drop_in_place(run);
    }

    /// Moves the entry out of its slot; the slot becomes logically dead.
    ///
    /// # Safety
    ///
    /// The slot must be live, and must not be read or destroyed again.
    #[allow(unsafe_code)]
    pub(crate) unsafe fn read_at(&self, index: usize) -> (K, V) {
        debug_assert!(index < self.capacity);
        self.ptr.as_ptr().add(index).read()
    }

    /// Relocates `[src_begin, src_end)` to start at `dst` inside this buffer.
    /// The runs may overlap.
    ///
    /// # Safety
    ///
    /// Both runs must lie within `capacity`. Source slots not covered by the
    /// destination run are logically dead afterwards.
    #[allow(unsafe_code)]
    pub(crate) unsafe fn move_range(&mut self, src_begin: usize, src_end: usize, dst: usize) {
        debug_assert!(src_begin <= src_end);
        debug_assert!(src_end <= self.capacity && dst + (src_end - src_begin) <= self.capacity);
        let base = self.ptr.as_ptr();
        ptr::copy(base.add(src_begin), base.add(dst), src_end - src_begin);
    }

    /// Relocates `[src_begin, src_end)` of `src` to start at `dst` in this buffer.
    ///
    /// # Safety
    ///
    /// The source run must be live, the destination run uninitialized and
    /// within `capacity`. The source slots are logically dead afterwards.
    #[allow(unsafe_code)]
    pub(crate) unsafe fn move_range_from(
        &mut self,
        src: &Self,
        src_begin: usize,
        src_end: usize,
        dst: usize,
    ) {
        debug_assert!(src_begin <= src_end && src_end <= src.capacity);
        debug_assert!(dst + (src_end - src_begin) <= self.capacity);
        ptr::copy_nonoverlapping(
            src.ptr.as_ptr().add(src_begin),
            self.ptr.as_ptr().add(dst),
            src_end - src_begin,
        );
    }

    /// # Safety
    ///
    /// `len <= capacity` and exactly the slots `[0, len)` must be live.
    #[allow(unsafe_code)]
    pub(crate) unsafe fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.capacity);
        self.len = len;
    }

    /// Shifts `[index, len)` one slot right and constructs `entry` in the gap.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is full or `index > len`.
    #[allow(unsafe_code)]
    pub(crate) fn insert_at(&mut self, index: usize, entry: (K, V)) {
        assert!(!self.is_full(), "insert into a full buffer");
        assert!(
            index <= self.len,
            "insert position {} beyond length {}",
            index,
            self.len
        );

        // SAFETY: `len < capacity`, so `[index + 1, len + 1)` fits; the gap at
        // `index` is dead after the shift and immediately re-constructed.
        unsafe {
            self.move_range(index, self.len, index + 1);
            self.construct_at(index, entry);
            self.set_len(self.len + 1);
        }
    }

    /// Appends `entry` after the last live slot.
    pub(crate) fn push(&mut self, entry: (K, V)) {
        self.insert_at(self.len, entry);
    }

    /// Moves the entry at `index` out and closes the gap.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    #[allow(unsafe_code)]
    pub(crate) fn remove_at(&mut self, index: usize) -> (K, V) {
        assert!(
            index < self.len,
            "remove position {} beyond length {}",
            index,
            self.len
        );

        // SAFETY: the slot is live; after the read it is dead and the shift
        // overwrites it, leaving `[0, len - 1)` live.
        unsafe {
            let entry = self.read_at(index);
            self.move_range(index + 1, self.len, index);
            self.set_len(self.len - 1);
            entry
        }
    }

    /// Drops `[start, end)` and closes the gap.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or `end > len`.
    #[allow(unsafe_code)]
    pub(crate) fn remove_range(&mut self, start: usize, end: usize) {
        assert!(
            start <= end && end <= self.len,
            "remove range {}..{} beyond length {}",
            start,
            end,
            self.len
        );
        let old_len = self.len;

        // SAFETY: the length is cut to `start` first, so a panicking drop leaks
        // the tail instead of dropping anything twice.
        unsafe {
            self.set_len(start);
            self.destroy_range(start, end);
            self.move_range(end, old_len, start);
            self.set_len(old_len - (end - start));
        }
    }

    /// Drops every live entry. Capacity is kept.
    #[allow(unsafe_code)]
    pub(crate) fn clear(&mut self) {
        let old_len = self.len;
        // SAFETY: see `remove_range`.
        unsafe {
            self.set_len(0);
            self.destroy_range(0, old_len);
        }
    }

    /// Moves every live entry into a fresh buffer of `new_capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfMemory` if the new buffer cannot be
    /// allocated; `self` is untouched in that case.
    ///
    /// # Panics
    ///
    /// Panics if `new_capacity < len`.
    #[allow(unsafe_code)]
    pub(crate) fn relocate(&mut self, new_capacity: usize) -> Result<(), FlatMapError> {
        assert!(
            new_capacity >= self.len,
            "relocation to {} slots would drop live entries",
            new_capacity
        );

        let mut fresh = Self::allocate(new_capacity)?;
        // SAFETY: `fresh` has room for `len` entries; after the copy the old
        // slots are dead, so the old length is zeroed before it is released.
        unsafe {
            fresh.move_range_from(self, 0, self.len, 0);
            fresh.set_len(self.len);
            self.set_len(0);
        }
        core::mem::swap(self, &mut fresh);
        Ok(())
    }

    /// Deallocates the raw region without touching entries.
    #[allow(unsafe_code)]
    fn release(&mut self) {
        debug_assert_eq!(self.len, 0, "release with live entries");
        if self.capacity == 0 {
            return;
        }
        // Zero-sized entries never allocated.
        if let Ok(layout) = Layout::array::<(K, V)>(self.capacity) {
            if layout.size() != 0 {
                // SAFETY: the region was allocated in `allocate` with this layout.
                unsafe { dealloc(self.ptr.as_ptr().cast::<u8>(), layout) };
            }
        }
        self.ptr = NonNull::dangling();
        self.capacity = 0;
    }
}

impl<K, V> Drop for Storage<K, V> {
    fn drop(&mut self) {
        self.clear();
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::string::{String, ToString};
    use core::cell::Cell;

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn keys(storage: &Storage<u32, String>) -> alloc::vec::Vec<u32> {
        storage.as_slice().iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn test_allocate_zero_capacity() {
        let storage: Storage<u32, u32> = Storage::allocate(0).unwrap();
        assert_eq!(storage.capacity(), 0);
        assert_eq!(storage.len(), 0);
        assert!(storage.is_full());
        assert!(storage.as_slice().is_empty());
    }

    #[test]
    fn test_allocate_reserves_without_constructing() {
        let storage: Storage<u32, String> = Storage::allocate(8).unwrap();
        assert_eq!(storage.capacity(), 8);
        assert_eq!(storage.len(), 0);
    }

    #[test]
    fn test_allocate_layout_overflow() {
        let result: Result<Storage<u64, u64>, _> = Storage::allocate(usize::MAX);
        assert_eq!(
            result.err(),
            Some(FlatMapError::OutOfMemory {
                requested: usize::MAX
            })
        );
    }

    #[test]
    fn test_insert_at_shifts_right() {
        let mut storage = Storage::allocate(4).unwrap();
        storage.push((1, "one".to_string()));
        storage.push((3, "three".to_string()));
        storage.insert_at(1, (2, "two".to_string()));
        storage.insert_at(0, (0, "zero".to_string()));

        assert_eq!(keys(&storage), [0, 1, 2, 3]);
        assert_eq!(storage.as_slice()[2].1, "two");
        assert!(storage.is_full());
    }

    #[test]
    #[should_panic(expected = "insert into a full buffer")]
    fn test_insert_at_full_buffer() {
        let mut storage = Storage::allocate(1).unwrap();
        storage.push((1, "one".to_string()));
        storage.push((2, "two".to_string()));
    }

    #[test]
    fn test_remove_at_closes_gap() {
        let mut storage = Storage::allocate(3).unwrap();
        storage.push((1, "one".to_string()));
        storage.push((2, "two".to_string()));
        storage.push((3, "three".to_string()));

        let removed = storage.remove_at(1);
        assert_eq!(removed, (2, "two".to_string()));
        assert_eq!(keys(&storage), [1, 3]);
        assert_eq!(storage.capacity(), 3);
    }

    #[test]
    fn test_remove_range_drops_exactly_the_run() {
        let drops = Rc::new(Cell::new(0));
        let mut storage = Storage::allocate(5).unwrap();
        for k in 0..5u32 {
            storage.push((k, DropCounter(drops.clone())));
        }

        storage.remove_range(1, 4);
        assert_eq!(drops.get(), 3);
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.as_slice()[0].0, 0);
        assert_eq!(storage.as_slice()[1].0, 4);

        storage.remove_range(1, 1);
        assert_eq!(drops.get(), 3);

        drop(storage);
        assert_eq!(drops.get(), 5);
    }

    #[test]
    fn test_relocate_moves_without_dropping() {
        let drops = Rc::new(Cell::new(0));
        let mut storage = Storage::allocate(2).unwrap();
        storage.push((1u32, DropCounter(drops.clone())));
        storage.push((2u32, DropCounter(drops.clone())));

        storage.relocate(4).unwrap();
        assert_eq!(drops.get(), 0);
        assert_eq!(storage.capacity(), 4);
        assert_eq!(storage.len(), 2);

        storage.relocate(2).unwrap();
        assert_eq!(storage.capacity(), 2);

        storage.clear();
        assert_eq!(drops.get(), 2);
        assert_eq!(storage.capacity(), 2);
    }

    #[test]
    fn test_relocate_failure_leaves_buffer_intact() {
        let mut storage: Storage<u64, u64> = Storage::allocate(2).unwrap();
        storage.push((1, 10));

        assert!(storage.relocate(usize::MAX).is_err());
        assert_eq!(storage.capacity(), 2);
        assert_eq!(storage.as_slice(), &[(1, 10)]);
    }

    #[test]
    fn test_drop_destroys_every_live_entry() {
        let drops = Rc::new(Cell::new(0));
        {
            let mut storage = Storage::allocate(8).unwrap();
            for k in 0..3u32 {
                storage.push((k, DropCounter(drops.clone())));
            }
            let removed = storage.remove_at(0);
            drop(removed);
            assert_eq!(drops.get(), 1);
        }
        assert_eq!(drops.get(), 3);
    }

    #[test]
    fn test_zero_sized_entries() {
        let mut storage: Storage<(), ()> = Storage::allocate(4).unwrap();
        storage.push(((), ()));
        storage.push(((), ()));
        storage.relocate(16).unwrap();
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.capacity(), 16);
    }
}
