use core::cmp::Ordering;

/// Strict weak order over keys.
///
/// The order is fixed for the lifetime of a map: entries are never re-sorted,
/// so an implementation must answer consistently for the same pair of keys.
/// Keys for which `compare` returns `Ordering::Equal` are treated as the same
/// key.
pub trait KeyOrder<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Ascending order by `Ord`. The default for `FlatMap`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ascending;

impl<K: Ord + ?Sized> KeyOrder<K> for Ascending {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Descending order by `Ord`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Descending;

impl<K: Ord + ?Sized> KeyOrder<K> for Descending {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        b.cmp(a)
    }
}

/// Order given by a comparison closure.
///
/// ```
/// # use flatmap::{FlatMap, OrderBy};
/// let by_len = OrderBy(|a: &&str, b: &&str| a.len().cmp(&b.len()));
/// let mut map = FlatMap::with_order(by_len);
/// map.insert("three", 3).unwrap();
/// map.insert("one", 1).unwrap();
/// assert_eq!(map.keys().copied().collect::<Vec<_>>(), ["one", "three"]);
/// ```
#[derive(Clone, Copy)]
pub struct OrderBy<F>(pub F);

impl<K: ?Sized, F> KeyOrder<K> for OrderBy<F>
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> core::fmt::Debug for OrderBy<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("OrderBy(..)")
    }
}
