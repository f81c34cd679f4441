#![no_std]

//! `FlatMap`: a sorted associative container backed by one contiguous buffer.
//!
//! Entries are stored as `(key, value)` pairs in a single heap-allocated
//! buffer, kept strictly increasing by key. Lookups are binary searches;
//! there is no hashing and no tree.
//!
//! This crate is `no_std` compatible and only needs `alloc`.
//!
//! # Performance Characteristics
//!
//! ## Time Complexity
//! - `find()`, `get()`, `at()`, `contains()`: O(log n) comparisons
//! - `insert()`, `insert_or_assign()`, `erase()`: O(log n) comparisons plus
//!   O(n) entry moves to shift the tail of the buffer
//! - Growth: the capacity doubles when full (1, 2, 4, ...), so appending
//!   is amortized O(1)
//! - Iteration: O(n), sequential over contiguous memory
//!
//! ## Space Complexity
//! - One allocation of `capacity * size_of::<(K, V)>()` bytes
//! - Capacity never shrinks on its own; call `shrink_to_fit()` to release
//!   the unused tail
//!
//! ## `no_std` Compatibility
//!
//! Enable the optional `std` feature for `TryFrom<HashMap>`, and `display`
//! for a `key value` per line `Display` dump:
//! ```toml
//! [dependencies]
//! flatmap = { version = "0.1", features = ["std"] }
//! ```
//!
//! # Map Interface
//!
//! ```
//! # use flatmap::{FlatMap, FlatMapError};
//! let mut map = FlatMap::new();
//!
//! map.insert("bee", 100).unwrap();
//! map.insert("bar", 200).unwrap();
//! map.insert("foo", 300).unwrap();
//!
//! // Iteration follows key order, not insertion order
//! let pairs: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
//! assert_eq!(pairs, [("bar", 200), ("bee", 100), ("foo", 300)]);
//!
//! assert_eq!(map.at(&"bee"), Ok(&100));
//! assert_eq!(map.insert("bee", 1), Err(FlatMapError::DuplicateKey));
//!
//! assert!(map.erase(&"bee"));
//! assert_eq!(map.len(), 2);
//! assert!(!map.contains(&"bee"));
//! ```
//!
//! `get_or_insert_default()` plays the role of an indexing operator that
//! creates missing entries:
//!
//! ```
//! # use flatmap::FlatMap;
//! let mut map: FlatMap<String, i32> = FlatMap::new();
//!
//! *map.get_or_insert_default("x".to_string()).unwrap() = 5;
//! assert_eq!(map.at("x"), Ok(&5));
//! assert_eq!(map["x"], 5);
//! ```
//!
//! # Cursor Interface
//!
//! Cursors are random-access positions that do not borrow the map. Any
//! structural change (insert, erase, reallocation, `clear`) invalidates them,
//! and the map rejects stale cursors instead of reading freed or shifted
//! memory:
//!
//! ```
//! # use flatmap::{FlatMap, FlatMapError};
//! let mut map: FlatMap<i32, &str> = FlatMap::try_from([(1, "one"), (2, "two"), (3, "three")]).unwrap();
//!
//! let cursor = map.find(&2);
//! assert_eq!(map.entry_at(cursor), Ok((&2, &"two")));
//! assert_eq!(map.begin().distance_to(&cursor), Ok(1));
//!
//! let next = map.erase_at(cursor).unwrap();
//! assert_eq!(map.entry_at(next), Ok((&3, &"three")));
//! assert_eq!(map.entry_at(cursor), Err(FlatMapError::InvalidCursor));
//! ```
//!
//! # Bulk Construction
//!
//! Every pair of the source goes through `insert`: the result is sorted
//! whatever the source order, and the first repeated key fails the whole
//! construction with `FlatMapError::DuplicateKey`.
//!
//! ```
//! # use flatmap::{FlatMap, FlatMapError};
//! let map: FlatMap<&str, i32> = FlatMap::try_from(vec![("b", 2), ("a", 1)]).unwrap();
//! assert_eq!(map.keys().copied().collect::<Vec<_>>(), ["a", "b"]);
//!
//! let duplicated: Result<FlatMap<&str, i32>, _> = FlatMap::try_from(vec![("a", 1), ("a", 2)]);
//! assert_eq!(duplicated.err(), Some(FlatMapError::DuplicateKey));
//! ```
//!
//! # Thread Safety
//!
//! `FlatMap` has no internal locking. It is `Send`/`Sync` when its keys and
//! values are; sharing it between threads for mutation needs an external
//! lock around the whole map.

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod cursor;
mod error;
mod iter;
mod map;
mod order;
mod storage;

// Re-export public types and traits
pub use cursor::{Cursor, RevCursor};
pub use error::FlatMapError;
pub use iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
pub use map::FlatMap;
pub use order::{Ascending, Descending, KeyOrder, OrderBy};
