use thiserror::Error;

/// Error types for `FlatMap` operations
///
/// Every failing operation leaves the map exactly as it was before the call.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum FlatMapError {
    /// Strict lookup of a key that is not in the map
    #[error("Key not found")]
    KeyNotFound,
    /// Insertion of a key that is already in the map
    #[error("Duplicate key: an entry with an equal key already exists")]
    DuplicateKey,
    /// Cursor position or cursor range outside the live entries
    #[error("Out of range: position {index} is not valid for {length} entries")]
    OutOfRange {
        /// Position that was requested
        index: usize,
        /// Number of live entries at the time of the request
        length: usize,
    },
    /// The allocator could not provide the requested buffer
    #[error("Out of memory: cannot allocate storage for {requested} entries")]
    OutOfMemory {
        /// Capacity, in entries, that was requested
        requested: usize,
    },
    /// Cursor issued by another map, or before the latest structural mutation
    #[error("Invalid cursor: the map was modified or the cursor belongs to another map")]
    InvalidCursor,
}
