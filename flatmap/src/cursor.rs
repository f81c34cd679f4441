use core::cmp::Ordering;
use core::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use crate::error::FlatMapError;

static NEXT_STAMP: AtomicUsize = AtomicUsize::new(1);

/// Draws a stamp no other map state has used.
pub(crate) fn fresh_stamp() -> usize {
    NEXT_STAMP.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Random-access position in the live range of a `FlatMap`.
///
/// A cursor does not borrow the map. It remembers which map it came from and
/// the state the map was in; any insert, erase, reallocation or `clear` makes
/// every previously issued cursor invalid, and the map rejects it with
/// `FlatMapError::InvalidCursor`.
///
/// Positions run from `0` (first entry) to `len` (the end marker). Moving
/// outside that range fails with `FlatMapError::OutOfRange`.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    stamp: usize,
    position: usize,
    len: usize,
}

impl Cursor {
    pub(crate) fn new(stamp: usize, position: usize, len: usize) -> Self {
        debug_assert!(position <= len);
        Self {
            stamp,
            position,
            len,
        }
    }

    pub(crate) fn stamp(&self) -> usize {
        self.stamp
    }

    /// Index of the entry this cursor points at.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn is_begin(&self) -> bool {
        self.position == 0
    }

    /// `true` for the one-past-the-last position, which has no entry.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.position == self.len
    }

    /// Moves the cursor by `delta` positions.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfRange` if the target is before the first
    /// entry or after the end marker. `index` is the target, or the current
    /// position when the target would be negative.
    pub fn offset(self, delta: isize) -> Result<Self, FlatMapError> {
        let target = self
            .position
            .checked_add_signed(delta)
            .ok_or(FlatMapError::OutOfRange {
                index: self.position,
                length: self.len,
            })?;
        if target > self.len {
            return Err(FlatMapError::OutOfRange {
                index: target,
                length: self.len,
            });
        }
        Ok(Self {
            position: target,
            ..self
        })
    }

    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfRange` when already at the end marker.
    pub fn step_forward(self) -> Result<Self, FlatMapError> {
        self.offset(1)
    }

    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfRange` when already at the first position.
    pub fn step_back(self) -> Result<Self, FlatMapError> {
        self.offset(-1)
    }

    /// Signed number of steps from `self` to `other`.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::InvalidCursor` if the cursors come from different
    /// maps or from different states of the same map.
    #[allow(clippy::cast_possible_wrap)]
    pub fn distance_to(&self, other: &Cursor) -> Result<isize, FlatMapError> {
        if self.stamp != other.stamp {
            return Err(FlatMapError::InvalidCursor);
        }
        Ok(other.position as isize - self.position as isize)
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.stamp == other.stamp && self.position == other.position
    }
}

impl Eq for Cursor {}

/// Cursors are ordered by position; cursors of different map states are
/// unordered.
impl PartialOrd for Cursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.stamp == other.stamp {
            Some(self.position.cmp(&other.position))
        } else {
            None
        }
    }
}

/// Cursor walking the live range from the last entry towards the first.
///
/// Wraps a forward cursor one past the entry it designates: `rbegin` wraps
/// `end`, `rend` wraps `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevCursor {
    base: Cursor,
}

impl RevCursor {
    pub(crate) fn new(base: Cursor) -> Self {
        Self { base }
    }

    /// The underlying forward cursor, one past the designated entry.
    #[must_use]
    pub fn base(&self) -> Cursor {
        self.base
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.base.is_begin()
    }

    /// Forward cursor to the designated entry.
    ///
    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfRange` at the reverse end.
    pub fn current(&self) -> Result<Cursor, FlatMapError> {
        self.base.step_back()
    }

    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfRange` if the move leaves the live range.
    pub fn offset(self, delta: isize) -> Result<Self, FlatMapError> {
        let delta = delta.checked_neg().ok_or(FlatMapError::OutOfRange {
            index: self.base.position,
            length: self.base.len,
        })?;
        Ok(Self::new(self.base.offset(delta)?))
    }

    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfRange` at the reverse end.
    pub fn step_forward(self) -> Result<Self, FlatMapError> {
        self.offset(1)
    }

    /// # Errors
    ///
    /// Returns `FlatMapError::OutOfRange` at the reverse beginning.
    pub fn step_back(self) -> Result<Self, FlatMapError> {
        self.offset(-1)
    }
}

impl PartialOrd for RevCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        other.base.partial_cmp(&self.base)
    }
}
