//! Millisecond time ranges for statement and timeline arithmetic.
//!
//! A [`TimeRange`] is a closed interval `[start, end]` of i64 milliseconds.
//! Ranges where `start > end` are *invalid* and act as the "fully deleted"
//! sentinel: imposing a timeline onto a range that lies entirely inside
//! deleted time yields an invalid range, which callers test with
//! [`TimeRange::is_valid`].

use core::cmp::Ordering;
use core::fmt;

/// Closed `[start, end]` interval in milliseconds.
///
/// Immutable value type. All arithmetic returns new ranges; none of the
/// operations allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeRange {
    start: i64,
    end: i64,
}

impl TimeRange {
    /// Create a range from inclusive endpoints. `start > end` is allowed and
    /// produces an invalid (empty) range.
    #[must_use]
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Create a range covering `len` milliseconds starting at `start`.
    #[must_use]
    pub const fn from_len(start: i64, len: i64) -> Self {
        Self {
            start,
            end: start + len - 1,
        }
    }

    /// The canonical invalid range.
    #[must_use]
    pub const fn empty() -> Self {
        Self { start: 0, end: -1 }
    }

    #[must_use]
    pub const fn start(&self) -> i64 {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> i64 {
        self.end
    }

    /// Number of milliseconds covered; zero or negative for invalid ranges.
    #[must_use]
    pub const fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    /// Whether the range covers at least one millisecond.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.start <= self.end
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.is_valid()
    }

    /// Whether the two ranges share at least one millisecond.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        Self::intersection_len_of(*self, *other) > 0
    }

    /// Whether `other` lies entirely inside this range.
    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether `ms` lies inside this range.
    #[must_use]
    pub const fn contains_ms(&self, ms: i64) -> bool {
        self.start <= ms && ms <= self.end
    }

    /// Length of the intersection of `a` and `b`, zero when disjoint.
    /// Commutative.
    #[must_use]
    pub const fn intersection_len_of(a: Self, b: Self) -> i64 {
        let lo = if a.start > b.start { a.start } else { b.start };
        let hi = if a.end < b.end { a.end } else { b.end };
        let len = hi - lo + 1;
        if len > 0 {
            len
        } else {
            0
        }
    }

    /// Range translated by `delta` milliseconds.
    #[must_use]
    pub const fn shift(&self, delta: i64) -> Self {
        Self {
            start: self.start + delta,
            end: self.end + delta,
        }
    }

    /// Range with the end moved by `delta`, start untouched.
    #[must_use]
    pub const fn stretch_right(&self, delta: i64) -> Self {
        Self {
            start: self.start,
            end: self.end + delta,
        }
    }

    /// Sort, then coalesce every pair where `next.start <= prev.end + 1`.
    ///
    /// Idempotent. The result is sorted, pairwise disjoint, and no two
    /// neighbours touch or are separated by less than one millisecond.
    #[must_use]
    pub fn merge_adjacent(mut ranges: Vec<Self>) -> Vec<Self> {
        ranges.sort_unstable();
        let mut merged: Vec<Self> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(prev) if range.start <= prev.end + 1 => {
                    if range.end > prev.end {
                        prev.end = range.end;
                    }
                }
                _ => merged.push(range),
            }
        }
        merged
    }
}

impl PartialOrd for TimeRange {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeRange {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then(self.end.cmp(&other.end))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}ms, {}ms]", self.start, self.end)
    }
}
