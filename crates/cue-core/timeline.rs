//! Deleted-time bookkeeping and coordinate remapping.
//!
//! A [`Timeline`] records which spans of the original recording have been
//! deleted, as a sorted list of non-overlapping [`TimeRange`]s with at least
//! one millisecond between neighbours. [`Timeline::impose`] projects a range
//! expressed in original coordinates into the post-deletion coordinate space;
//! a range that falls entirely inside deleted time projects to an invalid
//! range.
//!
//! `impose` keeps a one-slot cache of its forward scan. Callers that query
//! ranges in ascending `start` order (the synchronizers replay statements in
//! id order, which is ascending time order) resume the scan instead of
//! rescanning from the front. The cache is transparent: results are identical
//! with or without it.

use core::cmp::Ordering;

use crate::time::TimeRange;

#[derive(Debug, Clone, Copy)]
struct ImposeCache {
    range: TimeRange,
    index: usize,
    accum: i64,
}

/// Ordered set of deleted time ranges with coordinate projection.
///
/// Not thread-safe; sequential access only. Cross-thread callers serialize
/// through the owning engine's lock.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    deleted: Vec<TimeRange>,
    cache: Option<ImposeCache>,
}

impl Timeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The deleted ranges, sorted ascending, pairwise gap of at least 1ms.
    #[must_use]
    pub fn deleted_ranges(&self) -> &[TimeRange] {
        &self.deleted
    }

    /// Clear all deletions.
    pub fn reset(&mut self) {
        self.deleted.clear();
        self.invalidate();
    }

    /// Replace this timeline's deletions with a copy of `other`'s.
    ///
    /// Used by undo rollback and group merge.
    pub fn load(&mut self, other: &Self) {
        self.deleted.clear();
        self.deleted.extend_from_slice(&other.deleted);
        self.invalidate();
    }

    /// Mark `range` as deleted. Overlapping or adjacent deletions coalesce,
    /// so deleting the same span twice is a no-op.
    pub fn delete(&mut self, range: TimeRange) {
        if !range.is_valid() {
            return;
        }
        self.deleted.push(range);
        self.deleted = TimeRange::merge_adjacent(std::mem::take(&mut self.deleted));
        self.invalidate();
    }

    /// Undelete `range`: any deleted time inside it becomes live again.
    ///
    /// The contiguous run of deleted entries touching `range` is replaced by
    /// at most two remainder pieces, the part before `range.start` and the
    /// part after `range.end`. A no-op when `range` covers no deleted time.
    pub fn add(&mut self, range: TimeRange) {
        if !range.is_valid() {
            return;
        }
        let pos_start = self.probe(TimeRange::from_len(range.start(), 1));
        let pos_end = self.probe(TimeRange::from_len(range.end(), 1));
        let first = match pos_start {
            Ok(i) | Err(i) => i,
        };
        let last = match pos_end {
            Ok(i) => i as isize,
            Err(i) => i as isize - 1,
        };
        if last < first as isize {
            return;
        }
        let last = last as usize;
        let old_start = self.deleted[first].start();
        let old_end = self.deleted[last].end();
        let mut pieces = Vec::with_capacity(2);
        if old_start < range.start() {
            pieces.push(TimeRange::new(old_start, range.start() - 1));
        }
        if old_end > range.end() {
            pieces.push(TimeRange::new(range.end() + 1, old_end));
        }
        self.deleted.splice(first..=last, pieces);
        self.invalidate();
    }

    /// Project `range` from original coordinates into post-deletion
    /// coordinates. Returns an invalid range when `range` lies entirely
    /// inside deleted time.
    ///
    /// Takes `&mut self` because the forward-scan cache is updated on every
    /// call; the projection itself never mutates the deleted set.
    pub fn impose(&mut self, range: TimeRange) -> TimeRange {
        let mut accum = 0i64;
        let mut i = 0usize;
        if let Some(cache) = self.cache {
            if cache.range.start() <= range.start() {
                i = cache.index;
                accum = cache.accum;
            }
        }
        while i < self.deleted.len() && self.deleted[i].end() < range.start() {
            accum += self.deleted[i].len();
            i += 1;
        }
        self.cache = Some(ImposeCache {
            range,
            index: i,
            accum,
        });
        let mut left = range.start() - accum;
        let mut right = range.end() - accum;
        let left_part = TimeRange::new(0, (range.start() - 1).max(0));
        let right_part = TimeRange::new(0, range.end());
        for deleted in &self.deleted[i..] {
            if deleted.start() > range.end() {
                break;
            }
            right -= TimeRange::intersection_len_of(right_part, *deleted);
            left -= TimeRange::intersection_len_of(left_part, *deleted);
        }
        TimeRange::new(left, right)
    }

    /// Binary search by intersection: `Ok` when an entry overlaps `target`,
    /// otherwise the insertion point ordered by start.
    fn probe(&self, target: TimeRange) -> Result<usize, usize> {
        self.deleted.binary_search_by(|entry| {
            if entry.intersects(&target) {
                Ordering::Equal
            } else {
                entry.start().cmp(&target.start())
            }
        })
    }

    // Every mutation funnels through here so no path can leave a stale cache.
    fn invalidate(&mut self) {
        self.cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Ten 10ms deletions at 0, 20, 40, ..., 180.
    fn comb() -> Timeline {
        let mut timeline = Timeline::new();
        for i in 0..10 {
            timeline.delete(TimeRange::from_len(i * 20, 10));
        }
        timeline
    }

    #[test]
    fn comb_setup_has_ten_disjoint_ranges() {
        let timeline = comb();
        assert_eq!(timeline.deleted_ranges().len(), 10);
        assert_eq!(timeline.deleted_ranges()[0], TimeRange::new(0, 9));
        assert_eq!(timeline.deleted_ranges()[9], TimeRange::new(180, 189));
    }

    #[test]
    fn impose_on_empty_timeline_is_identity() {
        let mut timeline = Timeline::new();
        assert_eq!(timeline.impose(TimeRange::new(45, 95)), TimeRange::new(45, 95));
    }

    #[test]
    fn impose_shifts_past_earlier_deletions_and_trims_overlaps() {
        let mut timeline = comb();
        assert_eq!(timeline.impose(TimeRange::new(45, 95)), TimeRange::new(20, 45));
    }

    #[test]
    fn impose_trims_end_overlapping_a_deletion() {
        let mut timeline = Timeline::new();
        timeline.delete(TimeRange::new(40, 60));
        assert_eq!(timeline.impose(TimeRange::new(30, 40)), TimeRange::new(30, 39));
    }

    #[test]
    fn impose_inside_deleted_time_is_invalid() {
        let mut timeline = Timeline::new();
        timeline.delete(TimeRange::new(10, 100));
        assert!(!timeline.impose(TimeRange::new(50, 60)).is_valid());
    }

    #[test]
    fn overlapping_deletions_coalesce_to_one_range() {
        let mut timeline = Timeline::new();
        timeline.delete(TimeRange::new(1, 30));
        timeline.delete(TimeRange::new(0, 50));
        timeline.delete(TimeRange::new(5, 60));
        timeline.delete(TimeRange::new(40, 49));
        assert_eq!(timeline.deleted_ranges(), &[TimeRange::new(0, 60)]);
    }

    #[test]
    fn deleting_the_same_range_twice_is_idempotent() {
        let mut timeline = Timeline::new();
        timeline.delete(TimeRange::new(10, 20));
        timeline.delete(TimeRange::new(10, 20));
        assert_eq!(timeline.deleted_ranges(), &[TimeRange::new(10, 20)]);
    }

    #[test]
    fn adjacent_deletions_merge() {
        let mut timeline = Timeline::new();
        timeline.delete(TimeRange::new(0, 9));
        timeline.delete(TimeRange::new(10, 19));
        assert_eq!(timeline.deleted_ranges(), &[TimeRange::new(0, 19)]);
    }

    #[test]
    fn add_collapses_the_touched_run_keeping_left_remainder() {
        let mut timeline = comb();
        timeline.add(TimeRange::new(25, 89));
        assert_eq!(timeline.deleted_ranges().len(), 7);
        assert_eq!(timeline.deleted_ranges()[1], TimeRange::new(20, 24));
        assert_eq!(timeline.deleted_ranges()[2], TimeRange::new(100, 109));
    }

    #[test]
    fn add_spanning_whole_entries_removes_them() {
        let mut timeline = comb();
        timeline.add(TimeRange::new(10, 59));
        assert_eq!(timeline.deleted_ranges().len(), 8);
        assert_eq!(timeline.deleted_ranges()[0], TimeRange::new(0, 9));
        assert_eq!(timeline.deleted_ranges()[1], TimeRange::new(60, 69));
    }

    #[test]
    fn add_splits_a_single_deletion_into_pieces() {
        let mut timeline = Timeline::new();
        timeline.delete(TimeRange::new(1, 30));
        timeline.add(TimeRange::from_len(5, 5));
        timeline.add(TimeRange::from_len(12, 5));
        assert_eq!(
            timeline.deleted_ranges(),
            &[
                TimeRange::new(1, 4),
                TimeRange::new(10, 11),
                TimeRange::new(17, 30),
            ]
        );
    }

    #[test]
    fn add_outside_deleted_time_is_a_noop() {
        let mut timeline = Timeline::new();
        timeline.delete(TimeRange::new(50, 60));
        timeline.add(TimeRange::new(0, 40));
        assert_eq!(timeline.deleted_ranges(), &[TimeRange::new(50, 60)]);
    }

    #[test]
    fn delete_then_add_restores_projection() {
        let mut timeline = Timeline::new();
        timeline.delete(TimeRange::new(100, 199));
        let before = timeline.impose(TimeRange::new(300, 400));
        timeline.delete(TimeRange::new(500, 549));
        timeline.add(TimeRange::new(500, 549));
        assert_eq!(timeline.impose(TimeRange::new(300, 400)), before);
    }

    #[test]
    fn load_copies_deletions_and_reset_clears_them() {
        let mut source = Timeline::new();
        source.delete(TimeRange::new(0, 9));
        let mut timeline = Timeline::new();
        timeline.load(&source);
        assert_eq!(timeline.deleted_ranges(), source.deleted_ranges());
        timeline.reset();
        assert!(timeline.deleted_ranges().is_empty());
        assert_eq!(timeline.impose(TimeRange::new(0, 9)), TimeRange::new(0, 9));
    }

    #[test]
    fn cache_resume_matches_cold_scan_on_ascending_queries() {
        let mut cached = comb();
        for start in (0..200).step_by(7) {
            let query = TimeRange::from_len(start, 12);
            let mut cold = comb();
            assert_eq!(cached.impose(query), cold.impose(query), "query {query}");
        }
    }

    #[test]
    fn cache_is_skipped_for_non_monotonic_queries() {
        let mut timeline = comb();
        timeline.impose(TimeRange::new(150, 160));
        // Going backwards must not reuse the forward-scan position.
        assert_eq!(timeline.impose(TimeRange::new(45, 95)), TimeRange::new(20, 45));
    }

    #[test]
    fn cache_is_invalidated_by_mutation() {
        let mut timeline = comb();
        timeline.impose(TimeRange::new(150, 160));
        timeline.delete(TimeRange::new(10, 19));
        assert_eq!(timeline.impose(TimeRange::new(150, 160)), TimeRange::new(60, 69));
    }

    #[test]
    fn impose_is_monotonic_in_the_start_offset() {
        let mut timeline = comb();
        let mut prev = timeline.impose(TimeRange::from_len(0, 10));
        for start in 1..200 {
            let next = timeline.impose(TimeRange::from_len(start, 10));
            assert!(next.start() >= prev.start());
            assert!(next.end() >= prev.end());
            prev = next;
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn deletions() -> impl Strategy<Value = Vec<TimeRange>> {
            prop::collection::vec((0i64..500, 1i64..50), 0..12)
                .prop_map(|pairs| {
                    pairs
                        .into_iter()
                        .map(|(start, len)| TimeRange::from_len(start, len))
                        .collect()
                })
        }

        proptest! {
            #[test]
            fn cached_and_cold_impose_agree(
                ranges in deletions(),
                queries in prop::collection::vec((0i64..600, 1i64..80), 1..20),
            ) {
                let mut warm = Timeline::new();
                for range in &ranges {
                    warm.delete(*range);
                }
                let mut sorted = queries.clone();
                sorted.sort_unstable();
                for (start, len) in sorted {
                    let query = TimeRange::from_len(start, len);
                    let mut cold = Timeline::new();
                    for range in &ranges {
                        cold.delete(*range);
                    }
                    prop_assert_eq!(warm.impose(query), cold.impose(query));
                }
            }

            #[test]
            fn deleted_set_stays_sorted_and_gapped(ranges in deletions()) {
                let mut timeline = Timeline::new();
                for range in ranges {
                    timeline.delete(range);
                }
                let deleted = timeline.deleted_ranges();
                for pair in deleted.windows(2) {
                    prop_assert!(pair[0].end() + 1 < pair[1].start());
                }
            }
        }
    }
}
