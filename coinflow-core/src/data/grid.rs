//! Time-grid utilities: bucket ranges, forward-fill, nearest-neighbor lookup.
//!
//! Every auxiliary series is aligned onto the bucket grid derived from the
//! anchor range, and the merge uses a tolerance-bounded nearest lookup
//! against the anchor axis.

use chrono::{Duration, NaiveDateTime};

/// Inclusive bucket timestamps: `start`, `start + step`, ... while <= `end`.
pub fn bucket_range(start: NaiveDateTime, end: NaiveDateTime, step: Duration) -> Vec<NaiveDateTime> {
    let mut buckets = Vec::new();
    if step <= Duration::zero() {
        return buckets;
    }
    let mut current = start;
    while current <= end {
        buckets.push(current);
        current += step;
    }
    buckets
}

/// Forward-fill a sparse, time-sorted sample series onto a grid.
///
/// Each grid point takes the most recent sample at or before it. Grid
/// points before the first sample produce no row.
pub fn forward_fill<V: Copy>(
    samples: &[(NaiveDateTime, V)],
    grid: &[NaiveDateTime],
) -> Vec<(NaiveDateTime, V)> {
    let mut filled = Vec::with_capacity(grid.len());
    let mut idx = 0usize;
    let mut current: Option<V> = None;

    for &ts in grid {
        while idx < samples.len() && samples[idx].0 <= ts {
            current = Some(samples[idx].1);
            idx += 1;
        }
        if let Some(value) = current {
            filled.push((ts, value));
        }
    }
    filled
}

/// Index of the timestamp in `sorted` nearest to `target`, provided the
/// distance is within `tolerance` (inclusive). Ties resolve to the earlier
/// timestamp.
pub fn nearest_within(
    target: NaiveDateTime,
    sorted: &[NaiveDateTime],
    tolerance: Duration,
) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }
    let after = sorted.partition_point(|&ts| ts < target);

    let mut best: Option<(usize, Duration)> = None;
    for idx in [after.checked_sub(1), (after < sorted.len()).then_some(after)]
        .into_iter()
        .flatten()
    {
        let distance = (sorted[idx] - target).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((idx, distance)),
        }
    }

    best.and_then(|(idx, distance)| (distance <= tolerance).then_some(idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn bucket_range_is_inclusive() {
        let buckets = bucket_range(ts(0), ts(12), Duration::hours(4));
        assert_eq!(buckets, vec![ts(0), ts(4), ts(8), ts(12)]);
    }

    #[test]
    fn bucket_range_with_non_aligned_end() {
        let buckets = bucket_range(ts(0), ts(11), Duration::hours(4));
        assert_eq!(buckets, vec![ts(0), ts(4), ts(8)]);
    }

    #[test]
    fn bucket_range_degenerate_cases() {
        assert_eq!(bucket_range(ts(5), ts(5), Duration::hours(4)), vec![ts(5)]);
        assert!(bucket_range(ts(5), ts(4), Duration::hours(4)).is_empty());
    }

    #[test]
    fn forward_fill_carries_last_sample() {
        let samples = vec![(ts(0), 1.0), (ts(8), 2.0)];
        let grid = bucket_range(ts(0), ts(12), Duration::hours(4));
        let filled = forward_fill(&samples, &grid);
        assert_eq!(
            filled,
            vec![(ts(0), 1.0), (ts(4), 1.0), (ts(8), 2.0), (ts(12), 2.0)]
        );
    }

    #[test]
    fn forward_fill_skips_grid_before_first_sample() {
        let samples = vec![(ts(8), 2.0)];
        let grid = bucket_range(ts(0), ts(12), Duration::hours(4));
        let filled = forward_fill(&samples, &grid);
        assert_eq!(filled, vec![(ts(8), 2.0), (ts(12), 2.0)]);
    }

    #[test]
    fn nearest_within_finds_closest_neighbor() {
        let axis = vec![ts(0), ts(4), ts(8)];
        assert_eq!(nearest_within(ts(5), &axis, Duration::hours(4)), Some(1));
        assert_eq!(nearest_within(ts(7), &axis, Duration::hours(4)), Some(2));
        assert_eq!(nearest_within(ts(0), &axis, Duration::hours(4)), Some(0));
    }

    #[test]
    fn nearest_within_respects_tolerance() {
        let axis = vec![ts(0)];
        assert_eq!(nearest_within(ts(4), &axis, Duration::hours(4)), Some(0));
        assert_eq!(nearest_within(ts(5), &axis, Duration::hours(4)), None);
    }

    #[test]
    fn nearest_within_empty_axis() {
        assert_eq!(nearest_within(ts(0), &[], Duration::hours(4)), None);
    }

    #[test]
    fn nearest_within_tie_prefers_earlier() {
        let axis = vec![ts(0), ts(8)];
        assert_eq!(nearest_within(ts(4), &axis, Duration::hours(4)), Some(0));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn minutes(m: i64) -> NaiveDateTime {
            ts(0) + Duration::minutes(m)
        }

        proptest! {
            #[test]
            fn nearest_result_is_always_within_tolerance(
                axis_minutes in proptest::collection::btree_set(0i64..10_000, 1..50),
                target_minute in 0i64..10_000,
                tolerance_minutes in 0i64..500,
            ) {
                let axis: Vec<NaiveDateTime> =
                    axis_minutes.iter().map(|&m| minutes(m)).collect();
                let tolerance = Duration::minutes(tolerance_minutes);
                if let Some(idx) = nearest_within(minutes(target_minute), &axis, tolerance) {
                    let distance = (axis[idx] - minutes(target_minute)).abs();
                    prop_assert!(distance <= tolerance);
                    // and no other axis point is strictly closer
                    for &other in &axis {
                        prop_assert!((other - minutes(target_minute)).abs() >= distance);
                    }
                }
            }

            #[test]
            fn forward_fill_output_is_a_suffix_of_the_grid(
                sample_minutes in proptest::collection::btree_set(0i64..5_000, 1..20),
                grid_len in 1usize..40,
            ) {
                let samples: Vec<(NaiveDateTime, f64)> = sample_minutes
                    .iter()
                    .enumerate()
                    .map(|(i, &m)| (minutes(m), i as f64))
                    .collect();
                let grid = bucket_range(
                    minutes(0),
                    minutes(0) + Duration::hours(4) * (grid_len as i32 - 1),
                    Duration::hours(4),
                );
                let filled = forward_fill(&samples, &grid);

                prop_assert!(filled.len() <= grid.len());
                let offset = grid.len() - filled.len();
                for (i, (ts, _)) in filled.iter().enumerate() {
                    prop_assert_eq!(*ts, grid[offset + i]);
                }
            }
        }
    }
}
