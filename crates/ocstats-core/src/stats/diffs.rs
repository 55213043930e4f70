//! Diff attribution helpers.

use super::FileDiff;

/// Canonical ordering for file diff lists: modified, added, deleted, other,
/// then path. Every stored or displayed list goes through this.
#[inline]
pub fn sort_file_diffs(file_diffs: &mut [FileDiff]) {
    file_diffs.sort_by(|a, b| {
        let order = |s: &str| match s {
            "modified" => 0,
            "added" => 1,
            "deleted" => 2,
            _ => 3,
        };
        order(&a.status)
            .cmp(&order(&b.status))
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// Subtract a previous cumulative diff state from the current one. Files
/// whose counters did not move are dropped from the result. Inputs are
/// matched by path regardless of how the caller ordered them, so a file
/// whose status changes between snapshots still subtracts; the result comes
/// back in canonical order.
pub fn compute_incremental_diffs(current: &[FileDiff], previous: &[FileDiff]) -> Vec<FileDiff> {
    if previous.is_empty() {
        return current.to_vec();
    }

    let mut cur: Vec<&FileDiff> = current.iter().collect();
    let mut prev: Vec<&FileDiff> = previous.iter().collect();
    cur.sort_unstable_by(|a, b| a.path.cmp(&b.path));
    prev.sort_unstable_by(|a, b| a.path.cmp(&b.path));

    let mut result = Vec::with_capacity(cur.len());
    let mut i = 0;
    let mut j = 0;

    while i < cur.len() && j < prev.len() {
        let c = cur[i];
        let p = prev[j];

        match c.path.cmp(&p.path) {
            std::cmp::Ordering::Equal => {
                let a = c.additions.saturating_sub(p.additions);
                let d = c.deletions.saturating_sub(p.deletions);
                if a > 0 || d > 0 {
                    result.push(FileDiff {
                        path: c.path.clone(),
                        additions: a,
                        deletions: d,
                        status: c.status.clone(),
                    });
                }
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                result.push(c.clone());
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                j += 1;
            }
        }
    }

    while i < cur.len() {
        result.push(cur[i].clone());
        i += 1;
    }

    sort_file_diffs(&mut result);
    result
}

/// Total covered time of a set of (start, end) intervals, overlaps merged.
pub fn merge_intervals_duration(intervals: &mut [(i64, i64)]) -> i64 {
    if intervals.is_empty() {
        return 0;
    }
    intervals.sort_unstable_by_key(|&(start, _)| start);
    let mut total: i64 = 0;
    let mut cur_start = intervals[0].0;
    let mut cur_end = intervals[0].1;
    for &(start, end) in &intervals[1..] {
        if start <= cur_end {
            if end > cur_end {
                cur_end = end;
            }
        } else {
            total += cur_end - cur_start;
            cur_start = start;
            cur_end = end;
        }
    }
    total += cur_end - cur_start;
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn diff(path: &str, additions: u64, deletions: u64, status: &str) -> FileDiff {
        FileDiff {
            path: path.into(),
            additions,
            deletions,
            status: status.into(),
        }
    }

    #[test]
    fn test_sort_file_diffs_status_then_path() {
        let mut diffs = vec![
            diff("z.rs", 1, 0, "added"),
            diff("b.rs", 1, 0, "modified"),
            diff("a.rs", 1, 0, "deleted"),
            diff("a.rs", 1, 0, "modified"),
        ];
        sort_file_diffs(&mut diffs);
        let order: Vec<(&str, &str)> = diffs
            .iter()
            .map(|d| (d.path.as_ref(), d.status.as_ref()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.rs", "modified"),
                ("b.rs", "modified"),
                ("z.rs", "added"),
                ("a.rs", "deleted"),
            ]
        );
    }

    #[test]
    fn test_incremental_diffs_subtracts_previous() {
        let current = vec![diff("a.rs", 10, 4, "modified"), diff("b.rs", 3, 0, "added")];
        let previous = vec![diff("a.rs", 6, 4, "modified")];
        let inc = compute_incremental_diffs(&current, &previous);
        assert_eq!(inc.len(), 2);
        assert_eq!(inc[0].additions, 4);
        assert_eq!(inc[0].deletions, 0);
        assert_eq!(inc[1].path.as_ref(), "b.rs");
        assert_eq!(inc[1].additions, 3);
    }

    #[test]
    fn test_incremental_diffs_drops_unchanged() {
        let current = vec![diff("a.rs", 6, 4, "modified")];
        let previous = vec![diff("a.rs", 6, 4, "modified")];
        assert!(compute_incremental_diffs(&current, &previous).is_empty());
    }

    #[test]
    fn test_incremental_diffs_saturates_on_shrinking_counters() {
        let current = vec![diff("a.rs", 2, 1, "modified")];
        let previous = vec![diff("a.rs", 6, 4, "modified")];
        assert!(compute_incremental_diffs(&current, &previous).is_empty());
    }

    #[test]
    fn test_incremental_diffs_ignores_caller_ordering() {
        // Canonical order puts modified before added, so the path order of
        // the two lists disagrees; subtraction must still pair by path.
        let current = vec![
            diff("a.rs", 7, 0, "modified"),
            diff("b.rs", 5, 0, "modified"),
        ];
        let previous = vec![diff("b.rs", 5, 0, "modified"), diff("a.rs", 3, 0, "added")];
        let inc = compute_incremental_diffs(&current, &previous);
        assert_eq!(inc.len(), 1);
        assert_eq!(inc[0].path.as_ref(), "a.rs");
        assert_eq!(inc[0].additions, 4);
    }

    #[test]
    fn test_incremental_diffs_subtracts_across_status_change() {
        let current = vec![diff("a.rs", 10, 2, "deleted")];
        let previous = vec![diff("a.rs", 6, 2, "modified")];
        let inc = compute_incremental_diffs(&current, &previous);
        assert_eq!(inc.len(), 1);
        assert_eq!(inc[0].additions, 4);
        assert_eq!(inc[0].status.as_ref(), "deleted");
    }

    #[test]
    fn test_incremental_diffs_empty_previous_is_identity() {
        let current = vec![diff("a.rs", 1, 1, "modified")];
        let inc = compute_incremental_diffs(&current, &[]);
        assert_eq!(inc.len(), 1);
    }

    #[test]
    fn test_merge_intervals_overlapping() {
        let mut intervals = vec![(0, 10), (5, 20), (30, 40)];
        assert_eq!(merge_intervals_duration(&mut intervals), 30);
    }

    #[test]
    fn test_merge_intervals_adjacent_and_contained() {
        let mut intervals = vec![(0, 10), (10, 15), (2, 5)];
        assert_eq!(merge_intervals_duration(&mut intervals), 15);
        assert_eq!(merge_intervals_duration(&mut []), 0);
    }
}
