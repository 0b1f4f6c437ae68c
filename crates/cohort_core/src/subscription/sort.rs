//! # Adaptive Id Sort
//!
//! Sort tuned for the shape containers actually see: a long sorted run with a
//! few ids appended (or a few values changed) since the last step.
//!
//! ```text
//! [ sorted prefix ........................ | unsorted tail ]
//!                  ^ first displaced slot     sort tail, then merge
//!                    (binary search)          only from here on
//! ```
//!
//! Cost: one linear scan to find the prefix, plus work proportional to the
//! tail and to the region of the prefix it overlaps. Fully sorted input costs
//! a single scan. The sort is stable.

use crate::ecs::EntityId;
use std::cmp::Ordering;

/// At or below this many ids, plain insertion sort wins.
pub const SMALL_SORT_THRESHOLD: usize = 8;

/// Length of the longest non-descending prefix of `ids`.
pub fn sorted_prefix_len<F>(ids: &[EntityId], compare: &mut F) -> usize
where
    F: FnMut(EntityId, EntityId) -> Ordering,
{
    if ids.is_empty() {
        return 0;
    }
    let mut len = 1;
    while len < ids.len() && compare(ids[len - 1], ids[len]) != Ordering::Greater {
        len += 1;
    }
    len
}

/// Sorts `ids` stably under `compare`.
///
/// `scratch` is reused across calls to keep steady state allocation free.
pub fn sort_ids<F>(ids: &mut [EntityId], scratch: &mut Vec<EntityId>, mut compare: F)
where
    F: FnMut(EntityId, EntityId) -> Ordering,
{
    let prefix = sorted_prefix_len(ids, &mut compare);
    sort_with_prefix(ids, prefix, scratch, &mut compare);
}

/// Sorts `ids` stably, given that `ids[..prefix]` is already sorted.
pub fn sort_with_prefix<F>(
    ids: &mut [EntityId],
    prefix: usize,
    scratch: &mut Vec<EntityId>,
    compare: &mut F,
) where
    F: FnMut(EntityId, EntityId) -> Ordering,
{
    if prefix >= ids.len() {
        return;
    }

    if ids.len() <= SMALL_SORT_THRESHOLD {
        insertion_sort_from(ids, prefix.max(1), compare);
        return;
    }

    let tail = &mut ids[prefix..];
    if tail.len() <= SMALL_SORT_THRESHOLD {
        insertion_sort_from(tail, 1, compare);
    } else {
        // Stable and run-adaptive: a tail that is itself nearly sorted is cheap
        tail.sort_by(|a, b| compare(*a, *b));
    }

    merge_runs(ids, prefix, scratch, compare);
}

/// Insertion sort assuming `ids[..start]` is already sorted.
fn insertion_sort_from<F>(ids: &mut [EntityId], start: usize, compare: &mut F)
where
    F: FnMut(EntityId, EntityId) -> Ordering,
{
    for i in start..ids.len() {
        let current = ids[i];
        let mut j = i;
        // Strictly greater only: equal ids keep their order
        while j > 0 && compare(ids[j - 1], current) == Ordering::Greater {
            ids[j] = ids[j - 1];
            j -= 1;
        }
        ids[j] = current;
    }
}

/// Merges the sorted runs `ids[..mid]` and `ids[mid..]` in place.
///
/// Only the overlapping window is touched: prefix ids that sort before the
/// first tail id stay put, as do tail ids that sort after the last prefix id.
fn merge_runs<F>(ids: &mut [EntityId], mid: usize, scratch: &mut Vec<EntityId>, compare: &mut F)
where
    F: FnMut(EntityId, EntityId) -> Ordering,
{
    if mid == 0 || mid >= ids.len() {
        return;
    }

    let first_tail = ids[mid];
    let last_prefix = ids[mid - 1];
    if compare(last_prefix, first_tail) != Ordering::Greater {
        return;
    }

    let start = ids[..mid].partition_point(|&id| compare(id, first_tail) != Ordering::Greater);
    let end = mid + ids[mid..].partition_point(|&id| compare(id, last_prefix) == Ordering::Less);

    scratch.clear();
    scratch.extend_from_slice(&ids[start..mid]);

    let mut left = 0;
    let mut right = mid;
    let mut out = start;
    while left < scratch.len() && right < end {
        // Prefix wins ties to keep the merge stable
        if compare(ids[right], scratch[left]) == Ordering::Less {
            ids[out] = ids[right];
            right += 1;
        } else {
            ids[out] = scratch[left];
            left += 1;
        }
        out += 1;
    }

    let rest = &scratch[left..];
    ids[out..out + rest.len()].copy_from_slice(rest);
}
