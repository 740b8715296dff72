//! Combinatorial approximate lookup over the word index.
//!
//! The search walks a 2-D tolerance space: the number of query words
//! allowed to be omitted (outer), and the allowed difference in sentence
//! length (inner). Each (omitted, delta) level inspects the length
//! buckets `n - delta` and `n + delta`; within a bucket, every way of
//! dropping the permitted number of words is tried, and the surviving
//! postings are intersected with a k-way cursor merge. The first
//! non-empty intersection ends the search.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, debug_span};

use super::tables::WordIndex;

/// Cooperative cancellation signal for a long-running lookup.
///
/// Cheap to clone; hand one half to the lookup call and keep the other
/// to abandon the search from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Iterative k-of-n combination cursor over index positions.
///
/// Yields every way of choosing `k` positions out of `n`, in
/// lexicographic order, without recursion or per-step allocation.
struct OmissionCursor {
    indices: Vec<usize>,
    n: usize,
}

impl OmissionCursor {
    /// Requires `k <= n`.
    fn new(k: usize, n: usize) -> Self {
        Self {
            indices: (0..k).collect(),
            n,
        }
    }

    fn current(&self) -> &[usize] {
        &self.indices
    }

    /// Advance to the next combination; false when exhausted.
    fn advance(&mut self) -> bool {
        let k = self.indices.len();
        if k == 0 {
            return false; // the single empty combination was already yielded
        }
        // Find the rightmost position that can still move right.
        let mut i = k;
        while i > 0 {
            i -= 1;
            if self.indices[i] < self.n - k + i {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                return true;
            }
        }
        false
    }
}

/// Intersect the masked sorted lists with parallel cursors.
///
/// Advances the cursor holding the smallest head until all heads agree;
/// an agreed value goes to the output. Runs in time linear in the
/// combined list lengths and stops as soon as any list is exhausted.
fn intersect_masked(lists: &[&[u32]], mask: &[bool]) -> Vec<u32> {
    let kept: Vec<usize> = (0..lists.len()).filter(|&i| mask[i]).collect();
    if kept.is_empty() {
        return Vec::new();
    }
    let cap = kept.iter().map(|&i| lists[i].len()).min().unwrap_or(0);
    let mut out = Vec::with_capacity(cap);
    let mut cursors = vec![0usize; lists.len()];

    loop {
        let mut first = None;
        let mut smallest = 0u32;
        let mut smallest_idx = 0usize;
        let mut all_same = true;

        for &li in &kept {
            if cursors[li] >= lists[li].len() {
                return out; // some list exhausted, nothing more can agree
            }
            let head = lists[li][cursors[li]];
            match first {
                None => {
                    first = Some(head);
                    smallest = head;
                    smallest_idx = li;
                }
                Some(f) => {
                    if head != f {
                        all_same = false;
                    }
                    if head < smallest {
                        smallest = head;
                        smallest_idx = li;
                    }
                }
            }
        }

        if all_same {
            out.push(smallest);
            for &li in &kept {
                cursors[li] += 1;
            }
        } else {
            cursors[smallest_idx] += 1;
        }
    }
}

/// Search one length bucket at one tolerance level.
///
/// `omits` is the number of query words allowed to be dropped in this
/// bucket. Words with no posting at the bucket length are forced
/// omissions and consume the budget first; the remainder is spent on
/// every combination of the present words. Returns the ids of the first
/// combination whose kept postings all intersect, or `None`.
fn search_bucket(
    index: &WordIndex,
    tokens: &[String],
    omits: usize,
    bucket: u32,
    cancel: &CancelToken,
) -> Option<Vec<u32>> {
    let n = tokens.len();
    if omits >= n {
        return None; // would match every entry of this length
    }

    let mut lists: Vec<&[u32]> = Vec::with_capacity(n);
    for token in tokens {
        let posting = index.posting(token, bucket);
        if !posting.is_empty() {
            lists.push(posting);
        }
    }
    let missing = n - lists.len();
    if missing > omits || missing >= n {
        return None;
    }
    let omits = omits - missing;
    let cnt = lists.len();

    let mut mask = vec![true; cnt];
    let mut cursor = OmissionCursor::new(omits, cnt);
    loop {
        if cancel.is_cancelled() {
            return None;
        }
        mask.fill(true);
        for &i in cursor.current() {
            mask[i] = false;
        }
        let hit = intersect_masked(&lists, &mask);
        if !hit.is_empty() {
            return Some(hit);
        }
        if !cursor.advance() {
            return None;
        }
    }
}

/// Search one (omitted, delta) tolerance level.
///
/// Tries the shorter bucket `n - delta` before the longer bucket
/// `n + delta`: an entry shorter than the query can only lack words the
/// query has, so the length gap itself grants that many extra omissions
/// on top of the level's explicit budget.
pub(super) fn fuzzy_level(
    index: &WordIndex,
    tokens: &[String],
    omitted: u32,
    delta: u32,
    cancel: &CancelToken,
) -> Option<Vec<u32>> {
    let n = tokens.len() as u32;
    let _span = debug_span!("fuzzy_level", omitted, delta).entered();

    if delta > 0 && delta < n {
        let bucket = n - delta;
        let omits = (omitted + delta) as usize;
        if let Some(ids) = search_bucket(index, tokens, omits, bucket, cancel) {
            debug!(bucket, hits = ids.len(), "short-bucket hit");
            return Some(ids);
        }
    }

    let bucket = n + delta;
    if let Some(ids) = search_bucket(index, tokens, omitted as usize, bucket, cancel) {
        debug!(bucket, hits = ids.len(), "long-bucket hit");
        return Some(ids);
    }

    None
}

/// Exactness of a match found at tolerance level (omitted, delta):
/// 100 at (0, 0), strictly decreasing in each dimension, still positive
/// at the tolerance bounds.
pub(super) fn exactness(omitted: u32, delta: u32, max_omitted: u32, max_delta: u32) -> u8 {
    let mo = u64::from(max_omitted) + 1;
    let md = u64::from(max_delta) + 1;
    let num = 100 * (mo - u64::from(omitted)) * (md - u64::from(delta));
    let score = num / (mo * md);
    score.max(1) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combos(k: usize, n: usize) -> Vec<Vec<usize>> {
        let mut cursor = OmissionCursor::new(k, n);
        let mut all = vec![cursor.current().to_vec()];
        while cursor.advance() {
            all.push(cursor.current().to_vec());
        }
        all
    }

    #[test]
    fn cursor_zero_of_n() {
        assert_eq!(combos(0, 4), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn cursor_two_of_four() {
        assert_eq!(
            combos(2, 4),
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![0, 3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
            ]
        );
    }

    #[test]
    fn cursor_n_of_n() {
        assert_eq!(combos(3, 3), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn cursor_count_matches_binomial() {
        // C(6, 3) = 20
        assert_eq!(combos(3, 6).len(), 20);
    }

    #[test]
    fn intersect_basic() {
        let a: &[u32] = &[1, 3, 5, 7];
        let b: &[u32] = &[2, 3, 5, 8];
        let c: &[u32] = &[3, 5, 9];
        assert_eq!(
            intersect_masked(&[a, b, c], &[true, true, true]),
            vec![3, 5]
        );
    }

    #[test]
    fn intersect_respects_mask() {
        let a: &[u32] = &[1, 2];
        let b: &[u32] = &[3, 4];
        // b is masked out, so the intersection is just a.
        assert_eq!(intersect_masked(&[a, b], &[true, false]), vec![1, 2]);
        assert!(intersect_masked(&[a, b], &[false, false]).is_empty());
    }

    #[test]
    fn intersect_disjoint() {
        let a: &[u32] = &[1, 4, 9];
        let b: &[u32] = &[2, 5, 10];
        assert!(intersect_masked(&[a, b], &[true, true]).is_empty());
    }

    #[test]
    fn intersect_single_list() {
        let a: &[u32] = &[0, 7];
        assert_eq!(intersect_masked(&[a], &[true]), vec![0, 7]);
    }

    #[test]
    fn exactness_is_100_at_origin() {
        assert_eq!(exactness(0, 0, 0, 0), 100);
        assert_eq!(exactness(0, 0, 2, 2), 100);
        assert_eq!(exactness(0, 0, 9, 9), 100);
    }

    #[test]
    fn exactness_decreases_with_tolerance() {
        let widths: Vec<u8> = (0..=2)
            .flat_map(|o| (0..=2).map(move |d| exactness(o, d, 2, 2)))
            .collect();
        // Monotone along each axis.
        for o in 0..=2u32 {
            for d in 1..=2u32 {
                assert!(exactness(o, d, 2, 2) < exactness(o, d - 1, 2, 2));
            }
        }
        for d in 0..=2u32 {
            for o in 1..=2u32 {
                assert!(exactness(o, d, 2, 2) < exactness(o - 1, d, 2, 2));
            }
        }
        // Positive everywhere.
        assert!(widths.iter().all(|&s| (1..=100).contains(&s)));
    }

    #[test]
    fn exactness_never_zero_at_bounds() {
        assert!(exactness(9, 9, 9, 9) >= 1);
    }

    #[test]
    fn cancel_token_roundtrip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
