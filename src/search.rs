//! Longest-match lookup of a new-buffer suffix in the sorted old buffer.

use std::cmp::Ordering;

use crate::suffix::SuffixArray;

/// Longest prefix of the searched bytes found in the old buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Match {
    /// Offset of the match in the old buffer
    pub old_pos: usize,
    /// Number of matching bytes
    pub len: usize,
}

/// Count matching bytes between two slices
#[inline]
pub fn matchlen(old: &[u8], new: &[u8]) -> usize {
    old.iter().zip(new).take_while(|(a, b)| a == b).count()
}

/// Three-way comparison of an old suffix against `new`.
///
/// Bytes are compared until one side runs out; a side that runs out first
/// sorts first. An old suffix that is a proper prefix of `new` therefore
/// sorts below it, keeping longer matches above it reachable.
#[inline]
fn compare_suffix(old: &[u8], new: &[u8]) -> Ordering {
    let n = old.len().min(new.len());
    match old[..n].cmp(&new[..n]) {
        Ordering::Equal => old.len().cmp(&new.len()),
        ord => ord,
    }
}

/// Binary search in suffix array for best match
///
/// Narrows `[st, en]` over the sorted suffixes until at most two candidates
/// remain, then measures both and keeps the longer one (the upper candidate
/// on ties). An empty old buffer always yields `(0, 0)`.
pub fn longest_match(sa: &SuffixArray, old: &[u8], new: &[u8]) -> Match {
    let index = sa.positions();
    let mut st = 0;
    let mut en = index.len() - 1;

    while en - st >= 2 {
        let mid = st + (en - st) / 2;
        if compare_suffix(&old[index[mid]..], new) == Ordering::Less {
            st = mid;
        } else {
            en = mid;
        }
    }

    let x = matchlen(&old[index[st]..], new);
    let y = matchlen(&old[index[en]..], new);
    if x > y {
        Match {
            old_pos: index[st],
            len: x,
        }
    } else {
        Match {
            old_pos: index[en],
            len: y,
        }
    }
}
