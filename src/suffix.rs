#![allow(non_snake_case)]
/*-
 * Copyright 2003-2005 Colin Percival
 * Copyright 2012 Matthew Endsley
 * Modified 2017 Pieter-Jan Briers
 * All rights reserved
 *
 * Redistribution and use in source and binary forms, with or without
 * modification, are permitted providing that the following conditions
 * are met:
 * 1. Redistributions of source code must retain the above copyright
 *    notice, this list of conditions and the following disclaimer.
 * 2. Redistributions in binary form must reproduce the above copyright
 *    notice, this list of conditions and the following disclaimer in the
 *    documentation and/or other materials provided with the distribution.
 *
 * THIS SOFTWARE IS PROVIDED BY THE AUTHOR ``AS IS'' AND ANY EXPRESS OR
 * IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE IMPLIED
 * WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE
 * ARE DISCLAIMED.  IN NO EVENT SHALL THE AUTHOR BE LIABLE FOR ANY
 * DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL
 * DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS
 * OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION)
 * HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT,
 * STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING
 * IN ANY WAY OUT OF THE USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE
 * POSSIBILITY OF SUCH DAMAGE.
 */

//! Suffix array construction (Larsson-Sadakane qsufsort).
//!
//! Suffixes are bucket sorted on their first byte, then every group of
//! suffixes sharing a rank is refined by the rank found `h` bytes further on,
//! doubling `h` each round until every suffix has a rank of its own.

use std::cmp::Ordering;

/// One entry of the working index array.
///
/// While sorting, the start of a run of suffixes whose order is already final
/// is marked with `Sorted(run_length)`. The other slots of that run are stale
/// and skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Suffix(usize),
    Sorted(usize),
}

impl Slot {
    #[inline(always)]
    fn suffix(self) -> usize {
        match self {
            Slot::Suffix(pos) => pos,
            // Unsorted groups only ever hold suffix entries.
            Slot::Sorted(_) => unreachable!("sorted marker inside an unsorted group"),
        }
    }
}

/// Pending work for the partition refiner.
enum Task {
    Split { start: usize, len: usize },
    Rank { start: usize, end: usize },
}

/// Sorted suffixes of a buffer, including the empty suffix.
///
/// `positions()[r]` is the start of the suffix with rank `r`. The empty
/// suffix always sorts first, so the array has `old.len() + 1` entries.
#[derive(Debug, Clone)]
pub struct SuffixArray {
    positions: Vec<usize>,
}

impl SuffixArray {
    /// Sort all suffixes of `old`.
    pub fn new(old: &[u8]) -> Self {
        let mut I = vec![Slot::Sorted(0); old.len() + 1];
        let mut V = vec![0usize; old.len() + 1];
        qsufsort(&mut I, &mut V, old);
        drop(I);

        // Invert the rank array
        let mut positions = vec![0usize; old.len() + 1];
        for (pos, &rank) in V.iter().enumerate() {
            positions[rank] = pos;
        }
        Self { positions }
    }

    /// Suffix start offsets in lexicographic order.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Number of suffixes, which is the buffer length plus one.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Never true: the empty suffix is always present.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[inline(always)]
fn key(I: &[Slot], V: &[usize], k: usize, h: usize) -> usize {
    V[I[k].suffix() + h]
}

/// Small groups: repeatedly pull the minimum key to the front.
fn split_small(I: &mut [Slot], V: &mut [usize], start: usize, len: usize, h: usize) {
    let end = start + len;
    let mut k = start;
    while k < end {
        let mut j = 1;
        let mut x = key(I, V, k, h);
        for i in k + 1..end {
            let v = key(I, V, i, h);
            if v < x {
                x = v;
                j = 0;
            }
            if v == x {
                I.swap(k + j, i);
                j += 1;
            }
        }
        let rank = k + j - 1;
        for slot in k..k + j {
            V[I[slot].suffix()] = rank;
        }
        if j == 1 {
            I[k] = Slot::Sorted(1);
        }
        k += j;
    }
}

/// Three-way partition of `I[start..start + len]` around the middle key.
///
/// Returns the bounds `(jj, kk)` of the group equal to the pivot.
fn partition(I: &mut [Slot], V: &[usize], start: usize, len: usize, h: usize) -> (usize, usize) {
    let x = key(I, V, start + len / 2, h);

    let mut less = 0;
    let mut equal = 0;
    for k in start..start + len {
        match key(I, V, k, h).cmp(&x) {
            Ordering::Less => less += 1,
            Ordering::Equal => equal += 1,
            Ordering::Greater => {}
        }
    }
    let jj = start + less;
    let kk = jj + equal;

    let mut i = start;
    let mut j = 0;
    let mut k = 0;
    while i < jj {
        match key(I, V, i, h).cmp(&x) {
            Ordering::Less => i += 1,
            Ordering::Equal => {
                I.swap(i, jj + j);
                j += 1;
            }
            Ordering::Greater => {
                I.swap(i, kk + k);
                k += 1;
            }
        }
    }

    while jj + j < kk {
        if key(I, V, jj + j, h) == x {
            j += 1;
        } else {
            I.swap(jj + j, kk + k);
            k += 1;
        }
    }

    (jj, kk)
}

/// Refine the group `I[start..start + len]` by the rank `h` bytes ahead.
///
/// Runs on an explicit work list. Tasks pop in the same order a recursive
/// refinement would visit them: the lesser part, then the ranking of the
/// equal part, then the greater part.
fn split(I: &mut [Slot], V: &mut [usize], start: usize, len: usize, h: usize) {
    let mut work = vec![Task::Split { start, len }];
    while let Some(task) = work.pop() {
        match task {
            Task::Split { start, len } if len < 16 => split_small(I, V, start, len, h),
            Task::Split { start, len } => {
                let (jj, kk) = partition(I, V, start, len, h);
                if start + len > kk {
                    work.push(Task::Split {
                        start: kk,
                        len: start + len - kk,
                    });
                }
                work.push(Task::Rank { start: jj, end: kk });
                if jj > start {
                    work.push(Task::Split {
                        start,
                        len: jj - start,
                    });
                }
            }
            Task::Rank { start, end } => {
                for slot in start..end {
                    V[I[slot].suffix()] = end - 1;
                }
                if start == end - 1 {
                    I[start] = Slot::Sorted(1);
                }
            }
        }
    }
}

fn qsufsort(I: &mut [Slot], V: &mut [usize], old: &[u8]) {
    let n = old.len();

    // Bucket sort on first byte
    let mut buckets = [0usize; 256];
    for &o in old {
        buckets[o as usize] += 1;
    }
    for i in 1..256 {
        buckets[i] += buckets[i - 1];
    }
    for i in (1..256).rev() {
        buckets[i] = buckets[i - 1];
    }
    buckets[0] = 0;

    // Slot 0 is reserved for the empty suffix
    for (i, &o) in old.iter().enumerate() {
        buckets[o as usize] += 1;
        I[buckets[o as usize]] = Slot::Suffix(i);
    }
    I[0] = Slot::Suffix(n);

    for (i, &o) in old.iter().enumerate() {
        V[i] = buckets[o as usize];
    }
    V[n] = 0;

    for i in 1..256 {
        if buckets[i] == buckets[i - 1] + 1 {
            I[buckets[i]] = Slot::Sorted(1);
        }
    }
    I[0] = Slot::Sorted(1);

    let mut h = 1;
    while I[0] != Slot::Sorted(n + 1) {
        let mut len = 0;
        let mut i = 0;
        while i < n + 1 {
            match I[i] {
                Slot::Sorted(run) => {
                    len += run;
                    i += run;
                }
                Slot::Suffix(pos) => {
                    if len != 0 {
                        I[i - len] = Slot::Sorted(len);
                    }
                    let group = V[pos] + 1 - i;
                    split(I, V, i, group, h);
                    i += group;
                    len = 0;
                }
            }
        }
        if len != 0 {
            I[i - len] = Slot::Sorted(len);
        }
        h += h;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(old: &[u8]) -> Vec<usize> {
        let mut positions: Vec<usize> = (0..=old.len()).collect();
        positions.sort_by(|&a, &b| old[a..].cmp(&old[b..]));
        positions
    }

    #[test]
    fn test_empty_buffer() {
        let sa = SuffixArray::new(b"");
        assert_eq!(sa.positions(), &[0]);
        assert_eq!(sa.len(), 1);
        assert!(!sa.is_empty());
    }

    #[test]
    fn test_single_byte() {
        assert_eq!(SuffixArray::new(b"x").positions(), &[1, 0]);
    }

    #[test]
    fn test_banana() {
        let sa = SuffixArray::new(b"banana");
        assert_eq!(sa.positions(), &[6, 5, 3, 1, 0, 4, 2]);
    }

    #[test]
    fn test_matches_naive_sort() {
        let inputs: [&[u8]; 6] = [
            b"qabxcdafhjaksdhuaeuhuhasf",
            b"abcdefghijklmnopqrstuvwxyz",
            b"mississippi",
            b"\x00\x00\x01\x00\xff\x00\x00",
            b"asdhjkahsdhasdasdhajfakjdhsjahfkasjhdsjahsdhakjfhajshgjahdsajsdha",
            b"zyxwvutsrqponmlkjihgfedcbazyxwvutsrqponmlkjihgfedcba",
        ];
        for old in inputs {
            assert_eq!(SuffixArray::new(old).positions(), naive(old).as_slice());
        }
    }

    #[test]
    fn test_long_repetitive_input() {
        // Large equal-rank groups exercise the partitioning path
        let old: Vec<u8> = (0..2000).map(|i| b"abcab"[i % 5]).collect();
        assert_eq!(SuffixArray::new(&old).positions(), naive(&old).as_slice());

        let zeros = vec![0u8; 1000];
        assert_eq!(SuffixArray::new(&zeros).positions(), naive(&zeros).as_slice());
    }
}
