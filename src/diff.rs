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

use std::io::Write;

use log::{debug, trace};

use crate::compression::{CompressionAlgorithm, Compressor};
use crate::error::Result;
use crate::search::longest_match;
use crate::suffix::SuffixArray;
use crate::writer::{ControlEntry, PatchWriter};

/// A match must beat the bytes already agreeing at the previous offset by
/// more than this many bytes to start a new control triple.
const MIN_MATCH_GAIN: isize = 8;

/// Diff an "old" and a "new" buffer, returning a BSDIFF40 patch with bzip2
/// compressed segments.
///
/// The patch can be applied to the "old" buffer to return the new one with
/// [`patch`](crate::patch()).
pub fn diff(old: &[u8], new: &[u8]) -> Result<Vec<u8>> {
    diff_with(old, new, &CompressionAlgorithm::Bz2)
}

/// Diff with a caller chosen segment compressor.
pub fn diff_with<C: Compressor + ?Sized>(old: &[u8], new: &[u8], compressor: &C) -> Result<Vec<u8>> {
    let mut patch = Vec::new();
    diff_to_writer(old, new, compressor, &mut patch)?;
    Ok(patch)
}

/// Diff and write the finished patch to `writer`.
pub fn diff_to_writer<C, W>(old: &[u8], new: &[u8], compressor: &C, writer: &mut W) -> Result<()>
where
    C: Compressor + ?Sized,
    W: Write + ?Sized,
{
    debug!("diffing {} old bytes against {} new bytes", old.len(), new.len());

    let mut patch = PatchWriter::new(compressor);
    for anchor in DiffEncoder::new(old, new) {
        let copy_len = anchor.control.copy_len as usize;
        let extra_len = anchor.control.extra_len as usize;
        trace!(
            "control ({}, {}, {}) at new {} old {}",
            anchor.control.copy_len,
            anchor.control.extra_len,
            anchor.control.seek,
            anchor.new_pos,
            anchor.old_pos
        );

        patch.add_control_entry(anchor.control);
        patch.write_diff_stream(
            new[anchor.new_pos..anchor.new_pos + copy_len]
                .iter()
                .zip(&old[anchor.old_pos..anchor.old_pos + copy_len])
                .map(|(n, o)| n.wrapping_sub(*o)),
        );
        let extra_start = anchor.new_pos + copy_len;
        patch.write_extra_stream(&new[extra_start..extra_start + extra_len]);
    }

    debug!("{} control triples", patch.entries());
    patch.finish(writer)
}

/// Control triples for turning `old` into `new`, without building a patch.
pub fn compute_control(old: &[u8], new: &[u8]) -> Vec<ControlEntry> {
    DiffEncoder::new(old, new).map(|anchor| anchor.control).collect()
}

/// One emitted control triple and where it starts in both buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub control: ControlEntry,
    /// Start of the copied span in the new buffer
    pub new_pos: usize,
    /// Start of the copied span in the old buffer
    pub old_pos: usize,
}

/// Walks the new buffer, yielding one [`Anchor`] per control triple.
pub struct DiffEncoder<'a> {
    old: &'a [u8],
    new: &'a [u8],
    sa: SuffixArray,
    scan: usize,
    len: usize,
    pos: usize,
    lastscan: usize,
    lastpos: usize,
    lastoffset: isize,
}

impl<'a> DiffEncoder<'a> {
    /// Sort the suffixes of `old`; scanning starts at the first call to `next`.
    pub fn new(old: &'a [u8], new: &'a [u8]) -> Self {
        Self {
            old,
            new,
            sa: SuffixArray::new(old),
            scan: 0,
            len: 0,
            pos: 0,
            lastscan: 0,
            lastpos: 0,
            lastoffset: 0,
        }
    }

    /// Whether `new[i]` agrees with old at the previous anchor's offset.
    #[inline]
    fn agrees_with_last_offset(&self, i: usize) -> bool {
        let j = i as isize + self.lastoffset;
        j >= 0 && (j as usize) < self.old.len() && self.old[j as usize] == self.new[i]
    }

    /// Forward extension from the last anchor maximising `2 * matches - length`.
    fn forward_extension(&self) -> usize {
        let (old, new) = (self.old, self.new);
        let mut s = 0isize;
        let mut Sf = 0isize;
        let mut lenf = 0usize;
        let mut i = 0usize;
        while self.lastscan + i < self.scan && self.lastpos + i < old.len() {
            if old[self.lastpos + i] == new[self.lastscan + i] {
                s += 1;
            }
            i += 1;
            if s * 2 - i as isize > Sf * 2 - lenf as isize {
                Sf = s;
                lenf = i;
            }
        }
        lenf
    }

    /// Backward extension from the new match, same scoring as forward.
    fn backward_extension(&self) -> usize {
        let (old, new) = (self.old, self.new);
        let mut lenb = 0usize;
        if self.scan < new.len() {
            let mut s = 0isize;
            let mut Sb = 0isize;
            let mut i = 1usize;
            while self.scan >= self.lastscan + i && self.pos >= i {
                if old[self.pos - i] == new[self.scan - i] {
                    s += 1;
                }
                if s * 2 - i as isize > Sb * 2 - lenb as isize {
                    Sb = s;
                    lenb = i;
                }
                i += 1;
            }
        }
        lenb
    }

    fn emit(&mut self) -> Anchor {
        let (old, new) = (self.old, self.new);
        let (lastscan, lastpos, scan, pos) = (self.lastscan, self.lastpos, self.scan, self.pos);

        let mut lenf = self.forward_extension();
        let mut lenb = self.backward_extension();

        // Split the overlap where the forward side stops winning
        if lastscan + lenf > scan - lenb {
            let overlap = lastscan + lenf - (scan - lenb);
            let mut s = 0isize;
            let mut Ss = 0isize;
            let mut lens = 0usize;
            for i in 0..overlap {
                if new[lastscan + lenf - overlap + i] == old[lastpos + lenf - overlap + i] {
                    s += 1;
                }
                if new[scan - lenb + i] == old[pos - lenb + i] {
                    s -= 1;
                }
                if s > Ss {
                    Ss = s;
                    lens = i + 1;
                }
            }
            lenf = lenf + lens - overlap;
            lenb -= lens;
        }

        let extra_len = (scan - lenb) - (lastscan + lenf);
        // Nothing follows the final triple, so it does not move the old cursor
        let seek = if scan == new.len() {
            0
        } else {
            (pos - lenb) as i64 - (lastpos + lenf) as i64
        };

        let anchor = Anchor {
            control: ControlEntry::new(lenf as i64, extra_len as i64, seek),
            new_pos: lastscan,
            old_pos: lastpos,
        };

        self.lastscan = scan - lenb;
        self.lastpos = pos - lenb;
        self.lastoffset = pos as isize - scan as isize;

        anchor
    }
}

impl Iterator for DiffEncoder<'_> {
    type Item = Anchor;

    fn next(&mut self) -> Option<Anchor> {
        while self.scan < self.new.len() {
            let mut oldscore = 0isize;
            self.scan += self.len;
            let mut scsc = self.scan;

            // Find next matching block
            while self.scan < self.new.len() {
                let m = longest_match(&self.sa, self.old, &self.new[self.scan..]);
                self.pos = m.old_pos;
                self.len = m.len;

                // Score bytes the previous offset already explains
                while scsc < self.scan + self.len {
                    if self.agrees_with_last_offset(scsc) {
                        oldscore += 1;
                    }
                    scsc += 1;
                }

                let len = self.len as isize;
                if (len == oldscore && len != 0) || len > oldscore + MIN_MATCH_GAIN {
                    break;
                }

                if self.agrees_with_last_offset(self.scan) {
                    oldscore -= 1;
                }
                self.scan += 1;
            }

            if self.len as isize != oldscore || self.scan == self.new.len() {
                return Some(self.emit());
            }
        }
        None
    }
}
