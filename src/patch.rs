/*-
 * Copyright 2003-2005 Colin Percival
 * Copyright 2012 Matthew Endsley
 * Modified 2017 Pieter-Jan Briers
 * Modified 2021 Kornel Lesinski
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

use std::io::Read;

use log::{debug, trace};

use crate::compression::{CompressionAlgorithm, Compressor};
use crate::error::{Error, Result};
use crate::header::PatchHeader;
use crate::writer::{ControlEntry, CONTROL_ENTRY_LEN};

/// Upper bound on the output buffer reserved up front from the header's
/// declared size.
const MAX_PREALLOC: usize = 64 * 1024 * 1024;

/// Apply a BSDIFF40 patch with bzip2 compressed segments to `old`, returning
/// the new buffer.
pub fn patch(old: &[u8], patch_data: &[u8]) -> Result<Vec<u8>> {
    patch_with(old, patch_data, &CompressionAlgorithm::Bz2)
}

/// Apply a patch whose segments were compressed with `compressor`.
pub fn patch_with<C: Compressor + ?Sized>(
    old: &[u8],
    patch_data: &[u8],
    compressor: &C,
) -> Result<Vec<u8>> {
    Patch::parse(patch_data, compressor)?.apply(old)
}

/// Read the old buffer and the patch from streams, then apply.
///
/// Both inputs are read to the end before any work happens.
pub fn patch_from_reader<O, P, C>(old: &mut O, patch: &mut P, compressor: &C) -> Result<Vec<u8>>
where
    O: Read + ?Sized,
    P: Read + ?Sized,
    C: Compressor + ?Sized,
{
    let mut old_data = Vec::new();
    old.read_to_end(&mut old_data)?;
    let mut patch_data = Vec::new();
    patch.read_to_end(&mut patch_data)?;
    patch_with(&old_data, &patch_data, compressor)
}

/// A parsed patch with its three segments decompressed.
#[derive(Debug, Clone)]
pub struct Patch {
    pub new_size: usize,
    pub control: Vec<u8>,
    pub diff: Vec<u8>,
    pub extra: Vec<u8>,
}

impl Patch {
    /// Validate the header and decompress all segments.
    pub fn parse<C: Compressor + ?Sized>(patch_data: &[u8], compressor: &C) -> Result<Self> {
        let header = PatchHeader::parse(patch_data)?;
        let (control, diff, extra) = header.segments(patch_data.len());

        let control = compressor
            .decompress(&patch_data[control])
            .map_err(Error::Decompression)?;
        let diff = compressor
            .decompress(&patch_data[diff])
            .map_err(Error::Decompression)?;
        let extra = compressor
            .decompress(&patch_data[extra])
            .map_err(Error::Decompression)?;

        debug!(
            "patch header: new size {}, control {} bytes, diff {} bytes, extra {} bytes",
            header.new_size,
            control.len(),
            diff.len(),
            extra.len()
        );

        Ok(Self {
            new_size: header.new_size,
            control,
            diff,
            extra,
        })
    }

    /// Decode the control segment triple by triple.
    ///
    /// A trailing partial triple yields an error.
    pub fn control_entries(&self) -> impl Iterator<Item = Result<ControlEntry>> + '_ {
        self.control.chunks(CONTROL_ENTRY_LEN).map(|chunk| {
            ControlEntry::from_bytes(chunk)
                .ok_or_else(|| Error::corrupt_patch("incomplete control triple"))
        })
    }

    /// Rebuild the new buffer from `old`.
    ///
    /// Stops as soon as `new_size` bytes have been produced. Running out of
    /// control, diff or extra data first is a corrupt patch.
    pub fn apply(&self, old: &[u8]) -> Result<Vec<u8>> {
        let new_size = self.new_size;
        let mut new = Vec::with_capacity(new_size.min(MAX_PREALLOC));

        let mut entries = self.control_entries();
        let mut oldpos: i64 = 0;
        let mut diff_pos = 0usize;
        let mut extra_pos = 0usize;

        while new.len() < new_size {
            let entry = entries.next().ok_or_else(|| {
                Error::corrupt_patch(format!(
                    "control data exhausted after {} of {} bytes",
                    new.len(),
                    new_size
                ))
            })??;
            trace!(
                "apply ({}, {}, {}) at new {} old {}",
                entry.copy_len,
                entry.extra_len,
                entry.seek,
                new.len(),
                oldpos
            );

            let copy_len = checked_len(entry.copy_len, "copy")?;
            let extra_len = checked_len(entry.extra_len, "extra")?;

            // Add old bytes onto the diff bytes
            if new.len().checked_add(copy_len).map_or(true, |end| end > new_size) {
                return Err(Error::corrupt_patch("copy length would exceed new size"));
            }
            let diff = diff_pos
                .checked_add(copy_len)
                .and_then(|end| self.diff.get(diff_pos..end))
                .ok_or_else(|| Error::corrupt_patch("diff data exhausted"))?;
            let old_end = oldpos
                .checked_add(entry.copy_len)
                .ok_or_else(|| Error::corrupt_patch("old offset overflow"))?;

            let mix_start = new.len();
            new.extend_from_slice(diff);
            mix_old(&mut new[mix_start..], old, oldpos, old_end);
            diff_pos += copy_len;
            oldpos = old_end;

            // Literal bytes from the extra segment
            if new.len().checked_add(extra_len).map_or(true, |end| end > new_size) {
                return Err(Error::corrupt_patch("extra length would exceed new size"));
            }
            let extra = extra_pos
                .checked_add(extra_len)
                .and_then(|end| self.extra.get(extra_pos..end))
                .ok_or_else(|| Error::corrupt_patch("extra data exhausted"))?;
            new.extend_from_slice(extra);
            extra_pos += extra_len;

            oldpos = oldpos.checked_add(entry.seek).ok_or_else(|| {
                Error::corrupt_patch(format!("seek overflow: oldpos={}, seek={}", oldpos, entry.seek))
            })?;
        }

        if diff_pos != self.diff.len() || extra_pos != self.extra.len() {
            debug!(
                "ignoring unused patch data: diff {}/{}, extra {}/{}",
                diff_pos,
                self.diff.len(),
                extra_pos,
                self.extra.len()
            );
        }

        Ok(new)
    }
}

fn checked_len(value: i64, field: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| Error::corrupt_patch(format!("invalid {} length: {}", field, value)))
}

/// `mix[i] += old[start + i]` wherever `start + i` lies inside old.
#[inline]
fn mix_old(mix: &mut [u8], old: &[u8], start: i64, end: i64) {
    let lo = start.max(0);
    let hi = end.min(old.len() as i64);
    if lo >= hi {
        return;
    }
    let skip = (lo - start) as usize;
    let (lo, hi) = (lo as usize, hi as usize);
    for (n, o) in mix[skip..skip + (hi - lo)].iter_mut().zip(&old[lo..hi]) {
        *n = n.wrapping_add(*o);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::PatchWriter;

    fn build(entries: &[ControlEntry], diff: &[u8], extra: &[u8]) -> Vec<u8> {
        let alg = CompressionAlgorithm::None;
        let mut writer = PatchWriter::new(&alg);
        for &entry in entries {
            writer.add_control_entry(entry);
        }
        writer.write_diff_stream(diff.iter().copied());
        writer.write_extra_stream(extra);
        let mut out = Vec::new();
        writer.finish(&mut out).unwrap();
        out
    }

    fn apply_raw(old: &[u8], patch_data: &[u8]) -> Result<Vec<u8>> {
        patch_with(old, patch_data, &CompressionAlgorithm::None)
    }

    #[test]
    fn test_copy_extra_and_seek() {
        let old = b"abcdef";
        // copy "abc" with +1 on the middle byte, insert "XY", seek back to 'a', copy "ab"
        let patch_data = build(
            &[ControlEntry::new(3, 2, -3), ControlEntry::new(2, 0, 0)],
            &[0, 1, 0, 0, 0],
            b"XY",
        );
        assert_eq!(apply_raw(old, &patch_data).unwrap(), b"accXYab");
    }

    #[test]
    fn test_add_skips_bytes_outside_old() {
        let old = b"ab";
        // old cursor starts one byte before old and runs one byte past it
        let patch_data = build(
            &[ControlEntry::new(0, 0, -1), ControlEntry::new(4, 0, 0)],
            &[b'x', 1, 1, b'y'],
            b"",
        );
        assert_eq!(apply_raw(old, &patch_data).unwrap(), b"xbcy");
    }

    #[test]
    fn test_empty_patch_output() {
        let patch_data = build(&[], b"", b"");
        assert!(apply_raw(b"whatever", &patch_data).unwrap().is_empty());
    }

    #[test]
    fn test_negative_lengths_rejected() {
        let mut patch_data = build(&[ControlEntry::new(1, 0, 0)], b"a", b"");
        // Set the sign bit on the copy length
        patch_data[32 + 7] = 0x80;
        assert!(apply_raw(b"", &patch_data).unwrap_err().is_corruption());
    }

    #[test]
    fn test_output_overrun_rejected() {
        let mut patch_data = build(&[ControlEntry::new(0, 4, 0)], b"", b"abcd");
        // Declare a new size smaller than the triple produces
        patch_data[24] = 2;
        assert!(matches!(
            apply_raw(b"", &patch_data),
            Err(Error::CorruptPatch { .. })
        ));
    }

    #[test]
    fn test_exhausted_segments_rejected() {
        // Claims 4 extra bytes but ships 2
        let mut patch_data = build(&[ControlEntry::new(0, 2, 0)], b"", b"ab");
        patch_data[24] = 4;
        patch_data[32..56].copy_from_slice(&ControlEntry::new(0, 4, 0).to_bytes());
        assert!(apply_raw(b"", &patch_data).is_err());

        // Control runs out before new size is reached
        let mut patch_data = build(&[ControlEntry::new(0, 2, 0)], b"", b"ab");
        patch_data[24] = 3;
        assert!(apply_raw(b"", &patch_data).is_err());

        // Diff runs out
        let patch_data = build(&[ControlEntry::new(3, 0, 0)], b"ab", b"");
        assert!(apply_raw(b"abc", &patch_data).is_err());
    }

    #[test]
    fn test_truncated_control_triple() {
        let mut patch_data = build(&[ControlEntry::new(0, 1, 0)], b"", b"z");
        // Shrink the control segment to 20 bytes
        patch_data.drain(52..56);
        patch_data[8] = 20;
        assert!(apply_raw(b"", &patch_data).is_err());
    }

    #[test]
    fn test_seek_overflow_rejected() {
        let patch_data = build(
            &[ControlEntry::new(0, 1, i64::MAX), ControlEntry::new(1, 0, 0)],
            &[0],
            b"a",
        );
        // The second triple's copy would push the old offset past i64::MAX
        assert!(apply_raw(b"", &patch_data).is_err());
    }

    #[test]
    fn test_bad_segment_compression() {
        let patch_data = build(&[ControlEntry::new(0, 1, 0)], b"", b"z");
        let err = patch(b"", &patch_data).unwrap_err();
        assert!(matches!(err, Error::Decompression(_)));
    }
}
