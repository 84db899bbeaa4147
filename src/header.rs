//! The fixed 32-byte BSDIFF40 header.
//!
//! ```text
//! offset  size  field
//! 0       8     "BSDIFF40"
//! 8       8     compressed length of the control segment
//! 16      8     compressed length of the diff segment
//! 24      8     size of the reconstructed new buffer
//! 32      X     control segment
//! 32+X    Y     diff segment
//! 32+X+Y  ...   extra segment (rest of the patch)
//! ```

use crate::error::{Error, Result};
use crate::varint;

pub const MAGIC: &[u8; 8] = b"BSDIFF40";

/// Size of the header in bytes.
pub const HEADER_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchHeader {
    /// Compressed length of the control segment
    pub control_len: usize,
    /// Compressed length of the diff segment
    pub diff_len: usize,
    /// Length of the reconstructed new buffer
    pub new_size: usize,
}

impl PatchHeader {
    /// Parse and validate the header at the start of `patch_data`.
    ///
    /// The declared segment lengths must fit inside `patch_data`.
    pub fn parse(patch_data: &[u8]) -> Result<Self> {
        if patch_data.len() < HEADER_LEN {
            return Err(Error::corrupt_patch(format!(
                "patch is {} bytes, shorter than the {} byte header",
                patch_data.len(),
                HEADER_LEN
            )));
        }

        if &patch_data[0..8] != MAGIC {
            return Err(Error::corrupt_patch("invalid BSDIFF40 magic"));
        }

        let control_len = read_len(&patch_data[8..16], "control length")?;
        let diff_len = read_len(&patch_data[16..24], "diff length")?;
        let new_size = read_len(&patch_data[24..32], "new size")?;

        if HEADER_LEN
            .checked_add(control_len)
            .and_then(|p| p.checked_add(diff_len))
            .map_or(true, |total| total > patch_data.len())
        {
            return Err(Error::corrupt_patch("segment lengths exceed patch size"));
        }

        Ok(Self {
            control_len,
            diff_len,
            new_size,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut header = [0u8; HEADER_LEN];
        header[0..8].copy_from_slice(MAGIC);
        varint::write_i64(&mut header[8..16], self.control_len as i64);
        varint::write_i64(&mut header[16..24], self.diff_len as i64);
        varint::write_i64(&mut header[24..32], self.new_size as i64);
        header
    }

    /// Byte ranges of the control, diff and extra segments within a patch of
    /// `patch_len` bytes.
    pub(crate) fn segments(
        &self,
        patch_len: usize,
    ) -> (
        std::ops::Range<usize>,
        std::ops::Range<usize>,
        std::ops::Range<usize>,
    ) {
        let control_end = HEADER_LEN + self.control_len;
        let diff_end = control_end + self.diff_len;
        (
            HEADER_LEN..control_end,
            control_end..diff_end,
            diff_end..patch_len,
        )
    }
}

fn read_len(buf: &[u8], field: &str) -> Result<usize> {
    let value = varint::read_i64(buf)
        .ok_or_else(|| Error::corrupt_patch(format!("truncated {}", field)))?;
    if value < 0 {
        return Err(Error::corrupt_patch(format!("negative {}: {}", field, value)));
    }
    usize::try_from(value).map_err(|_| Error::corrupt_patch(format!("{} too large: {}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = PatchHeader {
            control_len: 0x10,
            diff_len: 0x20,
            new_size: 0x0102,
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..8], b"BSDIFF40");
        assert_eq!(bytes[8], 0x10);
        assert_eq!(bytes[16], 0x20);
        assert_eq!(&bytes[24..26], &[0x02, 0x01]);
    }

    #[test]
    fn test_parse_round_trip() {
        let header = PatchHeader {
            control_len: 3,
            diff_len: 4,
            new_size: 99,
        };
        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(&[0u8; 10]);
        assert_eq!(PatchHeader::parse(&data).unwrap(), header);

        let (control, diff, extra) = header.segments(data.len());
        assert_eq!(control, 32..35);
        assert_eq!(diff, 35..39);
        assert_eq!(extra, 39..42);
    }

    #[test]
    fn test_parse_too_short() {
        assert!(PatchHeader::parse(&[0u8; 31]).unwrap_err().is_corruption());
    }

    #[test]
    fn test_parse_invalid_magic() {
        let invalid = vec![0u8; 32];
        assert!(matches!(
            PatchHeader::parse(&invalid),
            Err(Error::CorruptPatch { .. })
        ));
    }

    #[test]
    fn test_parse_negative_lengths() {
        for field in [8, 16, 24] {
            let mut data = vec![0u8; 32];
            data[0..8].copy_from_slice(MAGIC);
            data[field] = 0x01;
            data[field + 7] = 0x80; // Sign bit
            assert!(PatchHeader::parse(&data).is_err());
        }
    }

    #[test]
    fn test_parse_segments_exceed_patch() {
        let header = PatchHeader {
            control_len: 10,
            diff_len: 10,
            new_size: 0,
        };
        let mut data = header.to_bytes().to_vec();
        data.extend_from_slice(&[0u8; 19]);
        assert!(PatchHeader::parse(&data).is_err());
        data.push(0);
        assert!(PatchHeader::parse(&data).is_ok());
    }
}
