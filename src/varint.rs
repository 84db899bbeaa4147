//! Sign-magnitude 64-bit integers as stored in BSDIFF40 headers and control
//! triples.
//!
//! The magnitude is written little-endian into 8 bytes and bit 63 carries the
//! sign. This is NOT two's complement: `-1` encodes as
//! `01 00 00 00 00 00 00 80`. Magnitudes must fit in 63 bits.

/// Encoded width of every integer in the container.
pub const INT_LEN: usize = 8;

const SIGN_BIT: u64 = 1 << 63;

/// Encode `x` in bspatch sign-magnitude format.
#[inline]
pub fn encode_i64(x: i64) -> [u8; INT_LEN] {
    let magnitude = x.unsigned_abs();
    debug_assert!(magnitude < SIGN_BIT, "magnitude does not fit in 63 bits");
    if x < 0 {
        (magnitude | SIGN_BIT).to_le_bytes()
    } else {
        magnitude.to_le_bytes()
    }
}

/// Decode a sign-magnitude integer.
#[inline]
pub fn decode_i64(buf: [u8; INT_LEN]) -> i64 {
    let y = u64::from_le_bytes(buf);
    let magnitude = (y & !SIGN_BIT) as i64;
    if y & SIGN_BIT == 0 {
        magnitude
    } else {
        -magnitude
    }
}

/// Write `x` into the first 8 bytes of `buf`.
#[inline]
pub fn write_i64(buf: &mut [u8], x: i64) {
    buf[..INT_LEN].copy_from_slice(&encode_i64(x));
}

/// Read an integer from the first 8 bytes of `buf`, or `None` if `buf` is
/// too short.
#[inline]
pub fn read_i64(buf: &[u8]) -> Option<i64> {
    let bytes: [u8; INT_LEN] = buf.get(..INT_LEN)?.try_into().ok()?;
    Some(decode_i64(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_zero() {
        assert_eq!(encode_i64(0), [0; 8]);
    }

    #[test]
    fn test_encode_positive() {
        assert_eq!(encode_i64(42), [42, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_negative() {
        assert_eq!(encode_i64(-42), [42, 0, 0, 0, 0, 0, 0, 0x80]);
        assert_eq!(encode_i64(-1), [1, 0, 0, 0, 0, 0, 0, 0x80]);
    }

    #[test]
    fn test_decode_max_positive() {
        let buf = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        assert_eq!(decode_i64(buf), i64::MAX);
    }

    #[test]
    fn test_decode_max_negative() {
        let buf = [0xFF; 8];
        assert_eq!(decode_i64(buf), -i64::MAX);
        assert_eq!(encode_i64(-i64::MAX), buf);
    }

    #[test]
    fn test_negative_zero_decodes_to_zero() {
        assert_eq!(decode_i64([0, 0, 0, 0, 0, 0, 0, 0x80]), 0);
    }

    #[test]
    fn test_known_values_round_trip() {
        for x in [0, 1, -1, 12345, -12345, i64::MAX, -i64::MAX] {
            assert_eq!(decode_i64(encode_i64(x)), x);
        }
    }

    #[test]
    fn test_read_write_slices() {
        let mut buf = [0u8; 12];
        write_i64(&mut buf[2..], -300);
        assert_eq!(read_i64(&buf[2..]), Some(-300));
        assert_eq!(read_i64(&buf[5..]), None);
    }
}
