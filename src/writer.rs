use std::io::Write;

use log::debug;

use crate::compression::Compressor;
use crate::error::{Error, Result};
use crate::header::PatchHeader;
use crate::varint;

/// Encoded size of one control triple.
pub const CONTROL_ENTRY_LEN: usize = 3 * varint::INT_LEN;

/// One `(copyLen, extraLen, seek)` control triple.
///
/// `copy_len` bytes are rebuilt from old plus the diff segment, `extra_len`
/// literal bytes come from the extra segment, then the old cursor moves by
/// `seek`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlEntry {
    pub copy_len: i64,
    pub extra_len: i64,
    pub seek: i64,
}

impl ControlEntry {
    pub fn new(copy_len: i64, extra_len: i64, seek: i64) -> Self {
        Self {
            copy_len,
            extra_len,
            seek,
        }
    }

    pub fn to_bytes(&self) -> [u8; CONTROL_ENTRY_LEN] {
        let mut buf = [0u8; CONTROL_ENTRY_LEN];
        varint::write_i64(&mut buf[0..8], self.copy_len);
        varint::write_i64(&mut buf[8..16], self.extra_len);
        varint::write_i64(&mut buf[16..24], self.seek);
        buf
    }

    /// Decode a triple from the first 24 bytes of `buf`.
    pub fn from_bytes(buf: &[u8]) -> Option<Self> {
        Some(Self {
            copy_len: varint::read_i64(buf.get(0..8)?)?,
            extra_len: varint::read_i64(buf.get(8..16)?)?,
            seek: varint::read_i64(buf.get(16..24)?)?,
        })
    }
}

/// Accumulates the three patch segments and assembles the container.
pub struct PatchWriter<'c, C: Compressor + ?Sized> {
    ctrl_data: Vec<u8>,
    diff_data: Vec<u8>,
    extra_data: Vec<u8>,
    compressor: &'c C,
    entries: usize,
    written_output: u64,
}

impl<'c, C: Compressor + ?Sized> PatchWriter<'c, C> {
    pub fn new(compressor: &'c C) -> Self {
        Self {
            ctrl_data: Vec::new(),
            diff_data: Vec::new(),
            extra_data: Vec::new(),
            compressor,
            entries: 0,
            written_output: 0,
        }
    }

    pub fn add_control_entry(&mut self, entry: ControlEntry) {
        self.ctrl_data.extend_from_slice(&entry.to_bytes());
        self.entries += 1;
        self.written_output += (entry.copy_len + entry.extra_len) as u64;
    }

    /// Append bytes to the diff segment
    pub fn write_diff_stream(&mut self, data: impl IntoIterator<Item = u8>) {
        self.diff_data.extend(data);
    }

    pub fn write_extra_stream(&mut self, data: &[u8]) {
        self.extra_data.extend_from_slice(data);
    }

    /// Number of control triples added so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Bytes the patch will produce once applied.
    pub fn output_len(&self) -> u64 {
        self.written_output
    }

    /// Compress all segments and write header plus segments to `writer`.
    pub fn finish<W: Write + ?Sized>(self, writer: &mut W) -> Result<()> {
        let ctrl_compressed = self
            .compressor
            .compress(&self.ctrl_data)
            .map_err(Error::Compression)?;
        let diff_compressed = self
            .compressor
            .compress(&self.diff_data)
            .map_err(Error::Compression)?;
        let extra_compressed = self
            .compressor
            .compress(&self.extra_data)
            .map_err(Error::Compression)?;

        debug!(
            "patch segments: control {} -> {}, diff {} -> {}, extra {} -> {} bytes",
            self.ctrl_data.len(),
            ctrl_compressed.len(),
            self.diff_data.len(),
            diff_compressed.len(),
            self.extra_data.len(),
            extra_compressed.len()
        );

        let header = PatchHeader {
            control_len: ctrl_compressed.len(),
            diff_len: diff_compressed.len(),
            new_size: self.written_output as usize,
        };

        writer.write_all(&header.to_bytes())?;
        writer.write_all(&ctrl_compressed)?;
        writer.write_all(&diff_compressed)?;
        writer.write_all(&extra_compressed)?;

        Ok(())
    }
}
