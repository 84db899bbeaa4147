#![allow(clippy::needless_doctest_main)]
#![doc = include_str!("../README.md")]

mod compression;
mod diff;
mod error;
mod header;
mod patch;
mod search;
mod suffix;
pub mod varint;
mod writer;

pub use compression::{CompressionAlgorithm, Compressor};
pub use diff::{compute_control, diff, diff_to_writer, diff_with, Anchor, DiffEncoder};
pub use error::{Error, Result};
pub use header::{PatchHeader, HEADER_LEN, MAGIC};
pub use patch::{patch, patch_from_reader, patch_with, Patch};
pub use search::{longest_match, matchlen, Match};
pub use suffix::SuffixArray;
pub use writer::{ControlEntry, PatchWriter, CONTROL_ENTRY_LEN};

pub use patch::patch as apply_patch;
