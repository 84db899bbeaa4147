//! Error types for diff generation and patch application.

use std::io;

use thiserror::Error;

/// Errors produced while building or applying a patch.
#[derive(Error, Debug)]
pub enum Error {
    /// The patch container is malformed or does not fit the old buffer.
    #[error("corrupt patch: {reason}")]
    CorruptPatch {
        /// What was wrong with the patch
        reason: String,
    },

    /// The compressor failed while encoding a segment.
    #[error("compression error: {0}")]
    Compression(io::Error),

    /// A compressed segment could not be decoded.
    #[error("decompression error: {0}")]
    Decompression(io::Error),

    /// Reading or writing a caller supplied stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for diff and patch operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a corrupt patch error with a reason
    pub fn corrupt_patch<S: Into<String>>(reason: S) -> Self {
        Self::CorruptPatch {
            reason: reason.into(),
        }
    }

    /// Whether the error means the patch bytes themselves are bad.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::CorruptPatch { .. } | Error::Decompression(_))
    }
}
