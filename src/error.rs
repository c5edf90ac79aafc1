//! The crate's single error type, covering the five kinds of failure a
//! cabinet operation can report: malformed structure, recognized-but-
//! unsupported features, truncated input, checksum mismatches, and codec
//! decompression failures.

use std::fmt;
use std::io;

/// Convenience alias for results produced by this crate's internal APIs.
pub type Result<T> = std::result::Result<T, CabError>;

/// Everything that can go wrong while parsing, extracting, or writing a
/// cabinet.
#[derive(Debug, thiserror::Error)]
pub enum CabError {
    /// The byte stream does not have the structure a cabinet (or one of its
    /// embedded records) is required to have.
    #[error("malformed cabinet: {message}")]
    Format {
        /// Human-readable description of what was wrong.
        message: String,
    },

    /// The input is recognizable but asks for something this implementation
    /// does not support at this level (e.g. an unknown compression type).
    #[error("unsupported: {message}")]
    Unsupported {
        /// Human-readable description of the unsupported feature.
        message: String,
    },

    /// The underlying byte source ran out of data before the format said it
    /// should.
    #[error("truncated cabinet data: {message}")]
    Truncated {
        /// Human-readable description of what was expected.
        message: String,
    },

    /// A CFDATA block's checksum did not match its declared value.
    #[error(
        "checksum mismatch (expected {expected:#010x}, found {actual:#010x}): {message}"
    )]
    Checksum {
        /// The checksum recorded in the CFDATA header.
        expected: u32,
        /// The checksum actually computed over the block.
        actual: u32,
        /// Extra context (which block, which cabinet).
        message: String,
    },

    /// A codec detected an internal inconsistency while decompressing
    /// (invalid Huffman code, arithmetic coder desync, out-of-range offset).
    #[error("decompression failed: {message}")]
    Decompress {
        /// Human-readable description of the failure.
        message: String,
    },

    /// A lower-level I/O failure (as opposed to a structural one).
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CabError {
    /// Builds a [`CabError::Format`] from a message.
    pub fn format<S: Into<String>>(message: S) -> CabError {
        CabError::Format { message: message.into() }
    }

    /// Builds a [`CabError::Unsupported`] from a message.
    pub fn unsupported<S: Into<String>>(message: S) -> CabError {
        CabError::Unsupported { message: message.into() }
    }

    /// Builds a [`CabError::Truncated`] from a message.
    pub fn truncated<S: Into<String>>(message: S) -> CabError {
        CabError::Truncated { message: message.into() }
    }

    /// Builds a [`CabError::Decompress`] from a message.
    pub fn decompress<S: Into<String>>(message: S) -> CabError {
        CabError::Decompress { message: message.into() }
    }
}

/// Converts this error into a `std::io::Error`, for the parts of the public
/// API that still speak in terms of `io::Result` (matching the teacher
/// crate's pre-existing surface built on `Read`/`Write`/`Seek`).
impl From<CabError> for io::Error {
    fn from(err: CabError) -> io::Error {
        match err {
            CabError::Io(io_err) => io_err,
            CabError::Checksum { .. } => {
                io::Error::new(io::ErrorKind::InvalidData, err.to_string())
            }
            _ => io::Error::new(io::ErrorKind::InvalidData, err.to_string()),
        }
    }
}

impl fmt::Display for CabErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CabErrorKind::Format => "format",
            CabErrorKind::Unsupported => "unsupported",
            CabErrorKind::Truncated => "truncated",
            CabErrorKind::Checksum => "checksum",
            CabErrorKind::Decompress => "decompress",
            CabErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// The five kinds from §4.11 (plus the transport-level `Io` escape hatch),
/// exposed separately from the error payload for callers that want to match
/// on kind without destructuring the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CabErrorKind {
    Format,
    Unsupported,
    Truncated,
    Checksum,
    Decompress,
    Io,
}

impl CabError {
    /// Returns which of the five (or six, counting `Io`) kinds this error is.
    pub fn kind(&self) -> CabErrorKind {
        match self {
            CabError::Format { .. } => CabErrorKind::Format,
            CabError::Unsupported { .. } => CabErrorKind::Unsupported,
            CabError::Truncated { .. } => CabErrorKind::Truncated,
            CabError::Checksum { .. } => CabErrorKind::Checksum,
            CabError::Decompress { .. } => CabErrorKind::Decompress,
            CabError::Io(_) => CabErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_non_empty() {
        let errs = vec![
            CabError::format("bad signature"),
            CabError::unsupported("quantum level 99"),
            CabError::truncated("short header"),
            CabError::Checksum {
                expected: 0x1234,
                actual: 0x5678,
                message: "block 3".to_string(),
            },
            CabError::decompress("bad huffman code"),
        ];
        for err in errs {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn io_roundtrip_preserves_kind() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let cab_err: CabError = io_err.into();
        assert_eq!(cab_err.kind(), CabErrorKind::Io);
        let back: io::Error = cab_err.into();
        assert_eq!(back.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(CabError::format("x").kind(), CabErrorKind::Format);
        assert_eq!(CabError::unsupported("x").kind(), CabErrorKind::Unsupported);
        assert_eq!(CabError::truncated("x").kind(), CabErrorKind::Truncated);
        assert_eq!(CabError::decompress("x").kind(), CabErrorKind::Decompress);
    }
}
