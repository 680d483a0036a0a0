//! Error types for the wasmsplit-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for wasmsplit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all wasmsplit operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Module header does not carry the expected magic or version
    #[error("malformed module header: {details}")]
    MalformedHeader {
        /// Detailed description of the mismatch
        details: String,
    },

    /// A section declares more payload bytes than remain in the stream
    #[error(
        "truncated section (id {id}): declared {declared} bytes but only {available} remain"
    )]
    TruncatedSection {
        /// Raw section id byte
        id: u8,
        /// Declared payload length
        declared: usize,
        /// Bytes actually remaining in the stream
        available: usize,
    },

    /// Invalid or non-terminating variable-length integer
    #[error("malformed varint at offset {offset}: buffer too small or invalid encoding")]
    MalformedEncoding {
        /// Byte offset where the error occurred
        offset: usize,
    },

    /// Section id outside the range the binary format defines
    #[error("unknown section id {id}: must be between 0 and 12")]
    UnknownSectionId {
        /// The offending id byte
        id: u8,
    },

    /// A known-kind section id appeared more than once in a module
    #[error("duplicate section id {id}: known-kind sections must not repeat")]
    DuplicateSection {
        /// The repeated section id
        id: u8,
    },

    /// A Type/Import/Export payload does not match its expected internal layout
    #[error("unsupported {section} section layout: {details}")]
    UnsupportedStructuredLayout {
        /// Which structured section kind failed to decode
        section: &'static str,
        /// Detailed description of the issue
        details: String,
    },

    /// Metadata document fails schema validation or base64 decoding
    #[error("malformed metadata document: {details}")]
    MalformedMetadata {
        /// Detailed description of the issue
        details: String,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new malformed header error
    pub fn malformed_header(details: impl Into<String>) -> Self {
        Self::MalformedHeader {
            details: details.into(),
        }
    }

    /// Creates a new varint encoding error
    pub fn malformed_encoding(offset: usize) -> Self {
        Self::MalformedEncoding { offset }
    }

    /// Creates a new unsupported structured layout error
    pub fn unsupported_layout(section: &'static str, details: impl Into<String>) -> Self {
        Self::UnsupportedStructuredLayout {
            section,
            details: details.into(),
        }
    }

    /// Creates a new malformed metadata error
    pub fn malformed_metadata(details: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            details: details.into(),
        }
    }

    /// Returns true if the stripper may fall back to a raw byte capture
    /// after this error, instead of failing the whole operation
    pub fn allows_raw_fallback(&self) -> bool {
        matches!(self, Self::UnsupportedStructuredLayout { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed_metadata(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::malformed_metadata(format!("invalid base64 payload: {}", err))
    }
}
