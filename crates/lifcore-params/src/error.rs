//! Error types for parameter block loading and construction

use thiserror::Error;

/// Result type for parameter block operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Reasons a parameter block is rejected
///
/// Every variant is fatal at startup: a block is either accepted in full or
/// not at all.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Block ended before a section was complete
    #[error("Truncated block: section {section} needs {needed} bytes, {available} available")]
    Truncated {
        /// Section being read
        section: &'static str,
        /// Bytes required
        needed: usize,
        /// Bytes left in the block
        available: usize,
    },

    /// Invalid magic number
    #[error("Invalid magic number: expected {expected:?}, found {found:?}")]
    InvalidMagic {
        /// Expected magic number
        expected: [u8; 4],
        /// Found magic number
        found: [u8; 4],
    },

    /// Unsupported block version
    #[error("Unsupported version: {version}, supported: {supported}")]
    UnsupportedVersion {
        /// Version found
        version: u32,
        /// Supported version
        supported: u32,
    },

    /// Neuron model id not known to this build
    #[error("Unknown neuron model id {model}")]
    UnknownModel {
        /// Model id found in the header
        model: u32,
    },

    /// Per-neuron array length disagrees with the population size
    #[error("Length mismatch for {field}: expected {expected}, found {found}")]
    LengthMismatch {
        /// Array name
        field: &'static str,
        /// Expected length
        expected: usize,
        /// Length declared in the block
        found: usize,
    },

    /// Block describes a different population size than the caller expects
    #[error("Population size mismatch: expected {expected} neurons, block has {found}")]
    PopulationSizeMismatch {
        /// Size the caller expects
        expected: usize,
        /// Size declared by the block
        found: usize,
    },

    /// Field value outside its legal range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// CRC32 trailer does not match the block contents
    #[error("Checksum verification failed: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// Checksum stored in the trailer
        expected: u32,
        /// Checksum computed over the block
        computed: u32,
    },

    /// Bytes left over after the trailer
    #[error("{count} trailing bytes after checksum")]
    TrailingBytes {
        /// Number of unexpected bytes
        count: usize,
    },

    /// I/O error while reading a block from disk
    #[error("I/O error: {source}")]
    Io {
        #[from]
        /// Source I/O error
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a length mismatch error
    pub fn length_mismatch(field: &'static str, expected: usize, found: usize) -> Self {
        Self::LengthMismatch {
            field,
            expected,
            found,
        }
    }
}
