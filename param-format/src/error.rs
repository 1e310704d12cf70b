//! Error types for Param decoding, editing and encoding

use thiserror::Error;

/// Errors that can occur when decoding, editing or encoding a Param file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// Input is empty or does not start with the Param magic
    #[error("Not a Param file (missing or invalid magic)")]
    FormatRejected,

    /// A fixed-width read was clamped to fewer bytes than the value needs
    #[error("Short read at 0x{offset:X}: wanted {wanted} bytes, {available} available")]
    ShortRead {
        offset: usize,
        wanted: usize,
        available: usize,
    },

    /// A string field does not hold valid UTF-8
    #[error("Invalid string data at 0x{offset:X}: {reason}")]
    Decode { offset: usize, reason: String },

    /// A value cannot be represented in its field's byte width
    #[error("Cannot encode field '{field}': {reason}")]
    Encode { field: String, reason: String },

    /// Raw entry data does not match the section stride
    #[error("Raw data is {actual} bytes, entry size is {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A value of the wrong kind was assigned to a field
    #[error("Field '{field}' expects {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    /// No field with this name exists in the entry's layout
    #[error("No field named '{0}'")]
    UnknownField(String),

    /// Operation needs a loaded file but the container is empty
    #[error("No Param file loaded")]
    NotLoaded,

    /// The in-memory tree no longer satisfies the layout invariants
    #[error("Corrupt Param tree: {0}")]
    CorruptTree(String),
}

/// Result alias used throughout the codec
pub type Result<T> = std::result::Result<T, ParamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ParamError::ShortRead {
            offset: 0x1C,
            wanted: 4,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Short read at 0x1C: wanted 4 bytes, 2 available"
        );

        let err = ParamError::SizeMismatch {
            expected: 16,
            actual: 15,
        };
        assert_eq!(err.to_string(), "Raw data is 15 bytes, entry size is 16");
    }
}
