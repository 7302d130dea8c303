//! Error type shared by the byte stream and NBT codecs.

/// Errors raised while reading or writing binary streams and NBT trees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NbtError {
    #[error("unexpected end of data at offset {offset}: needed {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    #[error("varint at offset {offset} did not terminate within {max_bytes} bytes")]
    VarIntTooLong { offset: usize, max_bytes: usize },

    #[error("unknown tag type {id} at offset {offset}")]
    UnknownTagType { id: u8, offset: usize },

    #[error("root tag must be a compound, found type {0}")]
    RootNotCompound(u8),

    #[error("nesting depth exceeds {0}")]
    DepthLimit(usize),

    #[error("negative length {0}")]
    NegativeLength(i64),

    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("string of {0} bytes does not fit the length prefix")]
    StringTooLong(usize),

    #[error("list of {expected:?} cannot hold a {found:?}")]
    ListTypeMismatch {
        expected: crate::TagType,
        found: crate::TagType,
    },
}
