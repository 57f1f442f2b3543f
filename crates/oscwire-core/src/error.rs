//! Error types for oscwire

use thiserror::Error;

/// Result type alias for oscwire operations
pub type Result<T> = std::result::Result<T, Error>;

/// oscwire error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Empty method, separator inside a segment, or pattern syntax where a
    /// literal path is required
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    /// Unknown single-character type tag
    #[error("unsupported type tag: 0x{0:02x}")]
    UnsupportedTypeTag(u8),

    /// Type tag string is empty or lacks the leading comma
    #[error("missing type tag string")]
    MissingTypeTags,

    /// Leading bytes are neither `#bundle` nor `/`
    #[error("unrecognized packet")]
    UnrecognizedPacket,

    /// Wrong bundle magic or a child length that disagrees with its contents
    #[error("bundle framing error: {0}")]
    BundleFraming(String),

    /// Reader ran off the end of its buffer
    #[error("buffer too small: need {needed} bytes, have {have}")]
    BufferTooSmall { needed: usize, have: usize },

    /// String payload is not NUL-terminated or not valid UTF-8
    #[error("invalid string: {0}")]
    InvalidString(String),

    /// Payload does not fit the 32-bit length fields of the wire format
    #[error("payload too large: {0} bytes")]
    PacketTooLarge(usize),
}

impl Error {
    /// True for errors confined to a single message's argument list.
    ///
    /// Inside a bundle the child length prefix lets the reader skip past
    /// such a message and carry on with its siblings.
    pub fn is_message_local(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedTypeTag(_)
                | Error::MissingTypeTags
                | Error::MalformedAddress(_)
                | Error::InvalidString(_)
        )
    }
}
