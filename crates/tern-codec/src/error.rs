//! Codec error types.

/// A byte stream that does not decode to a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The stream ended inside a value.
    #[error("truncated input")]
    Truncated,
    /// A discriminant names no variant of the expected node type.
    #[error("unknown variant: {0}")]
    UnknownVariant(String),
    /// Anything else: bad UTF-8, a length over the limit, nesting past the
    /// depth limit, trailing bytes.
    #[error("malformed input: {0}")]
    Malformed(String),
}

impl From<bincode::Error> for DecodeError {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(ref io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                DecodeError::Truncated
            }
            bincode::ErrorKind::InvalidTagEncoding(tag) => {
                DecodeError::UnknownVariant(format!("tag {tag}"))
            }
            bincode::ErrorKind::Custom(ref msg) if msg.contains("variant index") => {
                DecodeError::UnknownVariant(msg.clone())
            }
            other => DecodeError::Malformed(other.to_string()),
        }
    }
}

/// A tree that could not be encoded (only possible past the size limit).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("encode failed: {0}")]
pub struct EncodeError(pub String);

impl From<bincode::Error> for EncodeError {
    fn from(err: bincode::Error) -> Self {
        EncodeError(err.to_string())
    }
}
