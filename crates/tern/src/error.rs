use tern_codec::{DecodeError, EncodeError};
use tern_eval::EvalError;
use tern_types::ParseError;

/// Anything that can go wrong between source text and a result value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

pub type Result<T> = std::result::Result<T, Error>;
