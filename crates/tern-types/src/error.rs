use crate::Position;
use serde::Serialize;

/// A syntax error. Parsing stops at the first one.
///
/// Serializable so hosts can hand it to tooling as structured output
/// instead of parsing the message text.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{file}:{position}: {message}")]
pub struct ParseError {
    /// Source file name.
    pub file: String,
    /// Where the offending token starts.
    pub position: Position,
    /// What the parser expected, in words.
    pub message: String,
    /// The exact source line for context.
    pub source_line: String,
}

impl ParseError {
    /// Create a new error.
    pub fn new(
        file: impl Into<String>,
        position: Position,
        message: impl Into<String>,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            position,
            message: message.into(),
            source_line: source_line.into(),
        }
    }
}
