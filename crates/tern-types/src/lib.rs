//! Shared types for the Tern interpreter.
//!
//! This crate defines the AST node types, source positions, parse errors,
//! and other shared data structures used by every stage.

mod error;
mod position;
pub mod ast;
pub mod nesting;

pub use error::ParseError;
pub use position::{Node, Position, SourceFile};

/// Result type used by the lexer and parser.
pub type Result<T> = std::result::Result<T, ParseError>;
