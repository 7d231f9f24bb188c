//! Tern AST codec.
//!
//! Encodes parsed statements to a compact binary form and back, so hosts can
//! cache programs without re-parsing them.
//!
//! # Format
//!
//! bincode with fixed-width little-endian integers:
//! - every enum value starts with its variant index as a `u32`
//! - strings and sequences carry a `u64` length prefix
//! - `Option` is a one-byte tag (0 or 1) followed by the value
//! - a [`Position`] is its line then its column, each an `i32` (8 bytes)
//!
//! Children follow their parent depth-first in field order. The variant
//! order of the AST enums is therefore part of the format. There is no
//! header or version byte; callers that persist streams across releases
//! version them externally.
//!
//! Decoding never panics on bad input: short streams, unknown
//! discriminants, lengths past [`MAX_ENCODED_LEN`], trees nested deeper than
//! [`MAX_NESTING_DEPTH`] and trailing bytes all come back as a
//! [`DecodeError`].

mod error;

pub use error::{DecodeError, EncodeError};
pub use tern_types::nesting::MAX_NESTING_DEPTH;

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tern_types::ast::{Program, Stmt};
use tern_types::Position;

/// Upper bound on an encoded stream, and on what decoding will allocate.
pub const MAX_ENCODED_LEN: u64 = 64 * 1024 * 1024;

/// Encoded size of a [`Position`].
pub const POSITION_LEN: usize = 8;

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_ENCODED_LEN)
        .reject_trailing_bytes()
}

// ══════════════════════════════════════════════════════════════════════════════
// Nodes
// ══════════════════════════════════════════════════════════════════════════════

/// Encode any AST node (or [`Position`]).
pub fn encode_node<T: Serialize + ?Sized>(node: &T) -> Result<Vec<u8>, EncodeError> {
    let bytes = options().serialize(node)?;
    tracing::trace!(bytes = bytes.len(), "encoded node");
    Ok(bytes)
}

/// Decode a single node of type `T`. The whole input must be consumed.
pub fn decode_node<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    let node = options().deserialize(bytes)?;
    tracing::trace!(bytes = bytes.len(), "decoded node");
    Ok(node)
}

pub fn encode_position(position: Position) -> Result<Vec<u8>, EncodeError> {
    encode_node(&position)
}

pub fn decode_position(bytes: &[u8]) -> Result<Position, DecodeError> {
    decode_node(bytes)
}

// ══════════════════════════════════════════════════════════════════════════════
// Statement sequences
// ══════════════════════════════════════════════════════════════════════════════

/// Encode a sequence of statements.
pub fn encode(stmts: &[Stmt]) -> Result<Vec<u8>, EncodeError> {
    let bytes = encode_node(stmts)?;
    tracing::debug!(statements = stmts.len(), bytes = bytes.len(), "encoded program");
    Ok(bytes)
}

/// Decode a sequence of statements produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<Vec<Stmt>, DecodeError> {
    let stmts: Vec<Stmt> = decode_node(bytes)?;
    tracing::debug!(statements = stmts.len(), bytes = bytes.len(), "decoded program");
    Ok(stmts)
}

/// Decode into `dest`, replacing its contents. On error `dest` is left
/// exactly as it was.
pub fn decode_into(bytes: &[u8], dest: &mut Vec<Stmt>) -> Result<(), DecodeError> {
    *dest = decode(bytes)?;
    Ok(())
}

pub fn encode_program(program: &Program) -> Result<Vec<u8>, EncodeError> {
    encode(&program.stmts)
}

pub fn decode_program(bytes: &[u8]) -> Result<Program, DecodeError> {
    decode(bytes).map(Program::new)
}
