//! In-memory cache of encoded programs.
//!
//! Entries are keyed by the SHA-256 of the source text and hold the codec
//! encoding, so a hit skips lexing and parsing and only pays for decoding.

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use tern_types::ast::Program;

/// SHA-256 digest of a source text.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceHash([u8; 32]);

impl SourceHash {
    pub fn of(source: &str) -> Self {
        Self(Sha256::digest(source.as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for SourceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SourceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceHash({})", &self.to_hex()[..12])
    }
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct ProgramCache {
    entries: HashMap<SourceHash, Vec<u8>>,
    stats: CacheStats,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the program for `source`, parsing and storing it on a miss.
    ///
    /// Parse errors are not cached; the next call parses again.
    pub fn load(&mut self, source: &str) -> Result<Program> {
        let key = SourceHash::of(source);
        if let Some(bytes) = self.entries.get(&key) {
            self.stats.hits += 1;
            tracing::debug!(hash = ?key, "program cache hit");
            return Ok(tern_codec::decode_program(bytes)?);
        }

        self.stats.misses += 1;
        tracing::debug!(hash = ?key, "program cache miss");
        let program = tern_parser::parse(source)?;
        self.entries.insert(key, tern_codec::encode_program(&program)?);
        Ok(program)
    }

    /// Store already encoded bytes for `source`, replacing any entry.
    pub fn insert(&mut self, source: &str, bytes: Vec<u8>) {
        self.entries.insert(SourceHash::of(source), bytes);
    }

    /// The encoded bytes cached for `source`, if any. Does not touch the counters.
    pub fn get(&self, source: &str) -> Option<&[u8]> {
        self.entries.get(&SourceHash::of(source)).map(Vec::as_slice)
    }

    pub fn contains(&self, source: &str) -> bool {
        self.entries.contains_key(&SourceHash::of(source))
    }

    pub fn remove(&mut self, source: &str) -> Option<Vec<u8>> {
        self.entries.remove(&SourceHash::of(source))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::default();
    }
}
