//! Tern parser: converts a token stream into an AST.
//!
//! ```text
//! source text → Lexer → tokens → Parser → Program
//! ```

mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{ParseResult, Parser};

use tern_lexer::Lexer;
use tern_types::ast::Program;
use tern_types::SourceFile;

/// Lex and parse a source file.
pub fn parse_file(source_file: &SourceFile) -> ParseResult<Program> {
    let tokens = Lexer::new(source_file).lex()?;
    Parser::new(tokens, source_file).parse()
}

/// Lex and parse source text under the file name `<script>`.
pub fn parse(source: &str) -> ParseResult<Program> {
    parse_file(&SourceFile::new("<script>", source))
}
