//! Core parser infrastructure: token cursor, error reporting, helpers.

use tern_lexer::token::{Token, TokenKind};
use tern_stack::ensure_sufficient_stack;
use tern_types::ast::Program;
use tern_types::nesting::{self, MAX_NESTING_DEPTH};
use tern_types::{ParseError, Position, SourceFile};

/// Result alias used by every parse routine.
pub type ParseResult<T> = Result<T, ParseError>;

/// The Tern parser.
///
/// Consumes a token stream produced by the lexer and builds an AST.
/// The first syntax error aborts parsing; there is no recovery.
pub struct Parser<'src> {
    /// The token stream.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Source file for error context.
    source_file: &'src SourceFile,
    /// Number of loops enclosing the current statement, reset at each
    /// function literal. `break`/`continue` need it to be non-zero.
    pub(crate) loop_depth: u32,
    /// Statements and expressions currently being parsed, innermost last.
    nesting: usize,
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and source file.
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            source_file,
            loop_depth: 0,
            nesting: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token kind without advancing.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        self.look_ahead(0)
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = match self.tokens.get(self.pos) {
            Some(token) => token.clone(),
            None => Token::new(TokenKind::Eof, self.current_pos()),
        };
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Returns the position of the current token.
    pub(crate) fn current_pos(&self) -> Position {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.pos)
            .unwrap_or_else(|| Position::new(1, 1))
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    // ── Separators ────────────────────────────────────────────────────────────

    /// Skip all consecutive newline tokens.
    pub(crate) fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// Skip newlines and semicolons between statements.
    pub(crate) fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// A simple statement must be followed by a newline, `;`, `}` or end of
    /// file. Only the first two are consumed.
    pub(crate) fn expect_terminator(&mut self) -> ParseResult<()> {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            other => Err(self.error_at_current(format!("expected newline or ';', got '{other}'"))),
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind and consume it.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> ParseResult<Token> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(self.error_at_current(format!(
                "expected '{}', got '{}'",
                expected,
                self.peek_kind()
            )))
        }
    }

    /// Expect an identifier token. Returns the name.
    pub(crate) fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.peek_kind() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error_at_current(format!("expected identifier, got '{other}'"))),
        }
    }

    /// Expect an identifier OR a keyword used as a member name after `.`
    /// (e.g. `resp.default`).
    pub(crate) fn expect_member_name(&mut self) -> ParseResult<String> {
        let kind = self.peek_kind().clone();
        match kind {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ if kind.is_keyword() => {
                self.advance();
                Ok(kind.to_string())
            }
            other => Err(self.error_at_current(format!("expected member name, got '{other}'"))),
        }
    }

    // ── Nesting ───────────────────────────────────────────────────────────────

    /// Run one recursive parse step one level deeper.
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.nesting >= MAX_NESTING_DEPTH {
            return Err(self.error_at_current("nesting too deep"));
        }
        self.nesting += 1;
        let result = ensure_sufficient_stack(|| parse(self));
        self.nesting -= 1;
        result
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Build an error at the current token position.
    pub(crate) fn error_at_current(&self, message: impl Into<String>) -> ParseError {
        self.error_at(message, self.current_pos())
    }

    /// Build an error at a specific position.
    pub(crate) fn error_at(&self, message: impl Into<String>, pos: Position) -> ParseError {
        let source_line = self.source_file.line(pos.line).unwrap_or("");
        ParseError::new(&self.source_file.name, pos, message, source_line)
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a `Program` AST.
    pub fn parse(mut self) -> ParseResult<Program> {
        let mut stmts = Vec::new();
        self.skip_separators();
        while !self.at_end() {
            let stmt = self.parse_statement()?;
            // Operator and postfix chains are built by loops, so only the
            // finished tree shows how deep they went.
            if !nesting::stmt_fits(&stmt, MAX_NESTING_DEPTH) {
                return Err(self.error_at("nesting too deep", stmt.pos));
            }
            stmts.push(stmt);
            self.expect_terminator()?;
            self.skip_separators();
        }
        tracing::trace!(file = %self.source_file.name, statements = stmts.len(), "parsed program");
        Ok(Program::new(stmts))
    }
}
