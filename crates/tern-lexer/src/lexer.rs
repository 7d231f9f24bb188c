//! Core lexer: converts source text to a token stream.
//!
//! Features:
//! - Decimal, hex, and float literals (`42`, `0x2a`, `1.5`, `1.3e3`)
//! - Double-quoted strings with escapes, back-quoted raw strings
//! - Line comments (`//`, `#`) and block comments (`/* */`) stripped
//! - Newlines kept as tokens (statement separators), runs collapsed to one
//! - Stops at the first error: there is no recovery

use tern_types::{ParseError, Position, SourceFile};

use crate::token::{Token, TokenKind};

/// Result of lexing: the token stream (always ending in [`TokenKind::Eof`]),
/// or the first error.
pub type LexResult = Result<Vec<Token>, ParseError>;

/// The Tern lexer.
pub struct Lexer<'src> {
    /// The full source text as bytes.
    source: &'src [u8],
    /// Source file for error reporting.
    source_file: &'src SourceFile,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: i32,
    /// Current column number (1-based, counted in characters).
    col: i32,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: source_file.source.as_bytes(),
            source_file,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Lex the entire source file into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            let token = self.scan_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            let repeated_newline = token.kind == TokenKind::Newline
                && tokens.last().is_none_or(|t| t.kind == TokenKind::Newline);
            if !repeated_newline {
                tokens.push(token);
            }
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // UTF-8 continuation bytes do not start a new column.
            self.col += 1;
        }
        Some(ch)
    }

    fn current_pos(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn error(&self, message: impl Into<String>, pos: Position) -> ParseError {
        let source_line = self.source_file.line(pos.line).unwrap_or("");
        ParseError::new(&self.source_file.name, pos, message, source_line)
    }

    /// Text between `start` and the cursor. The source came from a `&str`
    /// and tokens only split on ASCII bytes, so the slice is valid UTF-8.
    fn text_from(&self, start: usize) -> &'src str {
        std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("")
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip spaces, tabs and comments (not newlines, which are tokens).
    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b' ' | b'\t' | b'\r'), _) => {
                    self.advance();
                }
                (Some(b'#'), _) | (Some(b'/'), Some(b'/')) => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some(b'/'), Some(b'*')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ParseError> {
        let start = self.current_pos();
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated block comment", start)),
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.advance();
                    self.advance();
                    return Ok(());
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    fn scan_token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia()?;

        let start = self.current_pos();
        let start_offset = self.pos;
        let Some(ch) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, start));
        };

        let kind = match ch {
            b'\n' => TokenKind::Newline,
            b'"' => self.scan_string(start)?,
            b'`' => self.scan_raw_string(start)?,
            b'0'..=b'9' => self.scan_number(start, start_offset)?,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(start_offset),

            b'+' => self.pick(&[(b'+', TokenKind::PlusPlus), (b'=', TokenKind::PlusEq)], TokenKind::Plus),
            b'-' => self.pick(&[(b'-', TokenKind::MinusMinus), (b'=', TokenKind::MinusEq)], TokenKind::Minus),
            b'*' => self.pick(&[(b'*', TokenKind::StarStar), (b'=', TokenKind::StarEq)], TokenKind::Star),
            b'/' => self.pick(&[(b'=', TokenKind::SlashEq)], TokenKind::Slash),
            b'%' => TokenKind::Percent,
            b'=' => self.pick(&[(b'=', TokenKind::EqEq)], TokenKind::Eq),
            b'!' => self.pick(&[(b'=', TokenKind::BangEq)], TokenKind::Bang),
            b'<' => self.pick(&[(b'=', TokenKind::LessEq), (b'<', TokenKind::Shl)], TokenKind::Less),
            b'>' => self.pick(&[(b'=', TokenKind::GreaterEq), (b'>', TokenKind::Shr)], TokenKind::Greater),
            b'&' => self.pick(&[(b'&', TokenKind::AmpAmp), (b'=', TokenKind::AmpEq)], TokenKind::Amp),
            b'|' => self.pick(&[(b'|', TokenKind::PipePipe), (b'=', TokenKind::PipeEq)], TokenKind::Pipe),
            b'^' => TokenKind::Caret,
            b'?' => TokenKind::Question,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semicolon,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,

            _ => {
                // Report the whole character, not just its first byte.
                while self.peek().is_some_and(|b| b & 0xC0 == 0x80) {
                    self.advance();
                }
                let text = self.text_from(start_offset);
                return Err(self.error(format!("unexpected character '{text}'"), start));
            }
        };
        Ok(Token::new(kind, start))
    }

    /// Consume one more byte if it matches one of `options`, otherwise
    /// return `single`.
    fn pick(&mut self, options: &[(u8, TokenKind)], single: TokenKind) -> TokenKind {
        if let Some(next) = self.peek() {
            for (byte, kind) in options {
                if *byte == next {
                    self.advance();
                    return kind.clone();
                }
            }
        }
        single
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    fn scan_number(&mut self, start: Position, start_offset: usize) -> Result<TokenKind, ParseError> {
        let first = self.source[start_offset];
        if first == b'0' && matches!(self.peek(), Some(b'x' | b'X')) {
            self.advance();
            let digits_start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = self.text_from(digits_start);
            if digits.is_empty() {
                return Err(self.error("expected hex digits after '0x'", start));
            }
            return i64::from_str_radix(digits, 16)
                .map(TokenKind::IntLit)
                .map_err(|_| self.error(format!("integer literal '0x{digits}' out of range"), start));
        }

        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_float = true;
            self.advance(); // consume '.'
            while let Some(b'0'..=b'9') = self.peek() {
                self.advance();
            }
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some(b'+' | b'-')));
            if matches!(self.peek_at(1 + sign), Some(b'0'..=b'9')) {
                is_float = true;
                for _ in 0..=sign {
                    self.advance();
                }
                while let Some(b'0'..=b'9') = self.peek() {
                    self.advance();
                }
            }
        }

        let text = self.text_from(start_offset);
        if is_float {
            text.parse::<f64>()
                .map(TokenKind::FloatLit)
                .map_err(|_| self.error(format!("invalid float literal '{text}'"), start))
        } else {
            text.parse::<i64>()
                .map(TokenKind::IntLit)
                .map_err(|_| self.error(format!("integer literal '{text}' out of range"), start))
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start_offset: usize) -> TokenKind {
        // First character was already consumed (letter or `_`)
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        let text = self.text_from(start_offset);
        TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()))
    }

    // ─────────────────────────────────────────────────────────────
    // String literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a string literal starting after the opening `"`.
    fn scan_string(&mut self, start: Position) -> Result<TokenKind, ParseError> {
        let mut buf: Vec<u8> = Vec::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return Err(self.error("unterminated string literal", start));
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    let escaped = self.scan_escape_sequence()?;
                    buf.push(escaped);
                }
                Some(_) => {
                    if let Some(byte) = self.advance() {
                        buf.push(byte);
                    }
                }
            }
        }
        self.finish_string(buf, start)
    }

    /// Scan a raw string starting after the opening back-quote. Newlines are
    /// allowed and no escapes are processed.
    fn scan_raw_string(&mut self, start: Position) -> Result<TokenKind, ParseError> {
        let mut buf: Vec<u8> = Vec::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated raw string literal", start)),
                Some(b'`') => break,
                Some(byte) => buf.push(byte),
            }
        }
        self.finish_string(buf, start)
    }

    fn finish_string(&self, buf: Vec<u8>, start: Position) -> Result<TokenKind, ParseError> {
        String::from_utf8(buf)
            .map(TokenKind::StringLit)
            .map_err(|_| self.error("string literal is not valid UTF-8", start))
    }

    /// Scan an escape sequence at the `\`.
    fn scan_escape_sequence(&mut self) -> Result<u8, ParseError> {
        let start = self.current_pos();
        self.advance(); // consume the '\'
        match self.advance() {
            Some(b'"') => Ok(b'"'),
            Some(b'\\') => Ok(b'\\'),
            Some(b'n') => Ok(b'\n'),
            Some(b't') => Ok(b'\t'),
            Some(b'r') => Ok(b'\r'),
            Some(b'0') => Ok(0),
            Some(ch) => Err(self.error(
                format!("invalid escape sequence '\\{}'", ch as char),
                start,
            )),
            None => Err(self.error("unexpected end of file in escape sequence", start)),
        }
    }
}
