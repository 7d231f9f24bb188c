//! Token types for the Tern lexer.
//!
//! Defines [`TokenKind`] covering every lexeme in the language and
//! [`Token`], which pairs a kind with a source [`Position`].

use std::fmt;
use tern_types::Position;

/// All reserved identifiers.
///
/// These cannot be used as variable names. The lexer recognises each one and
/// emits a specific keyword token instead of [`TokenKind::Identifier`].
pub const ALL_KEYWORDS: &[&str] = &[
    "func", "return", "var", "if", "else", "for", "in", "break", "continue", "switch", "case",
    "default", "nil", "true", "false",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Where the token starts.
    pub pos: Position,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    /// `42`, `0x2a`
    IntLit(i64),
    /// `3.14`, `1.3e3`
    FloatLit(f64),
    /// `"hello"` or `` `raw` ``
    StringLit(String),
    /// `true`
    True,
    /// `false`
    False,
    /// `nil`
    Nil,

    /// User-defined identifier: `my_var`, `toString`
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────
    Func,
    Return,
    Var,
    If,
    Else,
    For,
    In,
    Break,
    Continue,
    Switch,
    Case,
    Default,

    // ── Arithmetic ───────────────────────────────────────────
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,

    // ── Assignment ───────────────────────────────────────────
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    AmpEq,
    PipeEq,

    // ── Comparison ───────────────────────────────────────────
    EqEq,
    BangEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,

    // ── Bitwise & logical ────────────────────────────────────
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    AmpAmp,
    PipePipe,
    Bang,

    // ── Punctuation ──────────────────────────────────────────
    Question,
    Colon,
    Comma,
    Dot,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // ── Special ──────────────────────────────────────────────
    /// Statement separator.
    Newline,
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Map a keyword string to its token, or `None` for plain identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        let kind = match s {
            "func" => TokenKind::Func,
            "return" => TokenKind::Return,
            "var" => TokenKind::Var,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "nil" => TokenKind::Nil,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns `true` for reserved words.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Func
                | TokenKind::Return
                | TokenKind::Var
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::For
                | TokenKind::In
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Switch
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::Nil
                | TokenKind::True
                | TokenKind::False
        )
    }

    /// Returns `true` if this token ends a simple statement.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::IntLit(n) => return write!(f, "{n}"),
            TokenKind::FloatLit(n) => return write!(f, "{n}"),
            TokenKind::StringLit(s) => return write!(f, "\"{s}\""),
            TokenKind::Identifier(name) => return f.write_str(name),
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Nil => "nil",
            TokenKind::Func => "func",
            TokenKind::Return => "return",
            TokenKind::Var => "var",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Switch => "switch",
            TokenKind::Case => "case",
            TokenKind::Default => "default",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::StarStar => "**",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::SlashEq => "/=",
            TokenKind::AmpEq => "&=",
            TokenKind::PipeEq => "|=",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEq => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEq => ">=",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::Bang => "!",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Newline => "newline",
            TokenKind::Eof => "end of file",
        };
        f.write_str(s)
    }
}
