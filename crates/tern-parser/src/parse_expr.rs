//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 1. `? :` (ternary, right-associative)
//! 2. `||`
//! 3. `&&`
//! 4. `|`
//! 5. `^`
//! 6. `&`
//! 7. `==`, `!=`
//! 8. `<`, `<=`, `>`, `>=`
//! 9. `<<`, `>>`
//! 10. `+`, `-`
//! 11. `*`, `/`, `%`
//! 12. unary `!`, `-`, `^`
//! 13. `**` (right-associative; binds tighter than a unary prefix)
//! 14. postfix `()` call, `[]` index, `.` member

use std::rc::Rc;

use tern_lexer::token::TokenKind;
use tern_types::ast::*;

use crate::parser::{ParseResult, Parser};

/// One rung of the binary-operator ladder: which tokens it accepts.
type OpTable = &'static [(TokenKind, BinOp)];

const LADDER: &[OpTable] = &[
    &[(TokenKind::PipePipe, BinOp::Or)],
    &[(TokenKind::AmpAmp, BinOp::And)],
    &[(TokenKind::Pipe, BinOp::BitOr)],
    &[(TokenKind::Caret, BinOp::BitXor)],
    &[(TokenKind::Amp, BinOp::BitAnd)],
    &[(TokenKind::EqEq, BinOp::Eq), (TokenKind::BangEq, BinOp::NotEq)],
    &[
        (TokenKind::Less, BinOp::Less),
        (TokenKind::LessEq, BinOp::LessEq),
        (TokenKind::Greater, BinOp::Greater),
        (TokenKind::GreaterEq, BinOp::GreaterEq),
    ],
    &[(TokenKind::Shl, BinOp::Shl), (TokenKind::Shr, BinOp::Shr)],
    &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
    &[
        (TokenKind::Star, BinOp::Mul),
        (TokenKind::Slash, BinOp::Div),
        (TokenKind::Percent, BinOp::Mod),
    ],
];

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.nested(Self::parse_ternary)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Ternary = BinaryExpr [ "?" Expression ":" Ternary ]`
    fn parse_ternary(&mut self) -> ParseResult<Expr> {
        let condition = self.parse_binary(0)?;
        if !self.check(&TokenKind::Question) {
            return Ok(condition);
        }
        let pos = self.advance().pos;
        self.skip_newlines();
        let then_expr = self.parse_expression()?;
        self.skip_newlines();
        self.expect(&TokenKind::Colon)?;
        self.skip_newlines();
        let else_expr = self.nested(Self::parse_ternary)?;
        Ok(Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            pos,
        ))
    }

    /// Left-associative binary operators, one ladder rung per `level`.
    fn parse_binary(&mut self, level: usize) -> ParseResult<Expr> {
        let Some(table) = LADDER.get(level) else {
            return self.parse_unary();
        };
        let mut left = self.parse_binary(level + 1)?;
        while let Some(op) = Self::match_op(table, self.peek_kind()) {
            let pos = self.advance().pos;
            // An operator at the end of a line continues the expression.
            self.skip_newlines();
            let right = self.parse_binary(level + 1)?;
            left = Expr::new(
                ExprKind::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                pos,
            );
        }
        Ok(left)
    }

    fn match_op(table: OpTable, kind: &TokenKind) -> Option<BinOp> {
        table
            .iter()
            .find(|(token, _)| token == kind)
            .map(|(_, op)| *op)
    }

    /// `UnaryExpr = ( "!" | "-" | "^" ) UnaryExpr | PowerExpr`
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Caret => UnaryOp::BitNot,
            _ => return self.parse_power(),
        };
        let pos = self.advance().pos;
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            pos,
        ))
    }

    /// `PowerExpr = PostfixExpr [ "**" UnaryExpr ]`
    fn parse_power(&mut self) -> ParseResult<Expr> {
        let base = self.parse_postfix()?;
        if !self.check(&TokenKind::StarStar) {
            return Ok(base);
        }
        let pos = self.advance().pos;
        let exponent = self.nested(Self::parse_unary)?;
        Ok(Expr::new(
            ExprKind::Binary {
                left: Box::new(base),
                op: BinOp::Pow,
                right: Box::new(exponent),
            },
            pos,
        ))
    }

    /// `PostfixExpr = PrimaryExpr { "(" Args ")" | "[" Expr "]" | "." Name }`
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let pos = self.current_pos();
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_comma_list(&TokenKind::RParen)?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        pos,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    self.skip_newlines();
                    let index = self.parse_expression()?;
                    self.skip_newlines();
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::new(
                        ExprKind::Index {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        pos,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_member_name()?;
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            name,
                        },
                        pos,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse a primary expression.
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let pos = self.current_pos();
        let kind = match self.peek_kind().clone() {
            // ── Literals ────────────────────────────────────────────────
            TokenKind::IntLit(n) => ExprKind::Int(n),
            TokenKind::FloatLit(n) => ExprKind::Float(n),
            TokenKind::StringLit(s) => ExprKind::Str(s),
            TokenKind::True => ExprKind::Bool(true),
            TokenKind::False => ExprKind::Bool(false),
            TokenKind::Nil => ExprKind::Nil,
            TokenKind::Identifier(name) => ExprKind::Ident(name),

            // ── Collections ─────────────────────────────────────────────
            TokenKind::LBracket => {
                self.advance();
                let elems = self.parse_comma_list(&TokenKind::RBracket)?;
                return Ok(Expr::new(ExprKind::Array(elems), pos));
            }
            TokenKind::LBrace => return self.parse_map_literal(),

            // ── Grouping ────────────────────────────────────────────────
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(&TokenKind::RParen)?;
                return Ok(Expr::new(ExprKind::Paren(Box::new(inner)), pos));
            }

            // ── Function literal ────────────────────────────────────────
            TokenKind::Func => return self.parse_func_literal(),

            other => {
                return Err(self.error_at_current(format!("expected expression, got '{other}'")));
            }
        };
        self.advance();
        Ok(Expr::new(kind, pos))
    }

    /// Parse comma-separated expressions up to and including `close`.
    /// Newlines and a trailing comma are allowed.
    fn parse_comma_list(&mut self, close: &TokenKind) -> ParseResult<Vec<Expr>> {
        let mut items = Vec::new();
        self.skip_newlines();
        while !self.check(close) {
            items.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(close)?;
        Ok(items)
    }

    /// `{ "key": expr, ident: expr, ... }`
    fn parse_map_literal(&mut self) -> ParseResult<Expr> {
        let pos = self.expect(&TokenKind::LBrace)?.pos;
        let mut entries = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RBrace) {
            let key = match self.peek_kind().clone() {
                TokenKind::StringLit(s) => {
                    self.advance();
                    s
                }
                TokenKind::Identifier(name) => {
                    self.advance();
                    name
                }
                other => {
                    return Err(self.error_at_current(format!("expected map key, got '{other}'")));
                }
            };
            self.skip_newlines();
            self.expect(&TokenKind::Colon)?;
            self.skip_newlines();
            let value = self.parse_expression()?;
            entries.push(MapEntry { key, value });
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::new(ExprKind::Map(entries), pos))
    }

    /// `func [name](params) { body }`
    fn parse_func_literal(&mut self) -> ParseResult<Expr> {
        let pos = self.expect(&TokenKind::Func)?.pos;
        let name = match self.peek_kind() {
            TokenKind::Identifier(_) => Some(self.expect_identifier()?),
            _ => None,
        };
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::RParen) {
            params.push(self.expect_identifier()?);
            self.skip_newlines();
            if !self.eat(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(&TokenKind::RParen)?;

        // A function body starts a fresh loop context.
        let outer_loops = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.parse_block();
        self.loop_depth = outer_loops;

        let lit = FuncLit {
            name,
            params,
            body: body?,
            pos,
        };
        Ok(Expr::new(ExprKind::Func(Rc::new(lit)), pos))
    }
}
