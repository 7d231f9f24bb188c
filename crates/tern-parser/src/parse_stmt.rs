//! Statement parsing.

use crate::parser::{ParseResult, Parser};
use tern_lexer::token::TokenKind;
use tern_types::ast::*;

impl<'src> Parser<'src> {
    /// Parse a block of statements: `{ stmts... }`
    pub(crate) fn parse_block(&mut self) -> ParseResult<Block> {
        let pos = self.expect(&TokenKind::LBrace)?.pos;
        let stmts = self.parse_stmts_until(|k| matches!(k, TokenKind::RBrace))?;
        self.expect(&TokenKind::RBrace)?;
        Ok(Block { stmts, pos })
    }

    /// Parse a loop body, tracking loop depth for `break`/`continue`.
    fn parse_loop_body(&mut self) -> ParseResult<Block> {
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        body
    }

    /// Parse statements until `stop` matches the current token (or end of
    /// file). The stop token is not consumed.
    fn parse_stmts_until(&mut self, stop: fn(&TokenKind) -> bool) -> ParseResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        self.skip_separators();
        while !stop(self.peek_kind()) && !self.at_end() {
            stmts.push(self.parse_statement()?);
            self.expect_terminator()?;
            self.skip_separators();
        }
        Ok(stmts)
    }

    /// Parse a single statement.
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Stmt> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> ParseResult<Stmt> {
        match self.peek_kind() {
            TokenKind::If => {
                let if_stmt = self.parse_if()?;
                let pos = if_stmt.pos;
                Ok(Stmt::new(StmtKind::If(if_stmt), pos))
            }
            TokenKind::For => self.parse_for(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break | TokenKind::Continue => self.parse_loop_jump(),
            _ => self.parse_simple_stmt(),
        }
    }

    /// Expression, `var`, assignment, compound assignment or `++`/`--`.
    /// These are the forms allowed in a C-style `for` header.
    pub(crate) fn parse_simple_stmt(&mut self) -> ParseResult<Stmt> {
        let pos = self.current_pos();
        if self.eat(&TokenKind::Var) {
            let name = self.expect_identifier()?;
            self.expect(&TokenKind::Eq)?;
            let value = self.parse_expression()?;
            return Ok(Stmt::new(StmtKind::Var { name, value }, pos));
        }

        let target = self.parse_expression()?;
        let compound = match self.peek_kind() {
            TokenKind::Eq => {
                self.advance();
                let value = self.parse_expression()?;
                return Ok(Stmt::new(StmtKind::Assign { target, value }, pos));
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if self.advance().kind == TokenKind::PlusPlus {
                    IncDecOp::Inc
                } else {
                    IncDecOp::Dec
                };
                return Ok(Stmt::new(StmtKind::IncDec { target, op }, pos));
            }
            TokenKind::PlusEq => BinOp::Add,
            TokenKind::MinusEq => BinOp::Sub,
            TokenKind::StarEq => BinOp::Mul,
            TokenKind::SlashEq => BinOp::Div,
            TokenKind::AmpEq => BinOp::BitAnd,
            TokenKind::PipeEq => BinOp::BitOr,
            _ => return Ok(Stmt::new(StmtKind::Expr(target), pos)),
        };
        self.advance();
        let value = self.parse_expression()?;
        Ok(Stmt::new(
            StmtKind::CompoundAssign {
                target,
                op: compound,
                value,
            },
            pos,
        ))
    }

    /// `if cond { ... } [else if ... | else { ... }]`
    fn parse_if(&mut self) -> ParseResult<IfStmt> {
        let pos = self.expect(&TokenKind::If)?.pos;
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;

        // `else` may sit on the line after the closing brace.
        if self.check(&TokenKind::Newline) && *self.look_ahead(1) == TokenKind::Else {
            self.advance();
        }
        let else_branch = if self.eat(&TokenKind::Else) {
            if self.check(&TokenKind::If) {
                Some(ElseBranch::ElseIf(Box::new(self.nested(Self::parse_if)?)))
            } else {
                Some(ElseBranch::Block(self.parse_block()?))
            }
        } else {
            None
        };

        Ok(IfStmt {
            condition,
            then_block,
            else_branch,
            pos,
        })
    }

    /// The three loop forms:
    /// - `for key [, value] in iterable { ... }`
    /// - `for [cond] { ... }`
    /// - `for [init]; [cond]; [post] { ... }`
    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let pos = self.expect(&TokenKind::For)?.pos;

        if self.check(&TokenKind::LBrace) {
            let body = self.parse_loop_body()?;
            return Ok(Stmt::new(StmtKind::ForCond { condition: None, body }, pos));
        }

        if self.at_range_header() {
            let key = self.expect_identifier()?;
            let value = if self.eat(&TokenKind::Comma) {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            self.expect(&TokenKind::In)?;
            let iterable = self.parse_expression()?;
            let body = self.parse_loop_body()?;
            return Ok(Stmt::new(
                StmtKind::ForIn {
                    key,
                    value,
                    iterable,
                    body,
                },
                pos,
            ));
        }

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_simple_stmt()?)
        };

        if !self.eat(&TokenKind::Semicolon) {
            let body_pos = self.current_pos();
            return match init {
                Some(Stmt {
                    kind: StmtKind::Expr(condition),
                    ..
                }) => {
                    let body = self.parse_loop_body()?;
                    Ok(Stmt::new(
                        StmtKind::ForCond {
                            condition: Some(condition),
                            body,
                        },
                        pos,
                    ))
                }
                _ => Err(self.error_at("expected loop condition or ';'", body_pos)),
            };
        }

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;
        let post = if self.check(&TokenKind::LBrace) {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt()?))
        };
        let body = self.parse_loop_body()?;
        Ok(Stmt::new(
            StmtKind::ForC {
                init: init.map(Box::new),
                condition,
                post,
                body,
            },
            pos,
        ))
    }

    /// `ident in` or `ident, ident in`
    fn at_range_header(&self) -> bool {
        if !matches!(self.look_ahead(0), TokenKind::Identifier(_)) {
            return false;
        }
        match self.look_ahead(1) {
            TokenKind::In => true,
            TokenKind::Comma => {
                matches!(self.look_ahead(2), TokenKind::Identifier(_))
                    && *self.look_ahead(3) == TokenKind::In
            }
            _ => false,
        }
    }

    /// `switch subject { case a, b: ... default: ... }`
    fn parse_switch(&mut self) -> ParseResult<Stmt> {
        let pos = self.expect(&TokenKind::Switch)?.pos;
        let subject = self.parse_expression()?;
        self.expect(&TokenKind::LBrace)?;
        self.skip_separators();

        let mut cases = Vec::new();
        let mut default = None;
        while !self.check(&TokenKind::RBrace) {
            let clause_pos = self.current_pos();
            match self.peek_kind() {
                TokenKind::Case => {
                    self.advance();
                    let mut exprs = vec![self.parse_expression()?];
                    while self.eat(&TokenKind::Comma) {
                        self.skip_newlines();
                        exprs.push(self.parse_expression()?);
                    }
                    self.expect(&TokenKind::Colon)?;
                    let stmts = self.parse_case_body()?;
                    cases.push(SwitchCase {
                        exprs,
                        body: Block {
                            stmts,
                            pos: clause_pos,
                        },
                        pos: clause_pos,
                    });
                }
                TokenKind::Default => {
                    if default.is_some() {
                        return Err(self.error_at_current("multiple 'default' clauses in switch"));
                    }
                    self.advance();
                    self.expect(&TokenKind::Colon)?;
                    let stmts = self.parse_case_body()?;
                    default = Some(Block {
                        stmts,
                        pos: clause_pos,
                    });
                }
                other => {
                    return Err(
                        self.error_at_current(format!("expected 'case' or 'default', got '{other}'"))
                    );
                }
            }
        }
        self.expect(&TokenKind::RBrace)?;

        Ok(Stmt::new(
            StmtKind::Switch {
                subject,
                cases,
                default,
            },
            pos,
        ))
    }

    fn parse_case_body(&mut self) -> ParseResult<Vec<Stmt>> {
        self.parse_stmts_until(|k| {
            matches!(k, TokenKind::Case | TokenKind::Default | TokenKind::RBrace)
        })
    }

    /// `return` or `return a, b, ...`
    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let pos = self.expect(&TokenKind::Return)?.pos;
        let mut values = Vec::new();
        if !self.peek_kind().is_terminator() {
            values.push(self.parse_expression()?);
            while self.eat(&TokenKind::Comma) {
                values.push(self.parse_expression()?);
            }
        }
        Ok(Stmt::new(StmtKind::Return(values), pos))
    }

    /// `break` / `continue`, only valid inside a loop of the same function.
    fn parse_loop_jump(&mut self) -> ParseResult<Stmt> {
        let token = self.advance();
        if self.loop_depth == 0 {
            return Err(self.error_at(format!("'{}' outside of loop", token.kind), token.pos));
        }
        let kind = if token.kind == TokenKind::Break {
            StmtKind::Break
        } else {
            StmtKind::Continue
        };
        Ok(Stmt::new(kind, token.pos))
    }
}
