//! AST node types for the Tern language.
//!
//! Every node carries a [`Position`] for error reporting.
//! Large recursive types are boxed to keep enum sizes reasonable.
//!
//! The declaration order of every enum below is its binary discriminant in
//! encoded programs. Append new variants at the end; never reorder.

use crate::nesting::{DepthGuard, MAX_NESTING_DEPTH};
use crate::{Node, Position};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::rc::Rc;
use tern_stack::ensure_sufficient_stack;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete program: top-level statements in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

impl Program {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Self { stmts }
    }
}

/// `{ statements... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub pos: Position,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Position,
}

impl Stmt {
    pub fn new(kind: StmtKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}

/// The kind of statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// A bare expression.
    Expr(Expr),
    /// `var name = expr`: always binds in the innermost scope.
    Var { name: String, value: Expr },
    /// `target = value`
    Assign { target: Expr, value: Expr },
    /// `target += value` and friends. Evaluated as `target = target op value`
    /// with the target resolved once.
    CompoundAssign { target: Expr, op: BinOp, value: Expr },
    /// `target++` / `target--`
    IncDec { target: Expr, op: IncDecOp },
    /// `if cond { ... } [else if ... | else { ... }]`
    If(IfStmt),
    /// `for key [, value] in iterable { ... }`
    ForIn {
        key: String,
        value: Option<String>,
        iterable: Expr,
        body: Block,
    },
    /// `for [cond] { ... }`. No condition loops forever.
    ForCond { condition: Option<Expr>, body: Block },
    /// `for init; cond; post { ... }`
    ForC {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
    },
    /// `switch subject { case a, b: ... default: ... }`
    Switch {
        subject: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Block>,
    },
    /// `return [expr, ...]`
    Return(Vec<Expr>),
    /// `break`
    Break,
    /// `continue`
    Continue,
}

/// `if cond { ... } [else ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
    pub pos: Position,
}

/// The else branch of an if statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElseBranch {
    /// `else if cond { ... }`
    ElseIf(Box<IfStmt>),
    /// `else { ... }`
    Block(Block),
}

/// `case e1, e2: stmts...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub exprs: Vec<Expr>,
    pub body: Block,
    pub pos: Position,
}

/// `++` or `--`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncDecOp {
    Inc,
    Dec,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node. Uses `Box` for recursive variants.
///
/// Dropping is iterative: operator chains built by the parser's loops can be
/// far deeper than the native stack allows.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos: Position,
}

impl Expr {
    pub fn new(kind: ExprKind, pos: Position) -> Self {
        Self { kind, pos }
    }

    /// Move every direct child expression onto `out`, leaving this node
    /// without expression children.
    fn detach_children(&mut self, out: &mut Vec<Expr>) {
        fn take(boxed: &mut Box<Expr>) -> Expr {
            std::mem::replace(&mut **boxed, Expr::new(ExprKind::Nil, Position::default()))
        }
        match &mut self.kind {
            ExprKind::Array(items) => out.append(items),
            ExprKind::Map(entries) => out.extend(entries.drain(..).map(|entry| entry.value)),
            ExprKind::Call { callee, args } => {
                out.push(take(callee));
                out.append(args);
            }
            ExprKind::Index { object, index } => {
                out.push(take(object));
                out.push(take(index));
            }
            ExprKind::Member { object, .. } => out.push(take(object)),
            ExprKind::Binary { left, right, .. } => {
                out.push(take(left));
                out.push(take(right));
            }
            ExprKind::Unary { operand, .. } => out.push(take(operand)),
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                out.push(take(condition));
                out.push(take(then_expr));
                out.push(take(else_expr));
            }
            ExprKind::Paren(inner) => out.push(take(inner)),
            ExprKind::Nil
            | ExprKind::Bool(_)
            | ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Ident(_)
            | ExprKind::Func(_) => {}
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut child) = pending.pop() {
            child.detach_children(&mut pending);
        }
    }
}

/// The kind of expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    // ── Literals ──
    /// `nil`
    Nil,
    /// `true` / `false`
    Bool(bool),
    /// `42`, `0xff`
    Int(i64),
    /// `3.14`, `1.3e3`
    Float(f64),
    /// `"hello"`
    Str(String),
    /// `[expr, ...]`
    Array(Vec<Expr>),
    /// `{"key": expr, ...}`
    Map(Vec<MapEntry>),

    // ── Names & access ──
    /// `my_var`
    Ident(String),
    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// `object[index]`
    Index { object: Box<Expr>, index: Box<Expr> },
    /// `object.name`
    Member { object: Box<Expr>, name: String },

    // ── Operators ──
    /// `a + b`, `a == b`, `a && b`, etc.
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `-x`, `!x`, `^x`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `cond ? a : b`
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },

    // ── Functions ──
    /// `func [name](params) { body }`, shared with every closure made from it.
    Func(Rc<FuncLit>),

    // ── Grouping ──
    /// `(expr)`
    Paren(Box<Expr>),
}

/// An entry in a map literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: String,
    pub value: Expr,
}

/// `func [name](params) { body }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncLit {
    /// Named literals bind themselves in the defining scope when evaluated.
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Block,
    pub pos: Position,
}

// ── Binary Operators ──────────────────────────────────────────────────────────

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Logical (short-circuit)
    Or,
    And,
    // Bitwise
    BitOr,
    BitXor,
    BitAnd,
    // Comparison
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    // Shift
    Shl,
    Shr,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinOp {
    /// Returns the operator symbol for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Or => "||",
            BinOp::And => "&&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitAnd => "&",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::LessEq => "<=",
            BinOp::Greater => ">",
            BinOp::GreaterEq => ">=",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `^x` (bitwise complement)
    BitNot,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Serialization
// ══════════════════════════════════════════════════════════════════════════════
//
// `Stmt`, `IfStmt` and `Expr` are the recursive nodes. They serialize exactly
// like their derived form, through borrowed mirrors, but each level runs on a
// grown stack and decoding refuses to go deeper than `MAX_NESTING_DEPTH`.

macro_rules! impl_recursive_serde {
    ($($ty:ident => $out:ident, $in:ident { $($field:ident: $fty:ty),* $(,)? }),* $(,)?) => {
        $(
            #[derive(Serialize)]
            struct $out<'a> {
                $($field: &'a $fty,)*
            }

            #[derive(Deserialize)]
            struct $in {
                $($field: $fty,)*
            }

            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    ensure_sufficient_stack(|| $out { $($field: &self.$field,)* }.serialize(serializer))
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let _level = DepthGuard::enter().ok_or_else(|| {
                        D::Error::custom(format!("nesting deeper than {}", MAX_NESTING_DEPTH))
                    })?;
                    let node = ensure_sufficient_stack(|| $in::deserialize(deserializer))?;
                    Ok($ty { $($field: node.$field,)* })
                }
            }
        )*
    };
}

impl_recursive_serde! {
    Stmt => StmtOut, StmtIn { kind: StmtKind, pos: Position },
    IfStmt => IfStmtOut, IfStmtIn {
        condition: Expr,
        then_block: Block,
        else_branch: Option<ElseBranch>,
        pos: Position,
    },
    Expr => ExprOut, ExprIn { kind: ExprKind, pos: Position },
}

// ══════════════════════════════════════════════════════════════════════════════
// Positions
// ══════════════════════════════════════════════════════════════════════════════

macro_rules! impl_node {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Node for $ty {
                fn position(&self) -> Position {
                    self.pos
                }

                fn set_position(&mut self, pos: Position) {
                    self.pos = pos;
                }
            }
        )*
    };
}

impl_node!(Stmt, Expr, Block, IfStmt, SwitchCase, FuncLit);
