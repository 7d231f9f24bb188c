//! The tree depth limit shared by the parser and the codec.
//!
//! Depth counts the [`Stmt`], [`IfStmt`] and [`Expr`] nodes on a path from
//! the root; blocks and function literals are transparent. The parser
//! rejects anything deeper than [`MAX_NESTING_DEPTH`] and the codec refuses
//! to decode it, so every parsed program can be encoded and decoded again.

use std::cell::Cell;

use tern_stack::ensure_sufficient_stack;

use crate::ast::{Block, ElseBranch, Expr, ExprKind, IfStmt, Stmt, StmtKind};

/// Deepest path a program may contain.
pub const MAX_NESTING_DEPTH: usize = 512;

/// Returns `true` if no path below `stmt` (inclusive) is deeper than `limit`.
///
/// The walk stops descending once the budget is spent, so it never recurses
/// more than `limit` levels whatever the shape of the tree.
pub fn stmt_fits(stmt: &Stmt, limit: usize) -> bool {
    let Some(budget) = limit.checked_sub(1) else {
        return false;
    };
    ensure_sufficient_stack(|| match &stmt.kind {
        StmtKind::Expr(expr) | StmtKind::Var { value: expr, .. } => expr_fits(expr, budget),
        StmtKind::Assign { target, value } | StmtKind::CompoundAssign { target, value, .. } => {
            expr_fits(target, budget) && expr_fits(value, budget)
        }
        StmtKind::IncDec { target, .. } => expr_fits(target, budget),
        StmtKind::If(if_stmt) => if_fits(if_stmt, budget),
        StmtKind::ForIn { iterable, body, .. } => {
            expr_fits(iterable, budget) && block_fits(body, budget)
        }
        StmtKind::ForCond { condition, body } => {
            opt_expr_fits(condition.as_ref(), budget) && block_fits(body, budget)
        }
        StmtKind::ForC {
            init,
            condition,
            post,
            body,
        } => {
            init.as_deref().map_or(true, |s| stmt_fits(s, budget))
                && opt_expr_fits(condition.as_ref(), budget)
                && post.as_deref().map_or(true, |s| stmt_fits(s, budget))
                && block_fits(body, budget)
        }
        StmtKind::Switch {
            subject,
            cases,
            default,
        } => {
            expr_fits(subject, budget)
                && cases.iter().all(|case| {
                    case.exprs.iter().all(|e| expr_fits(e, budget)) && block_fits(&case.body, budget)
                })
                && default.as_ref().map_or(true, |b| block_fits(b, budget))
        }
        StmtKind::Return(values) => values.iter().all(|e| expr_fits(e, budget)),
        StmtKind::Break | StmtKind::Continue => true,
    })
}

/// Expression counterpart of [`stmt_fits`].
pub fn expr_fits(expr: &Expr, limit: usize) -> bool {
    let Some(budget) = limit.checked_sub(1) else {
        return false;
    };
    ensure_sufficient_stack(|| match &expr.kind {
        ExprKind::Nil
        | ExprKind::Bool(_)
        | ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Ident(_) => true,
        ExprKind::Array(items) => items.iter().all(|e| expr_fits(e, budget)),
        ExprKind::Map(entries) => entries.iter().all(|entry| expr_fits(&entry.value, budget)),
        ExprKind::Call { callee, args } => {
            expr_fits(callee, budget) && args.iter().all(|e| expr_fits(e, budget))
        }
        ExprKind::Index { object, index } => expr_fits(object, budget) && expr_fits(index, budget),
        ExprKind::Member { object, .. } => expr_fits(object, budget),
        ExprKind::Binary { left, right, .. } => expr_fits(left, budget) && expr_fits(right, budget),
        ExprKind::Unary { operand, .. } => expr_fits(operand, budget),
        ExprKind::Ternary {
            condition,
            then_expr,
            else_expr,
        } => {
            expr_fits(condition, budget)
                && expr_fits(then_expr, budget)
                && expr_fits(else_expr, budget)
        }
        ExprKind::Func(lit) => block_fits(&lit.body, budget),
        ExprKind::Paren(inner) => expr_fits(inner, budget),
    })
}

fn if_fits(if_stmt: &IfStmt, limit: usize) -> bool {
    let Some(budget) = limit.checked_sub(1) else {
        return false;
    };
    expr_fits(&if_stmt.condition, budget)
        && block_fits(&if_stmt.then_block, budget)
        && match &if_stmt.else_branch {
            None => true,
            Some(ElseBranch::ElseIf(next)) => ensure_sufficient_stack(|| if_fits(next, budget)),
            Some(ElseBranch::Block(block)) => block_fits(block, budget),
        }
}

fn block_fits(block: &Block, limit: usize) -> bool {
    block.stmts.iter().all(|s| stmt_fits(s, limit))
}

fn opt_expr_fits(expr: Option<&Expr>, limit: usize) -> bool {
    expr.map_or(true, |e| expr_fits(e, limit))
}

// ══════════════════════════════════════════════════════════════════════════════
// Decoding
// ══════════════════════════════════════════════════════════════════════════════

thread_local! {
    static DECODE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One level of an in-progress deserialization. Dropping it leaves the level.
pub(crate) struct DepthGuard(());

impl DepthGuard {
    /// Enter one more level, or `None` past [`MAX_NESTING_DEPTH`].
    pub(crate) fn enter() -> Option<Self> {
        DECODE_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= MAX_NESTING_DEPTH {
                return None;
            }
            depth.set(current + 1);
            Some(DepthGuard(()))
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DECODE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    fn parens(n: usize) -> Expr {
        let mut expr = Expr::new(ExprKind::Int(1), Position::new(1, 1));
        for _ in 0..n {
            expr = Expr::new(ExprKind::Paren(Box::new(expr)), Position::new(1, 1));
        }
        expr
    }

    #[test]
    fn test_leaf_needs_one_level() {
        assert!(expr_fits(&parens(0), 1));
        assert!(!expr_fits(&parens(0), 0));
    }

    #[test]
    fn test_depth_is_exact() {
        // 10 parens around a literal is 11 levels.
        assert!(expr_fits(&parens(10), 11));
        assert!(!expr_fits(&parens(10), 10));
    }

    #[test]
    fn test_statement_counts_itself() {
        let stmt = Stmt::new(StmtKind::Expr(parens(2)), Position::new(1, 1));
        assert!(stmt_fits(&stmt, 4));
        assert!(!stmt_fits(&stmt, 3));
    }

    #[test]
    fn test_walk_stops_at_budget() {
        let deep = parens(200_000);
        assert!(!expr_fits(&deep, MAX_NESTING_DEPTH));
    }

    #[test]
    fn test_guard_releases_level() {
        let outer = DepthGuard::enter();
        assert!(outer.is_some());
        let before = DECODE_DEPTH.with(Cell::get);
        drop(DepthGuard::enter());
        assert_eq!(DECODE_DEPTH.with(Cell::get), before);
    }

    #[test]
    fn test_guard_refuses_past_limit() {
        let guards: Vec<_> = (0..MAX_NESTING_DEPTH).map_while(|_| DepthGuard::enter()).collect();
        assert_eq!(guards.len(), MAX_NESTING_DEPTH);
        assert!(DepthGuard::enter().is_none());
        drop(guards);
        assert!(DepthGuard::enter().is_some());
    }
}
