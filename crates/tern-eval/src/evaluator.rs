//! Core expression and statement evaluator.

use crate::coerce;
use crate::config::EvalConfig;
use crate::env::Env;
use crate::error::{Condition, EvalError, EvalResult, Fault};
use crate::value::{Closure, Table, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tern_stack::ensure_sufficient_stack;
use tern_types::ast::*;
use tern_types::Position;

/// How a statement finished.
///
/// Loops absorb `Break` and `Continue`; function calls absorb `Return`.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fell through, carrying the statement's value.
    Normal(Value),
    Return(Value),
    Break,
    Continue,
}

/// A resolved assignment target.
enum Place {
    Var(String),
    Element(Rc<RefCell<Vec<Value>>>, i64),
    Key(Rc<RefCell<Table>>, String),
}

/// The tree-walking evaluator.
///
/// Holds only limits and counters; all program state lives in the
/// [`Env`] passed to each call, so one evaluator can run many programs.
pub struct Evaluator {
    config: EvalConfig,
    /// Steps taken since the current `evaluate` began.
    gas: u64,
    /// Script function calls currently on the stack.
    depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_config(EvalConfig::default())
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Self {
            config,
            gas: 0,
            depth: 0,
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Steps consumed by the most recent `evaluate`.
    pub fn gas_used(&self) -> u64 {
        self.gas
    }

    /// Consume one unit of gas. Returns error if exhausted.
    fn tick(&mut self, pos: Position) -> EvalResult<()> {
        self.gas += 1;
        match self.config.gas_limit {
            Some(limit) if self.gas > limit => {
                tracing::warn!(limit, %pos, "gas exhausted");
                Err(EvalError::new(
                    Condition::GasExhausted,
                    format!("exceeded gas limit of {limit} steps"),
                    pos,
                ))
            }
            _ => Ok(()),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Program
    // ══════════════════════════════════════════════════════════════════════

    /// Run a program against `env`.
    ///
    /// The result is the value of the last statement executed, or the value
    /// of a top-level `return`. The first error aborts the run.
    #[tracing::instrument(level = "debug", skip_all, fields(statements = program.stmts.len()))]
    pub fn evaluate(&mut self, program: &Program, env: &Env) -> EvalResult<Value> {
        self.gas = 0;
        self.depth = 0;
        let mut last = Value::Nil;
        for stmt in &program.stmts {
            match self.exec_stmt(stmt, env)? {
                Flow::Normal(value) => last = value,
                Flow::Return(value) => {
                    last = value;
                    break;
                }
                // The parser rejects loop jumps outside a loop.
                Flow::Break | Flow::Continue => last = Value::Nil,
            }
        }
        tracing::debug!(gas = self.gas, "program finished");
        Ok(last)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    /// Run the statements of a block in `env`, stopping at the first
    /// control signal.
    pub fn exec_block(&mut self, block: &Block, env: &Env) -> EvalResult<Flow> {
        let mut last = Value::Nil;
        for stmt in &block.stmts {
            match self.exec_stmt(stmt, env)? {
                Flow::Normal(value) => last = value,
                signal => return Ok(signal),
            }
        }
        Ok(Flow::Normal(last))
    }

    /// Execute a single statement.
    pub fn exec_stmt(&mut self, stmt: &Stmt, env: &Env) -> EvalResult<Flow> {
        ensure_sufficient_stack(|| self.exec_stmt_inner(stmt, env))
    }

    fn exec_stmt_inner(&mut self, stmt: &Stmt, env: &Env) -> EvalResult<Flow> {
        self.tick(stmt.pos)?;
        match &stmt.kind {
            StmtKind::Expr(expr) => self.eval_expr(expr, env).map(Flow::Normal),
            StmtKind::Var { name, value } => {
                let value = self.eval_expr(value, env)?;
                env.define(name.as_str(), value.clone());
                Ok(Flow::Normal(value))
            }
            StmtKind::Assign { target, value } => {
                let place = self.resolve_place(target, env)?;
                let value = self.eval_expr(value, env)?;
                self.write_place(place, value.clone(), env, target.pos)?;
                Ok(Flow::Normal(value))
            }
            StmtKind::CompoundAssign { target, op, value } => {
                let place = self.resolve_place(target, env)?;
                let current = self.read_place(&place, env, target.pos)?;
                let rhs = self.eval_expr(value, env)?;
                let result = coerce::binary(*op, &current, &rhs).map_err(|f| f.at(stmt.pos))?;
                self.write_place(place, result.clone(), env, target.pos)?;
                Ok(Flow::Normal(result))
            }
            StmtKind::IncDec { target, op } => {
                let place = self.resolve_place(target, env)?;
                let current = self.read_place(&place, env, target.pos)?;
                let delta = if *op == IncDecOp::Inc { 1 } else { -1 };
                let next = match current {
                    Value::Int(n) => Value::Int(n.wrapping_add(delta)),
                    Value::Float(n) => Value::Float(n + delta as f64),
                    other => {
                        return Err(Fault::type_mismatch(format!(
                            "cannot increment or decrement {}",
                            other.type_name()
                        ))
                        .at(stmt.pos));
                    }
                };
                self.write_place(place, next, env, target.pos)?;
                Ok(Flow::Normal(Value::Nil))
            }
            StmtKind::If(if_stmt) => self.exec_if(if_stmt, env),
            StmtKind::ForIn {
                key,
                value,
                iterable,
                body,
            } => self.exec_for_in(key, value.as_deref(), iterable, body, env),
            StmtKind::ForCond { condition, body } => {
                self.exec_for_cond(condition.as_ref(), body, env, stmt.pos)
            }
            StmtKind::ForC {
                init,
                condition,
                post,
                body,
            } => self.exec_for_c(
                init.as_deref(),
                condition.as_ref(),
                post.as_deref(),
                body,
                env,
                stmt.pos,
            ),
            StmtKind::Switch {
                subject,
                cases,
                default,
            } => self.exec_switch(subject, cases, default.as_ref(), env),
            StmtKind::Return(values) => {
                let value = match values.as_slice() {
                    [] => Value::Nil,
                    [single] => self.eval_expr(single, env)?,
                    many => Value::array(self.eval_list(many, env)?),
                };
                Ok(Flow::Return(value))
            }
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),
        }
    }

    // ── Assignment ───────────────────────────────────────────────────────

    /// Evaluate the parts of an assignment target, without reading it.
    fn resolve_place(&mut self, target: &Expr, env: &Env) -> EvalResult<Place> {
        match &target.kind {
            ExprKind::Ident(name) => Ok(Place::Var(name.clone())),
            ExprKind::Paren(inner) => self.resolve_place(inner, env),
            ExprKind::Index { object, index } => {
                let object = self.eval_expr(object, env)?;
                let index = self.eval_expr(index, env)?;
                match (&object, &index) {
                    (Value::Array(items), Value::Int(i)) => Ok(Place::Element(Rc::clone(items), *i)),
                    (Value::Map(table), Value::String(key)) => {
                        Ok(Place::Key(Rc::clone(table), key.clone()))
                    }
                    (object, index) => Err(Fault::type_mismatch(format!(
                        "cannot assign to {}[{}]",
                        object.type_name(),
                        index.type_name()
                    ))
                    .at(target.pos)),
                }
            }
            ExprKind::Member { object, name } => match &self.eval_expr(object, env)? {
                Value::Map(table) => Ok(Place::Key(Rc::clone(table), name.clone())),
                other => Err(Fault::type_mismatch(format!(
                    "cannot assign member '{name}' of {}",
                    other.type_name()
                ))
                .at(target.pos)),
            },
            _ => Err(EvalError::new(
                Condition::InvalidAssignmentTarget,
                "left side of assignment must be a variable, index or member",
                target.pos,
            )),
        }
    }

    fn read_place(&self, place: &Place, env: &Env, pos: Position) -> EvalResult<Value> {
        match place {
            Place::Var(name) => env.get(name).ok_or_else(|| undefined(name, pos)),
            Place::Element(items, i) => {
                let items = items.borrow();
                let slot = coerce::array_slot(*i, items.len()).map_err(|f| f.at(pos))?;
                Ok(items[slot].clone())
            }
            Place::Key(table, key) => Ok(table.borrow().get(key).cloned().unwrap_or(Value::Nil)),
        }
    }

    /// Store into a place. Writing one past the end of an array appends.
    fn write_place(&self, place: Place, value: Value, env: &Env, pos: Position) -> EvalResult<()> {
        match place {
            Place::Var(name) => env.set(&name, value),
            Place::Element(items, i) => {
                let mut items = items.borrow_mut();
                if usize::try_from(i).ok() == Some(items.len()) {
                    items.push(value);
                } else {
                    let slot = coerce::array_slot(i, items.len()).map_err(|f| f.at(pos))?;
                    items[slot] = value;
                }
            }
            Place::Key(table, key) => table.borrow_mut().insert(key, value),
        }
        Ok(())
    }

    // ── Conditionals ─────────────────────────────────────────────────────

    fn exec_if(&mut self, if_stmt: &IfStmt, env: &Env) -> EvalResult<Flow> {
        if self.eval_expr(&if_stmt.condition, env)?.is_truthy() {
            return self.exec_block(&if_stmt.then_block, &env.child());
        }
        match &if_stmt.else_branch {
            Some(ElseBranch::ElseIf(next)) => self.exec_if(next, env),
            Some(ElseBranch::Block(block)) => self.exec_block(block, &env.child()),
            None => Ok(Flow::Normal(Value::Nil)),
        }
    }

    /// First matching case wins; `break` inside a case leaves the
    /// enclosing loop.
    fn exec_switch(
        &mut self,
        subject: &Expr,
        cases: &[SwitchCase],
        default: Option<&Block>,
        env: &Env,
    ) -> EvalResult<Flow> {
        let subject = self.eval_expr(subject, env)?;
        for case in cases {
            for expr in &case.exprs {
                let candidate = self.eval_expr(expr, env)?;
                if coerce::equals(&subject, &candidate).map_err(|f| f.at(expr.pos))? {
                    return self.exec_block(&case.body, &env.child());
                }
            }
        }
        match default {
            Some(block) => self.exec_block(block, &env.child()),
            None => Ok(Flow::Normal(Value::Nil)),
        }
    }

    // ── Loops ────────────────────────────────────────────────────────────

    /// Run one loop iteration body. `Some(flow)` means leave the loop with
    /// that result.
    fn loop_body(&mut self, body: &Block, frame: &Env) -> EvalResult<Option<Flow>> {
        Ok(match self.exec_block(body, frame)? {
            Flow::Break => Some(Flow::Normal(Value::Nil)),
            Flow::Return(value) => Some(Flow::Return(value)),
            Flow::Normal(_) | Flow::Continue => None,
        })
    }

    fn exec_for_in(
        &mut self,
        key: &str,
        value: Option<&str>,
        iterable: &Expr,
        body: &Block,
        env: &Env,
    ) -> EvalResult<Flow> {
        // Snapshot so the body may mutate the container it walks. A single
        // loop variable gets the map key, or the array / string element.
        let (pairs, keyed): (Vec<(Value, Value)>, bool) = match &self.eval_expr(iterable, env)? {
            Value::Array(items) => {
                let pairs = items
                    .borrow()
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (Value::Int(i as i64), item.clone()))
                    .collect();
                (pairs, false)
            }
            Value::Map(table) => {
                let pairs = table
                    .borrow()
                    .iter()
                    .map(|(k, v)| (Value::string(k.as_str()), v.clone()))
                    .collect();
                (pairs, true)
            }
            Value::String(s) => {
                let pairs = s
                    .chars()
                    .enumerate()
                    .map(|(i, c)| (Value::Int(i as i64), Value::String(c.to_string())))
                    .collect();
                (pairs, false)
            }
            other => {
                return Err(Fault::type_mismatch(format!(
                    "cannot range over {}",
                    other.type_name()
                ))
                .at(iterable.pos));
            }
        };

        for (k, v) in pairs {
            self.tick(body.pos)?;
            let frame = env.child();
            match value {
                Some(value_name) => {
                    frame.define(key, k);
                    frame.define(value_name, v);
                }
                None if keyed => frame.define(key, k),
                None => frame.define(key, v),
            }
            if let Some(flow) = self.loop_body(body, &frame)? {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal(Value::Nil))
    }

    fn exec_for_cond(
        &mut self,
        condition: Option<&Expr>,
        body: &Block,
        env: &Env,
        pos: Position,
    ) -> EvalResult<Flow> {
        loop {
            self.tick(pos)?;
            if let Some(condition) = condition {
                if !self.eval_expr(condition, env)?.is_truthy() {
                    break;
                }
            }
            if let Some(flow) = self.loop_body(body, &env.child())? {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal(Value::Nil))
    }

    fn exec_for_c(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        post: Option<&Stmt>,
        body: &Block,
        env: &Env,
        pos: Position,
    ) -> EvalResult<Flow> {
        let outer = env.child();
        if let Some(init) = init {
            self.exec_stmt(init, &outer)?;
        }
        loop {
            self.tick(pos)?;
            if let Some(condition) = condition {
                if !self.eval_expr(condition, &outer)?.is_truthy() {
                    break;
                }
            }
            if let Some(flow) = self.loop_body(body, &outer.child())? {
                return Ok(flow);
            }
            if let Some(post) = post {
                self.exec_stmt(post, &outer)?;
            }
        }
        Ok(Flow::Normal(Value::Nil))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a Value.
    pub fn eval_expr(&mut self, expr: &Expr, env: &Env) -> EvalResult<Value> {
        ensure_sufficient_stack(|| self.eval_expr_inner(expr, env))
    }

    fn eval_expr_inner(&mut self, expr: &Expr, env: &Env) -> EvalResult<Value> {
        self.tick(expr.pos)?;
        match &expr.kind {
            ExprKind::Nil => Ok(Value::Nil),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Int(n) => Ok(Value::Int(*n)),
            ExprKind::Float(n) => Ok(Value::Float(*n)),
            ExprKind::Str(s) => Ok(Value::String(s.clone())),

            ExprKind::Array(items) => Ok(Value::array(self.eval_list(items, env)?)),
            ExprKind::Map(entries) => {
                let mut table = Table::new();
                for entry in entries {
                    let value = self.eval_expr(&entry.value, env)?;
                    table.insert(entry.key.as_str(), value);
                }
                Ok(Value::map(table))
            }

            ExprKind::Ident(name) => env.get(name).ok_or_else(|| undefined(name, expr.pos)),

            ExprKind::Call { callee, args } => {
                let callee = self.eval_expr(callee, env)?;
                let args = self.eval_list(args, env)?;
                self.call_value(&callee, args, expr.pos)
            }
            ExprKind::Index { object, index } => {
                let object = self.eval_expr(object, env)?;
                let index = self.eval_expr(index, env)?;
                coerce::index(&object, &index).map_err(|f| f.at(expr.pos))
            }
            ExprKind::Member { object, name } => {
                let object = self.eval_expr(object, env)?;
                coerce::member(&object, name).map_err(|f| f.at(expr.pos))
            }

            ExprKind::Binary { left, op, right } => {
                self.eval_binary(left, *op, right, env, expr.pos)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.eval_expr(operand, env)?;
                coerce::unary(*op, &operand).map_err(|f| f.at(expr.pos))
            }
            ExprKind::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                if self.eval_expr(condition, env)?.is_truthy() {
                    self.eval_expr(then_expr, env)
                } else {
                    self.eval_expr(else_expr, env)
                }
            }

            ExprKind::Func(func) => {
                let closure = Value::Function(Rc::new(Closure {
                    func: Rc::clone(func),
                    env: env.clone(),
                }));
                if let Some(name) = &func.name {
                    env.define(name.as_str(), closure.clone());
                }
                Ok(closure)
            }
            ExprKind::Paren(inner) => self.eval_expr(inner, env),
        }
    }

    fn eval_list(&mut self, exprs: &[Expr], env: &Env) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval_expr(expr, env)?);
        }
        Ok(values)
    }

    fn eval_binary(
        &mut self,
        left: &Expr,
        op: BinOp,
        right: &Expr,
        env: &Env,
        pos: Position,
    ) -> EvalResult<Value> {
        // Short-circuit for logical operators
        match op {
            BinOp::And => {
                let lv = self.eval_expr(left, env)?;
                if !lv.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                return Ok(Value::Bool(self.eval_expr(right, env)?.is_truthy()));
            }
            BinOp::Or => {
                let lv = self.eval_expr(left, env)?;
                if lv.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                return Ok(Value::Bool(self.eval_expr(right, env)?.is_truthy()));
            }
            _ => {}
        }
        let lv = self.eval_expr(left, env)?;
        let rv = self.eval_expr(right, env)?;
        coerce::binary(op, &lv, &rv).map_err(|f| f.at(pos))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════

    /// Call a function or native value with evaluated arguments.
    ///
    /// Missing parameters bind `nil`; extra arguments are ignored.
    pub fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        pos: Position,
    ) -> EvalResult<Value> {
        match callee {
            Value::Function(closure) => self.call_closure(closure, args, pos),
            Value::Native(native) => {
                tracing::debug!(function = native.name(), args = args.len(), "native call");
                native.call(args).map_err(|f| f.at(pos))
            }
            other => Err(EvalError::new(
                Condition::NotCallable,
                format!("cannot call {}", other.type_name()),
                pos,
            )),
        }
    }

    fn call_closure(
        &mut self,
        closure: &Closure,
        args: Vec<Value>,
        pos: Position,
    ) -> EvalResult<Value> {
        if self.depth >= self.config.max_call_depth {
            tracing::warn!(depth = self.depth, %pos, "call depth exceeded");
            return Err(EvalError::new(
                Condition::CallDepthExceeded,
                format!("exceeded maximum call depth of {}", self.config.max_call_depth),
                pos,
            ));
        }
        tracing::debug!(
            function = closure.name().unwrap_or("<anonymous>"),
            args = args.len(),
            depth = self.depth,
            "call"
        );

        let frame = closure.env.child();
        let mut args = args.into_iter();
        for param in &closure.func.params {
            frame.define(param.as_str(), args.next().unwrap_or(Value::Nil));
        }

        self.depth += 1;
        let result = ensure_sufficient_stack(|| self.exec_block(&closure.func.body, &frame));
        self.depth -= 1;

        Ok(match result? {
            Flow::Return(value) => value,
            Flow::Normal(_) | Flow::Break | Flow::Continue => Value::Nil,
        })
    }
}

fn undefined(name: &str, pos: Position) -> EvalError {
    EvalError::new(
        Condition::UndefinedIdentifier,
        format!("undefined identifier '{name}'"),
        pos,
    )
}

/// Run a program with default limits.
pub fn evaluate(program: &Program, env: &Env) -> EvalResult<Value> {
    Evaluator::new().evaluate(program, env)
}

