//! Operator semantics.
//!
//! One pure function per operator family. Each takes fully evaluated
//! operands and either produces a value or a [`Fault`]; none of them falls
//! back to a default when no rule applies.
//!
//! | operands            | `+ - * / %`       | `**`          | `== !=`        | `< <= > >=`   |
//! |---------------------|-------------------|---------------|----------------|---------------|
//! | int, int            | int (wrapping)    | int if exp≥0  | by value       | by value      |
//! | int/float mix       | float             | float         | after promotion| after promotion|
//! | string, string      | `+` concatenates  | mismatch      | by value       | lexicographic |
//! | bool, bool          | mismatch          | mismatch      | by value       | mismatch      |
//! | nil, anything       | mismatch          | mismatch      | equal iff both nil | mismatch  |
//! | array/map/function  | mismatch          | mismatch      | mismatch       | mismatch      |
//!
//! Any other scalar pairing compares unequal and is a mismatch everywhere
//! else.

use crate::error::{Condition, Fault};
use crate::value::Value;
use std::cmp::Ordering;
use tern_types::ast::{BinOp, UnaryOp};

/// Two numeric operands after promotion.
enum Numbers {
    Ints(i64, i64),
    Floats(f64, f64),
}

fn numbers(left: &Value, right: &Value) -> Option<Numbers> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(Numbers::Ints(*a, *b)),
        (Value::Int(a), Value::Float(b)) => Some(Numbers::Floats(*a as f64, *b)),
        (Value::Float(a), Value::Int(b)) => Some(Numbers::Floats(*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Some(Numbers::Floats(*a, *b)),
        _ => None,
    }
}

fn mismatch(op: BinOp, left: &Value, right: &Value) -> Fault {
    Fault::type_mismatch(format!(
        "invalid operation: {} {} {}",
        left.type_name(),
        op.as_str(),
        right.type_name()
    ))
}

fn divide_by_zero(op: BinOp) -> Fault {
    let what = if op == BinOp::Mod { "remainder" } else { "division" };
    Fault::new(Condition::DivideByZero, format!("integer or float {what} by zero"))
}

fn not_an(op: BinOp, family: &str) -> Fault {
    Fault::type_mismatch(format!("'{}' is not a {family} operator", op.as_str()))
}

// ══════════════════════════════════════════════════════════════════════════════
// Binary operators
// ══════════════════════════════════════════════════════════════════════════════

/// Apply a binary operator to two evaluated operands.
///
/// `&&` and `||` are accepted for completeness and combine truthiness; the
/// evaluator short-circuits them before ever getting here.
pub fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, Fault> {
    match op {
        BinOp::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        BinOp::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        BinOp::Eq => equals(left, right).map(Value::Bool),
        BinOp::NotEq => equals(left, right).map(|eq| Value::Bool(!eq)),
        BinOp::Less | BinOp::LessEq | BinOp::Greater | BinOp::GreaterEq => {
            compare(op, left, right).map(Value::Bool)
        }
        BinOp::BitOr | BinOp::BitXor | BinOp::BitAnd | BinOp::Shl | BinOp::Shr => {
            bitwise(op, left, right)
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            arithmetic(op, left, right)
        }
        BinOp::Pow => power(left, right),
    }
}

/// `+ - * / %`.
pub fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, Fault> {
    if let (BinOp::Add, Value::String(a), Value::String(b)) = (op, left, right) {
        let mut joined = String::with_capacity(a.len() + b.len());
        joined.push_str(a);
        joined.push_str(b);
        return Ok(Value::String(joined));
    }
    match numbers(left, right) {
        Some(Numbers::Ints(a, b)) => int_arithmetic(op, a, b).map(Value::Int),
        Some(Numbers::Floats(a, b)) => float_arithmetic(op, a, b).map(Value::Float),
        None => Err(mismatch(op, left, right)),
    }
}

fn int_arithmetic(op: BinOp, a: i64, b: i64) -> Result<i64, Fault> {
    Ok(match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div | BinOp::Mod if b == 0 => return Err(divide_by_zero(op)),
        // Truncates toward zero.
        BinOp::Div => a.wrapping_div(b),
        BinOp::Mod => a.wrapping_rem(b),
        _ => return Err(not_an(op, "arithmetic")),
    })
}

fn float_arithmetic(op: BinOp, a: f64, b: f64) -> Result<f64, Fault> {
    Ok(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div | BinOp::Mod if b == 0.0 => return Err(divide_by_zero(op)),
        BinOp::Div => a / b,
        BinOp::Mod => a % b,
        _ => return Err(not_an(op, "arithmetic")),
    })
}

/// `**`: int result for an int base and non-negative int exponent.
pub fn power(base: &Value, exponent: &Value) -> Result<Value, Fault> {
    match numbers(base, exponent) {
        Some(Numbers::Ints(b, e)) if e >= 0 => Ok(Value::Int(wrapping_pow(b, e as u64))),
        Some(Numbers::Ints(b, e)) => Ok(Value::Float((b as f64).powf(e as f64))),
        Some(Numbers::Floats(b, e)) => Ok(Value::Float(b.powf(e))),
        None => Err(mismatch(BinOp::Pow, base, exponent)),
    }
}

fn wrapping_pow(mut base: i64, mut exp: u64) -> i64 {
    let mut acc: i64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    acc
}

/// `& | ^ << >>`, integers only.
pub fn bitwise(op: BinOp, left: &Value, right: &Value) -> Result<Value, Fault> {
    let (Value::Int(a), Value::Int(b)) = (left, right) else {
        return Err(mismatch(op, left, right));
    };
    let (a, b) = (*a, *b);
    let result = match op {
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::Shl | BinOp::Shr if b < 0 => {
            return Err(Fault::type_mismatch(format!("negative shift count {b}")));
        }
        BinOp::Shl if b >= 64 => 0,
        BinOp::Shl => a << b,
        BinOp::Shr if b >= 64 => {
            if a < 0 {
                -1
            } else {
                0
            }
        }
        BinOp::Shr => a >> b,
        _ => return Err(not_an(op, "bitwise")),
    };
    Ok(Value::Int(result))
}

// ══════════════════════════════════════════════════════════════════════════════
// Comparison
// ══════════════════════════════════════════════════════════════════════════════

/// Language equality (`==`).
///
/// Permissive across scalar types: mixing kinds is simply unequal. Arrays,
/// maps and functions have no equality and are a mismatch on either side.
pub fn equals(left: &Value, right: &Value) -> Result<bool, Fault> {
    if let Some(kind) = [left, right].into_iter().find(|v| !is_scalar(v)) {
        return Err(Fault::type_mismatch(format!(
            "{} values cannot be compared with ==",
            kind.type_name()
        )));
    }
    if let Some(pair) = numbers(left, right) {
        return Ok(match pair {
            Numbers::Ints(a, b) => a == b,
            Numbers::Floats(a, b) => a == b,
        });
    }
    Ok(match (left, right) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    })
}

fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Nil | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
    )
}

/// `< <= > >=` over numbers (after promotion) or strings (byte-wise
/// lexicographic).
pub fn compare(op: BinOp, left: &Value, right: &Value) -> Result<bool, Fault> {
    let ordering = match (numbers(left, right), left, right) {
        (Some(Numbers::Ints(a, b)), _, _) => Some(a.cmp(&b)),
        (Some(Numbers::Floats(a, b)), _, _) => a.partial_cmp(&b),
        (None, Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => return Err(mismatch(op, left, right)),
    };
    // NaN compares false under every operator.
    let Some(ordering) = ordering else {
        return Ok(false);
    };
    Ok(match op {
        BinOp::Less => ordering == Ordering::Less,
        BinOp::LessEq => ordering != Ordering::Greater,
        BinOp::Greater => ordering == Ordering::Greater,
        BinOp::GreaterEq => ordering != Ordering::Less,
        _ => return Err(mismatch(op, left, right)),
    })
}

// ══════════════════════════════════════════════════════════════════════════════
// Unary operators
// ══════════════════════════════════════════════════════════════════════════════

pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, Fault> {
    match (op, operand) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Neg, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (UnaryOp::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (UnaryOp::BitNot, Value::Int(n)) => Ok(Value::Int(!n)),
        (op, v) => Err(Fault::type_mismatch(format!(
            "invalid operation: {}{}",
            op.as_str(),
            v.type_name()
        ))),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Index & member access
// ══════════════════════════════════════════════════════════════════════════════

/// Validate an array index against `len`.
pub fn array_slot(index: i64, len: usize) -> Result<usize, Fault> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| {
            Fault::new(
                Condition::IndexOutOfRange,
                format!("index {index} out of range for length {len}"),
            )
        })
}

/// `object[index]`.
pub fn index(object: &Value, index: &Value) -> Result<Value, Fault> {
    match (object, index) {
        (Value::Array(items), Value::Int(i)) => {
            let items = items.borrow();
            let slot = array_slot(*i, items.len())?;
            Ok(items[slot].clone())
        }
        (Value::Map(table), Value::String(key)) => {
            Ok(table.borrow().get(key).cloned().unwrap_or(Value::Nil))
        }
        (Value::String(s), Value::Int(i)) => {
            let count = s.chars().count();
            let slot = array_slot(*i, count)?;
            Ok(s.chars()
                .nth(slot)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Nil))
        }
        (Value::Array(_) | Value::String(_), key) => Err(Fault::type_mismatch(format!(
            "{} index must be int, got {}",
            object.type_name(),
            key.type_name()
        ))),
        (Value::Map(_), key) => Err(Fault::type_mismatch(format!(
            "map key must be string, got {}",
            key.type_name()
        ))),
        (other, _) => Err(Fault::type_mismatch(format!(
            "cannot index {}",
            other.type_name()
        ))),
    }
}

/// `object.name`; only maps have members.
pub fn member(object: &Value, name: &str) -> Result<Value, Fault> {
    match object {
        Value::Map(table) => Ok(table.borrow().get(name).cloned().unwrap_or(Value::Nil)),
        other => Err(Fault::type_mismatch(format!(
            "cannot access member '{name}' of {}",
            other.type_name()
        ))),
    }
}
