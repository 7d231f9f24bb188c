//! Host builtins available to every script.
//!
//! - `len(x)`: byte length of a string, element count of an array or map
//! - `toString(x)`: display form of any value
//! - `toByteSlice(s)`: array of the string's UTF-8 bytes
//! - `toRuneSlice(s)`: array of the string's Unicode scalar values
//! - `range(n)` / `range(from, to)`: array of ints in `[from, to)`

use crate::env::Env;
use crate::error::Fault;
use crate::value::{NativeFunction, Value};

/// `range` refuses to build arrays longer than this.
pub const MAX_RANGE_LEN: i64 = 1 << 24;

/// Bind every builtin in `env`.
pub fn register(env: &Env) {
    let builtins: [(&str, fn(Vec<Value>) -> Result<Value, Fault>); 5] = [
        ("len", len),
        ("toString", to_string),
        ("toByteSlice", to_byte_slice),
        ("toRuneSlice", to_rune_slice),
        ("range", range),
    ];
    for (name, func) in builtins {
        env.define(name, Value::Native(NativeFunction::new(name, func)));
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> Result<(), Fault> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Fault::type_mismatch(format!(
            "{name} expects {expected} argument(s), got {}",
            args.len()
        )))
    }
}

fn string_arg<'a>(name: &str, value: &'a Value) -> Result<&'a str, Fault> {
    value.as_str().ok_or_else(|| {
        Fault::type_mismatch(format!("{name} expects a string, got {}", value.type_name()))
    })
}

fn int_arg(name: &str, value: &Value) -> Result<i64, Fault> {
    value.as_int().ok_or_else(|| {
        Fault::type_mismatch(format!("{name} expects an int, got {}", value.type_name()))
    })
}

fn len(args: Vec<Value>) -> Result<Value, Fault> {
    arity("len", &args, 1)?;
    let n = match &args[0] {
        Value::String(s) => s.len(),
        Value::Array(items) => items.borrow().len(),
        Value::Map(table) => table.borrow().len(),
        other => {
            return Err(Fault::type_mismatch(format!(
                "len of {} is not defined",
                other.type_name()
            )));
        }
    };
    Ok(Value::Int(n as i64))
}

fn to_string(args: Vec<Value>) -> Result<Value, Fault> {
    arity("toString", &args, 1)?;
    Ok(Value::String(args[0].to_string()))
}

fn to_byte_slice(args: Vec<Value>) -> Result<Value, Fault> {
    arity("toByteSlice", &args, 1)?;
    let s = string_arg("toByteSlice", &args[0])?;
    Ok(Value::array(
        s.bytes().map(|b| Value::Int(i64::from(b))).collect(),
    ))
}

fn to_rune_slice(args: Vec<Value>) -> Result<Value, Fault> {
    arity("toRuneSlice", &args, 1)?;
    let s = string_arg("toRuneSlice", &args[0])?;
    Ok(Value::array(
        s.chars().map(|c| Value::Int(i64::from(u32::from(c)))).collect(),
    ))
}

fn range(args: Vec<Value>) -> Result<Value, Fault> {
    let (from, to) = match args.as_slice() {
        [to] => (0, int_arg("range", to)?),
        [from, to] => (int_arg("range", from)?, int_arg("range", to)?),
        _ => {
            return Err(Fault::type_mismatch(format!(
                "range expects 1 or 2 arguments, got {}",
                args.len()
            )));
        }
    };
    if to.saturating_sub(from) > MAX_RANGE_LEN {
        return Err(Fault::type_mismatch(format!(
            "range of {} elements exceeds the limit of {MAX_RANGE_LEN}",
            to.saturating_sub(from)
        )));
    }
    Ok(Value::array((from..to).map(Value::Int).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Condition;

    fn call(name: &str, args: Vec<Value>) -> Result<Value, Fault> {
        let env = Env::new();
        register(&env);
        match env.get(name).as_ref() {
            Some(Value::Native(native)) => native.call(args),
            other => panic!("{name} not registered: {other:?}"),
        }
    }

    fn ints(values: &[i64]) -> Value {
        Value::array(values.iter().copied().map(Value::Int).collect())
    }

    #[test]
    fn test_len() {
        assert_eq!(call("len", vec![Value::string("héllo")]), Ok(Value::Int(6)));
        assert_eq!(call("len", vec![ints(&[1, 2, 3])]), Ok(Value::Int(3)));
        assert_eq!(
            call("len", vec![Value::Int(1)]).unwrap_err().condition,
            Condition::TypeMismatch
        );
        assert!(call("len", vec![]).is_err());
    }

    #[test]
    fn test_to_string() {
        assert_eq!(call("toString", vec![Value::Int(1)]), Ok(Value::string("1")));
        assert_eq!(call("toString", vec![Value::Float(1.5)]), Ok(Value::string("1.5")));
        assert_eq!(call("toString", vec![Value::string("a")]), Ok(Value::string("a")));
    }

    #[test]
    fn test_byte_and_rune_slices() {
        assert_eq!(call("toByteSlice", vec![Value::string("a")]), Ok(ints(&[97])));
        assert_eq!(
            call("toByteSlice", vec![Value::string("é")]),
            Ok(ints(&[0xc3, 0xa9]))
        );
        assert_eq!(call("toRuneSlice", vec![Value::string("é")]), Ok(ints(&[0xe9])));
        assert!(call("toRuneSlice", vec![Value::Nil]).is_err());
    }

    #[test]
    fn test_range() {
        assert_eq!(call("range", vec![Value::Int(3)]), Ok(ints(&[0, 1, 2])));
        assert_eq!(call("range", vec![Value::Int(2), Value::Int(4)]), Ok(ints(&[2, 3])));
        assert_eq!(call("range", vec![Value::Int(-1)]), Ok(ints(&[])));
        assert!(call("range", vec![Value::Int(i64::MAX)]).is_err());
        assert!(call("range", vec![]).is_err());
    }
}
