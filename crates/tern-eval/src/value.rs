//! Runtime values.

use crate::env::Env;
use crate::error::Fault;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;
use tern_stack::ensure_sufficient_stack;
use tern_types::ast::FuncLit;

/// Containers nested deeper than this print as `...`; a map can hold itself.
const DISPLAY_DEPTH: usize = 32;

/// A runtime value.
///
/// Arrays and maps are shared: copying the value copies the handle, so
/// every holder observes mutations through any other.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<Table>>),
    Function(Rc<Closure>),
    Native(NativeFunction),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn map(table: Table) -> Self {
        Value::Map(Rc::new(RefCell::new(table)))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Get the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
            Value::Native(_) => "native function",
        }
    }

    /// `nil`, `false`, `0`, `0.0` and `""` are falsy; everything else is
    /// truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Map(_) | Value::Function(_) | Value::Native(_) => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Move the children of a container this value solely owns onto `out`.
    /// Shared containers are left alone; another holder still needs them.
    fn detach_children(&mut self, out: &mut Vec<Value>) {
        match self {
            Value::Array(items) => {
                if let Some(items) = Rc::get_mut(items) {
                    out.append(items.get_mut());
                }
            }
            Value::Map(table) => {
                if let Some(table) = Rc::get_mut(table) {
                    table.get_mut().drain_values(out);
                }
            }
            Value::Function(closure) => {
                if let Some(closure) = Rc::get_mut(closure) {
                    closure.env.detach_bindings(out);
                }
            }
            Value::Nil
            | Value::Bool(_)
            | Value::Int(_)
            | Value::Float(_)
            | Value::String(_)
            | Value::Native(_) => {}
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, depth: usize, quote: bool) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n:?}"),
            Value::String(s) if quote => write!(f, "{s:?}"),
            Value::String(s) => f.write_str(s),
            Value::Array(_) | Value::Map(_) if depth >= DISPLAY_DEPTH => write!(f, "..."),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.write(f, depth + 1, true)?;
                }
                write!(f, "]")
            }
            Value::Map(table) => {
                write!(f, "{{")?;
                for (i, (k, v)) in table.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: ")?;
                    v.write(f, depth + 1, true)?;
                }
                write!(f, "}}")
            }
            Value::Function(closure) => match closure.name() {
                Some(name) => write!(f, "<func {name}>"),
                None => write!(f, "<func>"),
            },
            Value::Native(native) => write!(f, "<native {}>", native.name()),
        }
    }
}

/// Top-level strings print bare; strings inside containers are quoted.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0, false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0, true)
    }
}

/// Containers are dropped with an explicit work list so that a script
/// nesting arrays a million deep cannot exhaust the host stack.
impl Drop for Value {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);
        while let Some(mut value) = pending.pop() {
            value.detach_children(&mut pending);
        }
    }
}

/// Structural for scalars and containers, identity for functions.
///
/// This is host-side comparison (tests, embedding code); the language's own
/// `==` lives in [`coerce::equals`](crate::coerce::equals). Containers that
/// reach themselves compare equal when their shapes agree.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other, &mut HashSet::new())
    }
}

/// Container pairs already under comparison.
type Visited = HashSet<(usize, usize)>;

/// Returns `false` if `(a, b)` was already visited, recording it otherwise.
fn first_visit<T>(a: &Rc<T>, b: &Rc<T>, visited: &mut Visited) -> bool {
    visited.insert((Rc::as_ptr(a) as *const () as usize, Rc::as_ptr(b) as *const () as usize))
}

fn values_equal(a: &Value, b: &Value, visited: &mut Visited) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            if Rc::ptr_eq(a, b) || !first_visit(a, b, visited) {
                return true;
            }
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| ensure_sufficient_stack(|| values_equal(x, y, visited)))
        }
        (Value::Map(a), Value::Map(b)) => {
            if Rc::ptr_eq(a, b) || !first_visit(a, b, visited) {
                return true;
            }
            tables_equal(&a.borrow(), &b.borrow(), visited)
        }
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(&a.func, &b.func),
        _ => false,
    }
}

fn tables_equal(a: &Table, b: &Table, visited: &mut Visited) -> bool {
    a.entries.len() == b.entries.len()
        && a.entries.iter().all(|(key, x)| match b.entries.get(key) {
            Some(y) => ensure_sufficient_stack(|| values_equal(x, y, visited)),
            None => false,
        })
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Table
// ══════════════════════════════════════════════════════════════════════════════

/// String-keyed map that iterates in insertion order.
#[derive(Clone, Default)]
pub struct Table {
    order: Vec<String>,
    entries: BTreeMap<String, Value>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Insert or overwrite. A new key goes to the end of the iteration
    /// order; an existing key keeps its place.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return;
        }
        self.order.push(key.clone());
        self.entries.insert(key, value);
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k).map(|v| (k, v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    /// Empty the table, moving its values onto `out`.
    fn drain_values(&mut self, out: &mut Vec<Value>) {
        self.order.clear();
        out.extend(std::mem::take(&mut self.entries).into_values());
    }
}

/// Order-insensitive: two tables are equal when they bind the same keys to
/// equal values.
impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        tables_equal(self, other, &mut HashSet::new())
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Table {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut table = Table::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Callables
// ══════════════════════════════════════════════════════════════════════════════

/// A function literal bundled with the frame that was active when the
/// literal was evaluated.
pub struct Closure {
    pub func: Rc<FuncLit>,
    pub env: Env,
}

impl Closure {
    pub fn name(&self) -> Option<&str> {
        self.func.name.as_deref()
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name())
            .field("params", &self.func.params)
            .finish()
    }
}

type NativeFn = dyn Fn(Vec<Value>) -> Result<Value, Fault>;

/// A host function callable from scripts.
#[derive(Clone)]
pub struct NativeFunction {
    name: Rc<str>,
    func: Rc<NativeFn>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<Rc<str>>,
        func: impl Fn(Vec<Value>) -> Result<Value, Fault> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Value, Fault> {
        (self.func)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        for falsy in [
            Value::Nil,
            Value::Bool(false),
            Value::Int(0),
            Value::Float(0.0),
            Value::string(""),
        ] {
            assert!(!falsy.is_truthy(), "{falsy:?} should be falsy");
        }
        for truthy in [
            Value::Bool(true),
            Value::Int(-1),
            Value::Float(0.5),
            Value::string("0"),
            Value::array(vec![]),
            Value::map(Table::new()),
        ] {
            assert!(truthy.is_truthy(), "{truthy:?} should be truthy");
        }
    }

    #[test]
    fn test_arrays_share_storage() {
        let a = Value::array(vec![Value::Int(1)]);
        let b = a.clone();
        if let Value::Array(items) = &b {
            items.borrow_mut().push(Value::Int(2));
        }
        assert_eq!(a, Value::array(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_table_keeps_insertion_order() {
        let mut table = Table::new();
        table.insert("b", Value::Int(1));
        table.insert("a", Value::Int(2));
        table.insert("b", Value::Int(3));
        let keys: Vec<&String> = table.keys().collect();
        assert_eq!(keys, ["b", "a"]);
        assert_eq!(table.get("b"), Some(&Value::Int(3)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_display() {
        let table: Table = [("k", Value::string("v")), ("n", Value::Nil)]
            .into_iter()
            .collect();
        let value = Value::array(vec![Value::Int(1), Value::Float(2.0), Value::map(table)]);
        assert_eq!(value.to_string(), r#"[1, 2.0, {"k": "v", "n": nil}]"#);
        assert_eq!(Value::string("hi").to_string(), "hi");
    }

    #[test]
    fn test_self_referencing_map_displays() {
        let value = Value::map(Table::new());
        if let Value::Map(table) = &value {
            table.borrow_mut().insert("me", value.clone());
        }
        assert!(value.to_string().contains("..."));
    }

    fn self_containing(extra: i64) -> Value {
        let value = Value::map(Table::from_iter([("n", Value::Int(extra))]));
        if let Value::Map(table) = &value {
            table.borrow_mut().insert("me", value.clone());
        }
        value
    }

    /// Break the cycle so the test does not leak.
    fn unlink(value: &Value) {
        if let Value::Map(table) = value {
            table.borrow_mut().insert("me", Value::Nil);
        }
    }

    #[test]
    fn test_self_containing_maps_compare() {
        let (a, b, c) = (self_containing(1), self_containing(1), self_containing(2));
        assert_eq!(a, b);
        assert_ne!(a, c);
        for value in [&a, &b, &c] {
            unlink(value);
        }
    }

    #[test]
    fn test_mutually_containing_arrays_compare() {
        let a = Value::array(vec![]);
        let b = Value::array(vec![a.clone()]);
        if let Value::Array(items) = &a {
            items.borrow_mut().push(b.clone());
        }
        // a = [b], b = [a]: each is a one-element array of a one-element array...
        assert_eq!(a, b);
        if let Value::Array(items) = &a {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn test_deeply_nested_array_drops() {
        let mut value = Value::array(vec![]);
        for _ in 0..1_000_000 {
            value = Value::array(vec![value]);
        }
        drop(value);
    }

    #[test]
    fn test_deeply_nested_arrays_compare() {
        let build = || {
            let mut value = Value::Int(0);
            for _ in 0..200_000 {
                value = Value::array(vec![value]);
            }
            value
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_shared_child_survives_parent_drop() {
        let child = Value::array(vec![Value::Int(1)]);
        let parent = Value::array(vec![child.clone(), Value::map(Table::new())]);
        drop(parent);
        assert_eq!(child, Value::array(vec![Value::Int(1)]));
    }

    #[test]
    fn test_native_call() {
        let double = NativeFunction::new("double", |args: Vec<Value>| {
            Ok(Value::Int(args[0].as_int().unwrap_or(0) * 2))
        });
        assert_eq!(double.call(vec![Value::Int(4)]), Ok(Value::Int(8)));
        assert_eq!(double.name(), "double");
    }
}
