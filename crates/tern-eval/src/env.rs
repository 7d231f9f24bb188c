//! Lexical environments: reference-counted frames chained to a parent.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

struct Frame {
    bindings: RefCell<BTreeMap<String, Value>>,
    parent: Option<Env>,
}

/// Handle to one frame of the scope chain.
///
/// Cloning the handle shares the frame: closures that captured the same
/// frame observe each other's writes. Variables are looked up from the
/// innermost frame outward.
/// - `define` always binds in this frame.
/// - `set` updates the nearest frame that already binds the name, and
///   falls back to defining in this frame.
#[derive(Clone)]
pub struct Env(Rc<Frame>);

impl Env {
    /// Create a root frame with no parent.
    pub fn new() -> Self {
        Self(Rc::new(Frame {
            bindings: RefCell::new(BTreeMap::new()),
            parent: None,
        }))
    }

    /// Create a new frame whose parent is `self`.
    pub fn child(&self) -> Self {
        Self(Rc::new(Frame {
            bindings: RefCell::new(BTreeMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Env> {
        self.0.parent.as_ref()
    }

    /// Bind a name in this frame, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.bindings.borrow_mut().insert(name.into(), value);
    }

    /// Look up a name, searching from this frame outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut frame = Some(self);
        while let Some(env) = frame {
            if let Some(value) = env.0.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            frame = env.parent();
        }
        None
    }

    /// Assign to the nearest frame that binds `name`, or define it here.
    pub fn set(&self, name: &str, value: Value) {
        let mut frame = Some(self);
        while let Some(env) = frame {
            let mut bindings = env.0.bindings.borrow_mut();
            if let Some(slot) = bindings.get_mut(name) {
                *slot = value;
                return;
            }
            drop(bindings);
            frame = env.parent();
        }
        self.define(name, value);
    }

    /// Whether any frame in the chain binds `name`.
    pub fn is_defined(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names bound directly in this frame, in sorted order.
    pub fn local_names(&self) -> Vec<String> {
        self.0.bindings.borrow().keys().cloned().collect()
    }

    /// If this is the only handle to its frame, empty the frame's bindings
    /// onto `out`.
    pub(crate) fn detach_bindings(&mut self, out: &mut Vec<Value>) {
        if let Some(frame) = Rc::get_mut(&mut self.0) {
            out.extend(std::mem::take(frame.bindings.get_mut()).into_values());
        }
    }

    /// Whether two handles point at the same frame.
    pub fn ptr_eq(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

// Frames can reach themselves through closures stored in them, so only the
// shape of the chain is printed.
impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0;
        let mut frame = self.parent();
        while let Some(env) = frame {
            depth += 1;
            frame = env.parent();
        }
        f.debug_struct("Env")
            .field("depth", &depth)
            .field("names", &self.local_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_walks_outward() {
        let root = Env::new();
        root.define("x", Value::Int(1));
        let inner = root.child().child();
        assert_eq!(inner.get("x"), Some(Value::Int(1)));
        assert_eq!(inner.get("y"), None);
    }

    #[test]
    fn test_define_shadows() {
        let root = Env::new();
        root.define("x", Value::Int(1));
        let inner = root.child();
        inner.define("x", Value::Int(2));
        assert_eq!(inner.get("x"), Some(Value::Int(2)));
        assert_eq!(root.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_set_updates_defining_frame() {
        let root = Env::new();
        root.define("x", Value::Int(1));
        let inner = root.child();
        inner.set("x", Value::Int(5));
        assert_eq!(root.get("x"), Some(Value::Int(5)));
        assert!(inner.local_names().is_empty());
    }

    #[test]
    fn test_set_undefined_defines_innermost() {
        let root = Env::new();
        let inner = root.child();
        inner.set("y", Value::Int(3));
        assert_eq!(inner.get("y"), Some(Value::Int(3)));
        assert!(!root.is_defined("y"));
    }

    #[test]
    fn test_clones_share_frame() {
        let a = Env::new();
        let b = a.clone();
        b.define("z", Value::Bool(true));
        assert!(a.ptr_eq(&b));
        assert_eq!(a.get("z"), Some(Value::Bool(true)));
        assert!(!a.ptr_eq(&a.child()));
    }
}
