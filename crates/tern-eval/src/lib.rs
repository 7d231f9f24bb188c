//! Tern tree-walking evaluator.
//!
//! Executes Tern programs directly from the AST. Values are dynamically
//! typed; arrays, maps and environment frames are reference-counted and
//! shared, so closures observe each other's writes.
//!
//! ```
//! use tern_eval::{builtins, Env, Evaluator, Value};
//!
//! let program = tern_parser::parse("x = len([1, 2, 3])\nx * 2").unwrap();
//! let env = Env::new();
//! builtins::register(&env);
//! let result = Evaluator::new().evaluate(&program, &env).unwrap();
//! assert_eq!(result, Value::Int(6));
//! ```

pub mod builtins;
pub mod coerce;
mod config;
mod env;
mod error;
mod evaluator;
mod value;

pub use config::EvalConfig;
pub use env::Env;
pub use error::{Condition, EvalError, EvalResult, Fault};
pub use evaluator::{evaluate, Evaluator, Flow};
pub use value::{Closure, NativeFunction, Table, Value};
