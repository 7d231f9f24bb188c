//! Tern: an embeddable scripting interpreter.
//!
//! ```text
//! source → Lexer → Parser → Program → Evaluator → Value
//!                              ↕
//!                        tern-codec bytes
//! ```
//!
//! ```
//! use tern::{Interpreter, Value};
//!
//! let mut interp = Interpreter::new();
//! interp.define_native("double", |args| match args.as_slice() {
//!     [Value::Int(n)] => Ok(Value::Int(n * 2)),
//!     _ => Err(tern::Fault::type_mismatch("double expects one int")),
//! });
//! assert_eq!(interp.run("double(len(\"abc\"))").unwrap(), Value::Int(6));
//! ```

mod cache;
mod error;
mod interpreter;

pub use cache::{CacheStats, ProgramCache, SourceHash};
pub use error::{Error, Result};
pub use interpreter::Interpreter;

pub use tern_eval::{Condition, Env, EvalConfig, EvalError, Fault, NativeFunction, Table, Value};
pub use tern_types::ast::Program;
pub use tern_types::{ParseError, Position};
