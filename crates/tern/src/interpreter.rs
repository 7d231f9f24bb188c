use crate::cache::ProgramCache;
use crate::error::Result;
use tern_eval::{builtins, Env, EvalConfig, Evaluator, Fault, NativeFunction, Value};
use tern_types::ast::Program;

/// A root environment plus an evaluator.
///
/// Globals persist across runs: a variable assigned by one `run` is visible
/// to the next. Builtins are bound in the root frame at construction.
pub struct Interpreter {
    globals: Env,
    evaluator: Evaluator,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(EvalConfig::default())
    }

    pub fn with_config(config: EvalConfig) -> Self {
        let globals = Env::new();
        builtins::register(&globals);
        Self {
            globals,
            evaluator: Evaluator::with_config(config),
        }
    }

    pub fn config(&self) -> &EvalConfig {
        self.evaluator.config()
    }

    /// The root frame.
    pub fn globals(&self) -> &Env {
        &self.globals
    }

    /// Steps consumed by the most recent run.
    pub fn gas_used(&self) -> u64 {
        self.evaluator.gas_used()
    }

    /// Parse and evaluate `source`.
    pub fn run(&mut self, source: &str) -> Result<Value> {
        let program = tern_parser::parse(source)?;
        self.run_program(&program)
    }

    pub fn run_program(&mut self, program: &Program) -> Result<Value> {
        Ok(self.evaluator.evaluate(program, &self.globals)?)
    }

    /// Parse `source` and return its encoding, ready for [`run_compiled`].
    ///
    /// [`run_compiled`]: Interpreter::run_compiled
    pub fn compile(&self, source: &str) -> Result<Vec<u8>> {
        let program = tern_parser::parse(source)?;
        Ok(tern_codec::encode_program(&program)?)
    }

    pub fn run_compiled(&mut self, bytes: &[u8]) -> Result<Value> {
        let program = tern_codec::decode_program(bytes)?;
        self.run_program(&program)
    }

    /// Run `source`, going through `cache` instead of parsing when possible.
    pub fn run_cached(&mut self, cache: &mut ProgramCache, source: &str) -> Result<Value> {
        let program = cache.load(source)?;
        self.run_program(&program)
    }

    /// Bind `name` in the root frame.
    pub fn define(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.globals.define(name, value.into());
    }

    /// Bind a host function in the root frame.
    pub fn define_native<F>(&self, name: &str, func: F)
    where
        F: Fn(Vec<Value>) -> std::result::Result<Value, Fault> + 'static,
    {
        self.globals
            .define(name, Value::Native(NativeFunction::new(name, func)));
    }

    /// Look up `name` in the root frame.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.globals.get(name)
    }
}
