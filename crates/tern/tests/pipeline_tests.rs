//! End-to-end tests: source → parse → (encode → decode) → evaluate.
//!
//! Each program of the reference corpus is run three ways (directly, through
//! compiled bytes, and through the program cache) and must leave the same
//! value in the same global.

use pretty_assertions::assert_eq;
use tern::{
    Condition, Error, EvalConfig, Fault, Interpreter, Position, ProgramCache, Table, Value,
};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn s(text: &str) -> Value {
    Value::string(text)
}

fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().copied().map(Value::Int).collect())
}

/// Run `source` in a fresh interpreter and return global `name`.
fn global_after(source: &str, name: &str) -> Value {
    let mut interp = Interpreter::new();
    if let Err(e) = interp.run(source) {
        panic!("{source:?} failed: {e}");
    }
    interp
        .get(name)
        .unwrap_or_else(|| panic!("'{name}' is not defined after {source:?}"))
}

/// Same as [`global_after`], but through compiled bytes.
fn global_after_compiled(source: &str, name: &str) -> Value {
    let mut interp = Interpreter::new();
    let bytes = interp.compile(source).unwrap();
    if let Err(e) = interp.run_compiled(&bytes) {
        panic!("{source:?} failed after decoding: {e}");
    }
    interp.get(name).unwrap()
}

/// `(source, global to inspect, expected value)`
fn corpus() -> Vec<(&'static str, &'static str, Value)> {
    vec![
        ("a = nil", "a", Value::Nil),
        ("a = 1", "a", Value::Int(1)),
        ("a = 1.2", "a", Value::Float(1.2)),
        (r#"a = "foo""#, "a", s("foo")),
        ("a = true", "a", Value::Bool(true)),
        ("a = false", "a", Value::Bool(false)),
        ("a = [1,2,3]", "a", ints(&[1, 2, 3])),
        (
            r#"a = {"foo": "bar", "bar": {"blah": true, "blah!": [1.3e3, true]}}"#,
            "a",
            Value::map(Table::from_iter([
                ("foo", s("bar")),
                (
                    "bar",
                    Value::map(Table::from_iter([
                        ("blah", Value::Bool(true)),
                        (
                            "blah!",
                            Value::array(vec![Value::Float(1300.0), Value::Bool(true)]),
                        ),
                    ])),
                ),
            ])),
        ),
        ("a = toString(1)", "a", s("1")),
        ("a = toString(1.2)", "a", s("1.2")),
        (r#"a = toString("foo")"#, "a", s("foo")),
        ("a = 1 > 0", "a", Value::Bool(true)),
        ("a = 1 == 1.0", "a", Value::Bool(true)),
        (r#"a = 1 != "1""#, "a", Value::Bool(true)),
        ("a = 1.1 == 1.1", "a", Value::Bool(true)),
        (r#"a = false != "1""#, "a", Value::Bool(true)),
        ("a = nil == nil", "a", Value::Bool(true)),
        ("a = 1 <= 2 ? true : false", "a", Value::Bool(true)),
        ("a = 1; a += 1", "a", Value::Int(2)),
        ("a = 2; a -= 1", "a", Value::Int(1)),
        ("a = 2; a *= 2", "a", Value::Int(4)),
        ("a = 3; a /= 2", "a", Value::Int(1)),
        ("a = 2; a++", "a", Value::Int(3)),
        ("a = 2; a--", "a", Value::Int(1)),
        ("a = 2**3", "a", Value::Int(8)),
        ("a = 1; a &= 2", "a", Value::Int(0)),
        ("a = 1; a |= 2", "a", Value::Int(3)),
        ("a = !3", "a", Value::Bool(false)),
        ("a = ^3", "a", Value::Int(-4)),
        ("a = 3 << 2", "a", Value::Int(12)),
        ("a = 11 >> 2", "a", Value::Int(2)),
        ("func a() { return 2 }\nx = a()", "x", Value::Int(2)),
        ("func b(x) { return x + 1 }\nx = b(1)", "x", Value::Int(2)),
        ("func c(x) { return x, x + 1 }\nx = c(1)", "x", ints(&[1, 2])),
        (
            "func d(x) { return func() { return x + 1 } }\nx = d(1)()",
            "x",
            Value::Int(2),
        ),
        (
            r#"var x = func(x) {
                 return func(y) {
                   return x(y)
                 }
               }(func(z) {
                 return "Yay! " + z
               })("hello world")"#,
            "x",
            s("Yay! hello world"),
        ),
        (r#"x = len([1,2,true,["foo"]])"#, "x", Value::Int(4)),
        (
            "x = 0
             for a in [1,2,3] {
               x += 1
             }",
            "x",
            Value::Int(3),
        ),
        (
            "x = 0
             for {
               x += 1
               if (x > 3) {
                 break
               }
             }",
            "x",
            Value::Int(4),
        ),
        (
            "func loop_with_return_stmt() {
               y = 0
               for k in range(0, 10) {
                 if k == 5 {
                   return y
                 }
                 y++
               }
               return 1
             }
             x = loop_with_return_stmt()",
            "x",
            Value::Int(5),
        ),
        (
            "x = 0
             for a = 0; a < 10; a++ {
               x++
             }",
            "x",
            Value::Int(10),
        ),
        (
            "func cstylefor_with_return_stmt() {
               y = 0
               for i = 0; i < 10; i++ {
                 if i == 5 {
                   return y
                 }
                 y++
               }
               return 1
             }
             x = cstylefor_with_return_stmt()",
            "x",
            Value::Int(5),
        ),
        (
            r#"resp = {
                 "items": [{
                   "someData": 2,
                 }]
               }
               x = 0
               for item in resp.items {
                 x += item.someData
               }"#,
            "x",
            Value::Int(2),
        ),
        (
            "x = 3
             r = -1
             switch x {
             case 0:
               r = 0
             case 1, 2:
               r = 1
             default:
               r = 3
             }",
            "r",
            Value::Int(3),
        ),
        (
            "x = 5
             r = -1
             switch x {
             case 0:
               r = 0
             case 1, 2:
               r = 1
             }",
            "r",
            Value::Int(-1),
        ),
        (
            "r = -1
             if (false) {
               r = 1
             } else if (false) {
               r = 2
             } else {
               r = 4
             }",
            "r",
            Value::Int(4),
        ),
        (
            r#"a = toByteSlice("あいうえお")
               b = [227,129,130,227,129,132,227,129,134,227,129,136,227,129,138]
               x = 0
               for i = 0; i < len(a); i++ {
                 if (a[i] == b[i]) {
                   x++
                 }
               }"#,
            "x",
            Value::Int(15),
        ),
        (
            r#"a = toRuneSlice("あいうえお")
               b = [12354, 12356, 12358, 12360, 12362]
               x = 0
               for i = 0; i < len(a); i++ {
                 if (a[i] == b[i]) {
                   x++
                 }
               }"#,
            "x",
            Value::Int(5),
        ),
    ]
}

// ══════════════════════════════════════════════════════════════════════════════
// Corpus
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn corpus_runs_from_source() {
    for (source, name, expected) in corpus() {
        assert_eq!(global_after(source, name), expected, "{source}");
    }
}

#[test]
fn corpus_runs_from_compiled_bytes() {
    for (source, name, expected) in corpus() {
        assert_eq!(global_after_compiled(source, name), expected, "{source}");
    }
}

#[test]
fn corpus_runs_through_cache() {
    let mut cache = ProgramCache::new();
    for _ in 0..2 {
        for (source, name, expected) in corpus() {
            let mut interp = Interpreter::new();
            interp.run_cached(&mut cache, source).unwrap();
            assert_eq!(interp.get(name).unwrap(), expected, "{source}");
        }
    }
    let n = corpus().len() as u64;
    assert_eq!(cache.stats().misses, n);
    assert_eq!(cache.stats().hits, n);
}

// ══════════════════════════════════════════════════════════════════════════════
// Embedding surface
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn program_value_is_last_statement() {
    let mut interp = Interpreter::new();
    assert_eq!(interp.run("x = 2\nx * 21").unwrap(), Value::Int(42));
    assert_eq!(interp.run("").unwrap(), Value::Nil);
}

#[test]
fn host_defined_values_are_visible() {
    let mut interp = Interpreter::new();
    interp.define("greeting", "hi");
    interp.define("limit", 3i64);
    assert_eq!(interp.run(r#"greeting + " there""#).unwrap(), s("hi there"));
    assert_eq!(interp.run("limit * 2").unwrap(), Value::Int(6));
}

#[test]
fn host_sees_script_mutations_of_shared_array() {
    let mut interp = Interpreter::new();
    let items = Value::array(vec![]);
    interp.define("items", items.clone());
    interp.run("items[0] = 1\nitems[1] = 2").unwrap();
    assert_eq!(items, ints(&[1, 2]));
}

#[test]
fn native_fault_carries_call_position() {
    let mut interp = Interpreter::new();
    interp.define_native("fail", |_| Err(Fault::new(Condition::NotCallable, "nope")));
    let Err(Error::Eval(err)) = interp.run("x = 1\ny = fail()") else {
        panic!("expected a runtime error");
    };
    assert_eq!(err.condition, Condition::NotCallable);
    assert_eq!(err.position, Position::new(2, 9));
}

#[test]
fn parse_error_is_reported_before_running() {
    let mut interp = Interpreter::new();
    let Err(Error::Parse(err)) = interp.run("x = 1\ny = (") else {
        panic!("expected a parse error");
    };
    assert_eq!(err.position.line, 2);
    assert!(interp.get("x").is_none());
}

#[test]
fn runtime_error_keeps_earlier_writes() {
    let mut interp = Interpreter::new();
    let err = interp.run("x = 1\nx = missing").unwrap_err();
    assert!(matches!(
        err,
        Error::Eval(ref e) if e.condition == Condition::UndefinedIdentifier
    ));
    assert_eq!(interp.get("x"), Some(Value::Int(1)));
    assert_eq!(interp.run("x + 1").unwrap(), Value::Int(2));
}

#[test]
fn corrupt_bytes_are_a_decode_error() {
    let mut interp = Interpreter::new();
    let bytes = interp.compile("x = 1").unwrap();
    assert!(matches!(
        interp.run_compiled(&bytes[..bytes.len() - 1]),
        Err(Error::Decode(_))
    ));
}

#[test]
fn gas_limit_stops_infinite_loop() {
    let config = EvalConfig::default().with_gas_limit(10_000);
    let mut interp = Interpreter::with_config(config);
    let err = interp.run("for {}").unwrap_err();
    assert!(matches!(err, Error::Eval(ref e) if e.condition == Condition::GasExhausted));
    assert!(interp.gas_used() > 10_000);

    assert_eq!(interp.run("1 + 1").unwrap(), Value::Int(2));
}

#[test]
fn config_from_json() {
    let config = EvalConfig::from_json(r#"{"max_call_depth": 8}"#).unwrap();
    let mut interp = Interpreter::with_config(config);
    let err = interp.run("func f(n) { return f(n + 1) }\nf(0)").unwrap_err();
    assert!(matches!(err, Error::Eval(ref e) if e.condition == Condition::CallDepthExceeded));
}

#[test]
fn error_display_includes_position() {
    let mut interp = Interpreter::new();
    let err = interp.run("a = [1]\na[5]").unwrap_err();
    assert!(err.to_string().starts_with("2:"), "{err}");
}

// ══════════════════════════════════════════════════════════════════════════════
// Deep programs
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn recursion_at_default_limits() {
    let mut interp = Interpreter::new();
    let value = interp
        .run("func f(n) { if n == 0 { return 0 }\n return f(n - 1) + 1 }\nf(127)")
        .unwrap();
    assert_eq!(value, Value::Int(127));
}

#[test]
fn deeply_nested_source_is_a_parse_error() {
    let mut interp = Interpreter::new();
    let source = format!("x = {}1{}", "(".repeat(100_000), ")".repeat(100_000));
    let Err(Error::Parse(err)) = interp.run(&source) else {
        panic!("expected a parse error");
    };
    assert!(err.message.contains("nesting too deep"), "{err}");
    assert!(matches!(interp.compile(&source), Err(Error::Parse(_))));
}

#[test]
fn deeply_nested_value_is_released() {
    let mut interp = Interpreter::new();
    let value = interp
        .run("a = []\nfor k = 0; k < 1000000; k++ { a = [a] }\n1")
        .unwrap();
    assert_eq!(value, Value::Int(1));
    drop(interp);
}
