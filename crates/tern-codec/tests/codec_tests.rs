//! Codec tests: corpus round-trips, the byte layout, and hostile input.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tern_codec::{
    decode, decode_into, decode_node, decode_position, decode_program, encode, encode_node,
    encode_position, encode_program, DecodeError,
};
use tern_types::ast::{Expr, ExprKind, Stmt};
use tern_types::Position;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Programs covering every statement and expression form.
const CORPUS: &[&str] = &[
    "a = nil",
    "a = 1",
    "a = 1.2",
    r#"a = "foo""#,
    "a = true",
    "a = false",
    "a = [1,2,3]",
    r#"a = {"foo": "bar", "bar": "baz"}"#,
    r#"a = {"foo": "bar", "bar": {"blah": true, "blah!": [1.3e3, true]}}"#,
    "toString(1)",
    "toString(1.2)",
    r#"toString("foo")"#,
    "1 > 0",
    "1 == 1.0",
    r#"1 != "1""#,
    "1.1 == 1.1",
    r#"false != "1""#,
    "nil == nil",
    "1 <= 2 ? true : false",
    "a = 1; a += 1",
    "a = 2; a -= 1",
    "a = 2; a *= 2",
    "a = 3; a /= 2",
    "a = 2; a++",
    "a = 2; a--",
    "a = 2**3",
    "a = 1; a &= 2",
    "a = 1; a |= 2",
    "a = !3",
    "a = ^3",
    "a = 3 << 2",
    "a = 11 >> 2",
    "func a() { return 2 }",
    "func b(x) { return x + 1 }",
    "func c(x) { return x, x + 1 }",
    "func d(x) { return func() { return x + 1 } }",
    r#"var x = func(x) {
	  return func(y) {
	    x(y)
	  }
	 }(func(z) {
	  return "Yay! " + z
	 })("hello world")"#,
    r#"len([1,2,true,["foo"]])"#,
    "x = 0
     for a in [1,2,3] {
      x += 1
     }",
    "x = 0
	 for {
	  x += 1
	  if (x > 3) {
	    break
	  }
	 }",
    "func for_with_return_stmt() {
	  y = 0
	  for k in range(0, 10) {
	    if k == 5 {
	      return y
	    }
	    y++
	  }
	  return 1
	 }",
    "x = 0
	 for a = 0; a < 10; a++ {
	  x++
	 }",
    r#"resp = {
	    "items": [{
	        "someData": 2,
	    }]
	 }
	 x = 0
	 for item in resp.items {
	    x += item.someData
	 }"#,
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
    "r = -1
	 if (false) {
	  r = 1
	 } else if (false) {
	  r = 2
	 } else {
	  r = 4
	 }",
    r#"a = toByteSlice("あいうえお")
	 x = 0
	 for i = 0; i < len(a); i++ {
	  if (a[i] == 227) {
	    x++
	  } else {
	    continue
	  }
	 }"#,
    "for k, v in {`raw`: [0x1f, -2.5e-3]} { m[k].f = v ? nil : !v }",
];

fn parse(source: &str) -> Vec<Stmt> {
    tern_parser::parse(source)
        .unwrap_or_else(|e| panic!("parse error in {source:?}: {e}"))
        .stmts
}

// ─────────────────────────────────────────────────────────────────────
// Round trips
// ─────────────────────────────────────────────────────────────────────

#[test]
fn corpus_round_trips_with_positions() {
    for source in CORPUS {
        let stmts = parse(source);
        let bytes = encode(&stmts).unwrap();
        let decoded = decode(&bytes).unwrap_or_else(|e| panic!("{source:?}: {e}"));
        assert_eq!(decoded, stmts, "{source}");
    }
}

#[test]
fn program_round_trip() {
    let program = tern_parser::parse("func f(a, b) { return a ** b }\nf(2, 10)").unwrap();
    let bytes = encode_program(&program).unwrap();
    assert_eq!(decode_program(&bytes).unwrap(), program);
}

#[test]
fn single_expression_round_trip() {
    let expr = Expr::new(ExprKind::Str("héllo".into()), Position::new(3, 4));
    let bytes = encode_node(&expr).unwrap();
    assert_eq!(decode_node::<Expr>(&bytes).unwrap(), expr);
}

// ─────────────────────────────────────────────────────────────────────
// Byte layout
// ─────────────────────────────────────────────────────────────────────

#[test]
fn assignment_golden_bytes() {
    let bytes = encode(&parse("x = 1")).unwrap();
    #[rustfmt::skip]
    let expected: Vec<u8> = vec![
        1, 0, 0, 0, 0, 0, 0, 0, // one statement
        2, 0, 0, 0,             // StmtKind::Assign
        7, 0, 0, 0,             //   target: ExprKind::Ident
        1, 0, 0, 0, 0, 0, 0, 0, //     name length
        b'x',
        1, 0, 0, 0, 1, 0, 0, 0, //     position 1:1
        2, 0, 0, 0,             //   value: ExprKind::Int
        1, 0, 0, 0, 0, 0, 0, 0, //     1
        1, 0, 0, 0, 5, 0, 0, 0, //     position 1:5
        1, 0, 0, 0, 1, 0, 0, 0, // statement position 1:1
    ];
    assert_eq!(bytes, expected);
}

#[test]
fn position_layout() {
    assert_eq!(encode_position(Position::new(1, 2)).unwrap(), [1, 0, 0, 0, 2, 0, 0, 0]);
    assert_eq!(
        decode_position(&[0x10, 0x27, 0, 0, 7, 0, 0, 0]),
        Ok(Position::new(10_000, 7))
    );
}

// ─────────────────────────────────────────────────────────────────────
// Hostile input
// ─────────────────────────────────────────────────────────────────────

#[test]
fn every_strict_prefix_is_truncated() {
    let bytes = encode(&parse(CORPUS[36])).unwrap();
    for len in 0..bytes.len() {
        assert_eq!(decode(&bytes[..len]), Err(DecodeError::Truncated), "prefix of {len} bytes");
    }
}

#[test]
fn bad_discriminant_is_unknown_variant() {
    let mut bytes = encode(&parse("x = 1")).unwrap();
    bytes[8] = 99;
    assert!(matches!(decode(&bytes), Err(DecodeError::UnknownVariant(_))));

    let mut bytes = encode(&parse("x = 1")).unwrap();
    bytes[12] = 0xff;
    assert!(matches!(decode(&bytes), Err(DecodeError::UnknownVariant(_))));
}

#[test]
fn invalid_utf8_is_malformed() {
    let mut bytes = encode(&parse("x = 1")).unwrap();
    bytes[24] = 0xff;
    assert!(matches!(decode(&bytes), Err(DecodeError::Malformed(_))));
}

#[test]
fn oversized_length_prefix_is_rejected() {
    let mut bytes = encode(&parse("x = 1")).unwrap();
    bytes[16..24].copy_from_slice(&u64::MAX.to_le_bytes());
    assert!(decode(&bytes).is_err());
}

#[test]
fn decode_into_keeps_destination_on_error() {
    let original = parse("a = 1");
    let mut dest = original.clone();
    let bytes = encode(&parse("b = 2; c = 3")).unwrap();

    assert!(decode_into(&bytes[..bytes.len() - 1], &mut dest).is_err());
    assert_eq!(dest, original);

    decode_into(&bytes, &mut dest).unwrap();
    assert_eq!(dest.len(), 2);
}

#[test]
fn deeply_nested_stream_is_malformed() {
    // One statement, `StmtKind::Expr`, then `ExprKind::Paren` forever.
    let mut bytes = Vec::with_capacity(12 + 4 * 2_000_000);
    bytes.extend_from_slice(&1u64.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    for _ in 0..2_000_000 {
        bytes.extend_from_slice(&15u32.to_le_bytes());
    }
    let err = decode(&bytes).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(ref msg) if msg.contains("nesting")), "{err:?}");

    // The depth count is released after a failed decode.
    let ok = encode(&parse("x = ((1))")).unwrap();
    assert_eq!(decode(&ok).unwrap(), parse("x = ((1))"));
}

#[test]
fn deepest_parsable_program_round_trips() {
    let source = format!("x = {}1{}", "(".repeat(500), ")".repeat(500));
    let stmts = parse(&source);
    let bytes = encode(&stmts).unwrap();
    assert_eq!(decode(&bytes).unwrap(), stmts);
}

// ─────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn position_round_trips(line in any::<i32>(), column in any::<i32>()) {
        let pos = Position::new(line, column);
        let bytes = encode_position(pos).unwrap();
        prop_assert_eq!(bytes.len(), 8);
        prop_assert_eq!(decode_position(&bytes), Ok(pos));
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode(&bytes);
    }
}
