//! Property-based tests for the operator rules in `tern_eval::coerce`.
//!
//! These check algebraic laws over generated scalar values:
//! 1. Equality is symmetric and `!=` is its negation
//! 2. Ints equal their float promotion
//! 3. Integer division and remainder reconstruct the dividend
//! 4. Relational operators agree with their mirror image
//! 5. `!` is the negation of truthiness

use proptest::prelude::*;
use tern_eval::coerce::{binary, compare, equals, unary};
use tern_eval::Value;
use tern_types::ast::{BinOp, UnaryOp};

// -- Strategies --

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Nil),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        (-1.0e9..1.0e9f64).prop_map(Value::Float),
        "[a-z]{0,4}".prop_map(Value::String),
    ]
}

fn number_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-1_000_000i64..1_000_000).prop_map(Value::Int),
        (-1.0e6..1.0e6f64).prop_map(Value::Float),
    ]
}

// -- Properties --

proptest! {
    #[test]
    fn equality_is_symmetric(a in scalar_strategy(), b in scalar_strategy()) {
        prop_assert_eq!(equals(&a, &b), equals(&b, &a));
    }

    #[test]
    fn not_equal_negates_equal(a in scalar_strategy(), b in scalar_strategy()) {
        let eq = binary(BinOp::Eq, &a, &b).unwrap();
        let ne = binary(BinOp::NotEq, &a, &b).unwrap();
        prop_assert_eq!(ne, Value::Bool(!eq.is_truthy()));
    }

    #[test]
    fn int_equals_its_promotion(n in -(1i64 << 53)..(1i64 << 53)) {
        prop_assert_eq!(equals(&Value::Int(n), &Value::Float(n as f64)), Ok(true));
    }

    #[test]
    fn division_reconstructs_dividend(a in any::<i64>(), b in any::<i64>()) {
        prop_assume!(b != 0);
        let q = binary(BinOp::Div, &Value::Int(a), &Value::Int(b)).unwrap();
        let r = binary(BinOp::Mod, &Value::Int(a), &Value::Int(b)).unwrap();
        let (Value::Int(q), Value::Int(r)) = (q, r) else {
            panic!("integer operands must give integer results");
        };
        prop_assert_eq!(q.wrapping_mul(b).wrapping_add(r), a);
    }

    #[test]
    fn less_mirrors_greater(a in number_strategy(), b in number_strategy()) {
        prop_assert_eq!(
            compare(BinOp::Less, &a, &b),
            compare(BinOp::Greater, &b, &a)
        );
    }

    #[test]
    fn addition_commutes(a in number_strategy(), b in number_strategy()) {
        prop_assert_eq!(
            binary(BinOp::Add, &a, &b),
            binary(BinOp::Add, &b, &a)
        );
    }

    #[test]
    fn not_is_negated_truthiness(v in scalar_strategy()) {
        prop_assert_eq!(unary(UnaryOp::Not, &v), Ok(Value::Bool(!v.is_truthy())));
    }
}
