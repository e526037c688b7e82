// Тесты цепочек операторов: свёртки, сравнения и таблицы

mod common;

use common::{binop, eval_tree, ident, lower, lower_ok, num};
use pretty_assertions::assert_eq;
use rel_syntax::{CompileError, Expr, Value};
use serde_json::json;

#[test]
fn test_binop_left_fold() {
    let tree = json!({ "binop": ["+", "+"], "expr": [num("1"), num("2"), num("3")] });
    let expr = lower_ok("1 + 2 + 3", tree.clone());
    assert_eq!(expr.to_string(), "((1 + 2) + 3)");
    assert_eq!(eval_tree("1 + 2 + 3", tree), Value::Number(6.0));
}

#[test]
fn test_binop_mixed_operators_fold_left() {
    // 10 - 4 - 3 = 3, а не 10 - (4 - 3) = 9
    let tree = json!({ "binop": ["-", "-"], "expr": [num("10"), num("4"), num("3")] });
    assert_eq!(eval_tree("10 - 4 - 3", tree), Value::Number(3.0));
}

#[test]
fn test_rbinop_right_fold() {
    let tree = json!({ "rbinop": ["^", "^"], "expr": [num("2"), num("3"), num("2")] });
    let expr = lower_ok("2 ^ 3 ^ 2", tree.clone());
    assert_eq!(expr.to_string(), "(2 ^ (3 ^ 2))");
    assert_eq!(eval_tree("2 ^ 3 ^ 2", tree), Value::Number(512.0));
}

#[test]
fn test_rbinop_span_is_operator() {
    let tree = json!({ "rbinop": ["^"], "expr": [num("2"), num("3")] });
    let expr = lower_ok("2 ^ 3", tree);
    assert_eq!(expr.span().text(), "^");
}

#[test]
fn test_unop_applies_right_to_left() {
    let tree = json!({ "unop": ["-", "-"], "expr": num("1") });
    let expr = lower_ok("- -1", tree.clone());
    assert_eq!(expr.to_string(), "(-(-1))");
    assert_eq!(eval_tree("- -1", tree), Value::Number(1.0));
}

#[test]
fn test_dot_prefixed_unary() {
    let tree = json!({ "unop": ["=>"], "expr": ident("f") });
    let expr = lower_ok("=> f", tree);
    assert_eq!(expr.to_string(), "(. => f)");
}

#[test]
fn test_compare_chain_is_single_node() {
    let tree = json!({ "compare": ["<", "<="], "expr": [num("1"), num("2"), num("2")] });
    let expr = lower_ok("1 < 2 <= 2", tree.clone());
    match &expr {
        Expr::Compare { args, ops, .. } => {
            assert_eq!(args.len(), 3);
            assert_eq!(ops.len(), 2);
            assert_eq!(ops[0].symbol, "<");
            assert_eq!(ops[1].symbol, "<=");
        }
        other => panic!("expected compare chain, got {:?}", other),
    }
    assert_eq!(eval_tree("1 < 2 <= 2", tree), Value::Bool(true));
}

#[test]
fn test_compare_chain_short_circuits_to_false() {
    let tree = json!({ "compare": ["<", "<"], "expr": [num("3"), num("2"), num("5")] });
    assert_eq!(eval_tree("3 < 2 < 5", tree), Value::Bool(false));
}

#[test]
fn test_compare_span_covers_operands() {
    let tree = json!({ "compare": ["<"], "expr": [num("1"), num("2")] });
    let expr = lower_ok("1 < 2", tree);
    assert_eq!(expr.span().text(), "1 < 2");
}

#[test]
fn test_compare_arity_mismatch() {
    let tree = json!({ "compare": ["<", "<"], "expr": [num("1"), num("2")] });
    let err = lower("1 < 2 <", tree).unwrap_err();
    assert!(matches!(err, CompileError::ArityMismatch { .. }), "{}", err);
}

#[test]
fn test_unresolved_binary_operator_aborts_to_error() {
    let tree = json!({ "binop": ["+++"], "expr": [num("1"), num("2")] });
    match lower("1 +++ 2", tree).unwrap_err() {
        CompileError::UnresolvedOperator { table, op, .. } => {
            assert_eq!(table, "binary");
            assert_eq!(op, "+++");
        }
        other => panic!("expected unresolved operator, got {}", other),
    }
}

#[test]
fn test_unresolved_compare_operator() {
    let tree = json!({ "compare": ["<<>>"], "expr": [num("1"), num("2")] });
    let err = lower("1 <<>> 2", tree).unwrap_err();
    assert!(matches!(err, CompileError::UnresolvedOperator { table: "compare", .. }));
}

#[test]
fn test_boolean_operators_short_circuit() {
    // правая часть не вычисляется: `x` не связан
    let tree = binop("||", ident("true"), ident("x"));
    assert_eq!(eval_tree("true || x", tree), Value::Bool(true));
}

#[test]
fn test_compilation_is_deterministic() {
    let tree = json!({ "binop": ["*", "+"], "expr": [num("2"), num("3"), num("4")] });
    let a = lower_ok("2 * 3 + 4", tree.clone());
    let b = lower_ok("2 * 3 + 4", tree);
    assert_eq!(a, b);
}
