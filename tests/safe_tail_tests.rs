// Тесты безопасной навигации `?.`

mod common;

use common::{array, eval_tree, lower_ok, num, tuple};
use pretty_assertions::assert_eq;
use rel_syntax::{evaluate, EvalError, Expr, Value};
use serde_json::json;

fn get(attr: &str) -> serde_json::Value {
    json!({ "get": { "IDENT": attr } })
}

fn call(arg: serde_json::Value) -> serde_json::Value {
    json!({ "call": { "arg": [{ "expr": arg }] } })
}

/// `base?first ops...:fallback`; `ops` это пары (безопасный?, хвост)
fn safe_chain(
    base: serde_json::Value,
    first: serde_json::Value,
    ops: Vec<(bool, serde_json::Value)>,
    fallback: serde_json::Value,
) -> serde_json::Value {
    let ops: Vec<_> = ops
        .into_iter()
        .map(|(safe, tail)| {
            if safe {
                json!({ "safe": { "tail": tail } })
            } else {
                json!({ "tail": tail })
            }
        })
        .collect();
    json!({
        "expr": base,
        "tail_op": [{
            "safe_tail": { "first_safe": { "tail": first }, "ops": ops, "fall": fallback },
        }],
    })
}

fn nested() -> serde_json::Value {
    tuple(vec![("a", tuple(vec![("b", num("1"))]))])
}

#[test]
fn test_present_chain_returns_value() {
    let tree = safe_chain(nested(), get("a"), vec![(false, get("b"))], num("0"));
    assert_eq!(eval_tree("(a: (b: 1))?.a.b:0", tree), Value::Number(1.0));
}

#[test]
fn test_missing_attribute_yields_fallback() {
    let tree = safe_chain(tuple(vec![]), get("a"), vec![], num("42"));
    assert_eq!(eval_tree("()?.a:42", tree), Value::Number(42.0));
}

#[test]
fn test_short_circuit_skips_remaining_steps() {
    // `.b` на отсутствующем значении не вычисляется вовсе
    let tree = safe_chain(tuple(vec![]), get("a"), vec![(false, get("b"))], num("42"));
    assert_eq!(eval_tree("()?.a.b:42", tree), Value::Number(42.0));
}

#[test]
fn test_later_safe_step() {
    let tree = safe_chain(nested(), get("a"), vec![(true, get("c"))], num("7"));
    assert_eq!(eval_tree("(a: (b: 1))?.a?.c:7", tree), Value::Number(7.0));
}

#[test]
fn test_unsafe_step_propagates_missing_attribute() {
    let tree = safe_chain(nested(), get("a"), vec![(false, get("c"))], num("7"));
    let expr = lower_ok("(a: (b: 1))?.a.c:7", tree);
    let err = evaluate(&expr).unwrap_err();
    assert!(matches!(err.root(), EvalError::MissingAttr { .. }), "{}", err);
}

#[test]
fn test_type_errors_are_not_absorbed() {
    let tree = safe_chain(num("1"), get("a"), vec![], num("0"));
    let expr = lower_ok("1?.a:0", tree);
    let err = evaluate(&expr).unwrap_err();
    assert!(matches!(err.root(), EvalError::Type(_)), "{}", err);
}

#[test]
fn test_safe_call_out_of_range() {
    let base = || array(vec![num("10"), num("20")]);
    let hit = safe_chain(base(), call(num("1")), vec![], num("7"));
    assert_eq!(eval_tree("[10, 20]?(1):7", hit), Value::Number(20.0));

    let miss = safe_chain(base(), call(num("5")), vec![], num("7"));
    assert_eq!(eval_tree("[10, 20]?(5):7", miss), Value::Number(7.0));
}

#[test]
fn test_safe_tail_node_shape() {
    let tree = safe_chain(nested(), get("a"), vec![(false, get("b")), (true, get("c"))], num("0"));
    let expr = lower_ok("(a: (b: 1))?.a.b?.c:0", tree);
    match &expr {
        Expr::SafeTail { steps, .. } => {
            let safe: Vec<bool> = steps.iter().map(|s| s.safe).collect();
            assert_eq!(safe, vec![true, false, true]);
            let labels: Vec<&str> = steps.iter().map(|s| s.label.as_str()).collect();
            assert_eq!(labels, vec![".a", ".b", ".c"]);
        }
        other => panic!("expected safe tail, got {}", other),
    }
}
