// Тесты паттернов деструктуризации в let, функциях и cond

mod common;

use common::{array, binop, eval_tree, ident, let_in, lower, lower_ok, num, string, tuple};
use pretty_assertions::assert_eq;
use rel_syntax::{evaluate, CompileError, EvalError, Pattern, Value};
use serde_json::json;

fn extra(name: &str) -> serde_json::Value {
    json!({ "extra": { "ident": name } })
}

#[test]
fn test_let_array_destructuring() {
    let tree = let_in(
        json!({ "pattern": array(vec![ident("a"), ident("b")]) }),
        array(vec![num("1"), num("2")]),
        binop("+", ident("a"), ident("b")),
    );
    assert_eq!(eval_tree("let [a, b] = [1, 2]; a + b", tree), Value::Number(3.0));
}

#[test]
fn test_let_array_pattern_rejects_longer_value() {
    let tree = let_in(
        json!({ "pattern": array(vec![ident("a"), ident("b")]) }),
        array(vec![num("1"), num("2"), num("3")]),
        ident("a"),
    );
    let expr = lower_ok("let [a, b] = [1, 2, 3]; a", tree);
    let err = evaluate(&expr).unwrap_err();
    assert!(
        matches!(err.root(), EvalError::PatternMismatch { .. }),
        "{}",
        err
    );
}

#[test]
fn test_extra_element_captures_rest() {
    let tree = let_in(
        json!({ "pattern": array(vec![ident("a"), extra("rest")]) }),
        array(vec![num("1"), num("2"), num("3")]),
        ident("rest"),
    );
    assert_eq!(
        eval_tree("let [a, ...rest] = [1, 2, 3]; rest", tree),
        Value::array([Value::Number(2.0), Value::Number(3.0)])
    );
}

#[test]
fn test_extra_element_needs_prefix() {
    let tree = let_in(
        json!({ "pattern": array(vec![ident("a"), extra("rest")]) }),
        array(vec![]),
        ident("a"),
    );
    let expr = lower_ok("let [a, ...rest] = []; a", tree);
    assert!(evaluate(&expr).is_err());
}

#[test]
fn test_duplicate_extra_is_rejected() {
    let tree = let_in(
        json!({ "pattern": array(vec![extra("a"), extra("b")]) }),
        array(vec![num("1")]),
        ident("a"),
    );
    match lower("let [...a, ...b] = [1]; a", tree).unwrap_err() {
        CompileError::DuplicateExtraElement { structure, .. } => assert_eq!(structure, "array"),
        other => panic!("expected duplicate extra, got {}", other),
    }
}

#[test]
fn test_elided_array_slot() {
    let pattern = json!({
        "array": {
            "first_item": { "empty": "" },
            "item": [ident("b")],
        },
    });
    let tree = let_in(
        json!({ "pattern": pattern }),
        array(vec![num("1"), num("2")]),
        ident("b"),
    );
    assert_eq!(eval_tree("let [, b] = [1, 2]; b", tree), Value::Number(2.0));
}

#[test]
fn test_tuple_pattern_fallback_requires_tail_marker() {
    let pattern = json!({
        "tuple": { "pairs": [{ "name": ident("a"), "v": { "IDENT": "x", "fall": num("1") } }] },
    });
    let tree = let_in(json!({ "pattern": pattern }), tuple(vec![]), ident("x"));
    let err = lower("let (a: x:1) = (); x", tree).unwrap_err();
    assert!(matches!(err, CompileError::PatternShapeMismatch { .. }), "{}", err);
}

#[test]
fn test_tuple_pattern_fallback_applies() {
    let pattern = json!({
        "tuple": {
            "pairs": [{ "name": ident("a"), "tail": "?", "v": { "IDENT": "x", "fall": num("1") } }],
        },
    });
    let tree = let_in(json!({ "pattern": pattern }), tuple(vec![]), ident("x"));
    assert_eq!(eval_tree("let (a?: x:1) = (); x", tree), Value::Number(1.0));
}

#[test]
fn test_tuple_pattern_binds_by_name() {
    let pattern = json!({
        "tuple": { "pairs": [{ "v": ident("a") }, { "name": ident("b"), "v": ident("y") }] },
    });
    let tree = let_in(
        json!({ "pattern": pattern }),
        tuple(vec![("a", num("1")), ("b", num("2"))]),
        binop("+", ident("a"), ident("y")),
    );
    assert_eq!(eval_tree("let (a, b: y) = (a: 1, b: 2); a + y", tree), Value::Number(3.0));
}

#[test]
fn test_dict_pattern_fallback_on_key_tail() {
    let pattern = json!({
        "dict": {
            "pairs": [{
                "key": { "STR": "'k'", "tail": "?" },
                "value": { "IDENT": "v", "fall": num("5") },
            }],
        },
    });
    let empty = json!({ "dict": {}, "odelim": "{", "cdelim": "}" });
    let tree = let_in(json!({ "pattern": pattern }), empty, ident("v"));
    assert_eq!(eval_tree("let {'k'?: v:5} = {}; v", tree), Value::Number(5.0));
}

#[test]
fn test_let_rec_requires_single_name() {
    let tree = json!({
        "let": {
            "rec": "rec",
            "pattern": { "pattern": array(vec![ident("f")]) },
            "expr": [array(vec![num("1")]), ident("f")],
        },
    });
    let err = lower("let rec [f] = [1]; f", tree).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedConstruct { .. }), "{}", err);
}

#[test]
fn test_function_pattern() {
    let tree = json!({
        "fn": "\\",
        "pattern": { "pattern": ident("x") },
        "expr": binop("*", ident("x"), num("2")),
    });
    let expr = lower_ok("\\x x * 2", tree);
    match &expr {
        rel_syntax::Expr::Function { pattern, .. } => {
            assert!(matches!(pattern.as_ref(), Pattern::Expr(_)));
        }
        other => panic!("expected function, got {}", other),
    }
    let doubled = evaluate(&expr).unwrap().call(&Value::Number(21.0)).unwrap();
    assert_eq!(doubled, Value::Number(42.0));
}

#[test]
fn test_cond_with_control_value() {
    let tree = json!({
        "cond": {
            "controlVar": num("2"),
            "condition": [{ "pattern": num("1") }, { "pattern": num("2") }],
            "value": [{ "expr": string("'a'") }, { "expr": string("'b'") }],
        },
    });
    assert_eq!(
        eval_tree("cond 2 {1: 'a', 2: 'b'}", tree),
        Value::string("b")
    );
}

#[test]
fn test_cond_with_control_falls_through_to_none() {
    let tree = json!({
        "cond": {
            "controlVar": num("3"),
            "condition": [{ "pattern": num("1") }],
            "value": [{ "expr": string("'a'") }],
        },
    });
    assert_eq!(eval_tree("cond 3 {1: 'a'}", tree), Value::none());
}

#[test]
fn test_cond_arity_mismatch() {
    let tree = json!({
        "cond": {
            "controlVar": num("2"),
            "condition": [{ "pattern": num("1") }, { "pattern": num("2") }],
            "value": [{ "expr": string("'a'") }],
        },
    });
    let err = lower("cond 2 {1: 'a', 2}", tree).unwrap_err();
    assert!(matches!(err, CompileError::ArityMismatch { .. }), "{}", err);
}

#[test]
fn test_cond_without_control() {
    let tree = json!({
        "cond": {
            "pairs": [
                { "key": ident("false"), "value": num("1") },
                { "key": ident("true"), "value": num("2") },
            ],
        },
    });
    assert_eq!(eval_tree("cond {false: 1, true: 2}", tree), Value::Number(2.0));
}
