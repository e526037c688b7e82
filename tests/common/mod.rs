// Общие помощники интеграционных тестов: дерево в JSON → IR

#![allow(dead_code)]

use rel_syntax::{evaluate, CompileError, Compiler, Expr, Value};
use serde_json::json;

/// Документ `{"source": ..., "tree": ...}` для грамматики по умолчанию
pub fn document(source: &str, tree: serde_json::Value) -> String {
    json!({ "source": source, "tree": tree }).to_string()
}

pub fn lower(source: &str, tree: serde_json::Value) -> Result<Expr, CompileError> {
    Compiler::new().compile("", &document(source, tree))
}

pub fn lower_ok(source: &str, tree: serde_json::Value) -> Expr {
    match lower(source, tree) {
        Ok(expr) => expr,
        Err(err) => panic!("compiling {:?} failed: {}", source, err),
    }
}

pub fn eval_tree(source: &str, tree: serde_json::Value) -> Value {
    let expr = lower_ok(source, tree);
    match evaluate(&expr) {
        Ok(value) => value,
        Err(err) => panic!("evaluating {} failed: {}", expr, err),
    }
}

pub fn num(n: &str) -> serde_json::Value {
    json!({ "NUM": n })
}

pub fn ident(name: &str) -> serde_json::Value {
    json!({ "IDENT": name })
}

pub fn string(quoted: &str) -> serde_json::Value {
    json!({ "STR": quoted })
}

pub fn binop(op: &str, lhs: serde_json::Value, rhs: serde_json::Value) -> serde_json::Value {
    json!({ "binop": [op], "expr": [lhs, rhs] })
}

/// `[a, b, ...]` как выражение или паттерн
pub fn array(items: Vec<serde_json::Value>) -> serde_json::Value {
    let mut items = items.into_iter();
    match items.next() {
        Some(first) => json!({
            "array": { "first_item": first, "item": items.collect::<Vec<_>>() },
            "odelim": "[",
            "cdelim": "]",
        }),
        None => json!({ "array": {}, "odelim": "[", "cdelim": "]" }),
    }
}

/// `(name: v, ...)`
pub fn tuple(pairs: Vec<(&str, serde_json::Value)>) -> serde_json::Value {
    let pairs: Vec<_> = pairs
        .into_iter()
        .map(|(name, v)| json!({ "name": { "IDENT": name }, "v": v }))
        .collect();
    json!({ "tuple": { "pairs": pairs }, "odelim": "(", "cdelim": ")" })
}

/// `let pattern = value; body`
pub fn let_in(
    pattern: serde_json::Value,
    value: serde_json::Value,
    body: serde_json::Value,
) -> serde_json::Value {
    json!({ "let": { "pattern": pattern, "expr": [value, body] } })
}
