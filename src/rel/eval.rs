// Эталонный вычислитель IR.
// Реляционная алгебра (соединения, сортировки, смещения) остаётся за полной средой исполнения.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::common::error::EvalError;
use crate::rel::expr::{BinaryOp, Expr, UnaryOp, XStrPart};
use crate::rel::pattern::Pattern;
use crate::rel::scope::Scope;
use crate::rel::value::{format_number, Closure, Value};

/// Вычисляет выражение в пустой области видимости
pub fn evaluate(expr: &Expr) -> Result<Value, EvalError> {
    eval(expr, &Scope::new())
}

pub fn eval(expr: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal { value, .. } => Ok(value.clone()),
        Expr::Ident { name, span } => scope.lookup(name).map_err(|e| e.in_context(span)),
        Expr::Dot { lhs, attr, span } => {
            let value = eval(lhs, scope)?;
            value.get_attr(attr).map_err(|e| e.in_context(span))
        }
        Expr::TupleProjection {
            lhs,
            inverse,
            attrs,
            span,
        } => {
            let value = eval(lhs, scope)?;
            project(&value, *inverse, attrs).map_err(|e| e.in_context(span))
        }
        Expr::Call { func, arg, span } => {
            let f = eval(func, scope)?;
            let a = eval(arg, scope)?;
            f.call(&a).map_err(|e| e.in_context(span))
        }
        Expr::Binary { op, lhs, rhs, span } => {
            binary(*op, lhs, rhs, scope).map_err(|e| e.in_context(span))
        }
        Expr::Unary { op, operand, span } => {
            let value = eval(operand, scope)?;
            unary(*op, &value).map_err(|e| e.in_context(span))
        }
        Expr::Package { inner, .. } | Expr::Paren { inner, .. } => eval(inner, scope),
        Expr::Compare { args, ops, span } => {
            let (first, rest) = args.split_first().ok_or_else(|| {
                EvalError::type_error("empty compare chain").in_context(span)
            })?;
            if rest.len() != ops.len() {
                return Err(EvalError::type_error(format!(
                    "compare chain has {} operands for {} operators",
                    args.len(),
                    ops.len()
                ))
                .in_context(span));
            }
            let mut lhs = eval(first, scope)?;
            for (op, arg) in ops.iter().zip(rest) {
                let rhs = eval(arg, scope)?;
                if !(op.func)(&lhs, &rhs).map_err(|e| e.in_context(span))? {
                    return Ok(Value::Bool(false));
                }
                lhs = rhs;
            }
            Ok(Value::Bool(true))
        }
        Expr::IfElse {
            if_true,
            cond,
            if_false,
            ..
        } => {
            if eval(cond, scope)?.truthy() {
                eval(if_true, scope)
            } else {
                eval(if_false, scope)
            }
        }
        Expr::CondControl { control, arms, .. } => {
            let value = eval(control, scope)?;
            for (pattern, body) in arms {
                match pattern.bind(scope, &value) {
                    Ok(bindings) => return eval(body, &scope.update(&bindings)),
                    Err(err) if matches!(err.root(), EvalError::PatternMismatch { .. }) => {}
                    Err(err) => return Err(err),
                }
            }
            Ok(Value::none())
        }
        Expr::Cond { dict, .. } => cond(dict, scope),
        Expr::Count { operand, span } => {
            let value = eval(operand, scope)?;
            count(&value).map_err(|e| e.in_context(span))
        }
        Expr::Single { operand, span } => {
            let value = eval(operand, scope)?;
            single(&value).map_err(|e| e.in_context(span))
        }
        Expr::SafeTail {
            fallback,
            base,
            steps,
            ..
        } => {
            let mut current = eval(base, scope)?;
            for step in steps {
                match (step.callback)(&current, scope)? {
                    Some(next) => current = next,
                    None => return eval(fallback, scope),
                }
            }
            Ok(current)
        }
        Expr::Relation { names, tuples, .. } => {
            let mut out = BTreeSet::new();
            for tuple in tuples {
                let mut attrs = BTreeMap::new();
                for (name, value) in names.iter().zip(tuple) {
                    attrs.insert(name.clone(), eval(value, scope)?);
                }
                out.insert(Value::Tuple(attrs));
            }
            Ok(Value::Set(out))
        }
        Expr::Set { elements, .. } => elements
            .iter()
            .map(|e| eval(e, scope))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Value::Set),
        Expr::Dict { entries, .. } => {
            let mut out = BTreeMap::new();
            for entry in entries {
                out.insert(eval(&entry.key, scope)?, eval(&entry.value, scope)?);
            }
            Ok(Value::Dict(out))
        }
        Expr::Array { items, .. } => items
            .iter()
            .map(|item| item.as_ref().map(|e| eval(e, scope)).transpose())
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Bytes { items, span } => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let n = eval(item, scope)?.as_number().map_err(|e| e.in_context(span))?;
                if !(0.0..=255.0).contains(&n) || n.fract() != 0.0 {
                    return Err(EvalError::type_error(format!("{} is not a byte", n))
                        .in_context(span));
                }
                out.push(n as u8);
            }
            Ok(Value::Bytes(out))
        }
        Expr::Tuple { attrs, .. } => {
            let mut out = BTreeMap::new();
            for attr in attrs {
                out.insert(attr.name.clone(), eval(&attr.value, scope)?);
            }
            Ok(Value::Tuple(out))
        }
        Expr::Function { pattern, body, .. } => Ok(Value::Closure(Arc::new(Closure {
            pattern: (**pattern).clone(),
            body: (**body).clone(),
            scope: scope.clone(),
        }))),
        Expr::Recursion {
            name,
            base,
            fix,
            fixt,
            span,
        } => {
            let combinator = match base.as_ref() {
                Expr::Function { .. } => fix,
                Expr::Tuple { .. } => fixt,
                other => {
                    return Err(EvalError::type_error(format!(
                        "recursion over {} requires a function or a tuple",
                        other
                    ))
                    .in_context(span))
                }
            };
            let f = Value::Closure(Arc::new(Closure {
                pattern: Pattern::Expr(Expr::ident(span, name.clone())),
                body: (**base).clone(),
                scope: scope.clone(),
            }));
            eval(combinator, scope)?
                .call(&f)
                .map_err(|e| e.in_context(span))
        }
        Expr::XStr { parts, span } => {
            let mut out = String::new();
            for part in parts {
                match part {
                    XStrPart::Text(text) => out.push_str(text),
                    XStrPart::Expr { expr, format } => {
                        let value = eval(expr, scope)?;
                        let text = format_xstr(&value, format.as_deref())
                            .map_err(|e| e.in_context(span))?;
                        out.push_str(&text);
                    }
                }
            }
            Ok(Value::String(out))
        }
        Expr::Nest {
            lhs,
            inverse,
            attrs,
            name,
            span,
        } => {
            let value = eval(lhs, scope)?;
            nest(&value, *inverse, attrs, name).map_err(|e| e.in_context(span))
        }
    }
}

/// Применяет замыкание к аргументу
pub fn call_closure(closure: &Closure, arg: &Value) -> Result<Value, EvalError> {
    let bindings = closure.pattern.bind(&closure.scope, arg)?;
    eval(&closure.body, &closure.scope.update(&bindings))
}

/// Правая часть стрелки: литерал функции связывает свой паттерн,
/// любое другое выражение видит значение как `.`
pub fn apply(value: &Value, rhs: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    match rhs {
        Expr::Function { pattern, body, .. } => {
            let bindings = pattern.bind(scope, value)?;
            eval(body, &scope.update(&bindings))
        }
        _ => eval(rhs, &scope.with(".", value.clone())),
    }
}

fn binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    match op {
        BinaryOp::And => {
            let l = eval(lhs, scope)?;
            if l.truthy() {
                eval(rhs, scope)
            } else {
                Ok(l)
            }
        }
        BinaryOp::Or => {
            let l = eval(lhs, scope)?;
            if l.truthy() {
                Ok(l)
            } else {
                eval(rhs, scope)
            }
        }
        BinaryOp::Arrow => apply(&eval(lhs, scope)?, rhs, scope),
        BinaryOp::DArrow => map_elements(&eval(lhs, scope)?, rhs, scope),
        BinaryOp::SeqArrow { strict } => map_sequence(&eval(lhs, scope)?, rhs, strict, scope),
        BinaryOp::TupleMap => match eval(lhs, scope)? {
            Value::Tuple(attrs) => {
                let mut out = BTreeMap::new();
                for (k, v) in attrs {
                    let mapped = apply(&v, rhs, scope)?;
                    out.insert(k, mapped);
                }
                Ok(Value::Tuple(out))
            }
            other => Err(expected(":>", "a tuple", &other)),
        },
        BinaryOp::Where => filter(&eval(lhs, scope)?, rhs, scope),
        BinaryOp::Sum | BinaryOp::Max | BinaryOp::Mean | BinaryOp::Median | BinaryOp::Min => {
            aggregate(op, &eval(lhs, scope)?, rhs, scope)
        }
        BinaryOp::OrderBy
        | BinaryOp::Order
        | BinaryOp::Rank
        | BinaryOp::Join
        | BinaryOp::Compose
        | BinaryOp::JoinCommon
        | BinaryOp::JoinExists
        | BinaryOp::RightMatch
        | BinaryOp::LeftMatch
        | BinaryOp::RightResidue
        | BinaryOp::LeftResidue
        | BinaryOp::Offset
        | BinaryOp::AddArrow => Err(EvalError::Unsupported(format!("operator {}", op.symbol()))),
        _ => {
            let l = eval(lhs, scope)?;
            let r = eval(rhs, scope)?;
            combine(op, l, r)
        }
    }
}

fn expected(op: &str, what: &str, got: &Value) -> EvalError {
    EvalError::type_error(format!(
        "{}: expected {}, got {} {}",
        op,
        what,
        got.type_name(),
        got
    ))
}

/// Пара (@: ключ, @value: значение), которой словарь представлен как множество
fn dict_entry(k: &Value, v: &Value) -> Value {
    Value::tuple([("@", k.clone()), ("@value", v.clone())])
}

fn map_elements(value: &Value, rhs: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    match value {
        Value::Set(items) => items
            .iter()
            .map(|v| apply(v, rhs, scope))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Value::Set),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_ref().map(|v| apply(v, rhs, scope)).transpose())
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Dict(entries) => entries
            .iter()
            .map(|(k, v)| apply(&dict_entry(k, v), rhs, scope))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Value::Set),
        other => Err(expected("=>", "a set, array or dict", other)),
    }
}

fn map_sequence(
    value: &Value,
    rhs: &Expr,
    strict: bool,
    scope: &Scope,
) -> Result<Value, EvalError> {
    let step = |key: Value, v: &Value| -> Result<Value, EvalError> {
        if strict {
            apply(&key, rhs, scope)?.call(v)
        } else {
            apply(v, rhs, scope)
        }
    };
    match value {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_ref()
                    .map(|v| step(Value::Number(i as f64), v))
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Dict(entries) => {
            let mut out = BTreeMap::new();
            for (k, v) in entries {
                out.insert(k.clone(), step(k.clone(), v)?);
            }
            Ok(Value::Dict(out))
        }
        v if v.is_none() => Ok(Value::none()),
        other => Err(expected(">>", "an array or dict", other)),
    }
}

fn filter(value: &Value, rhs: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    match value {
        Value::Set(items) => {
            let mut out = BTreeSet::new();
            for v in items {
                if apply(v, rhs, scope)?.truthy() {
                    out.insert(v.clone());
                }
            }
            Ok(Value::Set(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let kept = match item {
                    Some(v) => {
                        if apply(v, rhs, scope)?.truthy() {
                            Some(v.clone())
                        } else {
                            None
                        }
                    }
                    None => None,
                };
                out.push(kept);
            }
            Ok(Value::Array(out))
        }
        Value::Dict(entries) => {
            let mut out = BTreeMap::new();
            for (k, v) in entries {
                if apply(&dict_entry(k, v), rhs, scope)?.truthy() {
                    out.insert(k.clone(), v.clone());
                }
            }
            Ok(Value::Dict(out))
        }
        other => Err(expected("where", "a set, array or dict", other)),
    }
}

fn aggregate(op: BinaryOp, value: &Value, rhs: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    let elements: Vec<&Value> = match value {
        Value::Set(items) => items.iter().collect(),
        Value::Array(items) => items.iter().flatten().collect(),
        other => return Err(expected(op.symbol(), "a set or array", other)),
    };
    let mut numbers = Vec::with_capacity(elements.len());
    for v in elements {
        numbers.push(apply(v, rhs, scope)?.as_number()?);
    }
    if numbers.is_empty() {
        return match op {
            BinaryOp::Sum => Ok(Value::Number(0.0)),
            _ => Err(EvalError::NoReturn),
        };
    }
    let n = numbers.len() as f64;
    let result = match op {
        BinaryOp::Sum => numbers.iter().sum::<f64>(),
        BinaryOp::Max => numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        BinaryOp::Min => numbers.iter().copied().fold(f64::INFINITY, f64::min),
        BinaryOp::Mean => numbers.iter().sum::<f64>() / n,
        _ => {
            numbers.sort_by(|a, b| a.total_cmp(b));
            let mid = numbers.len() / 2;
            if numbers.len() % 2 == 0 {
                (numbers[mid - 1] + numbers[mid]) / 2.0
            } else {
                numbers[mid]
            }
        }
    };
    Ok(Value::Number(result))
}

fn combine(op: BinaryOp, l: Value, r: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add
        | BinaryOp::Sub
        | BinaryOp::Mul
        | BinaryOp::Div
        | BinaryOp::Mod
        | BinaryOp::SubMod
        | BinaryOp::IntDiv
        | BinaryOp::Pow => {
            let a = l.as_number()?;
            let b = r.as_number()?;
            let n = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => a / b,
                BinaryOp::Mod => a % b,
                BinaryOp::SubMod => a - a % b,
                BinaryOp::IntDiv => (a / b).floor(),
                _ => a.powf(b),
            };
            Ok(Value::Number(n))
        }
        BinaryOp::Concat => match (l, r) {
            (Value::Array(mut a), Value::Array(b)) => {
                a.extend(b);
                Ok(Value::Array(a))
            }
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            (Value::Bytes(mut a), Value::Bytes(b)) => {
                a.extend(b);
                Ok(Value::Bytes(a))
            }
            (a, b) if a.is_none() => Ok(b),
            (a, b) if b.is_none() => Ok(a),
            (a, _) => Err(expected("++", "an array, string or bytes", &a)),
        },
        BinaryOp::With => match l {
            Value::Set(mut items) => {
                items.insert(r);
                Ok(Value::Set(items))
            }
            other => Err(expected("with", "a set", &other)),
        },
        BinaryOp::Without => match l {
            Value::Set(mut items) => {
                items.remove(&r);
                Ok(Value::Set(items))
            }
            other => Err(expected("without", "a set", &other)),
        },
        _ => {
            let a = l.as_set()?;
            let b = r.as_set()?;
            let out: BTreeSet<Value> = match op {
                BinaryOp::Union => a.union(b).cloned().collect(),
                BinaryOp::Intersect => a.intersection(b).cloned().collect(),
                BinaryOp::Difference => a.difference(b).cloned().collect(),
                BinaryOp::SymmetricDiff => a.symmetric_difference(b).cloned().collect(),
                other => return Err(EvalError::Unsupported(format!("operator {}", other.symbol()))),
            };
            Ok(Value::Set(out))
        }
    }
}

fn unary(op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Pos => Ok(Value::Number(value.as_number()?)),
        UnaryOp::Neg => Ok(Value::Number(-value.as_number()?)),
        UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
        UnaryOp::PowerSet => {
            let items: Vec<&Value> = value.as_set()?.iter().collect();
            if items.len() > 16 {
                return Err(EvalError::Unsupported(format!(
                    "power set of {} elements",
                    items.len()
                )));
            }
            let mut out = BTreeSet::new();
            for mask in 0u32..(1 << items.len()) {
                let subset = items
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, v)| (*v).clone());
                out.insert(Value::set(subset));
            }
            Ok(Value::Set(out))
        }
        UnaryOp::Eval => Err(EvalError::Unsupported("operator *".to_string())),
    }
}

fn cond(dict: &Expr, scope: &Scope) -> Result<Value, EvalError> {
    match dict {
        Expr::Dict { entries, .. } => {
            for entry in entries {
                let matched = match entry.key.as_ident() {
                    Some("_") => true,
                    _ => eval(&entry.key, scope)?.truthy(),
                };
                if matched {
                    return eval(&entry.value, scope);
                }
            }
            Ok(Value::none())
        }
        other => match eval(other, scope)? {
            Value::Dict(entries) => Ok(entries
                .into_iter()
                .find(|(k, _)| k.truthy())
                .map(|(_, v)| v)
                .unwrap_or_else(Value::none)),
            v => Err(expected("cond", "a dict", &v)),
        },
    }
}

fn count(value: &Value) -> Result<Value, EvalError> {
    let n = match value {
        Value::Set(items) => items.len(),
        Value::Array(items) => items.iter().flatten().count(),
        Value::Dict(entries) => entries.len(),
        Value::Tuple(attrs) => attrs.len(),
        Value::String(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        other => return Err(expected("count", "a collection", other)),
    };
    Ok(Value::Number(n as f64))
}

fn single(value: &Value) -> Result<Value, EvalError> {
    let mut items: Vec<&Value> = match value {
        Value::Set(items) => items.iter().collect(),
        Value::Array(items) => items.iter().flatten().collect(),
        other => return Err(expected("single", "a set or array", other)),
    };
    match (items.pop(), items.is_empty()) {
        (Some(v), true) => Ok(v.clone()),
        _ => Err(EvalError::type_error(format!(
            "single: {} does not have exactly one element",
            value
        ))),
    }
}

fn project(value: &Value, inverse: bool, attrs: &[String]) -> Result<Value, EvalError> {
    match value {
        Value::Tuple(tuple) => {
            if !inverse {
                if let Some(missing) = attrs.iter().find(|a| !tuple.contains_key(*a)) {
                    return Err(EvalError::MissingAttr {
                        attr: missing.clone(),
                        available: tuple.keys().cloned().collect(),
                    });
                }
            }
            Ok(Value::Tuple(
                tuple
                    .iter()
                    .filter(|(k, _)| attrs.contains(k) != inverse)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ))
        }
        Value::Set(items) => items
            .iter()
            .map(|v| project(v, inverse, attrs))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Value::Set),
        other => Err(expected("projection", "a tuple or relation", other)),
    }
}

fn nest(value: &Value, inverse: bool, attrs: &[String], name: &str) -> Result<Value, EvalError> {
    let mut groups: BTreeMap<BTreeMap<String, Value>, BTreeSet<Value>> = BTreeMap::new();
    for item in value.as_set()? {
        let tuple = match item {
            Value::Tuple(tuple) => tuple,
            other => return Err(expected("nest", "a relation", other)),
        };
        let mut key = BTreeMap::new();
        let mut nested = BTreeMap::new();
        for (k, v) in tuple {
            if attrs.contains(k) != inverse {
                nested.insert(k.clone(), v.clone());
            } else {
                key.insert(k.clone(), v.clone());
            }
        }
        groups.entry(key).or_default().insert(Value::Tuple(nested));
    }
    Ok(Value::Set(
        groups
            .into_iter()
            .map(|(mut key, nested)| {
                key.insert(name.to_string(), Value::Set(nested));
                Value::Tuple(key)
            })
            .collect(),
    ))
}

fn format_xstr(value: &Value, format: Option<&str>) -> Result<String, EvalError> {
    match (format, value) {
        (None, Value::String(s)) => Ok(s.clone()),
        (None, v) => Ok(v.to_string()),
        (Some("q"), v) => Ok(v.to_string()),
        (Some(spec), Value::Number(n)) if spec.starts_with('.') && spec.ends_with('f') => {
            let precision: usize = spec[1..spec.len() - 1]
                .parse()
                .map_err(|_| EvalError::Unsupported(format!("format {:?}", spec)))?;
            Ok(format!("{:.*}", precision, n))
        }
        (Some("d"), Value::Number(n)) => Ok(format_number(n.trunc())),
        (Some(spec), _) => Err(EvalError::Unsupported(format!("format {:?}", spec))),
    }
}
