// Коллекции: отношения, множества, словари, массивы, байты и кортежи

use std::collections::{BTreeMap, BTreeSet};

use crate::common::error::CompileError;
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::{child, compile_expr, compile_exprs, delims_span, parse_name, parse_names};
use crate::compiler::recursion::fix_funcs;
use crate::rel::expr::{DictEntry, Expr, TupleAttr};
use crate::rel::value::Value;
use crate::syntax::ast::Node;

/// `{|a, b| (1, 2), (3, 4)}`
pub fn compile_relation(
    ctx: &CompilationContext,
    node: &Node,
    rel: &Node,
) -> Result<Expr, CompileError> {
    let span = delims_span(node);
    let names = parse_names(child(rel, "names"));

    let mut seen = BTreeSet::new();
    if let Some(dup) = names.iter().find(|name| !seen.insert(name.as_str())) {
        return Err(CompileError::arity(
            &span,
            format!("relation names must be unique, {:?} repeats", dup),
        ));
    }

    let mut tuples = Vec::new();
    for tuple in rel.many("tuple") {
        let values = compile_exprs(ctx, tuple.many("v"))?;
        if values.len() != names.len() {
            return Err(CompileError::arity(
                tuple.span(),
                format!(
                    "relation tuple has {} values, expected {}",
                    values.len(),
                    names.len()
                ),
            ));
        }
        tuples.push(values);
    }
    Ok(Expr::Relation {
        names,
        tuples,
        span,
    })
}

pub fn compile_set(ctx: &CompilationContext, node: &Node, set: &Node) -> Result<Expr, CompileError> {
    let span = delims_span(node);
    if set.has("elt") {
        let elements = compile_exprs(ctx, set.many("elt"))?;
        return Ok(Expr::Set { elements, span });
    }
    Ok(Expr::literal(&span, Value::none()))
}

pub fn compile_dict(ctx: &CompilationContext, node: &Node, dict: &Node) -> Result<Expr, CompileError> {
    let span = delims_span(node);
    match compile_dict_entries(ctx, dict)? {
        Some(entries) => Ok(Expr::Dict {
            entries,
            conditional: false,
            span,
        }),
        None => Ok(Expr::literal(&span, Value::Dict(BTreeMap::new()))),
    }
}

/// Пары `key: value`; `None`, если пар нет вовсе
pub fn compile_dict_entries(
    ctx: &CompilationContext,
    node: &Node,
) -> Result<Option<Vec<DictEntry>>, CompileError> {
    let pairs = node.many("pairs");
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut entries = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let (key, value) = match (pair.one("key"), pair.one("value")) {
            (Some(key), Some(value)) => (key, value),
            _ => {
                return Err(CompileError::arity(
                    pair.span(),
                    "dictionary pair needs both a key and a value",
                ))
            }
        };
        entries.push(DictEntry {
            key: compile_expr(ctx, key)?,
            value: compile_expr(ctx, value)?,
            span: pair.span().clone(),
        });
    }
    Ok(Some(entries))
}

pub fn compile_array(
    ctx: &CompilationContext,
    node: &Node,
    array: &Node,
) -> Result<Expr, CompileError> {
    let span = delims_span(node);
    let items = compile_sparse_items(ctx, array)?;
    if items.is_empty() {
        return Ok(Expr::literal(&span, Value::Array(Vec::new())));
    }
    Ok(Expr::array(&span, items))
}

/// Элементы `[a, , c]`: пропуск это `None`
fn compile_sparse_items(
    ctx: &CompilationContext,
    array: &Node,
) -> Result<Vec<Option<Expr>>, CompileError> {
    let first = match array.one("first_item") {
        Some(first) => first,
        None => return Ok(Vec::new()),
    };
    std::iter::once(first)
        .chain(array.many("item"))
        .map(|item| {
            if item.has("empty") {
                Ok(None)
            } else {
                compile_expr(ctx, item).map(Some)
            }
        })
        .collect()
}

pub fn compile_bytes(
    ctx: &CompilationContext,
    node: &Node,
    bytes: &Node,
) -> Result<Expr, CompileError> {
    let span = delims_span(node);
    if bytes.has("item") {
        let items = compile_exprs(ctx, bytes.many("item"))?;
        return Ok(Expr::Bytes { items, span });
    }
    Ok(Expr::literal(&span, Value::Bytes(Vec::new())))
}

/// `(a: 1, b)`: без явного имени атрибут называется по идентификатору или `.attr`
pub fn compile_tuple(
    ctx: &CompilationContext,
    node: &Node,
    tuple: &Node,
) -> Result<Expr, CompileError> {
    let span = delims_span(node);
    let pairs = tuple.many("pairs");
    if pairs.is_empty() {
        return Ok(Expr::literal(&span, Value::tuple(Vec::<(String, Value)>::new())));
    }

    let mut attrs = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let v = child(pair, "v");
        let mut value = compile_expr(ctx, v)?;
        let name = match pair.one("name") {
            Some(name) => parse_name(name),
            None => match &value {
                Expr::Dot { attr, .. } => attr.clone(),
                Expr::Ident { name, .. } => name.clone(),
                other => {
                    return Err(CompileError::unsupported(
                        v.span(),
                        format!("unnamed attr expression must be name or end in .name: {}", other),
                    ))
                }
            },
        };
        if pair.has("rec") {
            let (fix, fixt) = fix_funcs();
            value = Expr::Recursion {
                name: name.clone(),
                base: Box::new(value),
                fix: Box::new(fix),
                fixt: Box::new(fixt),
                span: v.span().clone(),
            };
        }
        attrs.push(TupleAttr { name, value });
    }
    Ok(Expr::Tuple { attrs, span })
}
