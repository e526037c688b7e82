// Условные выражения: устаревший `if` и `cond`

use std::collections::BTreeMap;

use crate::common::diagnostics::IF_DEPRECATION;
use crate::common::error::{abort, CompileError};
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::collection::compile_dict_entries;
use crate::compiler::expr::{child, compile_expr, compile_exprs};
use crate::compiler::pattern::compile_pattern;
use crate::rel::expr::Expr;
use crate::rel::value::Value;
use crate::syntax::ast::{Children, Node};

/// `r if t else f`; без `else` ложная ветвь это пустое множество
pub fn compile_if(ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    ctx.diagnostics.warn_deprecated_once(IF_DEPRECATION);

    let mut result = compile_expr(ctx, child(node, "expr"))?;
    let span = result.span().clone();
    for branch in node.many("if") {
        let cond = compile_expr(ctx, child(branch, "t"))?;
        let if_false = match branch.one("f") {
            Some(f) => compile_expr(ctx, f)?,
            None => Expr::literal(&span, Value::none()),
        };
        result = Expr::IfElse {
            if_true: Box::new(result),
            cond: Box::new(cond),
            if_false: Box::new(if_false),
            span: span.clone(),
        };
    }
    Ok(result)
}

pub fn compile_cond(ctx: &CompilationContext, cond: &Node) -> Result<Expr, CompileError> {
    match cond.one("controlVar") {
        Some(control) => compile_cond_with_control(ctx, cond, control),
        None => compile_cond_without_control(ctx, cond),
    }
}

/// `cond x {P1: v1, P2: v2}`: первая подходящая ветвь
fn compile_cond_with_control(
    ctx: &CompilationContext,
    cond: &Node,
    control: &Node,
) -> Result<Expr, CompileError> {
    let mut patterns = Vec::new();
    for element in cond.many("condition") {
        if !element.has("pattern") {
            abort(CompileError::malformed(
                element.span(),
                format!("cond condition without pattern: {:?}", element),
            ));
        }
        patterns.push(compile_pattern(ctx, element)?);
    }

    let mut values = Vec::new();
    for value in cond.many("value") {
        values.push(compile_cond_value(ctx, value)?);
    }

    if patterns.len() != values.len() {
        return Err(CompileError::arity(
            cond.span(),
            format!(
                "mismatch between conditions and values: {} vs {}",
                patterns.len(),
                values.len()
            ),
        ));
    }

    Ok(Expr::CondControl {
        control: Box::new(compile_expr(ctx, control)?),
        arms: patterns.into_iter().zip(values).collect(),
        span: cond.span().clone(),
    })
}

/// Несколько выражений в одной ветви собираются в массив
fn compile_cond_value(ctx: &CompilationContext, value: &Node) -> Result<Expr, CompileError> {
    match value.get("expr") {
        Some(Children::One(expr)) => compile_expr(ctx, expr),
        Some(Children::Many(exprs)) if exprs.len() == 1 => compile_expr(ctx, &exprs[0]),
        Some(Children::Many(exprs)) if !exprs.is_empty() => {
            let items = compile_exprs(ctx, exprs)?.into_iter().map(Some).collect();
            Ok(Expr::array(value.span(), items))
        }
        _ => Err(CompileError::arity(value.span(), "cond value without expression")),
    }
}

/// `cond {c1: v1, _: v0}`: ветви без управляющего выражения
fn compile_cond_without_control(ctx: &CompilationContext, cond: &Node) -> Result<Expr, CompileError> {
    let span = cond.span();
    let dict = match compile_dict_entries(ctx, cond)? {
        Some(entries) => Expr::Dict {
            entries,
            conditional: true,
            span: span.clone(),
        },
        None => Expr::literal(span, Value::Dict(BTreeMap::new())),
    };
    Ok(Expr::Cond {
        dict: Box::new(dict),
        span: span.clone(),
    })
}
