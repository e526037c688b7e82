// Безопасная навигация: `a?.b.c:fallback`

use std::sync::Arc;

use crate::common::error::{abort, CompileError};
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::access::{attr_name, call_args};
use crate::compiler::expr::{child, compile_expr};
use crate::rel::eval::eval;
use crate::rel::expr::{format_attr, Expr, SafeTailCallback, SafeTailStep};
use crate::rel::scope::Scope;
use crate::rel::value::Value;
use crate::syntax::ast::Node;

pub fn compile_safe_tails(
    ctx: &CompilationContext,
    base: Expr,
    tail: &Node,
) -> Result<Expr, CompileError> {
    let first = child(child(tail, "first_safe"), "tail");
    let mut steps = vec![make_safe(compile_tail_step(ctx, first)?)];
    let fallback = compile_expr(ctx, child(tail, "fall"))?;

    for op in tail.many("ops") {
        let step = if let Some(safe) = op.one("safe") {
            make_safe(compile_tail_step(ctx, child(safe, "tail"))?)
        } else if let Some(plain) = op.one("tail") {
            compile_tail_step(ctx, plain)?
        } else {
            abort(CompileError::malformed(
                op.span(),
                format!("safe tail op without tail: {:?}", op),
            ))
        };
        steps.push(step);
    }

    Ok(Expr::SafeTail {
        fallback: Box::new(fallback),
        base: Box::new(base),
        steps,
        span: tail.span().clone(),
    })
}

/// Шаг цепочки как замыкание над уже скомпилированными аргументами
fn compile_tail_step(ctx: &CompilationContext, tail: &Node) -> Result<SafeTailStep, CompileError> {
    let args = match tail.one("call") {
        Some(call) => Some((call.span().clone(), call_args(ctx, call)?)),
        None => None,
    };
    let attr = tail.one("get").map(attr_name);
    if args.is_none() && attr.is_none() {
        abort(CompileError::malformed(tail.span(), "no tail"));
    }

    let mut label = String::new();
    if let Some((_, args)) = &args {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        label.push_str(&format!("({})", args.join(", ")));
    }
    if let Some((_, attr)) = &attr {
        label.push_str(&format!(".{}", format_attr(attr)));
    }

    let callback: SafeTailCallback = Arc::new(move |v: &Value, local: &Scope| {
        let mut v = v.clone();
        if let Some((span, args)) = &args {
            for arg in args {
                let a = eval(arg, local)?;
                v = v.call(&a).map_err(|e| e.in_context(span))?;
            }
        }
        if let Some((span, attr)) = &attr {
            v = v.get_attr(attr).map_err(|e| e.in_context(span))?;
        }
        Ok(Some(v))
    });

    Ok(SafeTailStep {
        label,
        safe: false,
        callback,
    })
}

/// Отсутствие атрибута или значения прерывает цепочку вместо ошибки
fn make_safe(step: SafeTailStep) -> SafeTailStep {
    let inner = step.callback;
    let callback: SafeTailCallback =
        Arc::new(move |v: &Value, local: &Scope| match inner(v, local) {
            Err(err) if err.is_absent_signal() => Ok(None),
            other => other,
        });
    SafeTailStep {
        label: step.label,
        safe: true,
        callback,
    }
}
