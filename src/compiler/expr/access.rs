// Вызовы и обращения к атрибутам: `f(a, b)`, `x.a`, `x.|a, b|`, `.a`

use crate::common::error::{abort, CompileError};
use crate::common::span::Span;
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::literal::parse_string;
use crate::compiler::expr::{access_span, child, compile_expr, parse_names, safe_tail, token};
use crate::rel::expr::Expr;
use crate::syntax::ast::Node;

pub fn compile_call_get(ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    let mut result = match node.one("expr") {
        Some(expr) => compile_expr(ctx, expr)?,
        None => {
            // `.a` читает атрибут текущего значения `.`
            let get = child(node, "get");
            let dot = child(get, "dot");
            compile_get(Expr::ident(dot.span(), "."), Some(get))?
        }
    };
    for part in node.many("tail_op") {
        result = match part.one("safe_tail") {
            Some(safe) => safe_tail::compile_safe_tails(ctx, result, safe)?,
            None => compile_tail(ctx, result, part.one("tail"))?,
        };
    }
    Ok(result)
}

/// Аргументы вызова каррируются: `f(a, b)` это `f(a)(b)`
pub fn compile_tail(
    ctx: &CompilationContext,
    mut base: Expr,
    tail: Option<&Node>,
) -> Result<Expr, CompileError> {
    let tail = match tail {
        Some(tail) => tail,
        None => return Ok(base),
    };
    if let Some(call) = tail.one("call") {
        for arg in call_args(ctx, call)? {
            let span = access_span(base.span(), call.span());
            base = Expr::call(&span, base, arg);
        }
    }
    compile_get(base, tail.one("get"))
}

pub(crate) fn call_args(ctx: &CompilationContext, call: &Node) -> Result<Vec<Expr>, CompileError> {
    call.many("arg")
        .iter()
        .map(|arg| compile_expr(ctx, child(arg, "expr")))
        .collect()
}

pub fn compile_get(base: Expr, get: Option<&Node>) -> Result<Expr, CompileError> {
    let get = match get {
        Some(get) => get,
        None => return Ok(base),
    };
    if let Some(names) = get.one("names") {
        let span = access_span(base.span(), names.span());
        return Ok(Expr::TupleProjection {
            lhs: Box::new(base),
            inverse: get.has("inverse"),
            attrs: parse_names(names),
            span,
        });
    }
    let (attr_span, attr) = attr_name(get);
    let span = access_span(base.span(), &attr_span);
    Ok(Expr::dot(&span, base, attr))
}

/// Имя атрибута из `IDENT` или строкового литерала
pub(crate) fn attr_name(get: &Node) -> (Span, String) {
    if let Some(ident) = get.one("IDENT") {
        let ident = token(ident);
        return (ident.span().clone(), ident.text().to_string());
    }
    if let Some(s) = get.one("STR") {
        let s = token(s);
        return (s.span().clone(), parse_string(s.text()));
    }
    abort(CompileError::malformed(
        get.span(),
        format!("attribute access without a name: {:?}", get),
    ))
}
