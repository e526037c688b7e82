// `let P = E1; E2` ⇒ `E1 -> \P E2`

use crate::common::error::{abort, CompileError};
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::compile_expr;
use crate::compiler::pattern::compile_pattern;
use crate::compiler::recursion::fix_funcs;
use crate::rel::expr::Expr;
use crate::syntax::ast::Node;

pub fn compile_let(ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    let span = node.span();
    let (value, body) = match node.many("expr") {
        [value, body] => (value, body),
        other => abort(CompileError::malformed(
            span,
            format!("let expects two expr children, found {}", other.len()),
        )),
    };
    let mut value = compile_expr(ctx, value)?;
    let body = compile_expr(ctx, body)?;

    let pattern = compile_pattern(ctx, node)?;

    if node.has("rec") {
        let name = match pattern.as_expr().and_then(Expr::as_ident) {
            Some(name) => name.to_string(),
            None => {
                return Err(CompileError::unsupported(
                    span,
                    format!("let rec binding must be a single name, got {}", pattern),
                ))
            }
        };
        let (fix, fixt) = fix_funcs();
        value = Expr::Recursion {
            name,
            base: Box::new(value),
            fix: Box::new(fix),
            fixt: Box::new(fixt),
            span: span.clone(),
        };
    }

    let arrow = ctx.operators.binary("->", span);
    Ok(Expr::binary(span, arrow, value, Expr::function(span, pattern, body)))
}
