// `\pattern body`

use crate::common::error::CompileError;
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::{child, compile_expr};
use crate::compiler::pattern::compile_pattern;
use crate::rel::expr::Expr;
use crate::syntax::ast::Node;

pub fn compile_function(ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    let pattern = compile_pattern(ctx, node)?;
    let body = compile_expr(ctx, child(node, "expr"))?;
    Ok(Expr::function(node.span(), pattern, body))
}
