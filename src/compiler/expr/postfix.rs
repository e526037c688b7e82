// Постфиксные операторы `count` и `single`

use crate::common::error::CompileError;
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::{child, compile_expr, token};
use crate::rel::expr::Expr;
use crate::syntax::ast::Node;

pub fn compile_postfix(ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    if node.has("touch") {
        return Err(CompileError::unsupported(node.span(), "touch"));
    }
    let op = token(child(node, "postfix"));
    let operand = Box::new(compile_expr(ctx, child(node, "expr"))?);
    let span = node.span().clone();
    match op.text() {
        "count" => Ok(Expr::Count { operand, span }),
        "single" => Ok(Expr::Single { operand, span }),
        other => Err(CompileError::unsupported(
            op.span(),
            format!("postfix operator {:?}", other),
        )),
    }
}
