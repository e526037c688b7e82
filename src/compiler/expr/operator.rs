// Цепочки операторов: префиксные, левоассоциативные, правоассоциативные и сравнения

use crate::common::error::CompileError;
use crate::common::span::Span;
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::{child, compile_expr, compile_exprs, token};
use crate::rel::expr::Expr;
use crate::syntax::ast::Node;

fn check_chain(node: &Node, ops: &[Node], args: usize) -> Result<(), CompileError> {
    if args != ops.len() + 1 {
        return Err(CompileError::arity(
            node.span(),
            format!("{} operators need {} operands, found {}", ops.len(), ops.len() + 1, args),
        ));
    }
    Ok(())
}

/// Унарные операторы применяются справа налево: `-!x` это `-(!x)`
pub fn compile_unop(ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    let mut result = compile_expr(ctx, child(node, "expr"))?;
    for op in node.many("unop").iter().rev() {
        let op = token(op);
        let span = Span::merge_or(op.span(), &[op.span(), result.span()]);
        result = ctx.operators.apply_unary(op.text(), &span, result);
    }
    Ok(result)
}

/// `a + b - c` это `(a + b) - c`
pub fn compile_binop(ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    let ops = node.many("binop");
    let args = node.many("expr");
    check_chain(node, ops, args.len())?;

    let mut result = compile_expr(ctx, &args[0])?;
    for (op, arg) in ops.iter().zip(&args[1..]) {
        let op = token(op);
        let binop = ctx.operators.binary(op.text(), op.span());
        let rhs = compile_expr(ctx, arg)?;
        let span = Span::merge_or(op.span(), &[op.span(), result.span(), rhs.span()]);
        result = Expr::binary(&span, binop, result, rhs);
    }
    Ok(result)
}

/// `a ^ b ^ c` это `a ^ (b ^ c)`; спан узла это спан оператора
pub fn compile_rbinop(ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    let ops = node.many("rbinop");
    let args = node.many("expr");
    check_chain(node, ops, args.len())?;

    let mut result = compile_expr(ctx, &args[args.len() - 1])?;
    for (op, arg) in ops.iter().zip(args).rev() {
        let op = token(op);
        let binop = ctx.operators.binary(op.text(), op.span());
        let lhs = compile_expr(ctx, arg)?;
        result = Expr::binary(op.span(), binop, lhs, result);
    }
    Ok(result)
}

/// `a < b <= c` остаётся одним n-арным узлом
pub fn compile_compare(ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    let ops = node.many("compare");
    let args = node.many("expr");
    check_chain(node, ops, args.len())?;

    let args = compile_exprs(ctx, args)?;
    let ops = ops
        .iter()
        .map(|op| {
            let op = token(op);
            ctx.operators.compare(op.text(), op.span())
        })
        .collect();

    let (first, last) = (&args[0], &args[args.len() - 1]);
    let span = Span::merge_or(first.span(), &[first.span(), last.span()]);
    Ok(Expr::Compare { args, ops, span })
}
