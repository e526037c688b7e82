// Цепочки стрелок: `->`, `=>`, `>>`, привязки `-> \x`, фильтры `where` и `nest`

use crate::common::error::{abort, CompileError};
use crate::common::span::Span;
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::{child, compile_expr, parse_names, token};
use crate::compiler::pattern::compile_pattern;
use crate::rel::expr::{BinaryOp, Expr};
use crate::rel::pattern::Pattern;
use crate::syntax::ast::Node;

/// Шаг цепочки в порядке приоритета тегов
enum ArrowStep<'n> {
    Nest(&'n Node),
    Unnest(&'n Node),
    Op(&'n Node),
    Binding,
    Filter(&'n Node),
}

impl<'n> ArrowStep<'n> {
    fn classify(step: &'n Node) -> Option<Self> {
        if let Some(nest) = step.one("nest") {
            Some(ArrowStep::Nest(nest))
        } else if let Some(unnest) = step.one("unnest") {
            Some(ArrowStep::Unnest(unnest))
        } else if let Some(op) = step.one("ARROW") {
            Some(ArrowStep::Op(op))
        } else if step.has("binding") {
            Some(ArrowStep::Binding)
        } else {
            step.one("FILTER").map(|_| ArrowStep::Filter(step))
        }
    }
}

/// `amp`: каждый маркер `&` оборачивает результат в функцию от `-`
pub fn compile_arrow(ctx: &CompilationContext, node: &Node, amp: bool) -> Result<Expr, CompileError> {
    let span = node.span();
    let mut expr = compile_expr(ctx, child(node, "expr"))?;

    for step in node.many("arrow") {
        let kind = ArrowStep::classify(step).unwrap_or_else(|| {
            abort(CompileError::malformed(
                step.span(),
                format!("unrecognised arrow step {:?}", step),
            ))
        });
        expr = match kind {
            ArrowStep::Nest(nest) => compile_nest(expr, nest, span),
            ArrowStep::Unnest(unnest) => {
                return Err(CompileError::unsupported(unnest.span(), "unnest"))
            }
            ArrowStep::Op(op) => {
                let op = ctx.operators.binary(token(op).text(), op.span());
                let rhs = compile_expr(ctx, child(step, "expr"))?;
                Expr::binary(span, op, expr, rhs)
            }
            ArrowStep::Binding => {
                let mut rhs = compile_expr(ctx, child(step, "expr"))?;
                if step.has("pattern") {
                    let pattern = compile_pattern(ctx, step)?;
                    rhs = Expr::function(span, pattern, rhs);
                }
                Expr::binary(span, BinaryOp::Arrow, expr, rhs)
            }
            ArrowStep::Filter(filter) => {
                // предикат фильтрует и затем применяется к отобранным элементам
                let pred = compile_expr(ctx, filter)?;
                let filtered = Expr::binary(span, BinaryOp::Where, expr, pred.clone());
                Expr::binary(span, BinaryOp::DArrow, filtered, pred)
            }
        };
    }

    if amp {
        for _ in node.many("amp") {
            expr = Expr::function(span, Pattern::Expr(Expr::ident(span, "-")), expr);
        }
    }
    Ok(expr)
}

fn compile_nest(lhs: Expr, nest: &Node, span: &Span) -> Expr {
    let names = child(nest, "names");
    let name = token(child(nest, "IDENT")).text().to_string();
    Expr::Nest {
        lhs: Box::new(lhs),
        inverse: nest.has("inverse"),
        attrs: parse_names(names),
        name,
        span: span.clone(),
    }
}
