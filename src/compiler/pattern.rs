// Компиляция паттернов деструктуризации

use crate::common::error::CompileError;
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::{child, compile_expr, compile_exprs, token};
use crate::rel::expr::Expr;
use crate::rel::pattern::{DictPatternEntry, FallbackPattern, Pattern, TuplePatternAttr};
use crate::syntax::ast::Node;

/// Вид узла паттерна по приоритету тегов
#[derive(Debug, Clone, Copy)]
pub enum PatternNode<'n> {
    Wrapper(&'n Node),
    Array(&'n Node),
    Tuple(&'n Node),
    Dict(&'n Node),
    Set(&'n Node),
    Extra(&'n Node),
    Exprs(&'n [Node]),
    Expr,
}

impl<'n> PatternNode<'n> {
    pub fn classify(node: &'n Node) -> Self {
        if let Some(inner) = node.one("pattern") {
            return PatternNode::Wrapper(inner);
        }
        if let Some(array) = node.one("array") {
            return PatternNode::Array(array);
        }
        if let Some(tuple) = node.one("tuple") {
            return PatternNode::Tuple(tuple);
        }
        if let Some(dict) = node.one("dict") {
            return PatternNode::Dict(dict);
        }
        if let Some(set) = node.one("set") {
            return PatternNode::Set(set);
        }
        if let Some(extra) = node.one("extra") {
            return PatternNode::Extra(extra);
        }
        match node.many("exprpattern") {
            [] => PatternNode::Expr,
            alternatives => PatternNode::Exprs(alternatives),
        }
    }
}

pub fn compile_pattern(ctx: &CompilationContext, node: &Node) -> Result<Pattern, CompileError> {
    match PatternNode::classify(node) {
        PatternNode::Wrapper(inner) => compile_pattern(ctx, inner),
        PatternNode::Array(array) => {
            let items = compile_sparse_patterns(ctx, array)?;
            check_single_extra(array, "array", items.iter().filter(|i| i.is_extra()).count())?;
            Ok(Pattern::Array(items))
        }
        PatternNode::Tuple(tuple) => compile_tuple_pattern(ctx, tuple),
        PatternNode::Dict(dict) => compile_dict_pattern(ctx, dict),
        PatternNode::Set(set) => {
            let elements = set
                .many("elt")
                .iter()
                .map(|elt| compile_pattern(ctx, elt))
                .collect::<Result<Vec<_>, _>>()?;
            let extras = elements
                .iter()
                .filter(|p| matches!(p, Pattern::Extra(_)))
                .count();
            check_single_extra(set, "set", extras)?;
            Ok(Pattern::Set(elements))
        }
        PatternNode::Extra(extra) => Ok(compile_extra(extra)),
        PatternNode::Exprs(alternatives) => Ok(Pattern::Exprs(compile_exprs(ctx, alternatives)?)),
        PatternNode::Expr => Ok(Pattern::Expr(compile_expr(ctx, node)?)),
    }
}

/// `...` или `...name`
fn compile_extra(extra: &Node) -> Pattern {
    let name = extra
        .one("ident")
        .map(|ident| token(ident).text().to_string())
        .filter(|name| !name.is_empty());
    Pattern::Extra(name)
}

fn check_single_extra(
    node: &Node,
    structure: &'static str,
    extras: usize,
) -> Result<(), CompileError> {
    if extras > 1 {
        return Err(CompileError::DuplicateExtraElement {
            span: node.span().clone(),
            structure,
        });
    }
    Ok(())
}

/// Значение по умолчанию допустимо только при маркере `?` на ключе
fn compile_fallback(
    ctx: &CompilationContext,
    tail: bool,
    holder: &Node,
) -> Result<Option<Expr>, CompileError> {
    match holder.one("fall") {
        None => Ok(None),
        Some(fall) if tail => Ok(Some(compile_expr(ctx, fall)?)),
        Some(fall) => Err(CompileError::PatternShapeMismatch {
            span: fall.span().clone(),
            detail: "fallback item does not match".to_string(),
        }),
    }
}

fn compile_sparse_patterns(
    ctx: &CompilationContext,
    array: &Node,
) -> Result<Vec<FallbackPattern>, CompileError> {
    let mut items = Vec::new();
    let first = array.one("first_item").into_iter();
    for item in first.chain(array.many("item")) {
        if item.has("empty") {
            items.push(FallbackPattern::elided());
            continue;
        }
        let pattern = compile_pattern(ctx, item)?;
        let fallback = match item.one("fall") {
            Some(fall) => Some(compile_expr(ctx, fall)?),
            None => None,
        };
        items.push(FallbackPattern::new(Some(pattern), fallback));
    }
    Ok(items)
}

fn compile_tuple_pattern(ctx: &CompilationContext, tuple: &Node) -> Result<Pattern, CompileError> {
    let mut attrs = Vec::new();
    for pair in tuple.many("pairs") {
        if pair.has("extra") {
            attrs.push(TuplePatternAttr {
                name: String::new(),
                pattern: FallbackPattern::new(Some(compile_pattern(ctx, pair)?), None),
            });
            continue;
        }
        let v = child(pair, "v");
        let pattern = compile_pattern(ctx, v)?;
        let name = match pair.one("name") {
            Some(name) => crate::compiler::expr::parse_name(name),
            None => pattern.to_string(),
        };
        let fallback = compile_fallback(ctx, pair.has("tail"), v)?;
        attrs.push(TuplePatternAttr {
            name,
            pattern: FallbackPattern::new(Some(pattern), fallback),
        });
    }
    let extras = attrs.iter().filter(|a| a.pattern.is_extra()).count();
    check_single_extra(tuple, "tuple", extras)?;
    Ok(Pattern::Tuple(attrs))
}

fn compile_dict_pattern(ctx: &CompilationContext, dict: &Node) -> Result<Pattern, CompileError> {
    let mut entries = Vec::new();
    for pair in dict.many("pairs") {
        if let Some(extra) = pair.one("extra") {
            entries.push(DictPatternEntry {
                key: None,
                pattern: FallbackPattern::new(Some(compile_extra(extra)), None),
            });
            continue;
        }
        let key = child(pair, "key");
        let value = child(pair, "value");
        let key_expr = compile_expr(ctx, key)?;
        let pattern = compile_pattern(ctx, value)?;
        let fallback = compile_fallback(ctx, key.has("tail"), value)?;
        entries.push(DictPatternEntry {
            key: Some(key_expr),
            pattern: FallbackPattern::new(Some(pattern), fallback),
        });
    }
    let extras = entries.iter().filter(|e| e.pattern.is_extra()).count();
    check_single_extra(dict, "dict", extras)?;
    Ok(Pattern::Dict(entries))
}
