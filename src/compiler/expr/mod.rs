/// Модуль компиляции выражений

pub mod access;
pub mod arrow;
pub mod collection;
pub mod cond;
pub mod function;
pub mod let_expr;
pub mod literal;
pub mod macro_embed;
pub mod operator;
pub mod package;
pub mod postfix;
pub mod safe_tail;

use crate::common::error::{abort, CompileError};
use crate::common::span::Span;
use crate::compiler::context::CompilationContext;
use crate::rel::expr::Expr;
use crate::syntax::ast::{Children, Node};

/// Вид узла выражения, определённый по первому найденному тегу
#[derive(Debug, Clone, Copy)]
pub enum ExprNode<'n> {
    Arrow { amp: bool },
    Let(&'n Node),
    Unop,
    Binop,
    Compare,
    Rbinop,
    If,
    CallGet,
    Postfix,
    Relation(&'n Node),
    Set(&'n Node),
    Dict(&'n Node),
    Array(&'n Node),
    Bytes(&'n Node),
    Embed,
    Function,
    Package(&'n Node),
    Tuple(&'n Node),
    XStr(&'n Node),
    Ident(&'n Node),
    Str(&'n Node),
    Num(&'n Node),
    Char(&'n Node),
    Cond(&'n Node),
    Paren(&'n Children),
}

/// Порядок важен: новые теги добавлять до `expr`
const DISPATCH_TAGS: &[&str] = &[
    "amp", "arrow", "let", "unop", "binop", "compare", "rbinop", "if", "get", "tail_op",
    "postfix", "touch", "rel", "set", "dict", "array", "bytes", "embed", "fn", "pkg", "tuple",
    "xstr", "IDENT", "STR", "NUM", "CHAR", "cond", "expr",
];

impl<'n> ExprNode<'n> {
    pub fn classify(node: &'n Node) -> Option<Self> {
        let (tag, children) = DISPATCH_TAGS
            .iter()
            .find_map(|tag| node.get(tag).map(|c| (*tag, c)))?;
        let first = children.nodes().first();
        let one = || match first {
            Some(first) => first,
            None => abort(CompileError::malformed(
                node.span(),
                format!("empty {} sequence in {:?}", tag, node),
            )),
        };
        Some(match tag {
            "amp" => ExprNode::Arrow { amp: true },
            "arrow" => ExprNode::Arrow { amp: false },
            "let" => ExprNode::Let(one()),
            "unop" => ExprNode::Unop,
            "binop" => ExprNode::Binop,
            "compare" => ExprNode::Compare,
            "rbinop" => ExprNode::Rbinop,
            "if" => ExprNode::If,
            "get" | "tail_op" => ExprNode::CallGet,
            "postfix" | "touch" => ExprNode::Postfix,
            "rel" => ExprNode::Relation(one()),
            "set" => ExprNode::Set(one()),
            "dict" => ExprNode::Dict(one()),
            "array" => ExprNode::Array(one()),
            "bytes" => ExprNode::Bytes(one()),
            "embed" => ExprNode::Embed,
            "fn" => ExprNode::Function,
            "pkg" => ExprNode::Package(one()),
            "tuple" => ExprNode::Tuple(one()),
            "xstr" => ExprNode::XStr(one()),
            "IDENT" => ExprNode::Ident(one()),
            "STR" => ExprNode::Str(one()),
            "NUM" => ExprNode::Num(one()),
            "CHAR" => ExprNode::Char(one()),
            "cond" => ExprNode::Cond(one()),
            _ => ExprNode::Paren(children),
        })
    }
}

/// Диспетчеризация компиляции выражений
pub fn compile_expr(ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    if let Some(expr) = node.as_embedded() {
        return Ok(expr.clone());
    }
    let kind = ExprNode::classify(node).unwrap_or_else(|| {
        abort(CompileError::malformed(
            node.span(),
            format!("no recognised tag in {:?}", node),
        ))
    });
    match kind {
        ExprNode::Arrow { amp } => arrow::compile_arrow(ctx, node, amp),
        ExprNode::Let(let_node) => let_expr::compile_let(ctx, let_node),
        ExprNode::Unop => operator::compile_unop(ctx, node),
        ExprNode::Binop => operator::compile_binop(ctx, node),
        ExprNode::Compare => operator::compile_compare(ctx, node),
        ExprNode::Rbinop => operator::compile_rbinop(ctx, node),
        ExprNode::If => cond::compile_if(ctx, node),
        ExprNode::CallGet => access::compile_call_get(ctx, node),
        ExprNode::Postfix => postfix::compile_postfix(ctx, node),
        ExprNode::Relation(rel) => collection::compile_relation(ctx, node, rel),
        ExprNode::Set(set) => collection::compile_set(ctx, node, set),
        ExprNode::Dict(dict) => collection::compile_dict(ctx, node, dict),
        ExprNode::Array(array) => collection::compile_array(ctx, node, array),
        ExprNode::Bytes(bytes) => collection::compile_bytes(ctx, node, bytes),
        ExprNode::Embed => macro_embed::compile_macro(ctx, node),
        ExprNode::Function => function::compile_function(ctx, node),
        ExprNode::Package(pkg) => package::compile_package(ctx, node, pkg),
        ExprNode::Tuple(tuple) => collection::compile_tuple(ctx, node, tuple),
        ExprNode::XStr(xstr) => literal::compile_xstr(ctx, node, xstr),
        ExprNode::Ident(ident) => Ok(literal::compile_ident(ident)),
        ExprNode::Str(s) => Ok(literal::compile_string(s)),
        ExprNode::Num(num) => Ok(literal::compile_number(num)),
        ExprNode::Char(c) => Ok(literal::compile_char(c)),
        ExprNode::Cond(cond) => cond::compile_cond(ctx, cond),
        ExprNode::Paren(children) => compile_paren(ctx, node, children),
    }
}

pub fn compile_exprs(ctx: &CompilationContext, nodes: &[Node]) -> Result<Vec<Expr>, CompileError> {
    nodes.iter().map(|n| compile_expr(ctx, n)).collect()
}

/// Выражение в скобках сохраняется как узел, иначе просто прозрачная обёртка
fn compile_paren(
    ctx: &CompilationContext,
    node: &Node,
    children: &Children,
) -> Result<Expr, CompileError> {
    match children {
        Children::One(inner) => {
            let expr = compile_expr(ctx, inner)?;
            if node.has("odelim") {
                Ok(Expr::Paren {
                    inner: Box::new(expr),
                    span: delims_span(node),
                })
            } else {
                Ok(expr)
            }
        }
        Children::Many(nodes) if nodes.len() == 1 => compile_expr(ctx, &nodes[0]),
        Children::Many(nodes) => abort(CompileError::malformed(
            node.span(),
            format!("expected one expr child, found {}", nodes.len()),
        )),
    }
}

/// Обязательный потомок; его отсутствие означает дефект грамматики
pub(crate) fn child<'n>(node: &'n Node, tag: &str) -> &'n Node {
    node.one(tag).unwrap_or_else(|| {
        abort(CompileError::malformed(
            node.span(),
            format!("missing {:?} in {:?}", tag, node),
        ))
    })
}

/// Лист токена: ветвь с пустым тегом или сам узел
pub(crate) fn token(node: &Node) -> &Node {
    node.one("").unwrap_or(node)
}

/// Спан от открывающего до закрывающего ограничителя
pub(crate) fn delims_span(node: &Node) -> Span {
    match (node.one("odelim"), node.one("cdelim")) {
        (Some(open), Some(close)) => Span::merge_or(node.span(), &[open.span(), close.span()]),
        _ => node.span().clone(),
    }
}

/// Спан обращения к атрибуту или вызова: для `.a` захватывает ведущую точку
pub(crate) fn access_span(base: &Span, access: &Span) -> Span {
    match base.text() {
        "" => access.clone(),
        "." => access.extend_left(1),
        _ => Span::merge_or(access, &[base, access]),
    }
}

pub(crate) fn parse_names(names: &Node) -> Vec<String> {
    names
        .many("IDENT")
        .iter()
        .map(|ident| token(ident).text().to_string())
        .collect()
}

pub(crate) fn parse_name(name: &Node) -> String {
    if let Some(ident) = name.one("IDENT") {
        return token(ident).text().to_string();
    }
    if let Some(s) = name.one("STR") {
        return literal::parse_string(token(s).text());
    }
    token(name).text().to_string()
}
