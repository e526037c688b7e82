// Встроенные подграмматики: готовое выражение или дерево как значение

use crate::common::error::{abort, CompileError};
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::child;
use crate::rel::expr::Expr;
use crate::rel::value::Value;
use crate::syntax::ast::{Children, Node};

pub fn compile_macro(_ctx: &CompilationContext, node: &Node) -> Result<Expr, CompileError> {
    let ast = child(child(child(node, "embed"), "subgrammar"), "ast");
    if let Some(value) = ast.one("value") {
        return match value.as_embedded() {
            Some(expr) => Ok(expr.clone()),
            None => abort(CompileError::malformed(
                value.span(),
                "macro value is not an embedded expression",
            )),
        };
    }
    Ok(Expr::literal(ast.span(), ast_to_value(ast)))
}

/// Ветвь становится кортежем по тегам, `Many` массивом, лист строкой
pub fn ast_to_value(node: &Node) -> Value {
    match node {
        Node::Branch { children, .. } => Value::tuple(children.iter().map(|(tag, c)| {
            let value = match c {
                Children::One(n) => ast_to_value(n),
                Children::Many(nodes) => Value::array(nodes.iter().map(ast_to_value)),
            };
            (tag.clone(), value)
        })),
        Node::Leaf { .. } | Node::Embedded { .. } => Value::string(node.text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::span::{Source, Span};

    #[test]
    fn test_ast_to_value_shapes() {
        let src = Source::new("t", "a b");
        let leaf = |s: &str| Node::leaf(Span::find(&src, s).unwrap());
        let tree = Node::builder()
            .one("name", leaf("a"))
            .many("items", vec![leaf("b")])
            .build();
        assert_eq!(ast_to_value(&tree).to_string(), "(items: ['b'], name: 'a')");
    }
}
