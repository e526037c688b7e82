// Обобщённое синтаксическое дерево: ветви с тегами, листья и встроенные выражения

use std::fmt;

use crate::common::span::Span;
use crate::rel::expr::Expr;

/// Потомки ветви под одним тегом
#[derive(Debug, Clone, PartialEq)]
pub enum Children {
    One(Node),
    Many(Vec<Node>),
}

impl Children {
    pub fn nodes(&self) -> &[Node] {
        match self {
            Children::One(node) => std::slice::from_ref(node),
            Children::Many(nodes) => nodes,
        }
    }

    /// Спан, покрывающий всех потомков (или спан первого, если слить нельзя)
    pub fn span(&self) -> Option<Span> {
        let nodes = self.nodes();
        let first = nodes.first()?;
        let spans: Vec<&Span> = nodes.iter().map(Node::span).collect();
        Some(Span::merge_or(first.span(), &spans))
    }
}

#[derive(Clone, PartialEq)]
pub enum Node {
    Branch {
        children: Vec<(String, Children)>,
        span: Span,
    },
    Leaf {
        span: Span,
    },
    /// Выражение, заранее вычисленное макро-проходом
    Embedded {
        expr: Box<Expr>,
        span: Span,
    },
}

impl Node {
    pub fn leaf(span: Span) -> Self {
        Node::Leaf { span }
    }

    pub fn embedded(expr: Expr) -> Self {
        let span = expr.span().clone();
        Node::Embedded {
            expr: Box::new(expr),
            span,
        }
    }

    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    pub fn span(&self) -> &Span {
        match self {
            Node::Branch { span, .. } | Node::Leaf { span } | Node::Embedded { span, .. } => span,
        }
    }

    /// Текст узла: для листа это текст его спана
    pub fn text(&self) -> &str {
        self.span().text()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub fn as_embedded(&self) -> Option<&Expr> {
        match self {
            Node::Embedded { expr, .. } => Some(expr),
            _ => None,
        }
    }

    pub fn children(&self) -> &[(String, Children)] {
        match self {
            Node::Branch { children, .. } => children,
            _ => &[],
        }
    }

    pub fn get(&self, tag: &str) -> Option<&Children> {
        self.children()
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, c)| c)
    }

    pub fn has(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// Единственный потомок под тегом. Последовательность из одного узла тоже подходит.
    pub fn one(&self, tag: &str) -> Option<&Node> {
        match self.get(tag)? {
            Children::One(node) => Some(node),
            Children::Many(nodes) if nodes.len() == 1 => nodes.first(),
            Children::Many(_) => None,
        }
    }

    /// Все потомки под тегом; отсутствие тега даёт пустой срез
    pub fn many(&self, tag: &str) -> &[Node] {
        self.get(tag).map(Children::nodes).unwrap_or(&[])
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.children().iter().map(|(t, _)| t.as_str())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Leaf { span } => write!(f, "{:?}", span.text()),
            Node::Embedded { expr, .. } => write!(f, "<embedded {}>", expr),
            Node::Branch { children, .. } => {
                let mut map = f.debug_map();
                for (tag, c) in children {
                    match c {
                        Children::One(node) => map.entry(tag, node),
                        Children::Many(nodes) => map.entry(tag, nodes),
                    };
                }
                map.finish()
            }
        }
    }
}

/// Построитель ветвей. Используется адаптерами грамматик и в тестах.
#[derive(Debug, Default)]
pub struct NodeBuilder {
    children: Vec<(String, Children)>,
    span: Option<Span>,
}

impl NodeBuilder {
    pub fn one(mut self, tag: impl Into<String>, node: Node) -> Self {
        self.children.push((tag.into(), Children::One(node)));
        self
    }

    pub fn many(mut self, tag: impl Into<String>, nodes: Vec<Node>) -> Self {
        self.children.push((tag.into(), Children::Many(nodes)));
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Node {
        let span = match self.span {
            Some(span) => span,
            None => {
                let spans: Vec<Span> = self
                    .children
                    .iter()
                    .filter_map(|(_, c)| c.span())
                    .collect();
                let refs: Vec<&Span> = spans.iter().collect();
                match refs.first() {
                    Some(first) => Span::merge_or(first, &refs),
                    None => Span::unknown(),
                }
            }
        };
        Node::Branch {
            children: self.children,
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::span::Source;

    #[test]
    fn test_builder_covers_children() {
        let src = Source::new("t", "1 + 2");
        let node = Node::builder()
            .many(
                "expr",
                vec![
                    Node::leaf(Span::new(src.clone(), 0, 1)),
                    Node::leaf(Span::new(src.clone(), 4, 5)),
                ],
            )
            .build();
        assert_eq!(node.text(), "1 + 2");
        assert_eq!(node.many("expr").len(), 2);
        assert!(node.one("expr").is_none());
        assert!(node.many("binop").is_empty());
    }

    #[test]
    fn test_one_accepts_single_sequence() {
        let src = Source::new("t", "x");
        let node = Node::builder()
            .many("IDENT", vec![Node::leaf(Span::whole(src))])
            .build();
        assert_eq!(node.one("IDENT").map(Node::text), Some("x"));
    }
}
