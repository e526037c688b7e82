// Граница с движком грамматики: трейт Grammar и адаптер сериализованных деревьев

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::common::error::ParseError;
use crate::common::span::{Source, Span};
use crate::syntax::ast::Node;

/// Внешний движок грамматики: превращает текст в обобщённое дерево
pub trait Grammar: Send + Sync {
    fn parse(&self, source: &str, filename: &str) -> Result<Node, ParseError>;
}

/// Сериализованное дерево вместе с текстом программы, к которому привязаны спаны
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeDocument {
    pub source: String,
    pub tree: Json,
}

/// Читает дерево из JSON-документа `{"source": ..., "tree": ...}`.
///
/// Узел дерева:
/// - объект: ветвь, ключи это теги, массив под тегом это последовательность,
///   необязательный ключ `"@"` задаёт спан ветви как `[start, end]`;
/// - пара `[start, end]`: лист по байтовым смещениям;
/// - строка: лист на первом вхождении этого текста в программе
///   (или отдельный лист, если текста в программе нет).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonGrammar;

impl JsonGrammar {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_document(&self, doc: &TreeDocument, filename: &str) -> Result<Node, ParseError> {
        let reader = TreeReader {
            source: Source::new(filename, doc.source.clone()),
            filename,
        };
        reader.node(&doc.tree, "tree")
    }
}

impl Grammar for JsonGrammar {
    fn parse(&self, source: &str, filename: &str) -> Result<Node, ParseError> {
        let doc: TreeDocument = serde_json::from_str(source).map_err(|e| {
            ParseError::new(filename, format!("invalid syntax tree document: {}", e))
        })?;
        self.parse_document(&doc, filename)
    }
}

struct TreeReader<'a> {
    source: Arc<Source>,
    filename: &'a str,
}

impl<'a> TreeReader<'a> {
    fn node(&self, json: &Json, path: &str) -> Result<Node, ParseError> {
        match json {
            Json::Object(map) => {
                let mut builder = Node::builder();
                for (tag, value) in map {
                    if tag == "@" {
                        continue;
                    }
                    let child_path = format!("{}.{}", path, tag);
                    match value {
                        Json::Array(items) if offsets(value).is_none() => {
                            let nodes = items
                                .iter()
                                .enumerate()
                                .map(|(i, item)| self.node(item, &format!("{}[{}]", child_path, i)))
                                .collect::<Result<Vec<_>, _>>()?;
                            builder = builder.many(tag.as_str(), nodes);
                        }
                        _ => {
                            builder = builder.one(tag.as_str(), self.node(value, &child_path)?);
                        }
                    }
                }
                if let Some(at) = map.get("@") {
                    builder = builder.span(self.offsets_span(at, path)?);
                } else if map.is_empty() {
                    builder = builder.span(Span::new(self.source.clone(), 0, 0));
                }
                Ok(builder.build())
            }
            Json::Array(_) => Ok(Node::leaf(self.offsets_span(json, path)?)),
            Json::String(text) => {
                let span = Span::find(&self.source, text)
                    .unwrap_or_else(|| Span::detached(self.filename, text.as_str()));
                Ok(Node::leaf(span))
            }
            other => Err(self.error(path, format!("expected a node, found {}", other))),
        }
    }

    fn offsets_span(&self, json: &Json, path: &str) -> Result<Span, ParseError> {
        let (start, end) = offsets(json)
            .ok_or_else(|| self.error(path, "expected a [start, end] pair".to_string()))?;
        let len = self.source.text().len();
        if start > end || end > len {
            return Err(self.error(
                path,
                format!("span [{}, {}] out of range for source of length {}", start, end, len),
            ));
        }
        Ok(Span::new(self.source.clone(), start, end))
    }

    fn error(&self, path: &str, message: String) -> ParseError {
        ParseError::new(self.filename, format!("{}: {}", path, message))
    }
}

fn offsets(json: &Json) -> Option<(usize, usize)> {
    match json.as_array()?.as_slice() {
        [start, end] => Some((start.as_u64()? as usize, end.as_u64()? as usize)),
        _ => None,
    }
}
