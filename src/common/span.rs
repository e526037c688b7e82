// Исходные позиции (спаны) и их слияние

use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use thiserror::Error;

/// Исходный текст вместе с именем файла
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            text: text.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

lazy_static! {
    static ref UNKNOWN_SOURCE: Arc<Source> = Source::new("<unknown>", "");
}

/// Ошибка слияния спанов. Не фатальна: вызывающий код берёт запасной спан.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanMergeError {
    #[error("no spans to merge")]
    Empty,
    #[error("cannot merge spans from {left:?} and {right:?}")]
    DifferentSources { left: String, right: String },
}

/// Участок исходного текста: файл, диапазон байтовых смещений и сам текст
#[derive(Clone)]
pub struct Span {
    source: Arc<Source>,
    start: usize,
    end: usize,
}

impl Span {
    /// Создаёт спан, прижимая границы к тексту и к границам символов
    pub fn new(source: Arc<Source>, start: usize, end: usize) -> Self {
        let text = source.text();
        let end = ceil_boundary(text, end.min(text.len()));
        let start = floor_boundary(text, start.min(end));
        Self { source, start, end }
    }

    /// Спан, покрывающий весь исходник
    pub fn whole(source: Arc<Source>) -> Self {
        let end = source.text().len();
        Self::new(source, 0, end)
    }

    /// Спан без исходника. Ни с чем не сливается.
    pub fn unknown() -> Self {
        Self::whole(UNKNOWN_SOURCE.clone())
    }

    /// Спан над отдельным кусочком текста, не привязанным к файлу программы
    pub fn detached(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::whole(Source::new(name, text))
    }

    /// Первое вхождение `needle` в исходнике
    pub fn find(source: &Arc<Source>, needle: &str) -> Option<Self> {
        source
            .text()
            .find(needle)
            .map(|start| Self::new(source.clone(), start, start + needle.len()))
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub fn filename(&self) -> &str {
        self.source.name()
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn text(&self) -> &str {
        &self.source.text()[self.start..self.end]
    }

    pub fn same_source(&self, other: &Span) -> bool {
        Arc::ptr_eq(&self.source, &other.source) || *self.source == *other.source
    }

    /// Строка и колонка начала спана (обе с единицы)
    pub fn line_col(&self) -> (usize, usize) {
        let before = &self.source.text()[..self.start];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(nl) => before[nl + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        (line, column)
    }

    /// Расширяет спан влево на `chars` символов (например, чтобы захватить ведущую точку)
    pub fn extend_left(&self, chars: usize) -> Span {
        let mut start = self.start;
        for c in self.source.text()[..self.start].chars().rev().take(chars) {
            start -= c.len_utf8();
        }
        Span {
            source: self.source.clone(),
            start,
            end: self.end,
        }
    }

    /// Минимальный спан, покрывающий все входные, если они из одного исходника
    pub fn merge(spans: &[&Span]) -> Result<Span, SpanMergeError> {
        let (first, rest) = spans.split_first().ok_or(SpanMergeError::Empty)?;
        let mut start = first.start;
        let mut end = first.end;
        for span in rest {
            if !first.same_source(span) {
                return Err(SpanMergeError::DifferentSources {
                    left: first.filename().to_string(),
                    right: span.filename().to_string(),
                });
            }
            start = start.min(span.start);
            end = end.max(span.end);
        }
        Ok(Span {
            source: first.source.clone(),
            start,
            end,
        })
    }

    /// Слияние с откатом на `fallback` при ошибке
    pub fn merge_or(fallback: &Span, spans: &[&Span]) -> Span {
        match Span::merge(spans) {
            Ok(span) => span,
            Err(err) => {
                tracing::trace!("span merge degraded to {:?}: {}", fallback, err);
                fallback.clone()
            }
        }
    }
}

fn floor_boundary(text: &str, mut i: usize) -> usize {
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_boundary(text: &str, mut i: usize) -> usize {
    while i < text.len() && !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

impl Default for Span {
    fn default() -> Self {
        Self::unknown()
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.end == other.end && self.same_source(other)
    }
}

impl Eq for Span {}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}..{} {:?}",
            self.filename(),
            self.start,
            self.end,
            self.text()
        )
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, column) = self.line_col();
        write!(f, "{}:{}:{}", self.filename(), line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_covers_all_parts() {
        let src = Source::new("a.arrai", "1 + 2 + 3");
        let lhs = Span::new(src.clone(), 0, 1);
        let op = Span::new(src.clone(), 6, 7);
        let rhs = Span::new(src.clone(), 8, 9);
        let merged = Span::merge(&[&op, &lhs, &rhs]).unwrap();
        assert_eq!(merged.text(), "1 + 2 + 3");
    }

    #[test]
    fn test_merge_different_sources_fails() {
        let a = Span::whole(Source::new("a", "x"));
        let b = Span::whole(Source::new("b", "y"));
        assert!(matches!(
            Span::merge(&[&a, &b]),
            Err(SpanMergeError::DifferentSources { .. })
        ));
        assert_eq!(Span::merge(&[]), Err(SpanMergeError::Empty));
    }

    #[test]
    fn test_merge_or_falls_back() {
        let op = Span::detached("op", "+");
        let other = Span::whole(Source::new("b", "1"));
        let span = Span::merge_or(&op, &[&op, &other]);
        assert_eq!(span.text(), "+");
        assert!(!span.is_empty());
    }

    #[test]
    fn test_line_col_and_extend_left() {
        let src = Source::new("f", "let x = 1;\n  .a");
        let attr = Span::find(&src, "a").unwrap();
        assert_eq!(attr.start(), 14);
        assert_eq!(attr.line_col(), (2, 4));
        assert_eq!(attr.extend_left(1).text(), ".a");
    }

    #[test]
    fn test_new_clamps_bounds() {
        let src = Source::new("f", "abc");
        let span = Span::new(src, 2, 99);
        assert_eq!(span.text(), "c");
    }
}
