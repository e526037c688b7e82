// Единый формат ошибок компиляции и вычисления

use thiserror::Error;

use crate::common::span::Span;

/// Ошибка грамматики (внешнего парсера), пробрасывается без изменений
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{filename}: {message}")]
pub struct ParseError {
    pub filename: String,
    pub message: String,
}

impl ParseError {
    pub fn new(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            message: message.into(),
        }
    }
}

/// Ошибка внешнего резолвера модулей
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ModuleError {
    pub message: String,
}

impl ModuleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// Узел без единого известного тега. Всегда дефект грамматики.
    #[error("{span}: misshapen node AST: {detail}")]
    MalformedTree { span: Span, detail: String },

    /// Оператор отсутствует в своей таблице. Грамматика должна это исключать.
    #[error("{span}: {table} operator {op:?} not found")]
    UnresolvedOperator {
        span: Span,
        table: &'static str,
        op: String,
    },

    #[error("{span}: {detail}")]
    PatternShapeMismatch { span: Span, detail: String },

    #[error("{span}: {detail}")]
    ArityMismatch { span: Span, detail: String },

    #[error("{span}: local import {path:?} invalid; no local context")]
    MissingSourceContext { span: Span, path: String },

    #[error("{span}: unsupported construct: {construct}")]
    UnsupportedConstruct { span: Span, construct: String },

    #[error("{span}: more than one extra-element pattern in {structure} pattern")]
    DuplicateExtraElement {
        span: Span,
        structure: &'static str,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{span}: {source}")]
    Module {
        span: Span,
        #[source]
        source: ModuleError,
    },

    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl CompileError {
    pub fn malformed(span: &Span, detail: impl Into<String>) -> Self {
        CompileError::MalformedTree {
            span: span.clone(),
            detail: detail.into(),
        }
    }

    pub fn unsupported(span: &Span, construct: impl Into<String>) -> Self {
        CompileError::UnsupportedConstruct {
            span: span.clone(),
            construct: construct.into(),
        }
    }

    pub fn arity(span: &Span, detail: impl Into<String>) -> Self {
        CompileError::ArityMismatch {
            span: span.clone(),
            detail: detail.into(),
        }
    }

    pub fn span(&self) -> Option<&Span> {
        match self {
            CompileError::MalformedTree { span, .. }
            | CompileError::UnresolvedOperator { span, .. }
            | CompileError::PatternShapeMismatch { span, .. }
            | CompileError::ArityMismatch { span, .. }
            | CompileError::MissingSourceContext { span, .. }
            | CompileError::UnsupportedConstruct { span, .. }
            | CompileError::DuplicateExtraElement { span, .. }
            | CompileError::Module { span, .. } => Some(span),
            CompileError::Parse(_) | CompileError::Internal(_) => None,
        }
    }

    /// Ошибки, которые означают баг компилятора или грамматики, а не пользователя
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CompileError::MalformedTree { .. }
                | CompileError::UnresolvedOperator { .. }
                | CompileError::Internal(_)
        )
    }
}

/// Безусловное прерывание компиляции при нарушении внутреннего инварианта.
/// Публичная точка входа `compile` превращает его обратно в `Err`.
pub fn abort(err: CompileError) -> ! {
    tracing::error!("compilation aborted: {}", err);
    std::panic::panic_any(err)
}

/// Ошибки эталонного вычислителя IR
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Явный сигнал «нет значения»
    #[error("no return value")]
    NoReturn,

    #[error("missing attr {attr:?} (available: {available:?})")]
    MissingAttr { attr: String, available: Vec<String> },

    #[error("{span}: {source}")]
    Context {
        span: Span,
        #[source]
        source: Box<EvalError>,
    },

    #[error("name {0:?} not found in scope")]
    Unbound(String),

    #[error("{0}")]
    Type(String),

    #[error("{value} does not match pattern {pattern}")]
    PatternMismatch { pattern: String, value: String },

    #[error("{0}")]
    Module(String),

    #[error("{0} is not supported by the reference evaluator")]
    Unsupported(String),
}

impl EvalError {
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }

    /// Оборачивает ошибку в контекст спана (однократно)
    pub fn in_context(self, span: &Span) -> Self {
        match self {
            EvalError::Context { .. } => self,
            err => EvalError::Context {
                span: span.clone(),
                source: Box::new(err),
            },
        }
    }

    /// Ошибка без контекстных обёрток
    pub fn root(&self) -> &EvalError {
        match self {
            EvalError::Context { source, .. } => source.root(),
            err => err,
        }
    }

    /// Сигналы, которые безопасная навигация превращает в откат на запасное значение
    pub fn is_absent_signal(&self) -> bool {
        matches!(
            self.root(),
            EvalError::NoReturn | EvalError::MissingAttr { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_signal_sees_through_context() {
        let err = EvalError::MissingAttr {
            attr: "b".to_string(),
            available: vec![],
        }
        .in_context(&Span::detached("t", "x.b"));
        assert!(err.is_absent_signal());
        assert!(!EvalError::type_error("boom").is_absent_signal());
        assert!(EvalError::NoReturn.is_absent_signal());
    }

    #[test]
    fn test_internal_classification() {
        let span = Span::detached("t", "?");
        assert!(CompileError::malformed(&span, "x").is_internal());
        assert!(!CompileError::arity(&span, "x").is_internal());
    }
}
