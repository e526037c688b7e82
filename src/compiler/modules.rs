// Граница с резолверами модулей: стандартная библиотека, локальные файлы, внешний контент

use crate::common::error::{EvalError, ModuleError};
use crate::common::span::Span;
use crate::rel::expr::Expr;
use crate::rel::value::Value;

/// Источник выражений для импортов. Ошибки пробрасываются компилятором с привязкой к спану.
pub trait ModuleResolver: Send + Sync {
    /// Пакет `//name`
    fn standard_library(&self, name: &str, span: &Span) -> Result<Expr, ModuleError>;

    /// Функция импорта локального файла; её вызывают с путём файла.
    /// `from_root` сбрасывается маркером `.` в пути импорта.
    fn local_file(&self, from_root: bool, span: &Span) -> Result<Expr, ModuleError>;

    /// Функция импорта внешнего контента по имени
    fn external_content(&self, span: &Span) -> Result<Expr, ModuleError>;
}

/// Резолвер по умолчанию: откладывает загрузку до вычисления.
/// Стандартная библиотека остаётся обращением `//.name`, а загрузчики файлов
/// сообщают при вызове, что бэкенд модулей не настроен.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredModules;

impl DeferredModules {
    fn loader(span: &Span, name: &'static str) -> Expr {
        Expr::literal(
            span,
            Value::native(name, move |arg| {
                Err(EvalError::Module(format!(
                    "{}: no module backend configured to load {}",
                    name, arg
                )))
            }),
        )
    }
}

impl ModuleResolver for DeferredModules {
    fn standard_library(&self, name: &str, span: &Span) -> Result<Expr, ModuleError> {
        Ok(Expr::dot(span, Expr::ident(span, "//"), name))
    }

    fn local_file(&self, from_root: bool, span: &Span) -> Result<Expr, ModuleError> {
        let name = if from_root {
            "import_local_file_from_root"
        } else {
            "import_local_file"
        };
        Ok(Self::loader(span, name))
    }

    fn external_content(&self, span: &Span) -> Result<Expr, ModuleError> {
        Ok(Self::loader(span, "import_external_content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rel::eval::evaluate;

    #[test]
    fn test_deferred_loader_reports_missing_backend() {
        let span = Span::detached("t", "//{./x}");
        let loader = DeferredModules.local_file(true, &span).unwrap();
        let call = Expr::call(&span, loader, Expr::literal(&span, Value::string("x")));
        let err = evaluate(&call).unwrap_err();
        assert!(matches!(err.root(), EvalError::Module(m) if m.contains("no module backend")));
    }

    #[test]
    fn test_standard_library_is_deferred_lookup() {
        let span = Span::detached("t", "//seq");
        let e = DeferredModules.standard_library("seq", &span).unwrap();
        assert_eq!(e.to_string(), "//.seq");
    }
}
