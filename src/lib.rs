// Публичный API: синтаксическое дерево arr.ai → IR выражений

pub mod common;
pub mod compiler;
pub mod rel;
pub mod syntax;

pub use common::{CompileError, Diagnostics, EvalError, ParseError, Span};
pub use compiler::{Compiler, SourceDir, NO_PATH};
pub use rel::{evaluate, BinaryOp, CompareOp, Expr, Pattern, UnaryOp, Value};
pub use syntax::{Grammar, JsonGrammar, Node};

/// Компилирует исходник грамматикой и резолвером по умолчанию.
///
/// `path` определяет каталог для локальных импортов: `""` это текущий каталог,
/// [`NO_PATH`] означает исходник без файла.
pub fn compile(path: &str, source: &str) -> Result<Expr, CompileError> {
    Compiler::new().compile(path, source)
}

/// Как [`compile`], но ошибка прерывает выполнение
pub fn compile_or_abort(path: &str, source: &str) -> Expr {
    Compiler::new().compile_or_abort(path, source)
}

/// Компилирует уже разобранное дерево
pub fn compile_tree(source_dir: &SourceDir, tree: &Node) -> Result<Expr, CompileError> {
    Compiler::new().compile_tree(source_dir, tree)
}
