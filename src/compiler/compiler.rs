// Компилятор синтаксического дерева → IR выражений

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use crate::common::diagnostics::Diagnostics;
use crate::common::error::{abort, CompileError};
use crate::compiler::context::{normalize_filename, CompilationContext, SourceDir};
use crate::compiler::expr::compile_expr;
use crate::compiler::modules::{DeferredModules, ModuleResolver};
use crate::compiler::operators::OperatorTables;
use crate::rel::expr::Expr;
use crate::syntax::ast::Node;
use crate::syntax::grammar::{Grammar, JsonGrammar};

pub struct Compiler {
    grammar: Arc<dyn Grammar>,         // Внешний парсер: текст → дерево
    modules: Arc<dyn ModuleResolver>,  // Резолвер импортов
    diagnostics: Arc<Diagnostics>,     // Канал предупреждений (по умолчанию общий на процесс)
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            grammar: Arc::new(JsonGrammar::new()),
            modules: Arc::new(DeferredModules),
            diagnostics: Diagnostics::global(),
        }
    }

    pub fn with_grammar(mut self, grammar: impl Grammar + 'static) -> Self {
        self.grammar = Arc::new(grammar);
        self
    }

    pub fn with_modules(mut self, modules: impl ModuleResolver + 'static) -> Self {
        self.modules = Arc::new(modules);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Разбирает и компилирует исходник. `path` задаёт каталог для локальных
    /// импортов: пустой путь это `.`, `NO_PATH` запрещает локальные импорты.
    /// Дефекты дерева возвращаются как `Err` без вывода паники в stderr.
    pub fn compile(&self, path: &str, source: &str) -> Result<Expr, CompileError> {
        catch_aborts(path, || {
            let source_dir = SourceDir::from_file_path(path);
            let filename = normalize_filename(path);
            tracing::debug!(path, filename = %filename, "compiling source");

            let tree = self.grammar.parse(source, &filename)?;
            let expr = self.lower(&source_dir, &tree)?;
            tracing::debug!(path, "compiled: {}", expr);
            Ok(expr)
        })
    }

    /// Как `compile`, но любая ошибка прерывает поток
    pub fn compile_or_abort(&self, path: &str, source: &str) -> Expr {
        match self.compile(path, source) {
            Ok(expr) => expr,
            Err(err) => abort(err),
        }
    }

    /// Компиляция уже разобранного дерева
    pub fn compile_tree(&self, source_dir: &SourceDir, tree: &Node) -> Result<Expr, CompileError> {
        catch_aborts(tree.span().filename(), || self.lower(source_dir, tree))
    }

    fn lower(&self, source_dir: &SourceDir, tree: &Node) -> Result<Expr, CompileError> {
        let ctx = CompilationContext {
            source_dir,
            modules: self.modules.as_ref(),
            diagnostics: self.diagnostics.as_ref(),
            operators: OperatorTables::global(),
        };
        compile_expr(&ctx, tree)
    }
}

thread_local! {
    // Глубина вложенных `catch_aborts` в текущем потоке
    static CATCHING: Cell<usize> = Cell::new(0);
}

fn catching() -> bool {
    CATCHING.with(|depth| depth.get() > 0)
}

/// Хук паники молчит о `CompileError`, который будет пойман на границе API,
/// остальные паники отдаёт прежнему хуку
fn install_quiet_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if catching() && info.payload().is::<CompileError>() {
                return;
            }
            previous(info);
        }));
    });
}

/// Нарушения инвариантов дерева прерывают компиляцию паникой с `CompileError`;
/// на границе API они снова становятся значением ошибки
fn catch_aborts<F>(path: &str, f: F) -> Result<Expr, CompileError>
where
    F: FnOnce() -> Result<Expr, CompileError>,
{
    install_quiet_hook();
    CATCHING.with(|depth| depth.set(depth.get() + 1));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    CATCHING.with(|depth| depth.set(depth.get() - 1));

    match outcome {
        Ok(result) => result,
        Err(payload) => match payload.downcast::<CompileError>() {
            Ok(err) => Err(*err),
            Err(payload) => Err(CompileError::Internal(format!(
                "compiling {:?}: {}",
                path,
                panic_message(payload.as_ref())
            ))),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
