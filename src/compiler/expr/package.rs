// Импорты: `//name`, `//{./path}`, `//{/path}`, `//{host/path}`

use crate::common::error::{abort, CompileError, ModuleError};
use crate::common::span::Span;
use crate::compiler::context::{join_path, CompilationContext};
use crate::compiler::expr::{child, token};
use crate::rel::expr::Expr;
use crate::rel::value::Value;
use crate::syntax::ast::Node;

fn module_error(span: &Span) -> impl FnOnce(ModuleError) -> CompileError + '_ {
    move |source| CompileError::Module {
        span: span.clone(),
        source,
    }
}

pub fn compile_package(
    ctx: &CompilationContext,
    node: &Node,
    pkg: &Node,
) -> Result<Expr, CompileError> {
    if let Some(std) = pkg.one("std") {
        let import = child(node, "import");
        let ident = token(child(std, "IDENT"));
        let span = Span::merge_or(ident.span(), &[import.span(), ident.span()]);
        let inner = ctx
            .modules
            .standard_library(ident.text(), &span)
            .map_err(module_error(&span))?;
        return Ok(Expr::package(ident.span(), inner));
    }

    if let Some(path) = pkg.one("PKGPATH") {
        let path = token(path);
        let span = path.span();
        let name = path.text();
        if name.starts_with('/') {
            let file = name.trim_matches('/');
            // `//{./x}` ищет относительно каталога файла, `//{/x}` от корня
            let from_root = !pkg.has("dot");
            let dir = ctx
                .source_dir
                .as_path()
                .ok_or_else(|| CompileError::MissingSourceContext {
                    span: span.clone(),
                    path: name.to_string(),
                })?;
            let loader = ctx
                .modules
                .local_file(from_root, span)
                .map_err(module_error(span))?;
            return Ok(Expr::call(
                span,
                Expr::package(span, loader),
                Expr::literal(span, Value::string(join_path(dir, file))),
            ));
        }
        let loader = ctx
            .modules
            .external_content(span)
            .map_err(module_error(span))?;
        return Ok(Expr::call(
            span,
            Expr::package(span, loader),
            Expr::literal(span, Value::string(name)),
        ));
    }

    abort(CompileError::malformed(pkg.span(), "malformed package AST"))
}
