// Тесты публичного API: compile, compile_tree, грамматика, резолверы, диагностика

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::{binop, document, ident, num};
use pretty_assertions::assert_eq;
use rel_syntax::common::error::ModuleError;
use rel_syntax::common::{DiagnosticsSink, Source};
use rel_syntax::compiler::ModuleResolver;
use rel_syntax::{
    compile, compile_or_abort, compile_tree, evaluate, CompileError, Compiler, Diagnostics,
    Expr, Grammar, Node, ParseError, SourceDir, Span, Value,
};
use serde_json::json;

struct Counting(Arc<AtomicUsize>);

impl DiagnosticsSink for Counting {
    fn deprecation_warning(&self, _message: &str) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn deprecated_if() -> String {
    document(
        "1 if true else 2",
        json!({ "if": [{ "t": ident("true"), "f": num("2") }], "expr": num("1") }),
    )
}

#[test]
fn test_compile_free_function() {
    let doc = document("1 + 2", binop("+", num("1"), num("2")));
    let expr = compile("", &doc).unwrap();
    assert_eq!(evaluate(&expr).unwrap(), Value::Number(3.0));
    assert_eq!(expr.span().filename(), ".");
}

#[test]
fn test_relative_filename_is_cleaned() {
    let doc = document("x", ident("x"));
    let expr = compile("./src/../lib/main.arrai", &doc).unwrap();
    assert_eq!(expr.span().filename(), "lib/main.arrai");
}

#[test]
fn test_invalid_document_is_parse_error() {
    let err = compile("main.arrai", "not json").unwrap_err();
    match err {
        CompileError::Parse(ParseError { filename, .. }) => assert_eq!(filename, "main.arrai"),
        other => panic!("expected parse error, got {}", other),
    }
}

#[test]
fn test_malformed_tree_is_error() {
    let doc = document("?", json!({ "bogus": "?" }));
    let err = compile("", &doc).unwrap_err();
    assert!(matches!(err, CompileError::MalformedTree { .. }), "{}", err);
    assert!(err.is_internal());
}

#[test]
fn test_empty_tag_sequence_is_malformed() {
    let err = compile("", &document("x", json!({ "IDENT": [] }))).unwrap_err();
    assert!(matches!(err, CompileError::MalformedTree { .. }), "{}", err);
}

#[test]
#[should_panic]
fn test_compile_or_abort_panics() {
    let doc = document("?", json!({ "bogus": "?" }));
    compile_or_abort("", &doc);
}

#[test]
fn test_compile_tree_from_built_node() {
    let src = Source::new("built", "a + 1");
    let leaf = |text: &str| Node::leaf(Span::find(&src, text).unwrap());
    let tree = Node::builder()
        .many("binop", vec![leaf("+")])
        .many(
            "expr",
            vec![
                Node::builder().one("IDENT", leaf("a")).build(),
                Node::builder().one("NUM", leaf("1")).build(),
            ],
        )
        .build();
    let expr = compile_tree(&SourceDir::NoPath, &tree).unwrap();
    assert_eq!(expr.to_string(), "(a + 1)");
    assert_eq!(expr.span().text(), "a + 1");
}

#[test]
fn test_embedded_expression_passes_through() {
    let span = Span::detached("t", "42");
    let tree = Node::embedded(Expr::literal(&span, Value::Number(42.0)));
    let expr = compile_tree(&SourceDir::NoPath, &tree).unwrap();
    assert_eq!(evaluate(&expr).unwrap(), Value::Number(42.0));
}

#[test]
fn test_if_deprecation_warned_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let diagnostics = Arc::new(Diagnostics::new(Counting(count.clone())));
    let compiler = Compiler::new().with_diagnostics(diagnostics.clone());
    for _ in 0..100 {
        compiler.compile("", &deprecated_if()).unwrap();
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(diagnostics.has_warned());
}

#[test]
fn test_no_warning_without_if() {
    let count = Arc::new(AtomicUsize::new(0));
    let compiler =
        Compiler::new().with_diagnostics(Arc::new(Diagnostics::new(Counting(count.clone()))));
    compiler.compile("", &document("1", num("1"))).unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_compile_from_threads() {
    let compiler = Arc::new(Compiler::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let compiler = compiler.clone();
            std::thread::spawn(move || {
                let n = i.to_string();
                let doc = document(&format!("{} + 1", n), binop("+", num(&n), num("1")));
                evaluate(&compiler.compile("", &doc).unwrap()).unwrap()
            })
        })
        .collect();
    let results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let expected: Vec<Value> = (1..=4).map(|n| Value::Number(n as f64)).collect();
    assert_eq!(results, expected);
}

/// Грамматика, возвращающая заранее заданное дерево
struct FixedGrammar(Node);

impl Grammar for FixedGrammar {
    fn parse(&self, _source: &str, filename: &str) -> Result<Node, ParseError> {
        if filename.ends_with(".bad") {
            return Err(ParseError::new(filename, "unexpected token"));
        }
        Ok(self.0.clone())
    }
}

#[test]
fn test_custom_grammar() {
    let src = Source::new("g", "7");
    let tree = Node::builder()
        .one("NUM", Node::leaf(Span::find(&src, "7").unwrap()))
        .build();
    let compiler = Compiler::new().with_grammar(FixedGrammar(tree));
    let expr = compiler.compile("x.arrai", "ignored").unwrap();
    assert_eq!(evaluate(&expr).unwrap(), Value::Number(7.0));

    let err = compiler.compile("x.bad", "ignored").unwrap_err();
    assert!(matches!(err, CompileError::Parse(_)));
}

/// Резолвер, запоминающий запросы и отклоняющий внешний контент
#[derive(Default)]
struct RecordingModules {
    requests: Mutex<Vec<String>>,
}

impl ModuleResolver for RecordingModules {
    fn standard_library(&self, name: &str, span: &Span) -> Result<Expr, ModuleError> {
        self.requests.lock().unwrap().push(format!("std:{}", name));
        Ok(Expr::literal(span, Value::string(name)))
    }

    fn local_file(&self, from_root: bool, span: &Span) -> Result<Expr, ModuleError> {
        self.requests
            .lock()
            .unwrap()
            .push(format!("local:{}", from_root));
        Ok(Expr::literal(span, Value::native("load", |v| Ok(v.clone()))))
    }

    fn external_content(&self, _span: &Span) -> Result<Expr, ModuleError> {
        Err(ModuleError::new("network access disabled"))
    }
}

#[test]
fn test_custom_module_resolver() {
    let compiler = Compiler::new().with_modules(RecordingModules::default());

    let std_doc = document("//str", json!({ "import": "//", "pkg": { "std": { "IDENT": "str" } } }));
    let expr = compiler.compile("", &std_doc).unwrap();
    assert!(matches!(expr, Expr::Package { .. }));

    let ext_doc = document("//{host/x}", json!({ "import": "//", "pkg": { "PKGPATH": "host/x" } }));
    match compiler.compile("", &ext_doc).unwrap_err() {
        CompileError::Module { source, .. } => {
            assert_eq!(source.message, "network access disabled")
        }
        other => panic!("expected module error, got {}", other),
    }
}
