// Таблицы операторов: токен → конструктор IR

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::common::error::{abort, CompileError, EvalError};
use crate::common::span::Span;
use crate::rel::expr::{BinaryOp, CompareFn, CompareOp, Expr, UnaryOp};
use crate::rel::value::Value;

pub type UnaryBuilder = Box<dyn Fn(&Span, Expr) -> Expr + Send + Sync>;

/// Неизменяемые таблицы унарных, бинарных операторов и сравнений
pub struct OperatorTables {
    unary: HashMap<&'static str, UnaryBuilder>,
    binary: HashMap<&'static str, BinaryOp>,
    compare: HashMap<&'static str, CompareOp>,
}

lazy_static! {
    static ref OPERATOR_TABLES: OperatorTables = OperatorTables::new();
}

fn unary_op(op: UnaryOp) -> UnaryBuilder {
    Box::new(move |span: &Span, operand: Expr| Expr::unary(span, op, operand))
}

/// Префиксная форма бинарного оператора с текущим значением `.` слева
fn dot_unary(op: BinaryOp) -> UnaryBuilder {
    Box::new(move |span: &Span, operand: Expr| {
        Expr::binary(span, op, Expr::ident(span, "."), operand)
    })
}

const BINARY_OPS: &[(&str, BinaryOp)] = &[
    ("->", BinaryOp::Arrow),
    ("=>", BinaryOp::DArrow),
    (">>", BinaryOp::SeqArrow { strict: false }),
    (">>>", BinaryOp::SeqArrow { strict: true }),
    (":>", BinaryOp::TupleMap),
    ("orderby", BinaryOp::OrderBy),
    ("order", BinaryOp::Order),
    ("rank", BinaryOp::Rank),
    ("where", BinaryOp::Where),
    ("sum", BinaryOp::Sum),
    ("max", BinaryOp::Max),
    ("mean", BinaryOp::Mean),
    ("median", BinaryOp::Median),
    ("min", BinaryOp::Min),
    ("with", BinaryOp::With),
    ("without", BinaryOp::Without),
    ("&&", BinaryOp::And),
    ("||", BinaryOp::Or),
    ("+", BinaryOp::Add),
    ("-", BinaryOp::Sub),
    ("++", BinaryOp::Concat),
    ("&~", BinaryOp::Difference),
    ("~~", BinaryOp::SymmetricDiff),
    ("&", BinaryOp::Intersect),
    ("|", BinaryOp::Union),
    ("<&>", BinaryOp::Join),
    ("<->", BinaryOp::Compose),
    ("-&-", BinaryOp::JoinCommon),
    ("---", BinaryOp::JoinExists),
    ("-&>", BinaryOp::RightMatch),
    ("<&-", BinaryOp::LeftMatch),
    ("-->", BinaryOp::RightResidue),
    ("<--", BinaryOp::LeftResidue),
    ("*", BinaryOp::Mul),
    ("/", BinaryOp::Div),
    ("%", BinaryOp::Mod),
    ("-%", BinaryOp::SubMod),
    ("//", BinaryOp::IntDiv),
    ("^", BinaryOp::Pow),
    ("\\", BinaryOp::Offset),
    ("+>", BinaryOp::AddArrow),
];

fn member(a: &Value, b: &Value) -> Result<bool, EvalError> {
    b.as_set()
        .map(|set| set.contains(a))
        .map_err(|_| EvalError::type_error(format!("<: rhs not a set: {}", b)))
}

fn subset(a: &Value, b: &Value) -> Result<bool, EvalError> {
    let (a, b) = (a.as_set()?, b.as_set()?);
    Ok(a.len() < b.len() && a.is_subset(b))
}

fn subset_or_equal(a: &Value, b: &Value) -> Result<bool, EvalError> {
    Ok(a.as_set()?.is_subset(b.as_set()?))
}

fn subset_or_superset(a: &Value, b: &Value) -> Result<bool, EvalError> {
    Ok(subset(a, b)? || subset(b, a)?)
}

fn subset_superset_or_equal(a: &Value, b: &Value) -> Result<bool, EvalError> {
    Ok(subset_or_equal(a, b)? || subset_or_equal(b, a)?)
}

const COMPARE_OPS: &[(&str, CompareFn)] = &[
    ("<:", member),
    ("!<:", |a, b| Ok(!member(a, b)?)),
    ("=", |a, b| Ok(a == b)),
    ("!=", |a, b| Ok(a != b)),
    ("<", |a, b| Ok(a < b)),
    (">", |a, b| Ok(b < a)),
    ("<=", |a, b| Ok(a <= b)),
    (">=", |a, b| Ok(a >= b)),
    ("(<)", subset),
    ("(>)", |a, b| subset(b, a)),
    ("(<=)", subset_or_equal),
    ("(>=)", |a, b| subset_or_equal(b, a)),
    ("(<>)", subset_or_superset),
    ("(<>=)", |a, b| subset_superset_or_equal(b, a)),
    ("!(<)", |a, b| Ok(!subset(a, b)?)),
    ("!(>)", |a, b| Ok(!subset(b, a)?)),
    ("!(<=)", |a, b| Ok(!subset_or_equal(a, b)?)),
    ("!(>=)", |a, b| Ok(!subset_or_equal(b, a)?)),
    ("!(<>)", |a, b| Ok(!subset_or_superset(a, b)?)),
    ("!(<>=)", |a, b| Ok(!subset_superset_or_equal(b, a)?)),
];

impl OperatorTables {
    fn new() -> Self {
        let mut unary: HashMap<&'static str, UnaryBuilder> = HashMap::new();
        unary.insert("+", unary_op(UnaryOp::Pos));
        unary.insert("-", unary_op(UnaryOp::Neg));
        unary.insert("^", unary_op(UnaryOp::PowerSet));
        unary.insert("!", unary_op(UnaryOp::Not));
        unary.insert("*", unary_op(UnaryOp::Eval));
        unary.insert("//", Box::new(|span: &Span, operand: Expr| Expr::package(span, operand)));
        unary.insert("=>", dot_unary(BinaryOp::DArrow));
        unary.insert(">>", dot_unary(BinaryOp::SeqArrow { strict: false }));
        // TODO: префиксный `>>>` появится вместе с поддержкой в грамматике
        unary.insert(":>", dot_unary(BinaryOp::TupleMap));

        let binary = BINARY_OPS.iter().copied().collect();
        let compare = COMPARE_OPS
            .iter()
            .map(|&(symbol, func)| (symbol, CompareOp { symbol, func }))
            .collect();

        Self {
            unary,
            binary,
            compare,
        }
    }

    /// Общие таблицы процесса
    pub fn global() -> &'static OperatorTables {
        &OPERATOR_TABLES
    }

    pub fn lookup_unary(&self, symbol: &str) -> Option<&UnaryBuilder> {
        self.unary.get(symbol)
    }

    pub fn lookup_binary(&self, symbol: &str) -> Option<BinaryOp> {
        self.binary.get(symbol).copied()
    }

    pub fn lookup_compare(&self, symbol: &str) -> Option<CompareOp> {
        self.compare.get(symbol).copied()
    }

    /// Применяет унарный оператор; неизвестный токен прерывает компиляцию
    pub fn apply_unary(&self, symbol: &str, span: &Span, operand: Expr) -> Expr {
        match self.lookup_unary(symbol) {
            Some(build) => build(span, operand),
            None => unresolved("unary", symbol, span),
        }
    }

    pub fn binary(&self, symbol: &str, span: &Span) -> BinaryOp {
        self.lookup_binary(symbol)
            .unwrap_or_else(|| unresolved("binary", symbol, span))
    }

    pub fn compare(&self, symbol: &str, span: &Span) -> CompareOp {
        self.lookup_compare(symbol)
            .unwrap_or_else(|| unresolved("compare", symbol, span))
    }
}

fn unresolved(table: &'static str, symbol: &str, span: &Span) -> ! {
    abort(CompileError::UnresolvedOperator {
        span: span.clone(),
        table,
        op: symbol.to_string(),
    })
}
