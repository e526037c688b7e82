// IR выражений. Каждый вариант несёт спан исходника.

use std::fmt;
use std::sync::Arc;

use crate::common::error::EvalError;
use crate::common::span::Span;
use crate::rel::pattern::Pattern;
use crate::rel::scope::Scope;
use crate::rel::value::Value;

/// Шаг безопасной цепочки. `Ok(None)` означает «цепочка прервана, нужен запасной вариант».
pub type SafeTailCallback =
    Arc<dyn Fn(&Value, &Scope) -> Result<Option<Value>, EvalError> + Send + Sync>;

pub type CompareFn = fn(&Value, &Value) -> Result<bool, EvalError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Pos,
    Neg,
    PowerSet,
    Not,
    Eval,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::PowerSet => "^",
            UnaryOp::Not => "!",
            UnaryOp::Eval => "*",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Arrow,
    DArrow,
    SeqArrow { strict: bool },
    TupleMap,
    OrderBy,
    Order,
    Rank,
    Where,
    Sum,
    Max,
    Mean,
    Median,
    Min,
    With,
    Without,
    And,
    Or,
    Add,
    Sub,
    Concat,
    Difference,
    SymmetricDiff,
    Intersect,
    Union,
    Join,
    Compose,
    JoinCommon,
    JoinExists,
    RightMatch,
    LeftMatch,
    RightResidue,
    LeftResidue,
    Mul,
    Div,
    Mod,
    SubMod,
    IntDiv,
    Pow,
    Offset,
    AddArrow,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Arrow => "->",
            BinaryOp::DArrow => "=>",
            BinaryOp::SeqArrow { strict: false } => ">>",
            BinaryOp::SeqArrow { strict: true } => ">>>",
            BinaryOp::TupleMap => ":>",
            BinaryOp::OrderBy => "orderby",
            BinaryOp::Order => "order",
            BinaryOp::Rank => "rank",
            BinaryOp::Where => "where",
            BinaryOp::Sum => "sum",
            BinaryOp::Max => "max",
            BinaryOp::Mean => "mean",
            BinaryOp::Median => "median",
            BinaryOp::Min => "min",
            BinaryOp::With => "with",
            BinaryOp::Without => "without",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Concat => "++",
            BinaryOp::Difference => "&~",
            BinaryOp::SymmetricDiff => "~~",
            BinaryOp::Intersect => "&",
            BinaryOp::Union => "|",
            BinaryOp::Join => "<&>",
            BinaryOp::Compose => "<->",
            BinaryOp::JoinCommon => "-&-",
            BinaryOp::JoinExists => "---",
            BinaryOp::RightMatch => "-&>",
            BinaryOp::LeftMatch => "<&-",
            BinaryOp::RightResidue => "-->",
            BinaryOp::LeftResidue => "<--",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::SubMod => "-%",
            BinaryOp::IntDiv => "//",
            BinaryOp::Pow => "^",
            BinaryOp::Offset => "\\",
            BinaryOp::AddArrow => "+>",
        }
    }
}

/// Оператор сравнения из цепочки: символ и булева функция двух аргументов
#[derive(Clone, Copy)]
pub struct CompareOp {
    pub symbol: &'static str,
    pub func: CompareFn,
}

impl PartialEq for CompareOp {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl fmt::Debug for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompareOp({})", self.symbol)
    }
}

/// Шаг безопасной навигации: обращение к атрибуту или вызов
#[derive(Clone)]
pub struct SafeTailStep {
    pub label: String,
    pub safe: bool,
    pub callback: SafeTailCallback,
}

impl PartialEq for SafeTailStep {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.safe == other.safe
    }
}

impl fmt::Debug for SafeTailStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", if self.safe { "?" } else { "" }, self.label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleAttr {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictEntry {
    pub key: Expr,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XStrPart {
    Text(String),
    Expr { expr: Expr, format: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Value,
        span: Span,
    },
    Ident {
        name: String,
        span: Span,
    },
    Dot {
        lhs: Box<Expr>,
        attr: String,
        span: Span,
    },
    TupleProjection {
        lhs: Box<Expr>,
        inverse: bool,
        attrs: Vec<String>,
        span: Span,
    },
    Call {
        func: Box<Expr>,
        arg: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Package {
        inner: Box<Expr>,
        span: Span,
    },
    /// n-арная цепочка сравнений: `args.len() == ops.len() + 1`
    Compare {
        args: Vec<Expr>,
        ops: Vec<CompareOp>,
        span: Span,
    },
    IfElse {
        if_true: Box<Expr>,
        cond: Box<Expr>,
        if_false: Box<Expr>,
        span: Span,
    },
    CondControl {
        control: Box<Expr>,
        arms: Vec<(Pattern, Expr)>,
        span: Span,
    },
    Cond {
        dict: Box<Expr>,
        span: Span,
    },
    Count {
        operand: Box<Expr>,
        span: Span,
    },
    Single {
        operand: Box<Expr>,
        span: Span,
    },
    SafeTail {
        fallback: Box<Expr>,
        base: Box<Expr>,
        steps: Vec<SafeTailStep>,
        span: Span,
    },
    Relation {
        names: Vec<String>,
        tuples: Vec<Vec<Expr>>,
        span: Span,
    },
    Set {
        elements: Vec<Expr>,
        span: Span,
    },
    Dict {
        entries: Vec<DictEntry>,
        conditional: bool,
        span: Span,
    },
    Array {
        items: Vec<Option<Expr>>,
        span: Span,
    },
    Bytes {
        items: Vec<Expr>,
        span: Span,
    },
    Tuple {
        attrs: Vec<TupleAttr>,
        span: Span,
    },
    Function {
        pattern: Box<Pattern>,
        body: Box<Expr>,
        span: Span,
    },
    Recursion {
        name: String,
        base: Box<Expr>,
        fix: Box<Expr>,
        fixt: Box<Expr>,
        span: Span,
    },
    Paren {
        inner: Box<Expr>,
        span: Span,
    },
    XStr {
        parts: Vec<XStrPart>,
        span: Span,
    },
    Nest {
        lhs: Box<Expr>,
        inverse: bool,
        attrs: Vec<String>,
        name: String,
        span: Span,
    },
}

impl Expr {
    pub fn literal(span: &Span, value: Value) -> Expr {
        Expr::Literal {
            value,
            span: span.clone(),
        }
    }

    pub fn ident(span: &Span, name: impl Into<String>) -> Expr {
        Expr::Ident {
            name: name.into(),
            span: span.clone(),
        }
    }

    pub fn dot(span: &Span, lhs: Expr, attr: impl Into<String>) -> Expr {
        Expr::Dot {
            lhs: Box::new(lhs),
            attr: attr.into(),
            span: span.clone(),
        }
    }

    pub fn call(span: &Span, func: Expr, arg: Expr) -> Expr {
        Expr::Call {
            func: Box::new(func),
            arg: Box::new(arg),
            span: span.clone(),
        }
    }

    pub fn binary(span: &Span, op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span: span.clone(),
        }
    }

    pub fn unary(span: &Span, op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
            span: span.clone(),
        }
    }

    pub fn package(span: &Span, inner: Expr) -> Expr {
        Expr::Package {
            inner: Box::new(inner),
            span: span.clone(),
        }
    }

    pub fn function(span: &Span, pattern: Pattern, body: Expr) -> Expr {
        Expr::Function {
            pattern: Box::new(pattern),
            body: Box::new(body),
            span: span.clone(),
        }
    }

    pub fn array(span: &Span, items: Vec<Option<Expr>>) -> Expr {
        Expr::Array {
            items,
            span: span.clone(),
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Ident { span, .. }
            | Expr::Dot { span, .. }
            | Expr::TupleProjection { span, .. }
            | Expr::Call { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Package { span, .. }
            | Expr::Compare { span, .. }
            | Expr::IfElse { span, .. }
            | Expr::CondControl { span, .. }
            | Expr::Cond { span, .. }
            | Expr::Count { span, .. }
            | Expr::Single { span, .. }
            | Expr::SafeTail { span, .. }
            | Expr::Relation { span, .. }
            | Expr::Set { span, .. }
            | Expr::Dict { span, .. }
            | Expr::Array { span, .. }
            | Expr::Bytes { span, .. }
            | Expr::Tuple { span, .. }
            | Expr::Function { span, .. }
            | Expr::Recursion { span, .. }
            | Expr::Paren { span, .. }
            | Expr::XStr { span, .. }
            | Expr::Nest { span, .. } => span,
        }
    }

    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Expr::Function { .. })
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Имя атрибута: голое, если это идентификатор, иначе в кавычках
pub fn format_attr(attr: &str) -> String {
    let mut chars = attr.chars();
    let ident = match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '@' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if ident {
        attr.to_string()
    } else {
        Value::string(attr).to_string()
    }
}

impl fmt::Display for TupleAttr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", format_attr(&self.name), self.value)
    }
}

impl fmt::Display for DictEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value, .. } => write!(f, "{}", value),
            Expr::Ident { name, .. } => write!(f, "{}", name),
            Expr::Dot { lhs, attr, .. } => match lhs.as_ident() {
                Some(".") => write!(f, ".{}", format_attr(attr)),
                _ => write!(f, "{}.{}", lhs, format_attr(attr)),
            },
            Expr::TupleProjection {
                lhs,
                inverse,
                attrs,
                ..
            } => {
                let tilde = if *inverse { "~" } else { "" };
                write!(f, "{}.{}|{}|", lhs, tilde, attrs.join(", "))
            }
            Expr::Call { func, arg, .. } => write!(f, "{}({})", func, arg),
            Expr::Binary { op, lhs, rhs, .. } => {
                write!(f, "({} {} {})", lhs, op.symbol(), rhs)
            }
            Expr::Unary { op, operand, .. } => write!(f, "({}{})", op.symbol(), operand),
            Expr::Package { inner, .. } => match inner.as_ref() {
                Expr::Dot { lhs, .. } if lhs.as_ident() == Some("//") => write!(f, "{}", inner),
                _ => write!(f, "(//{})", inner),
            },
            Expr::Compare { args, ops, .. } => {
                write!(f, "(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        let symbol = ops.get(i - 1).map(|op| op.symbol).unwrap_or("?");
                        write!(f, " {} ", symbol)?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::IfElse {
                if_true,
                cond,
                if_false,
                ..
            } => write!(f, "({} if {} else {})", if_true, cond, if_false),
            Expr::CondControl { control, arms, .. } => {
                write!(f, "cond {} {{", control)?;
                for (i, (pattern, expr)) in arms.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", pattern, expr)?;
                }
                write!(f, "}}")
            }
            Expr::Cond { dict, .. } => write!(f, "cond {}", dict),
            Expr::Count { operand, .. } => write!(f, "({} count)", operand),
            Expr::Single { operand, .. } => write!(f, "({} single)", operand),
            Expr::SafeTail {
                fallback,
                base,
                steps,
                ..
            } => {
                write!(f, "({}", base)?;
                for step in steps {
                    write!(f, "{:?}", step)?;
                }
                write!(f, ":{})", fallback)
            }
            Expr::Relation { names, tuples, .. } => {
                write!(f, "{{|{}| ", names.join(", "))?;
                for (i, tuple) in tuples.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "(")?;
                    join(f, tuple)?;
                    write!(f, ")")?;
                }
                write!(f, "}}")
            }
            Expr::Set { elements, .. } => {
                write!(f, "{{")?;
                join(f, elements)?;
                write!(f, "}}")
            }
            Expr::Dict { entries, .. } => {
                write!(f, "{{")?;
                join(f, entries)?;
                write!(f, "}}")
            }
            Expr::Array { items, .. } => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(item) = item {
                        write!(f, "{}", item)?;
                    }
                }
                write!(f, "]")
            }
            Expr::Bytes { items, .. } => {
                write!(f, "<<")?;
                join(f, items)?;
                write!(f, ">>")
            }
            Expr::Tuple { attrs, .. } => {
                write!(f, "(")?;
                join(f, attrs)?;
                write!(f, ")")
            }
            Expr::Function { pattern, body, .. } => write!(f, "\\{} {}", pattern, body),
            Expr::Recursion { name, base, .. } => write!(f, "rec {} {}", name, base),
            Expr::Paren { inner, .. } => write!(f, "({})", inner),
            Expr::XStr { parts, .. } => {
                write!(f, "$\"")?;
                for part in parts {
                    match part {
                        XStrPart::Text(text) => write!(f, "{}", text)?,
                        XStrPart::Expr { expr, format: None } => write!(f, "${{{}}}", expr)?,
                        XStrPart::Expr {
                            expr,
                            format: Some(fmt),
                        } => write!(f, "${{{}:{}}}", expr, fmt)?,
                    }
                }
                write!(f, "\"")
            }
            Expr::Nest {
                lhs,
                inverse,
                attrs,
                name,
                ..
            } => {
                let tilde = if *inverse { "~" } else { "" };
                write!(f, "({} nest {}|{}| {})", lhs, tilde, attrs.join(", "), name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_rendering_is_fully_parenthesised() {
        let span = Span::detached("t", "1 + 2 + 3");
        let n = |x: f64| Expr::literal(&span, Value::Number(x));
        let e = Expr::binary(
            &span,
            BinaryOp::Add,
            Expr::binary(&span, BinaryOp::Add, n(1.0), n(2.0)),
            n(3.0),
        );
        assert_eq!(e.to_string(), "((1 + 2) + 3)");
    }

    #[test]
    fn test_leading_dot_rendering() {
        let span = Span::detached("t", ".a");
        let e = Expr::dot(&span, Expr::ident(&span, "."), "a");
        assert_eq!(e.to_string(), ".a");
        assert_eq!(format_attr("two words"), "'two words'");
    }
}
