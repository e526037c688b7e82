// Единый тип значений для эталонного вычислителя

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::common::error::EvalError;
use crate::rel::eval;
use crate::rel::expr::Expr;
use crate::rel::pattern::Pattern;
use crate::rel::scope::Scope;

pub type NativeFn = dyn Fn(&Value) -> Result<Value, EvalError> + Send + Sync;

/// Встроенная функция одного аргумента
#[derive(Clone)]
pub struct NativeFunction {
    name: String,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&Value) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, arg: &Value) -> Result<Value, EvalError> {
        (self.func)(arg)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.func) as *const u8 as usize
    }
}

/// Замыкание: паттерн параметра, тело и захваченная область видимости
pub struct Closure {
    pub pattern: Pattern,
    pub body: Expr,
    pub scope: Scope,
}

#[derive(Clone)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Разреженный массив: `None` это пропущенный элемент
    Array(Vec<Option<Value>>),
    Tuple(BTreeMap<String, Value>),
    Set(BTreeSet<Value>),
    Dict(BTreeMap<Value, Value>),
    Closure(Arc<Closure>),
    Native(NativeFunction),
}

impl Value {
    /// «Нет значения» это пустое множество
    pub fn none() -> Self {
        Value::Set(BTreeSet::new())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::Set(s) if s.is_empty())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(items.into_iter().map(Some).collect())
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Set(items.into_iter().collect())
    }

    pub fn tuple<K: Into<String>>(attrs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Tuple(attrs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn native(
        name: impl Into<String>,
        func: impl Fn(&Value) -> Result<Value, EvalError> + Send + Sync + 'static,
    ) -> Self {
        Value::Native(NativeFunction::new(name, func))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::Dict(_) => "dict",
            Value::Closure(_) => "closure",
            Value::Native(_) => "native function",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Tuple(attrs) => !attrs.is_empty(),
            Value::Set(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            Value::Closure(_) | Value::Native(_) => true,
        }
    }

    pub fn as_number(&self) -> Result<f64, EvalError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(EvalError::type_error(format!(
                "expected a number, got {} {}",
                other.type_name(),
                other
            ))),
        }
    }

    pub fn as_set(&self) -> Result<&BTreeSet<Value>, EvalError> {
        match self {
            Value::Set(items) => Ok(items),
            other => Err(EvalError::type_error(format!(
                "expected a set, got {} {}",
                other.type_name(),
                other
            ))),
        }
    }

    /// Доступ к атрибуту кортежа (или строковому ключу словаря)
    pub fn get_attr(&self, attr: &str) -> Result<Value, EvalError> {
        match self {
            Value::Tuple(attrs) => attrs.get(attr).cloned().ok_or_else(|| {
                EvalError::MissingAttr {
                    attr: attr.to_string(),
                    available: attrs.keys().cloned().collect(),
                }
            }),
            Value::Dict(entries) => entries
                .get(&Value::string(attr))
                .cloned()
                .ok_or_else(|| EvalError::MissingAttr {
                    attr: attr.to_string(),
                    available: entries.keys().map(|k| k.to_string()).collect(),
                }),
            other => Err(EvalError::type_error(format!(
                "cannot get attr {:?} from {} {}",
                attr,
                other.type_name(),
                other
            ))),
        }
    }

    /// Вызов значения как функции
    pub fn call(&self, arg: &Value) -> Result<Value, EvalError> {
        match self {
            Value::Closure(closure) => eval::call_closure(closure, arg),
            Value::Native(native) => native.call(arg),
            Value::Array(items) => {
                let index = arg.as_number()?;
                if index < 0.0 || index.fract() != 0.0 {
                    return Err(EvalError::NoReturn);
                }
                match items.get(index as usize) {
                    Some(Some(v)) => Ok(v.clone()),
                    _ => Err(EvalError::NoReturn),
                }
            }
            Value::Dict(entries) => entries.get(arg).cloned().ok_or(EvalError::NoReturn),
            Value::Set(items) => {
                // множество пар (@: ключ, @value: значение)
                let mut found = items.iter().filter_map(|item| match item {
                    Value::Tuple(t) if t.get("@") == Some(arg) => t.get("@value").cloned(),
                    _ => None,
                });
                match (found.next(), found.next()) {
                    (Some(v), None) => Ok(v),
                    (None, _) => Err(EvalError::NoReturn),
                    (Some(_), Some(_)) => Err(EvalError::type_error(format!(
                        "call of {} with {} has more than one result",
                        self, arg
                    ))),
                }
            }
            other => Err(EvalError::type_error(format!(
                "{} {} is not callable",
                other.type_name(),
                other
            ))),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Bytes(_) => 3,
            Value::Array(_) => 4,
            Value::Tuple(_) => 5,
            Value::Set(_) => 6,
            Value::Dict(_) => 7,
            Value::Closure(_) => 8,
            Value::Native(_) => 9,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => {
                a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b))
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) => a.cmp(b),
            (Value::Tuple(a), Value::Tuple(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Dict(a), Value::Dict(b)) => a.cmp(b),
            (Value::Closure(a), Value::Closure(b)) => Arc::as_ptr(a).cmp(&Arc::as_ptr(b)),
            (Value::Native(a), Value::Native(b)) => {
                a.name.cmp(&b.name).then_with(|| a.addr().cmp(&b.addr()))
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

fn write_joined<T>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = T>,
    mut each: impl FnMut(&mut fmt::Formatter<'_>, T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        each(f, item)?;
    }
    Ok(())
}

/// Число в каноническом виде: целые без дробной части
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => {
                write!(f, "'")?;
                for c in s.chars() {
                    match c {
                        '\'' => write!(f, "\\'")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                write!(f, "'")
            }
            Value::Bytes(bytes) => {
                write!(f, "<<")?;
                write_joined(f, bytes, |f, b| write!(f, "{}", b))?;
                write!(f, ">>")
            }
            Value::Array(items) => {
                write!(f, "[")?;
                write_joined(f, items, |f, item| match item {
                    Some(v) => write!(f, "{}", v),
                    None => Ok(()),
                })?;
                write!(f, "]")
            }
            Value::Tuple(attrs) => {
                write!(f, "(")?;
                write_joined(f, attrs, |f, (k, v)| write!(f, "{}: {}", k, v))?;
                write!(f, ")")
            }
            Value::Set(items) => {
                write!(f, "{{")?;
                write_joined(f, items, |f, v| write!(f, "{}", v))?;
                write!(f, "}}")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                write_joined(f, entries, |f, (k, v)| write!(f, "{}: {}", k, v))?;
                write!(f, "}}")
            }
            Value::Closure(closure) => write!(f, "\\{} {}", closure.pattern, closure.body),
            Value::Native(native) => write!(f, "<native {}>", native.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendering() {
        let v = Value::tuple([
            ("a", Value::Number(1.0)),
            ("b", Value::array([Value::string("x"), Value::Bool(true)])),
        ]);
        assert_eq!(v.to_string(), "(a: 1, b: ['x', true])");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::none().to_string(), "{}");
        assert_eq!(
            Value::Array(vec![Some(Value::Number(1.0)), None, Some(Value::Number(3.0))])
                .to_string(),
            "[1, , 3]"
        );
    }

    #[test]
    fn test_total_order_in_sets() {
        let set = Value::set([
            Value::string("b"),
            Value::Number(2.0),
            Value::Number(-0.0),
            Value::Number(0.0),
            Value::Bool(false),
        ]);
        assert_eq!(set.to_string(), "{false, 0, 2, 'b'}");
    }

    #[test]
    fn test_missing_attr_lists_available() {
        let t = Value::tuple([("a", Value::Number(1.0))]);
        match t.get_attr("b") {
            Err(EvalError::MissingAttr { attr, available }) => {
                assert_eq!(attr, "b");
                assert_eq!(available, vec!["a".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_call_sparse_array_hole_is_no_value() {
        let arr = Value::Array(vec![Some(Value::Number(1.0)), None]);
        assert_eq!(arr.call(&Value::Number(0.0)).unwrap(), Value::Number(1.0));
        assert!(matches!(arr.call(&Value::Number(1.0)), Err(EvalError::NoReturn)));
    }
}
