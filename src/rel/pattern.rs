// IR паттернов и их сопоставление со значениями

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::common::error::EvalError;
use crate::rel::eval;
use crate::rel::expr::{format_attr, Expr};
use crate::rel::scope::Scope;
use crate::rel::value::Value;

/// Слот структурного паттерна: паттерн (или пропуск) и значение по умолчанию
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackPattern {
    pub pattern: Option<Box<Pattern>>,
    pub fallback: Option<Expr>,
}

impl FallbackPattern {
    pub fn new(pattern: Option<Pattern>, fallback: Option<Expr>) -> Self {
        Self {
            pattern: pattern.map(Box::new),
            fallback,
        }
    }

    /// Пропущенный слот `[a, , c]`
    pub fn elided() -> Self {
        Self::new(None, None)
    }

    pub fn is_extra(&self) -> bool {
        matches!(self.pattern.as_deref(), Some(Pattern::Extra(_)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TuplePatternAttr {
    pub name: String,
    pub pattern: FallbackPattern,
}

/// Элемент паттерна словаря. У элемента `...rest` ключа нет.
#[derive(Debug, Clone, PartialEq)]
pub struct DictPatternEntry {
    pub key: Option<Expr>,
    pub pattern: FallbackPattern,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Expr(Expr),
    Exprs(Vec<Expr>),
    Array(Vec<FallbackPattern>),
    Tuple(Vec<TuplePatternAttr>),
    Dict(Vec<DictPatternEntry>),
    Set(Vec<Pattern>),
    Extra(Option<String>),
}

impl Pattern {
    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Pattern::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    /// Сопоставляет значение с паттерном. Возвращает только новые привязки;
    /// значения по умолчанию и ключи вычисляются в `scope`.
    pub fn bind(&self, scope: &Scope, value: &Value) -> Result<Scope, EvalError> {
        let mut bindings = Bindings::default();
        self.bind_into(scope, value, &mut bindings)?;
        Ok(bindings.into_scope())
    }

    fn mismatch(&self, value: &Value) -> EvalError {
        EvalError::PatternMismatch {
            pattern: self.to_string(),
            value: value.to_string(),
        }
    }

    fn bind_into(
        &self,
        scope: &Scope,
        value: &Value,
        out: &mut Bindings,
    ) -> Result<(), EvalError> {
        match self {
            Pattern::Expr(Expr::Ident { name, .. }) => {
                if name != "_" {
                    out.bind(name, value.clone(), self)?;
                }
                Ok(())
            }
            Pattern::Expr(expr) => {
                if eval::eval(expr, scope)? == *value {
                    Ok(())
                } else {
                    Err(self.mismatch(value))
                }
            }
            Pattern::Exprs(exprs) => {
                for expr in exprs {
                    if eval::eval(expr, scope)? == *value {
                        return Ok(());
                    }
                }
                Err(self.mismatch(value))
            }
            Pattern::Extra(name) => {
                if let Some(name) = name {
                    out.bind(name, value.clone(), self)?;
                }
                Ok(())
            }
            Pattern::Array(items) => self.bind_array(items, scope, value, out),
            Pattern::Tuple(attrs) => self.bind_tuple(attrs, scope, value, out),
            Pattern::Dict(entries) => self.bind_dict(entries, scope, value, out),
            Pattern::Set(elements) => self.bind_set(elements, scope, value, out),
        }
    }

    fn bind_array(
        &self,
        items: &[FallbackPattern],
        scope: &Scope,
        value: &Value,
        out: &mut Bindings,
    ) -> Result<(), EvalError> {
        let values: &[Option<Value>] = match value {
            Value::Array(values) => values,
            v if v.is_none() => &[],
            _ => return Err(self.mismatch(value)),
        };

        match items.iter().position(FallbackPattern::is_extra) {
            None => {
                if values.len() > items.len() {
                    return Err(self.mismatch(value));
                }
                for (i, item) in items.iter().enumerate() {
                    let slot = values.get(i).and_then(Option::as_ref);
                    self.bind_slot(item, slot, scope, value, out)?;
                }
            }
            Some(extra) => {
                let (prefix, rest) = items.split_at(extra);
                let suffix = &rest[1..];
                if values.len() < prefix.len() + suffix.len() {
                    return Err(self.mismatch(value));
                }
                for (item, slot) in prefix.iter().zip(values) {
                    self.bind_slot(item, slot.as_ref(), scope, value, out)?;
                }
                let tail_start = values.len() - suffix.len();
                for (item, slot) in suffix.iter().zip(&values[tail_start..]) {
                    self.bind_slot(item, slot.as_ref(), scope, value, out)?;
                }
                let remainder = Value::Array(values[prefix.len()..tail_start].to_vec());
                if let Some(pattern) = &rest[0].pattern {
                    pattern.bind_into(scope, &remainder, out)?;
                }
            }
        }
        Ok(())
    }

    fn bind_slot(
        &self,
        item: &FallbackPattern,
        slot: Option<&Value>,
        scope: &Scope,
        whole: &Value,
        out: &mut Bindings,
    ) -> Result<(), EvalError> {
        let pattern = match &item.pattern {
            Some(pattern) => pattern,
            None => return Ok(()),
        };
        match (slot, &item.fallback) {
            (Some(v), _) => pattern.bind_into(scope, v, out),
            (None, Some(fallback)) => {
                let v = eval::eval(fallback, scope)?;
                pattern.bind_into(scope, &v, out)
            }
            (None, None) => Err(self.mismatch(whole)),
        }
    }

    fn bind_tuple(
        &self,
        attrs: &[TuplePatternAttr],
        scope: &Scope,
        value: &Value,
        out: &mut Bindings,
    ) -> Result<(), EvalError> {
        let tuple = match value {
            Value::Tuple(tuple) => tuple.clone(),
            v if v.is_none() => BTreeMap::new(),
            _ => return Err(self.mismatch(value)),
        };
        let mut leftover = tuple.clone();
        let mut extra = None;
        for attr in attrs {
            if attr.pattern.is_extra() {
                extra = attr.pattern.pattern.as_deref();
                continue;
            }
            leftover.remove(&attr.name);
            self.bind_slot(&attr.pattern, tuple.get(&attr.name), scope, value, out)?;
        }
        match extra {
            Some(pattern) => pattern.bind_into(scope, &Value::Tuple(leftover), out),
            None if leftover.is_empty() => Ok(()),
            None => Err(self.mismatch(value)),
        }
    }

    fn bind_dict(
        &self,
        entries: &[DictPatternEntry],
        scope: &Scope,
        value: &Value,
        out: &mut Bindings,
    ) -> Result<(), EvalError> {
        let dict = match value {
            Value::Dict(dict) => dict.clone(),
            v if v.is_none() => BTreeMap::new(),
            _ => return Err(self.mismatch(value)),
        };
        let mut leftover = dict.clone();
        let mut extra = None;
        for entry in entries {
            let key = match &entry.key {
                Some(key) => eval::eval(key, scope)?,
                None => {
                    extra = entry.pattern.pattern.as_deref();
                    continue;
                }
            };
            leftover.remove(&key);
            self.bind_slot(&entry.pattern, dict.get(&key), scope, value, out)?;
        }
        match extra {
            Some(pattern) => pattern.bind_into(scope, &Value::Dict(leftover), out),
            None if leftover.is_empty() => Ok(()),
            None => Err(self.mismatch(value)),
        }
    }

    fn bind_set(
        &self,
        elements: &[Pattern],
        scope: &Scope,
        value: &Value,
        out: &mut Bindings,
    ) -> Result<(), EvalError> {
        let mut leftover: BTreeSet<Value> = value
            .as_set()
            .map_err(|_| self.mismatch(value))?
            .clone();
        let mut extra = None;
        for element in elements {
            match element {
                Pattern::Extra(_) => extra = Some(element),
                Pattern::Expr(expr) if expr.as_ident().is_none() => {
                    let member = eval::eval(expr, scope)?;
                    if !leftover.remove(&member) {
                        return Err(self.mismatch(value));
                    }
                }
                other => {
                    return Err(EvalError::Unsupported(format!(
                        "set pattern element {}",
                        other
                    )))
                }
            }
        }
        match extra {
            Some(pattern) => pattern.bind_into(scope, &Value::Set(leftover), out),
            None if leftover.is_empty() => Ok(()),
            None => Err(self.mismatch(value)),
        }
    }
}

/// Накопитель привязок: одно имя не может получить два разных значения
#[derive(Default)]
struct Bindings {
    names: BTreeMap<String, Value>,
}

impl Bindings {
    fn bind(&mut self, name: &str, value: Value, pattern: &Pattern) -> Result<(), EvalError> {
        match self.names.get(name) {
            Some(existing) if *existing != value => Err(EvalError::PatternMismatch {
                pattern: pattern.to_string(),
                value: format!("{} (already bound to {})", value, existing),
            }),
            _ => {
                self.names.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    fn into_scope(self) -> Scope {
        self.names.into_iter().collect()
    }
}

impl fmt::Display for FallbackPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pattern) = &self.pattern {
            write!(f, "{}", pattern)?;
        }
        if let Some(fallback) = &self.fallback {
            write!(f, ":{}", fallback)?;
        }
        Ok(())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Expr(expr) => write!(f, "{}", expr),
            Pattern::Exprs(exprs) => {
                let parts: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", parts.join(" | "))
            }
            Pattern::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| match item.fallback {
                        Some(_) => format!("{}?{}", pattern_text(item), fallback_text(item)),
                        None => item.to_string(),
                    })
                    .collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Pattern::Tuple(attrs) => {
                let parts: Vec<String> = attrs
                    .iter()
                    .map(|attr| {
                        let body = pattern_text(&attr.pattern);
                        let tail = if attr.pattern.fallback.is_some() { "?" } else { "" };
                        if attr.pattern.is_extra() || (attr.name == body && tail.is_empty()) {
                            body
                        } else {
                            format!(
                                "{}{}: {}{}",
                                format_attr(&attr.name),
                                tail,
                                body,
                                fallback_text(&attr.pattern)
                            )
                        }
                    })
                    .collect();
                write!(f, "({})", parts.join(", "))
            }
            Pattern::Dict(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|entry| match &entry.key {
                        None => entry.pattern.to_string(),
                        Some(key) => {
                            let tail = if entry.pattern.fallback.is_some() { "?" } else { "" };
                            format!(
                                "{}{}: {}{}",
                                key,
                                tail,
                                pattern_text(&entry.pattern),
                                fallback_text(&entry.pattern)
                            )
                        }
                    })
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Pattern::Set(elements) => {
                let parts: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Pattern::Extra(Some(name)) => write!(f, "...{}", name),
            Pattern::Extra(None) => write!(f, "..."),
        }
    }
}

fn pattern_text(item: &FallbackPattern) -> String {
    item.pattern
        .as_ref()
        .map(|p| p.to_string())
        .unwrap_or_default()
}

fn fallback_text(item: &FallbackPattern) -> String {
    item.fallback
        .as_ref()
        .map(|e| format!(":{}", e))
        .unwrap_or_default()
}
