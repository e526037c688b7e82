// Лексическая область видимости вычислителя

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::common::error::EvalError;
use crate::rel::value::Value;

/// Неизменяемая область видимости. `with` возвращает новую, старая не меняется.
#[derive(Clone, Default)]
pub struct Scope {
    bindings: Arc<BTreeMap<String, Value>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(&self, name: impl Into<String>, value: Value) -> Scope {
        let mut bindings = (*self.bindings).clone();
        bindings.insert(name.into(), value);
        Scope {
            bindings: Arc::new(bindings),
        }
    }

    /// Добавляет все привязки из `other` (они перекрывают текущие)
    pub fn update(&self, other: &Scope) -> Scope {
        if other.bindings.is_empty() {
            return self.clone();
        }
        let mut bindings = (*self.bindings).clone();
        for (k, v) in other.bindings.iter() {
            bindings.insert(k.clone(), v.clone());
        }
        Scope {
            bindings: Arc::new(bindings),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        self.get(name)
            .cloned()
            .ok_or_else(|| EvalError::Unbound(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Scope {
            bindings: Arc::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.bindings.iter()).finish()
    }
}
