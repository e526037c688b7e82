// Комбинаторы неподвижной точки для рекурсивных привязок

use lazy_static::lazy_static;

use crate::common::error::EvalError;
use crate::common::span::Span;
use crate::rel::expr::Expr;
use crate::rel::value::Value;

lazy_static! {
    static ref FIX: Value = Value::native("fix", fix);
    static ref FIXT: Value = Value::native("fixt", fixt);
}

/// Пара (fix, fixt): для рекурсивной функции и для кортежа взаимно рекурсивных функций
pub fn fix_funcs() -> (Expr, Expr) {
    let span = Span::unknown();
    (
        Expr::literal(&span, FIX.clone()),
        Expr::literal(&span, FIXT.clone()),
    )
}

/// fix(f) = x => f(fix(f))(x). Развёртка ленивая, поэтому не зацикливается.
fn fix(f: &Value) -> Result<Value, EvalError> {
    let f = f.clone();
    Ok(Value::native("fix(f)", move |x| {
        let this = fix(&f)?;
        f.call(&this)?.call(x)
    }))
}

/// fixt(f): кортеж t, такой что t = f(t).
/// Имена атрибутов узнаём пробным вызовом f на пустом кортеже.
fn fixt(f: &Value) -> Result<Value, EvalError> {
    let probe = f.call(&Value::tuple(Vec::<(String, Value)>::new()))?;
    let attrs = match probe {
        Value::Tuple(attrs) => attrs,
        other => {
            return Err(EvalError::type_error(format!(
                "fixt: recursive binding must produce a tuple, got {} {}",
                other.type_name(),
                other
            )))
        }
    };
    let mut out = Vec::with_capacity(attrs.len());
    for (name, value) in attrs {
        let lazy = match value {
            Value::Closure(_) | Value::Native(_) => {
                let f = f.clone();
                let attr = name.clone();
                Value::native(format!("fixt.{}", name), move |x| {
                    let this = fixt(&f)?;
                    f.call(&this)?.get_attr(&attr)?.call(x)
                })
            }
            other => other,
        };
        out.push((name, lazy));
    }
    Ok(Value::tuple(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rel::eval::evaluate;
    use crate::rel::expr::BinaryOp;
    use crate::rel::pattern::Pattern;

    #[test]
    fn test_fix_builds_recursive_function() {
        // let rec fact = \n 1 if n <= 1 else n * fact(n - 1)
        let span = Span::detached("t", "fact");
        let n = || Expr::ident(&span, "n");
        let num = |x: f64| Expr::literal(&span, Value::Number(x));
        let tables = crate::compiler::operators::OperatorTables::global();
        let body = Expr::IfElse {
            if_true: Box::new(num(1.0)),
            cond: Box::new(Expr::Compare {
                args: vec![n(), num(1.0)],
                ops: vec![tables.compare("<=", &span)],
                span: span.clone(),
            }),
            if_false: Box::new(Expr::binary(
                &span,
                BinaryOp::Mul,
                n(),
                Expr::call(
                    &span,
                    Expr::ident(&span, "fact"),
                    Expr::binary(&span, BinaryOp::Sub, n(), num(1.0)),
                ),
            )),
            span: span.clone(),
        };
        let (fix, fixt) = fix_funcs();
        let rec = Expr::Recursion {
            name: "fact".to_string(),
            base: Box::new(Expr::function(&span, Pattern::Expr(n()), body)),
            fix: Box::new(fix),
            fixt: Box::new(fixt),
            span: span.clone(),
        };
        let call = Expr::call(&span, rec, num(5.0));
        assert_eq!(evaluate(&call).unwrap(), Value::Number(120.0));
    }
}
