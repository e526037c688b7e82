// Литералы: идентификаторы, строки, числа, символы и строки с подстановками

use crate::common::error::{abort, CompileError};
use crate::compiler::context::CompilationContext;
use crate::compiler::expr::{child, compile_expr, token};
use crate::rel::expr::{Expr, XStrPart};
use crate::rel::value::Value;
use crate::syntax::ast::Node;

/// `true`/`false` становятся булевыми литералами, остальное ссылкой на имя
pub fn compile_ident(ident: &Node) -> Expr {
    let ident = token(ident);
    match ident.text() {
        "true" => Expr::literal(ident.span(), Value::Bool(true)),
        "false" => Expr::literal(ident.span(), Value::Bool(false)),
        name => Expr::ident(ident.span(), name),
    }
}

pub fn compile_string(s: &Node) -> Expr {
    let s = token(s);
    Expr::literal(s.span(), Value::string(parse_string(s.text())))
}

pub fn compile_number(num: &Node) -> Expr {
    let num = token(num);
    match num.text().parse::<f64>() {
        Ok(n) => Expr::literal(num.span(), Value::Number(n)),
        Err(err) => abort(CompileError::malformed(
            num.span(),
            format!("NUM {:?}: {}", num.text(), err),
        )),
    }
}

/// `%c` это код первого символа после `%`, с учётом экранирования
pub fn compile_char(c: &Node) -> Expr {
    let c = token(c);
    let text = c.text();
    let body = text.get(1..).unwrap_or("");
    match unescape(body).chars().next() {
        Some(ch) => Expr::literal(c.span(), Value::Number(f64::from(u32::from(ch)))),
        None => abort(CompileError::malformed(
            c.span(),
            format!("CHAR {:?} is empty", text),
        )),
    }
}

pub fn compile_xstr(
    ctx: &CompilationContext,
    node: &Node,
    xstr: &Node,
) -> Result<Expr, CompileError> {
    let mut parts = Vec::new();
    for part in xstr.many("part") {
        if let Some(fragment) = part.one("fragment") {
            parts.push(XStrPart::Text(unescape(token(fragment).text())));
        } else {
            let sexpr = child(part, "sexpr");
            let expr = compile_expr(ctx, child(sexpr, "expr"))?;
            let format = sexpr
                .one("fmt")
                .map(|fmt| token(fmt).text().trim_start_matches(':').to_string())
                .filter(|fmt| !fmt.is_empty());
            parts.push(XStrPart::Expr { expr, format });
        }
    }
    Ok(Expr::XStr {
        parts,
        span: node.span().clone(),
    })
}

/// Строковый литерал в кавычках `'…'`, `"…"` или обратных `` `…` ``
pub fn parse_string(raw: &str) -> String {
    let quote = match raw.chars().next() {
        Some(q @ ('\'' | '"' | '`')) => q,
        _ => return raw.to_string(),
    };
    let body = &raw[1..];
    let body = body.strip_suffix(quote).unwrap_or(body);
    if quote == '`' {
        // в сырой строке удвоенная кавычка означает одну
        return body.replace("``", "`");
    }
    unescape(body)
}

/// Разбор escape-последовательностей; неизвестные оставляют символ как есть
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            Some('a') => '\u{07}',
            Some('b') => '\u{08}',
            Some('f') => '\u{0c}',
            Some('v') => '\u{0b}',
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().take(width).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(ch) if digits.len() == width => {
                        for _ in 0..width {
                            chars.next();
                        }
                        ch
                    }
                    _ => kind,
                }
            }
            Some(other) => other,
            None => '\\',
        };
        out.push(escaped);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_quotes() {
        assert_eq!(parse_string("'abc'"), "abc");
        assert_eq!(parse_string(r#""a\"b""#), "a\"b");
        assert_eq!(parse_string(r"'a\nb'"), "a\nb");
        assert_eq!(parse_string("`a``b\\n`"), "a`b\\n");
        assert_eq!(parse_string(r"'\x41é'"), "Aé");
    }

    #[test]
    fn test_unescape_keeps_unknown_escapes() {
        assert_eq!(unescape(r"\q\\"), "q\\");
        assert_eq!(unescape(r"\xZZ"), "xZZ");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }
}
