//! Restricted expression evaluator for trigger filters.
//!
//! Replaces dynamic code evaluation with a small boolean/arithmetic grammar
//! over named bindings supplied by the triggering event:
//!
//! ```text
//! or    := and ("||" and)*
//! and   := unary ("&&" unary)*
//! unary := "!" unary | cmp
//! cmp   := sum (("==" | "!=" | "<=" | ">=" | "<" | ">") sum)?
//! sum   := term (("+" | "-") term)*
//! term  := primary (("*" | "/") primary)*
//! primary := number | string | true | false | ident | "(" or ")"
//! ```
//!
//! Unknown identifiers evaluate to `false`, matching the forgiving behavior
//! expected of event filters.

use crate::scanner::{GrammarError, Scanner};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
        }
    }

    fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}

pub type Bindings = HashMap<String, Value>;

pub fn evaluate(expression: &str, bindings: &Bindings) -> Result<bool, GrammarError> {
    let mut scanner = Scanner::new(expression);
    let value = parse_or(&mut scanner, bindings)?;
    scanner.skip_whitespace();
    if !scanner.is_at_end() {
        return Err(scanner.error("Unexpected trailing input in filter expression"));
    }
    Ok(value.truthy())
}

fn parse_or(s: &mut Scanner, b: &Bindings) -> Result<Value, GrammarError> {
    let mut left = parse_and(s, b)?;
    loop {
        s.skip_whitespace();
        if !s.match_str("||") {
            return Ok(left);
        }
        let right = parse_and(s, b)?;
        left = Value::Bool(left.truthy() || right.truthy());
    }
}

fn parse_and(s: &mut Scanner, b: &Bindings) -> Result<Value, GrammarError> {
    let mut left = parse_unary(s, b)?;
    loop {
        s.skip_whitespace();
        if !s.match_str("&&") {
            return Ok(left);
        }
        let right = parse_unary(s, b)?;
        left = Value::Bool(left.truthy() && right.truthy());
    }
}

fn parse_unary(s: &mut Scanner, b: &Bindings) -> Result<Value, GrammarError> {
    s.skip_whitespace();
    if s.peek() == Some('!') {
        let saved = s.position();
        s.advance();
        // leave "!=" for the comparison level
        if s.peek() == Some('=') {
            s.set_position(saved);
        } else {
            let inner = parse_unary(s, b)?;
            return Ok(Value::Bool(!inner.truthy()));
        }
    }
    parse_cmp(s, b)
}

fn parse_cmp(s: &mut Scanner, b: &Bindings) -> Result<Value, GrammarError> {
    let left = parse_sum(s, b)?;
    s.skip_whitespace();
    let op = if s.match_str("==") {
        "=="
    } else if s.match_str("!=") {
        "!="
    } else if s.match_str("<=") {
        "<="
    } else if s.match_str(">=") {
        ">="
    } else if s.peek() == Some('<') {
        s.advance();
        "<"
    } else if s.peek() == Some('>') {
        s.advance();
        ">"
    } else {
        return Ok(left);
    };
    let right = parse_sum(s, b)?;
    let result = match op {
        "==" => left.loose_eq(&right),
        "!=" => !left.loose_eq(&right),
        _ => {
            let (Value::Num(l), Value::Num(r)) = (&left, &right) else {
                return Err(s.error("Relational comparison requires numbers"));
            };
            match op {
                "<" => l < r,
                "<=" => l <= r,
                ">" => l > r,
                ">=" => l >= r,
                _ => unreachable!(),
            }
        }
    };
    Ok(Value::Bool(result))
}

fn parse_sum(s: &mut Scanner, b: &Bindings) -> Result<Value, GrammarError> {
    let mut left = parse_term(s, b)?;
    loop {
        s.skip_whitespace();
        let op = match s.peek() {
            Some('+') => '+',
            Some('-') => '-',
            _ => return Ok(left),
        };
        s.advance();
        let right = parse_term(s, b)?;
        let (Value::Num(l), Value::Num(r)) = (&left, &right) else {
            return Err(s.error("Arithmetic requires numbers"));
        };
        left = Value::Num(if op == '+' { l + r } else { l - r });
    }
}

fn parse_term(s: &mut Scanner, b: &Bindings) -> Result<Value, GrammarError> {
    let mut left = parse_primary(s, b)?;
    loop {
        s.skip_whitespace();
        let op = match s.peek() {
            Some('*') => '*',
            Some('/') => '/',
            _ => return Ok(left),
        };
        s.advance();
        let right = parse_primary(s, b)?;
        let (Value::Num(l), Value::Num(r)) = (&left, &right) else {
            return Err(s.error("Arithmetic requires numbers"));
        };
        left = Value::Num(if op == '*' { l * r } else { l / r });
    }
}

fn parse_primary(s: &mut Scanner, b: &Bindings) -> Result<Value, GrammarError> {
    s.skip_whitespace();
    match s.peek() {
        Some('(') => {
            s.advance();
            let value = parse_or(s, b)?;
            s.skip_whitespace();
            s.expect(")")?;
            Ok(value)
        }
        Some(q @ ('\'' | '"')) => {
            s.advance();
            let mut out = String::new();
            while let Some(c) = s.peek() {
                if c == q {
                    break;
                }
                if c == '\\' {
                    s.advance();
                    if let Some(escaped) = s.advance() {
                        out.push(escaped);
                    }
                } else {
                    s.advance();
                    out.push(c);
                }
            }
            if s.peek() != Some(q) {
                return Err(s.error("Unterminated string in filter expression"));
            }
            s.advance();
            Ok(Value::Str(out))
        }
        Some(c) if c.is_ascii_digit() => {
            let num = s.read_while(|c| c.is_ascii_digit() || c == '.').to_string();
            num.parse::<f64>()
                .map(Value::Num)
                .map_err(|_| s.error("Invalid number in filter expression"))
        }
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            let ident = s
                .read_while(|c| c.is_ascii_alphanumeric() || c == '_')
                .to_string();
            match ident.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Ok(b.get(&ident).cloned().unwrap_or(Value::Bool(false))),
            }
        }
        _ => Err(s.error("Expected value in filter expression")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> Bindings {
        let mut b = Bindings::new();
        b.insert("ctrlKey".to_string(), Value::Bool(true));
        b.insert("shiftKey".to_string(), Value::Bool(false));
        b.insert("key".to_string(), Value::Str("Enter".to_string()));
        b.insert("value".to_string(), Value::Str("abc".to_string()));
        b.insert("count".to_string(), Value::Num(3.0));
        b
    }

    #[test]
    fn evaluates_boolean_bindings() {
        let b = bindings();
        assert!(evaluate("ctrlKey", &b).unwrap());
        assert!(!evaluate("shiftKey", &b).unwrap());
        assert!(evaluate("ctrlKey && !shiftKey", &b).unwrap());
        assert!(evaluate("shiftKey || ctrlKey", &b).unwrap());
    }

    #[test]
    fn evaluates_comparisons() {
        let b = bindings();
        assert!(evaluate("key == 'Enter'", &b).unwrap());
        assert!(evaluate("key != 'Escape'", &b).unwrap());
        assert!(evaluate("count >= 3", &b).unwrap());
        assert!(evaluate("count + 1 > 3.5", &b).unwrap());
        assert!(!evaluate("count * 2 < 6", &b).unwrap());
    }

    #[test]
    fn unknown_identifiers_are_false() {
        let b = bindings();
        assert!(!evaluate("metaKey", &b).unwrap());
        assert!(evaluate("!metaKey", &b).unwrap());
    }

    #[test]
    fn parenthesized_groups() {
        let b = bindings();
        assert!(evaluate("(shiftKey || ctrlKey) && key == 'Enter'", &b).unwrap());
    }

    #[test]
    fn malformed_expressions_error_with_position() {
        let b = bindings();
        assert!(evaluate("ctrlKey &&", &b).is_err());
        assert!(evaluate("'unterminated", &b).is_err());
        assert!(evaluate("count < 'abc'", &b).is_err());
        assert!(evaluate("a b", &b).is_err());
    }
}
