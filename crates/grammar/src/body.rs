//! Classifies body content from inside `{...}` by its leading token:
//! `only `/`not ` → field filter, selector-ish prefixes → selector list,
//! a quote → key/value pairs, anything else → selector list.

use crate::request::read_quoted;
use crate::scanner::{GrammarError, Scanner};
use crate::types::{FilterMode, ParsedBody};

pub fn parse_body_content(content: &str) -> Result<ParsedBody, GrammarError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(ParsedBody::Json(Vec::new()));
    }

    if let Some(rest) = trimmed.strip_prefix("only ") {
        return Ok(filter(FilterMode::Only, rest));
    }
    if let Some(rest) = trimmed.strip_prefix("not ") {
        return Ok(filter(FilterMode::Not, rest));
    }

    if starts_like_selector(trimmed) {
        return Ok(ParsedBody::Selectors(split_list(trimmed)));
    }

    if trimmed.starts_with('\'') || trimmed.starts_with('"') {
        return Ok(ParsedBody::Json(parse_pairs(trimmed)?));
    }

    Ok(ParsedBody::Selectors(split_list(trimmed)))
}

fn starts_like_selector(s: &str) -> bool {
    if s.starts_with('#') || s.starts_with('.') {
        return true;
    }
    for word in ["this", "closest", "find"] {
        if let Some(rest) = s.strip_prefix(word) {
            if rest.is_empty() || rest.starts_with(|c: char| !c.is_ascii_alphanumeric()) {
                return true;
            }
        }
    }
    false
}

fn filter(mode: FilterMode, rest: &str) -> ParsedBody {
    ParsedBody::Filter {
        mode,
        fields: split_list(rest),
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Comma-separated `quoted-or-bare : quoted-or-bare` pairs with backslash
/// escapes inside quotes.
fn parse_pairs(input: &str) -> Result<Vec<(String, String)>, GrammarError> {
    let mut result = Vec::new();
    let mut scanner = Scanner::new(input);

    while !scanner.is_at_end() {
        scanner.skip_whitespace();
        if scanner.is_at_end() {
            break;
        }
        let key = read_quoted(&mut scanner);
        scanner.skip_whitespace();
        scanner.expect(":")?;
        scanner.skip_whitespace();
        let value = read_quoted(&mut scanner);

        match result.iter_mut().find(|(k, _): &&mut (String, String)| *k == key) {
            Some((_, v)) => *v = value,
            None => result.push((key, value)),
        }

        scanner.skip_whitespace();
        if scanner.peek() == Some(',') {
            scanner.advance();
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_is_empty_json() {
        assert_eq!(parse_body_content("  ").unwrap(), ParsedBody::Json(Vec::new()));
    }

    #[test]
    fn classifies_filters() {
        let body = parse_body_content("only name, email").unwrap();
        assert_eq!(
            body,
            ParsedBody::Filter {
                mode: FilterMode::Only,
                fields: vec!["name".to_string(), "email".to_string()],
            }
        );
        let body = parse_body_content("not password").unwrap();
        assert!(matches!(body, ParsedBody::Filter { mode: FilterMode::Not, .. }));
    }

    #[test]
    fn classifies_selector_lists() {
        let body = parse_body_content("#form1, .extra").unwrap();
        assert_eq!(
            body,
            ParsedBody::Selectors(vec!["#form1".to_string(), ".extra".to_string()])
        );
        assert!(matches!(
            parse_body_content("this").unwrap(),
            ParsedBody::Selectors(_)
        ));
        assert!(matches!(
            parse_body_content("closest form").unwrap(),
            ParsedBody::Selectors(_)
        ));
    }

    #[test]
    fn quoted_pairs_become_json() {
        let body = parse_body_content("'name': 'John', 'role': 'admin'").unwrap();
        assert_eq!(
            body,
            ParsedBody::Json(vec![
                ("name".to_string(), "John".to_string()),
                ("role".to_string(), "admin".to_string()),
            ])
        );
    }

    #[test]
    fn quotes_support_escaping() {
        let body = parse_body_content(r#"'msg': 'it\'s fine'"#).unwrap();
        assert_eq!(
            body,
            ParsedBody::Json(vec![("msg".to_string(), "it's fine".to_string())])
        );
    }

    #[test]
    fn unrecognized_content_falls_back_to_selectors() {
        let body = parse_body_content("form input").unwrap();
        assert_eq!(body, ParsedBody::Selectors(vec!["form input".to_string()]));
    }

    #[test]
    fn this_prefix_words_are_not_selectors() {
        // "thistle" is not the keyword "this"
        let body = parse_body_content("thistle").unwrap();
        assert_eq!(body, ParsedBody::Selectors(vec!["thistle".to_string()]));
    }
}
