//! Parser for the `p-request` attribute:
//!
//! ```text
//! {headers}? METHOD? URL {body}? > target.behavior? :modifier*
//! ```
//!
//! Every segment except the URL is optional. A leading brace group is only
//! treated as headers when what follows it still looks like a request;
//! otherwise the cursor backtracks and the group is left for later segments.

use crate::body::parse_body_content;
use crate::modifier::parse_modifiers;
use crate::scanner::{GrammarError, Scanner};
use crate::types::{HttpMethod, ParsedRequest, SwapBehavior, Target};

pub fn parse_request(input: &str) -> Result<ParsedRequest, GrammarError> {
    let mut scanner = Scanner::new(input);
    scanner.skip_whitespace();

    let mut headers = Vec::new();
    let mut method = HttpMethod::Get;
    let mut url = String::new();
    let mut body = None;
    let mut target = Target::default();
    let mut modifiers = Vec::new();

    // Leading {headers}, disambiguated by what follows.
    if scanner.peek() == Some('{') {
        let saved = scanner.position();
        let content = scanner.read_balanced('{', '}');
        scanner.skip_whitespace();
        if looks_like_method_or_url(scanner.remaining().trim()) {
            headers = parse_header_content(&content)?;
        } else {
            scanner.set_position(saved);
        }
    }

    scanner.skip_whitespace();

    for m in HttpMethod::ALL {
        if scanner.match_word(m.as_str()) {
            method = m;
            scanner.skip_whitespace();
            break;
        }
    }

    if matches!(scanner.peek(), Some('/') | Some('h')) {
        url = read_url(&mut scanner);
    }
    if url.is_empty() {
        let rest = scanner.remaining().trim();
        if !rest.is_empty()
            && !rest.starts_with('>')
            && !rest.starts_with(':')
            && !rest.starts_with('{')
        {
            url = read_url(&mut scanner);
        }
        if url.is_empty() {
            return Err(scanner.error_with_hint(
                "Expected URL path",
                Some("Add a URL path like \"/api/data\""),
            ));
        }
    }

    scanner.skip_whitespace();

    if scanner.peek() == Some('{') {
        let content = scanner.read_balanced('{', '}');
        body = Some(parse_body_content(&content)?);
    }

    scanner.skip_whitespace();

    if scanner.peek() == Some('>') {
        scanner.advance();
        scanner.skip_whitespace();
        target = parse_target_expression(&mut scanner);
    }

    scanner.skip_whitespace();

    if scanner.peek() == Some(':') {
        modifiers = parse_modifiers(&mut scanner)?;
    }

    Ok(ParsedRequest {
        headers,
        method,
        url,
        body,
        target,
        modifiers,
    })
}

fn read_url(scanner: &mut Scanner) -> String {
    scanner
        .read_while(|c| !c.is_whitespace() && !matches!(c, '{' | '>' | ':'))
        .to_string()
}

/// One token up to the next modifier, split on a trailing `.behavior` suffix.
/// Spaces stay inside the token so `closest tr.outer` parses as a whole.
fn parse_target_expression(scanner: &mut Scanner) -> Target {
    let raw = scanner
        .read_while(|c| (c != ':' && !c.is_whitespace()) || c == ' ')
        .trim()
        .to_string();

    for behavior in SwapBehavior::ALL {
        let suffix = format!(".{}", behavior.as_str());
        if let Some(selector) = raw.strip_suffix(&suffix) {
            let selector = selector.trim();
            return Target {
                selector: if selector.is_empty() {
                    "this".to_string()
                } else {
                    selector.to_string()
                },
                behavior,
            };
        }
    }

    Target {
        selector: if raw.is_empty() { "this".to_string() } else { raw },
        behavior: SwapBehavior::Replace,
    }
}

fn looks_like_method_or_url(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    for m in HttpMethod::ALL {
        if s.strip_prefix(m.as_str())
            .is_some_and(|rest| rest.starts_with(' ') || rest.starts_with('\t'))
        {
            return true;
        }
    }
    s.starts_with('/') || s.starts_with("http")
}

fn parse_header_content(content: &str) -> Result<Vec<(String, String)>, GrammarError> {
    let mut result = Vec::new();
    let mut scanner = Scanner::new(content);

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

        match result.iter_mut().find(|(k, _)| *k == key) {
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

/// Quoted string with backslash escapes, or a bare token up to a delimiter.
pub(crate) fn read_quoted(scanner: &mut Scanner) -> String {
    let quote = match scanner.peek() {
        Some(q @ ('\'' | '"')) => q,
        _ => {
            return scanner
                .read_while(|c| c != ',' && c != ':' && !c.is_whitespace())
                .to_string();
        }
    };
    scanner.advance();
    let mut result = String::new();
    while let Some(c) = scanner.peek() {
        if c == quote {
            break;
        }
        if c == '\\' {
            scanner.advance();
            if let Some(escaped) = scanner.advance() {
                result.push(escaped);
            }
        } else {
            scanner.advance();
            result.push(c);
        }
    }
    if scanner.peek() == Some(quote) {
        scanner.advance();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParsedBody, SwapBehavior};

    #[test]
    fn parses_a_simple_url() {
        let r = parse_request("/users").unwrap();
        assert_eq!(r.method, HttpMethod::Get);
        assert_eq!(r.url, "/users");
        assert_eq!(r.target.selector, "this");
        assert_eq!(r.target.behavior, SwapBehavior::Replace);
    }

    #[test]
    fn parses_every_method() {
        for m in HttpMethod::ALL {
            let r = parse_request(&format!("{} /api", m.as_str())).unwrap();
            assert_eq!(r.method, m);
            assert_eq!(r.url, "/api");
        }
    }

    #[test]
    fn parses_target_and_behavior() {
        let r = parse_request("GET /users > #list.append").unwrap();
        assert_eq!(r.target.selector, "#list");
        assert_eq!(r.target.behavior, SwapBehavior::Append);

        let r = parse_request("GET /users > #list").unwrap();
        assert_eq!(r.target.selector, "#list");
        assert_eq!(r.target.behavior, SwapBehavior::Replace);
    }

    #[test]
    fn parses_every_behavior_suffix() {
        for b in SwapBehavior::ALL {
            let r = parse_request(&format!("GET /a > #el.{}", b.as_str())).unwrap();
            assert_eq!(r.target.selector, "#el");
            assert_eq!(r.target.behavior, b);
        }
    }

    #[test]
    fn target_with_spaces_keeps_closest_prefix() {
        let r = parse_request("DELETE /item/1 > closest tr.outer").unwrap();
        assert_eq!(r.target.selector, "closest tr");
        assert_eq!(r.target.behavior, SwapBehavior::Outer);
    }

    #[test]
    fn parses_leading_headers() {
        let r = parse_request("{'X-CSRF': 'token', 'Accept': 'text/html'} POST /users").unwrap();
        assert_eq!(r.method, HttpMethod::Post);
        assert_eq!(
            r.headers,
            vec![
                ("X-CSRF".to_string(), "token".to_string()),
                ("Accept".to_string(), "text/html".to_string()),
            ]
        );
    }

    #[test]
    fn leading_brace_backtracks_when_not_headers() {
        // No method/url after the brace group: the group is not headers, and
        // with nothing else present the parse fails on the missing URL.
        let err = parse_request("{'name': 'x'}").unwrap_err();
        assert!(err.message.contains("Expected URL path"));
    }

    #[test]
    fn parses_json_body_after_url() {
        let r = parse_request("POST /users {'name': 'John'}").unwrap();
        match r.body.expect("body") {
            ParsedBody::Json(pairs) => {
                assert_eq!(pairs, vec![("name".to_string(), "John".to_string())]);
            }
            other => panic!("expected json body, got {other:?}"),
        }
    }

    #[test]
    fn parses_selector_body() {
        let r = parse_request("POST /users {#form1}").unwrap();
        assert_eq!(
            r.body,
            Some(ParsedBody::Selectors(vec!["#form1".to_string()]))
        );
    }

    #[test]
    fn parses_modifiers_with_values() {
        let r = parse_request("GET /slow > #out :timeout(5000) :sync(queue)").unwrap();
        assert_eq!(r.modifiers.len(), 2);
        assert_eq!(r.modifiers[0].name, "timeout");
        assert_eq!(r.modifiers[0].value.as_deref(), Some("5000"));
        assert_eq!(r.modifiers[1].name, "sync");
        assert_eq!(r.modifiers[1].value.as_deref(), Some("queue"));
    }

    #[test]
    fn full_grammar_round_trips_structure() {
        let r = parse_request(
            "{'X-Token': 'abc'} POST /submit {only name, email} > #result.outer :confirm(Sure?)",
        )
        .unwrap();
        assert_eq!(r.method, HttpMethod::Post);
        assert_eq!(r.url, "/submit");
        assert_eq!(r.headers[0].0, "X-Token");
        assert!(matches!(r.body, Some(ParsedBody::Filter { .. })));
        assert_eq!(r.target.selector, "#result");
        assert_eq!(r.target.behavior, SwapBehavior::Outer);
        assert_eq!(r.modifiers[0].value.as_deref(), Some("Sure?"));
    }

    #[test]
    fn missing_url_is_a_positional_error() {
        let err = parse_request("GET > #list").unwrap_err();
        assert!(err.message.contains("Expected URL path"));
        assert!(err.hint.is_some());
    }
}
