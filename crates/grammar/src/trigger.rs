//! Parser for the `p-trigger` attribute: a comma-separated list of
//! `EVENT [filter] modifier*` clauses. Commas inside `[...]` do not split.

use crate::scanner::{GrammarError, Scanner};
use crate::types::{ParsedTrigger, ParsedTriggerEvent, TriggerModifiers};

pub fn parse_trigger(input: &str) -> Result<ParsedTrigger, GrammarError> {
    let mut events = Vec::new();
    for part in split_clauses(input) {
        events.push(parse_clause(&part)?);
    }
    Ok(ParsedTrigger { events })
}

fn split_clauses(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in input.chars() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if ch == ',' && depth == 0 {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn parse_clause(input: &str) -> Result<ParsedTriggerEvent, GrammarError> {
    let mut scanner = Scanner::new(input);
    scanner.skip_whitespace();

    let name;
    let mut is_polling = false;
    let mut polling_interval_ms = None;

    if scanner.match_word("every") {
        is_polling = true;
        scanner.skip_whitespace();
        polling_interval_ms = Some(parse_time_value(&mut scanner)?);
        name = "every".to_string();
    } else {
        name = scanner
            .read_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
            .to_string();
    }

    let filter = if scanner.peek() == Some('[') {
        Some(scanner.read_balanced('[', ']'))
    } else {
        None
    };

    let mut modifiers = TriggerModifiers::default();
    let mut from = None;

    while !scanner.is_at_end() {
        scanner.skip_whitespace();
        if scanner.is_at_end() {
            break;
        }
        if scanner.match_word("once") {
            modifiers.once = true;
        } else if scanner.match_word("changed") {
            modifiers.changed = true;
        } else if scanner.match_word("consume") {
            modifiers.consume = true;
        } else if scanner.match_word("debounce") {
            scanner.skip_whitespace();
            modifiers.debounce_ms = Some(parse_time_value(&mut scanner)?);
        } else if scanner.match_word("throttle") {
            scanner.skip_whitespace();
            modifiers.throttle_ms = Some(parse_time_value(&mut scanner)?);
        } else if scanner.match_word("delay") {
            scanner.skip_whitespace();
            modifiers.delay_ms = Some(parse_time_value(&mut scanner)?);
        } else if scanner.match_word("from") {
            scanner.skip_whitespace();
            let rest = scanner.remaining().trim();
            if !rest.is_empty() {
                from = Some(rest.to_string());
            }
            break; // `from` consumes the remainder of the clause
        } else {
            break;
        }
    }

    Ok(ParsedTriggerEvent {
        name,
        is_polling,
        polling_interval_ms,
        filter,
        modifiers,
        from,
    })
}

/// Numeric literal with an optional unit: `s` multiplies by 1000, `ms` or no
/// unit is milliseconds.
fn parse_time_value(scanner: &mut Scanner) -> Result<u64, GrammarError> {
    let num = scanner
        .read_while(|c| c.is_ascii_digit() || c == '.')
        .to_string();
    if num.is_empty() {
        return Err(scanner.error("Expected time value"));
    }
    let value: f64 = num
        .parse()
        .map_err(|_| scanner.error("Invalid time value"))?;
    let unit = scanner.read_while(|c| c.is_ascii_lowercase()).to_string();
    let ms = match unit.as_str() {
        "s" => value * 1000.0,
        _ => value,
    };
    Ok(ms.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(input: &str) -> ParsedTriggerEvent {
        let parsed = parse_trigger(input).unwrap();
        assert_eq!(parsed.events.len(), 1, "expected one clause in {input:?}");
        parsed.events.into_iter().next().unwrap()
    }

    #[test]
    fn parses_a_bare_event() {
        let ev = one("click");
        assert_eq!(ev.name, "click");
        assert!(!ev.is_polling);
        assert!(!ev.modifiers.once);
    }

    #[test]
    fn parses_keyword_modifiers() {
        let ev = one("click once consume");
        assert!(ev.modifiers.once);
        assert!(ev.modifiers.consume);
        assert!(!ev.modifiers.changed);
    }

    #[test]
    fn parses_timing_modifiers() {
        let ev = one("input changed debounce 300ms");
        assert!(ev.modifiers.changed);
        assert_eq!(ev.modifiers.debounce_ms, Some(300));

        let ev = one("scroll throttle 2s");
        assert_eq!(ev.modifiers.throttle_ms, Some(2000));

        let ev = one("click delay 500");
        assert_eq!(ev.modifiers.delay_ms, Some(500));
    }

    #[test]
    fn seconds_and_fractions_convert_to_ms() {
        let ev = one("every 1.5s");
        assert!(ev.is_polling);
        assert_eq!(ev.polling_interval_ms, Some(1500));
    }

    #[test]
    fn parses_filter_expression() {
        let ev = one("click[ctrlKey && shiftKey]");
        assert_eq!(ev.filter.as_deref(), Some("ctrlKey && shiftKey"));
    }

    #[test]
    fn from_consumes_the_rest_of_the_clause() {
        let ev = one("click from #sidebar .btn");
        assert_eq!(ev.from.as_deref(), Some("#sidebar .btn"));
    }

    #[test]
    fn commas_split_clauses_but_not_inside_filters() {
        let parsed = parse_trigger("click once, input changed").unwrap();
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(parsed.events[0].name, "click");
        assert_eq!(parsed.events[1].name, "input");

        let parsed = parse_trigger("keyup[key == 'a' || key == ','] debounce 100").unwrap();
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(
            parsed.events[0].filter.as_deref(),
            Some("key == 'a' || key == ','")
        );
        assert_eq!(parsed.events[0].modifiers.debounce_ms, Some(100));
    }

    #[test]
    fn missing_polling_interval_is_an_error() {
        assert!(parse_trigger("every").is_err());
    }
}
