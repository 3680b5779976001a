//! `:name` / `:name(value)` modifier sequences. The value is everything
//! inside one balanced parenthesis pair, nesting included.

use crate::scanner::{GrammarError, Scanner};
use crate::types::ParsedModifier;

pub fn parse_modifiers(scanner: &mut Scanner) -> Result<Vec<ParsedModifier>, GrammarError> {
    let mut modifiers = Vec::new();

    while !scanner.is_at_end() {
        scanner.skip_whitespace();
        if scanner.peek() != Some(':') {
            break;
        }
        scanner.advance();

        let name = scanner
            .read_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            .to_string();
        if name.is_empty() {
            return Err(scanner.error("Expected modifier name after \":\""));
        }

        let value = if scanner.peek() == Some('(') {
            Some(scanner.read_balanced('(', ')'))
        } else {
            None
        };

        modifiers.push(ParsedModifier { name, value });
    }

    Ok(modifiers)
}

pub fn get_modifier<'a>(modifiers: &'a [ParsedModifier], name: &str) -> Option<&'a ParsedModifier> {
    modifiers.iter().find(|m| m.name == name)
}

pub fn modifier_value<'a>(modifiers: &'a [ParsedModifier], name: &str) -> Option<&'a str> {
    get_modifier(modifiers, name)?.value.as_deref()
}

pub fn has_modifier(modifiers: &[ParsedModifier], name: &str) -> bool {
    get_modifier(modifiers, name).is_some()
}
