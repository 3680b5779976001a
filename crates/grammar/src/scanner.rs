use std::fmt;

/// Positional error for malformed attribute text. `position` is a char
/// offset into the trimmed input so the caret lines up in diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError {
    pub message: String,
    pub input: String,
    pub position: usize,
    pub hint: Option<String>,
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pulse parse error: {}", self.message)?;
        writeln!(f, "  {}", self.input)?;
        write!(f, "  {}^", " ".repeat(self.position))?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  Hint: {hint}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GrammarError {}

/// Primitive cursor over a trimmed string. All grammar parsers consume one
/// of these; backtracking is explicit position save/restore.
pub struct Scanner {
    input: String,
    pos: usize, // byte offset, always a char boundary
}

impl Scanner {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.trim().to_string(),
            pos: 0,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    pub fn match_str(&mut self, s: &str) -> bool {
        if self.input[self.pos..].starts_with(s) {
            self.pos += s.len();
            return true;
        }
        false
    }

    /// Match `word` only when followed by end of input, whitespace, or a
    /// structural delimiter, so `GET` does not match inside `GETAWAY`.
    pub fn match_word(&mut self, word: &str) -> bool {
        if !self.input[self.pos..].starts_with(word) {
            return false;
        }
        let after = self.input[self.pos + word.len()..].chars().next();
        match after {
            None => {}
            Some(c) if c.is_whitespace() || matches!(c, '>' | '{' | ':' | '.' | '[' | ']') => {}
            Some(_) => return false,
        }
        self.pos += word.len();
        true
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(self.input.is_char_boundary(pos));
        self.pos = pos;
    }

    pub fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> &str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.input[start..self.pos]
    }

    pub fn read_until(&mut self, delimiters: &[char]) -> &str {
        self.read_while(|c| !delimiters.contains(&c))
    }

    /// Read the content of a balanced `open`..`close` pair, consuming both
    /// delimiters. Supports nesting. Returns the inner content; an unclosed
    /// pair yields everything to end of input.
    pub fn read_balanced(&mut self, open: char, close: char) -> String {
        if self.peek() != Some(open) {
            return String::new();
        }
        self.advance();
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.peek() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            self.pos += c.len_utf8();
        }
        let content = self.input[start..self.pos].to_string();
        if depth == 0 {
            self.advance(); // consume close
        }
        content
    }

    pub fn expect(&mut self, s: &str) -> Result<(), GrammarError> {
        if self.match_str(s) {
            return Ok(());
        }
        Err(self.error(&format!("Expected '{s}'")))
    }

    pub fn error(&self, message: &str) -> GrammarError {
        self.error_with_hint(message, None)
    }

    pub fn error_with_hint(&self, message: &str, hint: Option<&str>) -> GrammarError {
        GrammarError {
            message: message.to_string(),
            input: self.input.clone(),
            position: self.input[..self.pos].chars().count(),
            hint: hint.map(|h| h.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_input_and_tracks_position() {
        let mut s = Scanner::new("  abc  ");
        assert_eq!(s.input(), "abc");
        assert_eq!(s.advance(), Some('a'));
        assert_eq!(s.position(), 1);
        assert!(!s.is_at_end());
    }

    #[test]
    fn match_word_requires_boundary() {
        let mut s = Scanner::new("GETAWAY /x");
        assert!(!s.match_word("GET"));
        let mut s = Scanner::new("GET /x");
        assert!(s.match_word("GET"));
        let mut s = Scanner::new("GET>rest");
        assert!(s.match_word("GET"));
    }

    #[test]
    fn read_balanced_supports_nesting() {
        let mut s = Scanner::new("(a(b)c) tail");
        assert_eq!(s.read_balanced('(', ')'), "a(b)c");
        s.skip_whitespace();
        assert_eq!(s.remaining(), "tail");
    }

    #[test]
    fn read_balanced_unclosed_consumes_rest() {
        let mut s = Scanner::new("{a{b}");
        assert_eq!(s.read_balanced('{', '}'), "a{b}");
        assert!(s.is_at_end());
    }

    #[test]
    fn error_points_at_offending_char() {
        let mut s = Scanner::new("ab?");
        s.advance();
        s.advance();
        let err = s.error("bad char");
        assert_eq!(err.position, 2);
        let rendered = err.to_string();
        assert!(rendered.contains("  ab?"));
        assert!(rendered.contains("  ^"));
    }
}
