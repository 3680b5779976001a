//! Simplified HTML tokenizer with a constrained, practical tag-name character
//! set (ASCII `[A-Za-z0-9:_-]`). Server fragments are well-formed in practice;
//! full HTML5 parse-error recovery is out of scope for this engine.

use crate::entities::decode_entities;
use memchr::memchr;

#[derive(Debug)]
pub enum Token {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<(String, Option<String>)>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(String),
    Text(String),
}

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

pub fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b':' || b == b'_' || b == b'-'
}

pub fn tokenize(input: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'<' {
            let start = i;
            match memchr(b'<', &bytes[i..]) {
                Some(rel) => i += rel,
                None => i = bytes.len(),
            }
            let decoded = decode_entities(&input[start..i]);
            if !decoded.is_empty() {
                out.push(Token::Text(decoded));
            }
            continue;
        }
        if input[i..].starts_with(COMMENT_START) {
            let body_start = i + COMMENT_START.len();
            match input[body_start..].find(COMMENT_END) {
                Some(rel) => {
                    out.push(Token::Comment(input[body_start..body_start + rel].to_string()));
                    i = body_start + rel + COMMENT_END.len();
                }
                None => {
                    out.push(Token::Comment(input[body_start..].to_string()));
                    i = bytes.len();
                }
            }
            continue;
        }
        if bytes[i..].len() >= 2 && bytes[i + 1] == b'!' {
            // doctype or other declaration; take up to '>'
            let body_start = i + 2;
            let end = memchr(b'>', &bytes[body_start..])
                .map(|rel| body_start + rel)
                .unwrap_or(bytes.len());
            let body = input[body_start..end].trim();
            if body.len() >= 7 && body[..7].eq_ignore_ascii_case("doctype") {
                out.push(Token::Doctype(body[7..].trim().to_string()));
            }
            i = if end < bytes.len() { end + 1 } else { bytes.len() };
            continue;
        }
        if bytes[i..].len() >= 2 && bytes[i + 1] == b'/' {
            let name_start = i + 2;
            let mut j = name_start;
            while j < bytes.len() && is_name_byte(bytes[j]) {
                j += 1;
            }
            let name = input[name_start..j].to_ascii_lowercase();
            let end = memchr(b'>', &bytes[j..]).map(|rel| j + rel);
            match end {
                Some(end) if !name.is_empty() => {
                    out.push(Token::EndTag(name));
                    i = end + 1;
                }
                _ => {
                    // stray "</"; treat as text
                    out.push(Token::Text("</".to_string()));
                    i += 2;
                }
            }
            continue;
        }
        match scan_start_tag(input, i) {
            Some((token, next, rawtext)) => {
                out.push(token);
                i = next;
                if let Some(tag) = rawtext {
                    let (text, after) = scan_rawtext(input, i, &tag);
                    if !text.is_empty() {
                        out.push(Token::Text(text.to_string()));
                    }
                    out.push(Token::EndTag(tag));
                    i = after;
                }
            }
            None => {
                out.push(Token::Text("<".to_string()));
                i += 1;
            }
        }
    }
    out
}

/// Returns the token, the index past `>`, and the rawtext element name when
/// the tag opens a `<script>`/`<style>` context.
fn scan_start_tag(input: &str, start: usize) -> Option<(Token, usize, Option<String>)> {
    let bytes = input.as_bytes();
    debug_assert!(bytes[start] == b'<');
    let name_start = start + 1;
    let mut i = name_start;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = input[name_start..i].to_ascii_lowercase();

    let mut attributes = Vec::new();
    let mut self_closing = false;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        if bytes[i] == b'>' {
            i += 1;
            break;
        }
        if bytes[i] == b'/' {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'>' {
                self_closing = true;
                i = j + 1;
                break;
            }
            i += 1;
            continue;
        }
        let attr_start = i;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        if i == attr_start {
            i += 1; // skip junk byte
            continue;
        }
        let attr_name = input[attr_start..i].to_ascii_lowercase();
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let value = if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let val_start = i;
                match memchr(quote, &bytes[i..]) {
                    Some(rel) => {
                        i += rel;
                        let v = &input[val_start..i];
                        i += 1; // closing quote
                        v
                    }
                    None => {
                        i = bytes.len();
                        &input[val_start..]
                    }
                }
            } else {
                let val_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                &input[val_start..i]
            };
            attributes.push((attr_name, Some(decode_entities(value))));
        } else {
            attributes.push((attr_name, None));
        }
    }

    let rawtext = if !self_closing && (name == "script" || name == "style") {
        Some(name.clone())
    } else {
        None
    };
    Some((
        Token::StartTag {
            name,
            attributes,
            self_closing,
        },
        i,
        rawtext,
    ))
}

/// Scan raw `<script>`/`<style>` content up to the matching close tag.
/// Returns the raw text and the index past the close tag.
fn scan_rawtext<'a>(input: &'a str, start: usize, tag: &str) -> (&'a str, usize) {
    let bytes = input.as_bytes();
    let mut i = start;
    while i < bytes.len() {
        let Some(rel) = memchr(b'<', &bytes[i..]) else {
            break;
        };
        i += rel;
        let rest = &input[i..];
        if rest.len() >= tag.len() + 2
            && rest[..2].eq("</")
            && rest[2..2 + tag.len()].eq_ignore_ascii_case(tag)
        {
            let mut k = i + 2 + tag.len();
            while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            if k < bytes.len() && bytes[k] == b'>' {
                return (&input[start..i], k + 1);
            }
        }
        i += 1;
    }
    (&input[start..], bytes.len())
}
