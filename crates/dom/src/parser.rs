//! Builds document/fragment trees from tokenizer output.
//!
//! Fragments parse into the same arena as the target document, as detached
//! roots, so applying them later is a reparent and never a cross-arena copy.

use crate::tokenizer::{Token, is_void_element, tokenize};
use crate::types::{Document, NodeId};

/// Elements that only occur in table context. Parsed bare, a naive builder
/// would leave them childless or misplace them, so the fragment text is
/// wrapped in the minimal table scaffolding and unwrapped again afterwards.
fn table_wrapper(tag: &str) -> Option<(usize, &'static str, &'static str)> {
    match tag {
        "thead" | "tbody" | "tfoot" | "colgroup" | "caption" => {
            Some((1, "<table>", "</table>"))
        }
        "tr" => Some((2, "<table><tbody>", "</tbody></table>")),
        "td" | "th" => Some((3, "<table><tbody><tr>", "</tr></tbody></table>")),
        "col" => Some((2, "<table><colgroup>", "</colgroup></table>")),
        _ => None,
    }
}

fn leading_tag(text: &str) -> Option<String> {
    let rest = text.trim_start();
    let rest = rest.strip_prefix('<')?;
    let end = rest
        .bytes()
        .position(|b| !b.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(rest[..end].to_ascii_lowercase())
}

/// Parse markup into detached top-level nodes inside `doc`'s arena.
pub fn parse_fragment(doc: &mut Document, text: &str) -> Vec<NodeId> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Some((depth, prefix, suffix)) = leading_tag(trimmed).as_deref().and_then(table_wrapper)
    {
        let wrapped = format!("{prefix}{trimmed}{suffix}");
        let container = build_container(doc, &wrapped);
        let mut source = container;
        for _ in 0..depth {
            match doc.first_element_child(source) {
                Some(next) => source = next,
                None => break,
            }
        }
        let roots: Vec<NodeId> = doc.children(source).to_vec();
        for root in &roots {
            doc.detach(*root);
        }
        doc.remove_subtree(container);
        return roots;
    }

    let container = build_container(doc, trimmed);
    let roots: Vec<NodeId> = doc.children(container).to_vec();
    for root in &roots {
        doc.detach(*root);
    }
    doc.remove_subtree(container);
    roots
}

/// Result of parsing a full-document response. All nodes hang detached off
/// `container`; the caller moves what it needs and frees the rest.
pub struct ParsedDocument {
    pub container: NodeId,
    pub head: Option<NodeId>,
    pub body: Option<NodeId>,
}

pub fn parse_document(doc: &mut Document, text: &str) -> ParsedDocument {
    let container = build_container(doc, text.trim());
    let head = doc.find_tag(container, "head").filter(|h| *h != container);
    let body = doc.find_tag(container, "body").filter(|b| *b != container);
    ParsedDocument {
        container,
        head,
        body,
    }
}

/// Whether response text looks like a full HTML document rather than a
/// fragment.
pub fn is_full_document(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    for marker in ["<html", "<head"] {
        let mut search = lower.as_str();
        let mut offset = 0;
        while let Some(pos) = search.find(marker) {
            let after = lower.as_bytes().get(offset + pos + marker.len());
            match after {
                Some(b) if b.is_ascii_whitespace() || *b == b'>' => return true,
                None => return true,
                _ => {
                    offset += pos + marker.len();
                    search = &lower[offset..];
                }
            }
        }
    }
    false
}

/// Tokenize and build under a fresh detached container element.
fn build_container(doc: &mut Document, text: &str) -> NodeId {
    let container = doc.create_element("template");
    let tokens = tokenize(text);
    let mut open: Vec<NodeId> = vec![container];

    for token in tokens {
        match token {
            Token::Doctype(_) => {}
            Token::Text(text) => {
                let parent = *open.last().unwrap_or(&container);
                let node = doc.create_text(&text);
                doc.append_child(parent, node);
            }
            Token::Comment(text) => {
                let parent = *open.last().unwrap_or(&container);
                let node = doc.create_comment(&text);
                doc.append_child(parent, node);
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let parent = *open.last().unwrap_or(&container);
                let el = doc.create_element(&name);
                for (k, v) in attributes {
                    match v {
                        Some(v) => doc.set_attr(el, &k, &v),
                        None => doc.set_bool_attr(el, &k),
                    }
                }
                doc.append_child(parent, el);
                if !self_closing && !is_void_element(&name) {
                    open.push(el);
                }
            }
            Token::EndTag(name) => {
                // ignore stray end tags instead of unwinding the whole stack
                let matched = open[1..].iter().rposition(|id| doc.tag_is(*id, &name));
                if let Some(pos) = matched {
                    open.truncate(pos + 1);
                }
            }
        }
    }
    container
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sibling_fragments() {
        let mut doc = Document::new();
        let roots = parse_fragment(&mut doc, "<p>a</p><p>b</p>");
        assert_eq!(roots.len(), 2);
        assert!(doc.tag_is(roots[0], "p"));
        assert_eq!(doc.text_content(roots[1]), "b");
        assert!(doc.parent(roots[0]).is_none());
    }

    #[test]
    fn table_rows_parse_without_invented_wrappers() {
        let mut doc = Document::new();
        let roots = parse_fragment(&mut doc, "<tr><td>1</td><td>2</td></tr>");
        assert_eq!(roots.len(), 1);
        assert!(doc.tag_is(roots[0], "tr"));
        let cells: Vec<_> = doc.children(roots[0]).to_vec();
        assert_eq!(cells.len(), 2);
        assert!(doc.tag_is(cells[0], "td"));
    }

    #[test]
    fn bare_cells_parse_at_top_level() {
        let mut doc = Document::new();
        let roots = parse_fragment(&mut doc, "<td>x</td>");
        assert_eq!(roots.len(), 1);
        assert!(doc.tag_is(roots[0], "td"));
    }

    #[test]
    fn stray_end_tag_does_not_unwind_stack() {
        let mut doc = Document::new();
        let roots = parse_fragment(&mut doc, "<div><span>a</span></b>tail</div>");
        assert_eq!(roots.len(), 1);
        assert_eq!(doc.text_content(roots[0]), "atail");
    }

    #[test]
    fn full_document_detection() {
        assert!(is_full_document("<html><body>x</body></html>"));
        assert!(is_full_document("<head><title>t</title></head>"));
        assert!(!is_full_document("<div>x</div>"));
        assert!(!is_full_document("<header>x</header>"));
    }

    #[test]
    fn parse_document_finds_head_and_body() {
        let mut doc = Document::new();
        let parsed = parse_document(
            &mut doc,
            "<html><head><title>t</title></head><body><p>x</p></body></html>",
        );
        let head = parsed.head.expect("head");
        let body = parsed.body.expect("body");
        assert!(doc.tag_is(head, "head"));
        assert_eq!(doc.text_content(body), "x");
    }
}
