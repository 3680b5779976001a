//! Simple selector support: `*`, type, `#id`, `.class`, `[attr]`,
//! `[attr="value"]`, compounds thereof, and comma-separated lists.
//! Combinators are not supported; declarative attributes in this engine
//! address single elements.

use crate::types::{Document, NodeId};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, Option<String>)>,
    pub universal: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorList {
    pub parts: Vec<Selector>,
}

impl SelectorList {
    /// `None` for selectors this engine cannot express (empty input,
    /// combinators, pseudo-classes).
    pub fn parse(input: &str) -> Option<SelectorList> {
        let mut parts = Vec::new();
        for piece in input.split(',') {
            parts.push(parse_compound(piece.trim())?);
        }
        if parts.is_empty() {
            return None;
        }
        Some(SelectorList { parts })
    }
}

fn parse_compound(s: &str) -> Option<Selector> {
    if s.is_empty() || s.contains(char::is_whitespace) {
        return None;
    }
    let mut sel = Selector::default();
    let bytes = s.as_bytes();
    let mut i = 0;

    // optional leading type or universal
    if bytes[0] == b'*' {
        sel.universal = true;
        i = 1;
    } else if bytes[0].is_ascii_alphanumeric() {
        let start = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-' || bytes[i] == b'_')
        {
            i += 1;
        }
        sel.tag = Some(s[start..i].to_ascii_lowercase());
    }

    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                i += 1;
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], b'#' | b'.' | b'[') {
                    i += 1;
                }
                if start == i {
                    return None;
                }
                sel.id = Some(s[start..i].to_string());
            }
            b'.' => {
                i += 1;
                let start = i;
                while i < bytes.len() && !matches!(bytes[i], b'#' | b'.' | b'[') {
                    i += 1;
                }
                if start == i {
                    return None;
                }
                sel.classes.push(s[start..i].to_string());
            }
            b'[' => {
                let close = s[i..].find(']')? + i;
                let body = &s[i + 1..close];
                i = close + 1;
                match body.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim_matches(|c| c == '"' || c == '\'');
                        sel.attrs
                            .push((name.trim().to_ascii_lowercase(), Some(value.to_string())));
                    }
                    None => {
                        sel.attrs.push((body.trim().to_ascii_lowercase(), None));
                    }
                }
            }
            _ => return None,
        }
    }

    if sel.tag.is_none()
        && sel.id.is_none()
        && sel.classes.is_empty()
        && sel.attrs.is_empty()
        && !sel.universal
    {
        return None;
    }
    Some(sel)
}

pub fn matches(doc: &Document, node: NodeId, list: &SelectorList) -> bool {
    list.parts.iter().any(|sel| matches_compound(doc, node, sel))
}

fn matches_compound(doc: &Document, node: NodeId, sel: &Selector) -> bool {
    if !doc.is_element(node) {
        return false;
    }
    if let Some(tag) = &sel.tag {
        if !doc.tag_is(node, tag) {
            return false;
        }
    }
    if let Some(id) = &sel.id {
        if doc.id_attr(node) != Some(id.as_str()) {
            return false;
        }
    }
    for class in &sel.classes {
        if !doc.has_class(node, class) {
            return false;
        }
    }
    for (name, value) in &sel.attrs {
        match value {
            Some(v) => {
                if doc.attr(node, name) != Some(v.as_str()) {
                    return false;
                }
            }
            None => {
                if !doc.has_attr(node, name) {
                    return false;
                }
            }
        }
    }
    true
}

/// First matching descendant of `scope` (scope itself excluded), preorder.
pub fn select_first(doc: &Document, scope: NodeId, list: &SelectorList) -> Option<NodeId> {
    doc.descendants(scope)
        .into_iter()
        .find(|n| matches(doc, *n, list))
}

pub fn select_all(doc: &Document, scope: NodeId, list: &SelectorList) -> Vec<NodeId> {
    doc.descendants(scope)
        .into_iter()
        .filter(|n| matches(doc, *n, list))
        .collect()
}

/// Nearest ancestor-or-self matching the selector.
pub fn closest(doc: &Document, node: NodeId, list: &SelectorList) -> Option<NodeId> {
    let mut current = Some(node);
    while let Some(n) = current {
        if matches(doc, n, list) {
            return Some(n);
        }
        current = doc.parent(n);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_fragment;

    fn fixture() -> (Document, NodeId) {
        let mut doc = Document::new();
        let roots = parse_fragment(
            &mut doc,
            r#"<div id="outer" class="wrap">
                 <form id="f"><input name="q" class="field wide"></form>
                 <span class="field"></span>
               </div>"#,
        );
        let root = doc.root();
        for r in roots {
            doc.append_child(root, r);
        }
        (doc, root)
    }

    #[test]
    fn selects_by_id_class_tag() {
        let (doc, root) = fixture();
        let list = SelectorList::parse("#outer").unwrap();
        let outer = select_first(&doc, root, &list).unwrap();
        assert!(doc.tag_is(outer, "div"));

        let list = SelectorList::parse(".field").unwrap();
        assert_eq!(select_all(&doc, root, &list).len(), 2);

        let list = SelectorList::parse("input.field").unwrap();
        let input = select_first(&doc, root, &list).unwrap();
        assert_eq!(doc.attr(input, "name"), Some("q"));
    }

    #[test]
    fn selects_by_attribute() {
        let (doc, root) = fixture();
        let list = SelectorList::parse(r#"[name="q"]"#).unwrap();
        assert!(select_first(&doc, root, &list).is_some());
        let list = SelectorList::parse("[name]").unwrap();
        assert!(select_first(&doc, root, &list).is_some());
        let list = SelectorList::parse(r#"[name="missing"]"#).unwrap();
        assert!(select_first(&doc, root, &list).is_none());
    }

    #[test]
    fn selector_list_matches_any_part() {
        let (doc, root) = fixture();
        let list = SelectorList::parse("nav, form").unwrap();
        let hit = select_first(&doc, root, &list).unwrap();
        assert!(doc.tag_is(hit, "form"));
    }

    #[test]
    fn closest_walks_ancestors() {
        let (doc, root) = fixture();
        let input = select_first(&doc, root, &SelectorList::parse("input").unwrap()).unwrap();
        let list = SelectorList::parse(".wrap").unwrap();
        let hit = closest(&doc, input, &list).unwrap();
        assert_eq!(doc.id_attr(hit), Some("outer"));
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(SelectorList::parse("div > span").is_none());
        assert!(SelectorList::parse("").is_none());
        assert!(SelectorList::parse("a:hover").is_none());
    }
}
