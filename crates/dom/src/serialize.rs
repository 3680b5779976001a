//! Markup serialization. Primarily used by tests to assert on swap results;
//! not a byte-faithful round-trip of the parsed input.

use crate::entities::{encode_attr, encode_text};
use crate::tokenizer::is_void_element;
use crate::types::{Document, NodeId, NodeKind};

pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, false, &mut out);
    out
}

/// The `innerHTML` equivalent of a node.
pub fn serialize_children(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let raw = doc.tag_is(id, "script") || doc.tag_is(id, "style");
    for child in doc.children(id) {
        write_node(doc, *child, raw, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, raw_text: bool, out: &mut String) {
    match doc.kind(id) {
        Some(NodeKind::Document { doctype }) => {
            if let Some(dt) = doctype {
                out.push_str("<!DOCTYPE ");
                out.push_str(dt);
                out.push('>');
            }
            for child in doc.children(id) {
                write_node(doc, *child, false, out);
            }
        }
        Some(NodeKind::Element { name, attributes }) => {
            out.push('<');
            out.push_str(name);
            for (k, v) in attributes {
                out.push(' ');
                out.push_str(k);
                if let Some(v) = v {
                    out.push_str("=\"");
                    out.push_str(&encode_attr(v));
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(name) {
                return;
            }
            let raw = name == "script" || name == "style";
            for child in doc.children(id) {
                write_node(doc, *child, raw, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        Some(NodeKind::Text { text }) => {
            if raw_text {
                out.push_str(text);
            } else {
                out.push_str(&encode_text(text));
            }
        }
        Some(NodeKind::Comment { text }) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_fragment;

    #[test]
    fn round_trips_simple_markup() {
        let mut doc = Document::new();
        let roots = parse_fragment(&mut doc, r#"<div id="a" class="x"><p>hi</p></div>"#);
        assert_eq!(
            serialize_node(&doc, roots[0]),
            r#"<div id="a" class="x"><p>hi</p></div>"#
        );
    }

    #[test]
    fn void_elements_have_no_close_tag() {
        let mut doc = Document::new();
        let roots = parse_fragment(&mut doc, r#"<p><br>x<img src="/a.png"></p>"#);
        assert_eq!(
            serialize_node(&doc, roots[0]),
            r#"<p><br>x<img src="/a.png"></p>"#
        );
    }

    #[test]
    fn text_is_encoded_outside_rawtext() {
        let mut doc = Document::new();
        let el = doc.create_element("span");
        let t = doc.create_text("a < b & c");
        doc.append_child(el, t);
        assert_eq!(serialize_node(&doc, el), "<span>a &lt; b &amp; c</span>");

        let script = doc.create_element("script");
        let code = doc.create_text("if (a < b) {}");
        doc.append_child(script, code);
        assert_eq!(
            serialize_node(&doc, script),
            "<script>if (a < b) {}</script>"
        );
    }
}
