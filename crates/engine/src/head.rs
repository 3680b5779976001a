//! Head merge for full-document responses. The incoming head never replaces
//! the live one wholesale: the title is updated in place, novel meta and
//! stylesheet links are appended, and inline styles accumulate.

use dom::{Document, NodeId};

pub(crate) fn merge_head(
    doc: &mut Document,
    live_head: NodeId,
    new_head: NodeId,
    ignore_title: bool,
) {
    let incoming: Vec<NodeId> = doc.children(new_head).to_vec();
    for node in incoming {
        if !doc.is_element(node) {
            continue;
        }
        if doc.tag_is(node, "title") {
            if !ignore_title {
                let text = doc.text_content(node);
                set_title(doc, live_head, &text);
            }
        } else if doc.tag_is(node, "meta") {
            if meta_key(doc, node).is_none_or(|key| find_meta(doc, live_head, &key).is_none()) {
                doc.detach(node);
                doc.append_child(live_head, node);
            }
        } else if doc.tag_is(node, "link") {
            let href = doc.attr(node, "href").map(str::to_string);
            let duplicate = href.as_deref().is_some_and(|href| {
                doc.children(live_head).iter().any(|c| {
                    doc.tag_is(*c, "link") && doc.attr(*c, "href") == Some(href)
                })
            });
            if !duplicate {
                doc.detach(node);
                doc.append_child(live_head, node);
            }
        } else if doc.tag_is(node, "style") || doc.tag_is(node, "script") {
            doc.detach(node);
            doc.append_child(live_head, node);
        }
    }
    // whatever is left of the incoming head is garbage now
    doc.remove_subtree(new_head);
}

fn set_title(doc: &mut Document, live_head: NodeId, text: &str) {
    let existing = doc
        .children(live_head)
        .iter()
        .copied()
        .find(|c| doc.tag_is(*c, "title"));
    match existing {
        Some(title) => {
            doc.clear_children(title);
            let text_node = doc.create_text(text);
            doc.append_child(title, text_node);
        }
        None => {
            let title = doc.create_element("title");
            let text_node = doc.create_text(text);
            doc.append_child(title, text_node);
            doc.append_child(live_head, title);
        }
    }
}

/// Identity of a meta tag: its `name` or `property` attribute.
fn meta_key(doc: &Document, node: NodeId) -> Option<String> {
    doc.attr(node, "name")
        .or_else(|| doc.attr(node, "property"))
        .map(str::to_string)
}

fn find_meta(doc: &Document, live_head: NodeId, key: &str) -> Option<NodeId> {
    doc.children(live_head)
        .iter()
        .copied()
        .find(|c| doc.tag_is(*c, "meta") && meta_key(doc, *c).as_deref() == Some(key))
}
