//! Content swap mechanics. Fragments are parsed into the same arena as the
//! live tree, so a swap is pure re-parenting; behaviors that discard content
//! free it so the arena does not leak.

use dom::{Document, NodeId};
use grammar::SwapBehavior;

/// Apply `content` (detached roots, in order) to `target`. Returns the
/// roots that ended up in the tree.
pub(crate) fn perform_swap(
    doc: &mut Document,
    target: NodeId,
    content: Vec<NodeId>,
    behavior: SwapBehavior,
) -> Vec<NodeId> {
    match behavior {
        SwapBehavior::Replace => {
            doc.clear_children(target);
            for root in &content {
                doc.append_child(target, *root);
            }
            content
        }
        SwapBehavior::Outer => {
            match doc.parent(target) {
                Some(parent) => {
                    for root in &content {
                        doc.insert_before(parent, *root, target);
                    }
                    doc.remove_subtree(target);
                    content
                }
                None => {
                    // detached target; nowhere to put the content
                    free_fragment(doc, content);
                    Vec::new()
                }
            }
        }
        SwapBehavior::Append => {
            for root in &content {
                doc.append_child(target, *root);
            }
            content
        }
        SwapBehavior::Prepend => {
            match doc.children(target).first().copied() {
                Some(first) => {
                    for root in &content {
                        doc.insert_before(target, *root, first);
                    }
                }
                None => {
                    for root in &content {
                        doc.append_child(target, *root);
                    }
                }
            }
            content
        }
        SwapBehavior::Before => match doc.parent(target) {
            Some(parent) => {
                for root in &content {
                    doc.insert_before(parent, *root, target);
                }
                content
            }
            None => {
                free_fragment(doc, content);
                Vec::new()
            }
        },
        SwapBehavior::After => match doc.parent(target) {
            Some(parent) => {
                let siblings = doc.children(parent);
                let next = siblings
                    .iter()
                    .position(|c| *c == target)
                    .and_then(|i| siblings.get(i + 1))
                    .copied();
                match next {
                    Some(next) => {
                        for root in &content {
                            doc.insert_before(parent, *root, next);
                        }
                    }
                    None => {
                        for root in &content {
                            doc.append_child(parent, *root);
                        }
                    }
                }
                content
            }
            None => {
                free_fragment(doc, content);
                Vec::new()
            }
        },
        SwapBehavior::Remove => {
            doc.remove_subtree(target);
            free_fragment(doc, content);
            Vec::new()
        }
        SwapBehavior::None => {
            free_fragment(doc, content);
            Vec::new()
        }
    }
}

pub(crate) fn free_fragment(doc: &mut Document, content: Vec<NodeId>) {
    for root in content {
        doc.remove_subtree(root);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::parse_fragment;

    fn setup() -> (Document, NodeId) {
        let mut doc = Document::new();
        let roots = parse_fragment(&mut doc, "<div id=\"t\"><span>old</span></div>");
        let target = roots[0];
        let root = doc.root();
        doc.append_child(root, target);
        (doc, target)
    }

    fn body_html(doc: &Document) -> String {
        dom::serialize_children(doc, doc.root())
    }

    #[test]
    fn replace_swaps_children_only() {
        let (mut doc, target) = setup();
        let content = parse_fragment(&mut doc, "<b>new</b>");
        perform_swap(&mut doc, target, content, SwapBehavior::Replace);
        assert_eq!(body_html(&doc), "<div id=\"t\"><b>new</b></div>");
    }

    #[test]
    fn outer_replaces_the_target_itself() {
        let (mut doc, target) = setup();
        let content = parse_fragment(&mut doc, "<b>new</b>");
        perform_swap(&mut doc, target, content, SwapBehavior::Outer);
        assert_eq!(body_html(&doc), "<b>new</b>");
        assert!(!doc.is_live(target));
    }

    #[test]
    fn append_prepend_before_after() {
        let (mut doc, target) = setup();
        let content = parse_fragment(&mut doc, "<i>a</i>");
        perform_swap(&mut doc, target, content, SwapBehavior::Append);
        let content = parse_fragment(&mut doc, "<i>p</i>");
        perform_swap(&mut doc, target, content, SwapBehavior::Prepend);
        assert_eq!(
            body_html(&doc),
            "<div id=\"t\"><i>p</i><span>old</span><i>a</i></div>"
        );

        let content = parse_fragment(&mut doc, "<i>b</i>");
        perform_swap(&mut doc, target, content, SwapBehavior::Before);
        let content = parse_fragment(&mut doc, "<i>f</i>");
        perform_swap(&mut doc, target, content, SwapBehavior::After);
        assert!(body_html(&doc).starts_with("<i>b</i><div id=\"t\">"));
        assert!(body_html(&doc).ends_with("</div><i>f</i>"));
    }

    #[test]
    fn remove_discards_target_and_content() {
        let (mut doc, target) = setup();
        let content = parse_fragment(&mut doc, "<b>ignored</b>");
        let inserted = perform_swap(&mut doc, target, content, SwapBehavior::Remove);
        assert!(inserted.is_empty());
        assert_eq!(body_html(&doc), "");
        assert!(!doc.is_live(target));
    }

    #[test]
    fn none_leaves_the_tree_untouched() {
        let (mut doc, target) = setup();
        let before = body_html(&doc);
        let content = parse_fragment(&mut doc, "<b>ignored</b>");
        perform_swap(&mut doc, target, content, SwapBehavior::None);
        assert_eq!(body_html(&doc), before);
    }
}
