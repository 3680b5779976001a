use std::collections::HashMap;

pub type RawId = u32;

/// Stable, opaque node key. Never reused within one `Document`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub RawId);

#[derive(Debug)]
pub enum NodeKind {
    Document {
        doctype: Option<String>,
    },
    Element {
        name: String,
        attributes: Vec<(String, Option<String>)>,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

#[derive(Debug)]
struct NodeRecord {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeRecord {
    fn allows_children(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Document { .. } | NodeKind::Element { .. }
        )
    }
}

/// Arena-backed document. Nodes are addressed by `NodeId`; removing a subtree
/// frees its records but never invalidates other ids. Detached nodes (parsed
/// fragments, preserved elements) live in the same arena until reinserted or
/// freed, so moves never cross arenas.
pub struct Document {
    nodes: Vec<NodeRecord>,
    live: HashMap<NodeId, usize>,
    next: RawId,
    root: NodeId,
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            live: HashMap::new(),
            next: 1,
            root: NodeId(0),
        };
        doc.root = doc.alloc(NodeKind::Document { doctype: None });
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next);
        self.next = self.next.wrapping_add(1);
        let index = self.nodes.len();
        self.nodes.push(NodeRecord {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.live.insert(id, index);
        id
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeKind::Element {
            name: name.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text {
            text: text.to_string(),
        })
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Comment {
            text: text.to_string(),
        })
    }

    fn index(&self, id: NodeId) -> Option<usize> {
        self.live.get(&id).copied()
    }

    pub fn is_live(&self, id: NodeId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.index(id).map(|i| &self.nodes[i].kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element { .. }))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Element { name, .. }) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn tag_is(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id)
            .is_some_and(|n| n.eq_ignore_ascii_case(tag))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text { text }) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn set_doctype(&mut self, doctype: String) {
        if let Some(i) = self.index(self.root) {
            if let NodeKind::Document { doctype: dt } = &mut self.nodes[i].kind {
                *dt = Some(doctype);
            }
        }
    }

    // ---- attributes ----

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .and_then(|(_, v)| v.as_deref()),
            _ => None,
        }
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes
                .iter()
                .any(|(k, _)| k.eq_ignore_ascii_case(name)),
            _ => false,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, Option<String>)] {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(i) = self.index(id) else { return };
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[i].kind {
            for (k, v) in attributes.iter_mut() {
                if k.eq_ignore_ascii_case(name) {
                    *v = Some(value.to_string());
                    return;
                }
            }
            attributes.push((name.to_string(), Some(value.to_string())));
        }
    }

    pub fn set_bool_attr(&mut self, id: NodeId, name: &str) {
        let Some(i) = self.index(id) else { return };
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[i].kind {
            if !attributes.iter().any(|(k, _)| k.eq_ignore_ascii_case(name)) {
                attributes.push((name.to_string(), None));
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        let Some(i) = self.index(id) else { return };
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[i].kind {
            attributes.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        }
    }

    pub fn id_attr(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id").filter(|v| !v.is_empty())
    }

    // ---- classes ----

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if self.has_class(id, class) {
            return;
        }
        let merged = match self.attr(id, "class") {
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.set_attr(id, "class", &merged);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        let Some(existing) = self.attr(id, "class") else {
            return;
        };
        let remaining = existing
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "class", &remaining);
    }

    // ---- tree structure ----

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.index(id).and_then(|i| self.nodes[i].parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.index(id) {
            Some(i) => &self.nodes[i].children,
            None => &[],
        }
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| self.is_element(*c))
    }

    /// Whether the node is reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(parent != child, "cannot append node to itself");
        let (Some(pi), Some(ci)) = (self.index(parent), self.index(child)) else {
            return;
        };
        if !self.nodes[pi].allows_children() {
            debug_assert!(false, "parent node cannot have children");
            return;
        }
        self.detach(child);
        let pi = self.index(parent).unwrap_or(pi);
        self.nodes[pi].children.push(child);
        self.nodes[ci].parent = Some(parent);
    }

    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, before: NodeId) {
        let (Some(_), Some(ci)) = (self.index(parent), self.index(child)) else {
            return;
        };
        self.detach(child);
        let Some(pi) = self.index(parent) else { return };
        let pos = self.nodes[pi].children.iter().position(|c| *c == before);
        match pos {
            Some(pos) => self.nodes[pi].children.insert(pos, child),
            None => self.nodes[pi].children.push(child),
        }
        self.nodes[ci].parent = Some(parent);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        match self.children(parent).first().copied() {
            Some(first) => self.insert_before(parent, child, first),
            None => self.append_child(parent, child),
        }
    }

    /// Unlink from the parent without freeing; the subtree stays alive and
    /// can be reinserted elsewhere.
    pub fn detach(&mut self, id: NodeId) {
        let Some(i) = self.index(id) else { return };
        if let Some(parent) = self.nodes[i].parent.take() {
            if let Some(pi) = self.index(parent) {
                self.nodes[pi].children.retain(|c| *c != id);
            }
        }
    }

    /// Unlink and free the whole subtree. Ids under it become dead.
    pub fn remove_subtree(&mut self, id: NodeId) {
        self.detach(id);
        self.free(id);
    }

    fn free(&mut self, id: NodeId) {
        let Some(i) = self.index(id) else { return };
        let children = std::mem::take(&mut self.nodes[i].children);
        self.live.remove(&id);
        for child in children {
            self.free(child);
        }
    }

    pub fn clear_children(&mut self, parent: NodeId) {
        let children: Vec<NodeId> = self.children(parent).to_vec();
        for child in children {
            self.remove_subtree(child);
        }
    }

    /// Preorder walk of the subtree, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.is_element(*n))
            .collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(t) = self.text(id) {
            out.push_str(t);
        }
        for d in self.descendants(id) {
            if let Some(t) = self.text(d) {
                out.push_str(t);
            }
        }
        out
    }

    /// First element with the given `id` attribute under `scope`.
    pub fn element_by_id(&self, scope: NodeId, value: &str) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|n| self.id_attr(*n) == Some(value))
    }

    pub fn find_tag(&self, scope: NodeId, tag: &str) -> Option<NodeId> {
        if self.tag_is(scope, tag) {
            return Some(scope);
        }
        self.descendants(scope)
            .into_iter()
            .find(|n| self.tag_is(*n, tag))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_detach_keep_subtree_alive() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.create_element("div");
        let text = doc.create_text("hi");
        doc.append_child(div, text);
        doc.append_child(root, div);
        assert!(doc.is_connected(text));

        doc.detach(div);
        assert!(!doc.is_connected(div));
        assert!(doc.is_live(text));

        doc.append_child(root, div);
        assert!(doc.is_connected(text));
    }

    #[test]
    fn remove_subtree_frees_descendants() {
        let mut doc = Document::new();
        let root = doc.root();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        doc.append_child(div, span);
        doc.append_child(root, div);

        doc.remove_subtree(div);
        assert!(!doc.is_live(div));
        assert!(!doc.is_live(span));
        assert!(doc.children(root).is_empty());
    }

    #[test]
    fn insert_before_orders_children() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let c = doc.create_element("c");
        doc.append_child(root, a);
        doc.append_child(root, c);
        doc.insert_before(root, b, c);
        let names: Vec<_> = doc
            .children(root)
            .iter()
            .map(|n| doc.tag_name(*n).unwrap().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn class_helpers_round_trip() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.add_class(el, "busy");
        doc.add_class(el, "busy");
        assert_eq!(doc.attr(el, "class"), Some("busy"));
        doc.add_class(el, "other");
        assert!(doc.has_class(el, "busy"));
        doc.remove_class(el, "busy");
        assert!(!doc.has_class(el, "busy"));
        assert!(doc.has_class(el, "other"));
    }

    #[test]
    fn append_reparents_from_previous_parent() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let child = doc.create_element("span");
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.append_child(a, child);
        doc.append_child(b, child);
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), [child]);
        assert_eq!(doc.parent(child), Some(b));
    }
}
