//! Attribute inheritance. Ancestors contribute request headers and the boost
//! flag; closer ancestors win on conflicts. `p-inherit="false"` on an
//! ancestor stops the walk at that ancestor (itself excluded), and a
//! comma-separated `p-inherit` value restricts which attributes that
//! ancestor passes down.

use crate::constants::{ATTR_BOOST, ATTR_INHERIT, ATTR_REQUEST};
use crate::Engine;
use dom::NodeId;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InheritedValues {
    pub headers: Vec<(String, String)>,
    pub boost: Option<bool>,
}

impl InheritedValues {
    fn set_header(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.headers.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value.to_string();
        } else {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }
}

fn allows(inherit_attr: Option<&str>, attr: &str) -> bool {
    match inherit_attr {
        None => true,
        Some(list) => list.split(',').any(|item| item.trim() == attr),
    }
}

impl Engine {
    pub(crate) fn resolve_inheritance(&mut self, node: NodeId) -> InheritedValues {
        // Collect the ancestor chain, nearest first, stopping below any
        // ancestor that opts out entirely.
        let mut chain = Vec::new();
        let mut current = self.doc.parent(node);
        while let Some(ancestor) = current {
            if !self.doc.is_element(ancestor) {
                break;
            }
            let inherit = self.doc.attr(ancestor, ATTR_INHERIT);
            if inherit.as_deref() == Some("false") {
                break;
            }
            chain.push(ancestor);
            current = self.doc.parent(ancestor);
        }

        // Apply farthest first so closer ancestors overwrite.
        let mut values = InheritedValues::default();
        for ancestor in chain.into_iter().rev() {
            let inherit = self.doc.attr(ancestor, ATTR_INHERIT).map(str::to_string);
            if allows(inherit.as_deref(), ATTR_BOOST) {
                if let Some(boost) = self.doc.attr(ancestor, ATTR_BOOST) {
                    values.boost = Some(boost != "false");
                }
            }
            if !allows(inherit.as_deref(), ATTR_REQUEST) {
                continue;
            }
            let Some(raw) = self.doc.attr(ancestor, ATTR_REQUEST).map(str::to_string) else {
                continue;
            };
            if let Some(parsed) = self.cached_request(&raw, ancestor) {
                for (name, value) in &parsed.headers {
                    values.set_header(name, value);
                }
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closer_ancestors_overwrite_headers() {
        let mut engine = Engine::for_tests(
            r#"<div p-request='{X-Version: "1"} POST /a'>
                 <div p-request='{X-Version: "2"} POST /b'>
                   <button id="leaf" p-request="GET /c">go</button>
                 </div>
               </div>"#,
        );
        let leaf = engine.doc.element_by_id(engine.doc.root(), "leaf").unwrap();
        let values = engine.resolve_inheritance(leaf);
        assert_eq!(
            values.headers,
            vec![("X-Version".to_string(), "2".to_string())]
        );
    }

    #[test]
    fn inherit_false_stops_the_walk() {
        let mut engine = Engine::for_tests(
            r#"<div p-request='{X-Version: "1"} POST /a'>
                 <div p-inherit="false">
                   <button id="leaf" p-request="GET /c">go</button>
                 </div>
               </div>"#,
        );
        let leaf = engine.doc.element_by_id(engine.doc.root(), "leaf").unwrap();
        assert!(engine.resolve_inheritance(leaf).headers.is_empty());
    }

    #[test]
    fn allowlist_filters_attributes() {
        let mut engine = Engine::for_tests(
            r#"<div p-boost="true" p-inherit="p-boost"
                    p-request='{X-Version: "1"} POST /a'>
                 <a id="leaf" href="/x">x</a>
               </div>"#,
        );
        let leaf = engine.doc.element_by_id(engine.doc.root(), "leaf").unwrap();
        let values = engine.resolve_inheritance(leaf);
        assert!(values.headers.is_empty());
        assert_eq!(values.boost, Some(true));
    }
}
