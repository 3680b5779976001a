//! Element activation and teardown. Activation parses the node's attributes
//! (through the parse cache), resolves inheritance, and installs trigger
//! listeners and drivers; teardown unwinds all of it so removed subtrees
//! leave nothing behind.

use crate::constants::{ATTR_IGNORE, ATTR_ON, ATTR_REQUEST, ATTR_TRIGGER};
use crate::state::NodeState;
use crate::Engine;
use dom::NodeId;
use grammar::{
    HttpMethod, ParsedRequest, ParsedTrigger, ParsedTriggerEvent, SwapBehavior, Target,
    TriggerModifiers,
};
use std::rc::Rc;

impl Engine {
    /// Activate every relevant element under `root`, `root` included.
    pub fn process_tree(&mut self, root: NodeId) {
        if self.doc.is_element(root) {
            self.process_element(root);
        }
        for el in self.doc.descendant_elements(root) {
            self.process_element(el);
        }
    }

    pub fn process_element(&mut self, node: NodeId) {
        if !self.doc.is_element(node) || self.states.contains_key(&node) {
            return;
        }
        if self.is_ignored(node) {
            return;
        }

        let request_attr = self.doc.attr(node, ATTR_REQUEST).map(str::to_string);
        let trigger_attr = self.doc.attr(node, ATTR_TRIGGER).map(str::to_string);
        let on_attr = self.doc.attr(node, ATTR_ON).map(str::to_string);
        let mut inherited = self.resolve_inheritance(node);
        if let Some(own) = self.doc.attr(node, crate::constants::ATTR_BOOST) {
            inherited.boost = Some(own != "false");
        }

        let parsed_request = match &request_attr {
            Some(raw) => self.cached_request(raw, node),
            None => {
                if inherited.boost == Some(true) {
                    self.boosted_request(node)
                } else {
                    None
                }
            }
        };

        if parsed_request.is_none() && on_attr.is_none() {
            return;
        }

        let mut state = NodeState {
            parsed_request: parsed_request.clone(),
            inherited,
            ..NodeState::default()
        };
        if let Some(raw) = &on_attr {
            state.on_handlers = parse_on_pairs(raw);
        }
        self.states.insert(node, state);

        if parsed_request.is_some() {
            let trigger = match &trigger_attr {
                Some(raw) => self.cached_trigger(raw, node),
                None => None,
            };
            let trigger = trigger.unwrap_or_else(|| {
                Rc::new(ParsedTrigger {
                    events: vec![self.default_trigger_clause(node)],
                })
            });
            for clause in &trigger.events {
                self.install_trigger_clause(node, clause);
            }
        }
    }

    /// Tear down one element's listeners, timers, and pending work.
    pub fn cleanup_element(&mut self, node: NodeId) {
        let Some(state) = self.states.remove(&node) else {
            return;
        };
        for listener in &state.listeners {
            if let Some(removed) = self.listeners.remove(listener) {
                if let Some(timer) = removed.debounce_timer {
                    self.timers.cancel(timer);
                }
            }
        }
        for timer in &state.timers {
            self.timers.cancel(*timer);
        }
        if let Some(id) = state.in_flight {
            self.cancel_in_flight(id);
        }
        for queued in &state.queue {
            self.cleanup_post(queued);
        }
        let stale_confirms: Vec<u64> = self
            .pending_confirms
            .iter()
            .filter(|(_, p)| p.ctx.node == node)
            .map(|(token, _)| *token)
            .collect();
        for token in stale_confirms {
            if let Some(pending) = self.pending_confirms.remove(&token) {
                self.timers.cancel(pending.timer);
            }
        }
        self.visible.remove(&node);
        self.request_cache.invalidate_node(node);
        self.trigger_cache.invalidate_node(node);
    }

    pub fn cleanup_tree(&mut self, root: NodeId) {
        self.cleanup_element(root);
        for el in self.doc.descendant_elements(root) {
            self.cleanup_element(el);
        }
    }

    /// Drop runtime state for nodes a swap destroyed.
    pub(crate) fn purge_dead(&mut self) {
        let dead: Vec<NodeId> = self
            .states
            .keys()
            .copied()
            .filter(|node| !self.doc.is_live(*node))
            .collect();
        for node in dead {
            self.cleanup_element(node);
        }
    }

    /// Re-read a node's attributes after the host changed them.
    pub fn reprocess_element(&mut self, node: NodeId) {
        self.cleanup_element(node);
        self.process_element(node);
    }

    fn is_ignored(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(el) = current {
            if self.doc.has_attr(el, ATTR_IGNORE) {
                return true;
            }
            current = self.doc.parent(el);
        }
        false
    }

    /// Synthesized request for boosted links and forms.
    fn boosted_request(&self, node: NodeId) -> Option<Rc<ParsedRequest>> {
        let (method, url) = if self.doc.tag_is(node, "a") {
            (HttpMethod::Get, self.doc.attr(node, "href")?.to_string())
        } else if self.doc.tag_is(node, "form") {
            let method = match self.doc.attr(node, "method") {
                Some(m) if m.eq_ignore_ascii_case("post") => HttpMethod::Post,
                _ => HttpMethod::Get,
            };
            (method, self.doc.attr(node, "action").unwrap_or("").to_string())
        } else {
            return None;
        };
        Some(Rc::new(ParsedRequest {
            headers: Vec::new(),
            method,
            url,
            body: None,
            target: Target {
                selector: "body".to_string(),
                behavior: SwapBehavior::Replace,
            },
            modifiers: Vec::new(),
        }))
    }

    fn default_trigger_clause(&self, node: NodeId) -> ParsedTriggerEvent {
        let name = if self.doc.tag_is(node, "input") || self.doc.tag_is(node, "textarea") {
            "input"
        } else if self.doc.tag_is(node, "select") {
            "change"
        } else if self.doc.tag_is(node, "form") {
            "submit"
        } else {
            "click"
        };
        ParsedTriggerEvent {
            name: name.to_string(),
            is_polling: false,
            polling_interval_ms: None,
            filter: None,
            modifiers: TriggerModifiers::default(),
            from: None,
        }
    }

    pub(crate) fn cached_request(&mut self, raw: &str, node: NodeId) -> Option<Rc<ParsedRequest>> {
        if let Some(hit) = self.request_cache.get(raw, Some(node)) {
            return Some(hit);
        }
        match grammar::parse_request(raw) {
            Ok(parsed) => {
                let parsed = Rc::new(parsed);
                self.request_cache.set(raw, Rc::clone(&parsed), Some(node));
                Some(parsed)
            }
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }

    pub(crate) fn cached_trigger(&mut self, raw: &str, node: NodeId) -> Option<Rc<ParsedTrigger>> {
        if let Some(hit) = self.trigger_cache.get(raw, Some(node)) {
            return Some(hit);
        }
        match grammar::parse_trigger(raw) {
            Ok(parsed) => {
                let parsed = Rc::new(parsed);
                self.trigger_cache.set(raw, Rc::clone(&parsed), Some(node));
                Some(parsed)
            }
            Err(err) => {
                log::error!("{err}");
                None
            }
        }
    }
}

/// `p-on` syntax: `event: callback | event: callback`.
fn parse_on_pairs(raw: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for clause in raw.split('|') {
        let Some((event, callback)) = clause.split_once(':') else {
            log::warn!("ignoring malformed p-on clause \"{}\"", clause.trim());
            continue;
        };
        let event = event.trim();
        let callback = callback.trim();
        if !event.is_empty() && !callback.is_empty() {
            pairs.push((event.to_string(), callback.to_string()));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_pairs_parse_events_and_callbacks() {
        let pairs = parse_on_pairs("before: showSpinner | error: handleError");
        assert_eq!(
            pairs,
            vec![
                ("before".to_string(), "showSpinner".to_string()),
                ("error".to_string(), "handleError".to_string()),
            ]
        );
        assert!(parse_on_pairs("nonsense").is_empty());
    }
}
