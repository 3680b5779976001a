//! Trigger subsystem: turns parsed trigger clauses into live listeners and
//! drivers, and feeds host events through the guard and timing chain.
//!
//! Guard order per listener: filter expression, then `changed`, then `once`,
//! then `consume`. Timing wraps the dispatch after the guards: a `delay`
//! runs first, then `debounce` or `throttle`, then the actual dispatch.

use crate::events::EventData;
use crate::timers::TimerTask;
use crate::Engine;
use dom::NodeId;
use grammar::ParsedTriggerEvent;
use std::rc::Rc;

pub type ListenerId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EventSource {
    Node(NodeId),
    /// `from:window` / `from:document`; fires at the root of the bubble path.
    Document,
}

pub(crate) struct TriggerListener {
    pub owner: NodeId,
    pub source: EventSource,
    pub clause: Rc<ParsedTriggerEvent>,
    pub fired_once: bool,
    pub debounce_timer: Option<crate::timers::TimerId>,
    pub last_throttle_fire: Option<u64>,
}

impl Engine {
    /// Feed a page event into the engine. The event starts at `target` and
    /// bubbles toward the root; a matching listener with `consume` stops
    /// propagation past its level.
    pub fn dispatch_event(&mut self, target: NodeId, name: &str, data: EventData) {
        let mut chain = vec![target];
        let mut current = self.doc.parent(target);
        while let Some(node) = current {
            chain.push(node);
            current = self.doc.parent(node);
        }

        for (depth, level) in chain.iter().enumerate() {
            let at_root = depth + 1 == chain.len();
            let mut ids: Vec<ListenerId> = self
                .listeners
                .iter()
                .filter(|(_, l)| {
                    l.clause.name == name
                        && match l.source {
                            EventSource::Node(node) => node == *level,
                            EventSource::Document => at_root,
                        }
                })
                .map(|(id, _)| *id)
                .collect();
            ids.sort_unstable(); // registration order

            let mut consumed = false;
            for id in ids {
                if self.run_listener(id, &data) {
                    consumed = true;
                }
            }
            if consumed {
                return;
            }
        }
    }

    /// Host-side visibility report for `revealed` triggers. Only the hidden
    /// to visible transition fires.
    pub fn set_visible(&mut self, node: NodeId, visible: bool) {
        if !visible {
            self.visible.remove(&node);
            return;
        }
        if !self.visible.insert(node) {
            return;
        }
        let mut ids: Vec<ListenerId> = self
            .listeners
            .iter()
            .filter(|(_, l)| l.owner == node && is_reveal_clause(&l.clause))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        for id in ids {
            self.run_listener(id, &EventData::new());
        }
    }

    pub(crate) fn install_trigger_clause(&mut self, node: NodeId, clause: &ParsedTriggerEvent) {
        if clause.is_polling {
            let interval = clause
                .polling_interval_ms
                .unwrap_or(self.config.default_polling_interval_ms);
            let deadline = self.now_ms + interval;
            let timer = self.timers.schedule(
                deadline,
                TimerTask::Poll {
                    node,
                    interval_ms: interval,
                },
            );
            if let Some(state) = self.states.get_mut(&node) {
                state.timers.push(timer);
            }
            return;
        }

        let source = match clause.from.as_deref() {
            None => EventSource::Node(node),
            Some("window") | Some("document") => EventSource::Document,
            Some("body") => match self.doc.find_tag(self.doc.root(), "body") {
                Some(body) => EventSource::Node(body),
                None => EventSource::Document,
            },
            Some(selector) => match self.query_first(self.doc.root(), selector) {
                Some(found) => EventSource::Node(found),
                None => EventSource::Node(node),
            },
        };

        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.insert(
            id,
            TriggerListener {
                owner: node,
                source,
                clause: Rc::new(clause.clone()),
                fired_once: false,
                debounce_timer: None,
                last_throttle_fire: None,
            },
        );
        if let Some(state) = self.states.get_mut(&node) {
            state.listeners.push(id);
        }

        if is_reveal_clause(clause) {
            if let Some(state) = self.states.get_mut(&node) {
                state.observed_visibility = true;
            }
            // already on screen when activated
            if self.visible.contains(&node) {
                self.run_listener(id, &EventData::new());
            }
        } else if clause.name == "load" {
            self.ready.push_back(crate::ReadyTask::FireListener {
                listener: id,
                data: EventData::new(),
            });
        }
    }

    /// Run one listener's guards, then hand off to the timing chain.
    /// Returns whether the event was consumed.
    pub(crate) fn run_listener(&mut self, id: ListenerId, data: &EventData) -> bool {
        let Some(listener) = self.listeners.get(&id) else {
            return false;
        };
        let owner = listener.owner;
        let clause = Rc::clone(&listener.clause);
        if !self.states.contains_key(&owner) {
            return false;
        }

        if let Some(filter) = &clause.filter {
            match grammar::expr::evaluate(filter, &data.bindings) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(err) => {
                    log::warn!("ignoring trigger with bad filter: {err}");
                    return false;
                }
            }
        }

        if clause.modifiers.changed {
            let current = self.doc.attr(owner, "value").unwrap_or_default().to_string();
            let Some(state) = self.states.get_mut(&owner) else {
                return false;
            };
            if state.last_value.as_deref() == Some(current.as_str()) {
                return false;
            }
            state.last_value = Some(current);
        }

        if clause.modifiers.once {
            let Some(listener) = self.listeners.get_mut(&id) else {
                return false;
            };
            if listener.fired_once {
                return false;
            }
            listener.fired_once = true;
        }

        let consumed = clause.modifiers.consume;

        if let Some(delay) = clause.modifiers.delay_ms {
            self.timers.schedule(
                self.now_ms + delay,
                TimerTask::ListenerDelay {
                    listener: id,
                    data: data.clone(),
                },
            );
            return consumed;
        }

        self.listener_timing(id, data.clone());
        consumed
    }

    /// Debounce/throttle stage; also the continuation after a `delay` timer.
    pub(crate) fn listener_timing(&mut self, id: ListenerId, data: EventData) {
        let Some(listener) = self.listeners.get(&id) else {
            return;
        };
        let owner = listener.owner;
        let modifiers = listener.clause.modifiers.clone();

        if let Some(ms) = modifiers.debounce_ms {
            let stale = self
                .listeners
                .get_mut(&id)
                .and_then(|l| l.debounce_timer.take());
            if let Some(stale) = stale {
                self.timers.cancel(stale);
            }
            let timer = self.timers.schedule(
                self.now_ms + ms,
                TimerTask::ListenerDebounce { listener: id, data },
            );
            if let Some(listener) = self.listeners.get_mut(&id) {
                listener.debounce_timer = Some(timer);
            }
            return;
        }

        if let Some(ms) = modifiers.throttle_ms {
            let now = self.now_ms;
            let Some(listener) = self.listeners.get_mut(&id) else {
                return;
            };
            if let Some(last) = listener.last_throttle_fire {
                if now < last.saturating_add(ms) {
                    return;
                }
            }
            listener.last_throttle_fire = Some(now);
        }

        self.dispatch(owner, Some(data));
    }

    /// Debounce quiet period elapsed.
    pub(crate) fn fire_debounced(&mut self, id: ListenerId, data: EventData) {
        let Some(listener) = self.listeners.get_mut(&id) else {
            return;
        };
        listener.debounce_timer = None;
        let owner = listener.owner;
        self.dispatch(owner, Some(data));
    }

    /// Polling tick: self-cancels once the node is gone.
    pub(crate) fn fire_poll(&mut self, node: NodeId, interval_ms: u64) {
        if !self.states.contains_key(&node) || !self.doc.is_connected(node) {
            return;
        }
        let timer = self.timers.schedule(
            self.now_ms + interval_ms,
            TimerTask::Poll { node, interval_ms },
        );
        let live = &self.timers;
        if let Some(state) = self.states.get_mut(&node) {
            state.timers.retain(|id| live.is_live(*id));
            state.timers.push(timer);
        }
        self.dispatch(node, None);
    }
}

fn is_reveal_clause(clause: &ParsedTriggerEvent) -> bool {
    clause.name == "revealed" || clause.name == "intersect"
}
