//! Declarative hypermedia engine over an arena DOM.
//!
//! The engine is single threaded and deterministic: the host owns the event
//! loop and feeds it page events, visibility reports, clock advances, and
//! fetch completions; the engine mutates its [`dom::Document`] and emits
//! [`EngineCommand`]s and lifecycle [`EmittedEvent`]s for the host to act on.

pub mod commands;
pub mod config;
pub mod constants;
pub mod events;
pub mod extensions;

mod builder;
mod dispatch;
mod head;
mod inherit;
mod process;
mod response;
mod state;
mod swap;
mod timers;
mod triggers;

pub use commands::{EngineCommand, FetchBody, FetchRequest, FetchResponse, RequestId};
pub use config::{Config, ResponseRule};
pub use events::{EmittedEvent, EventData, EventHandler, EventOutcome};
pub use extensions::Extension;
pub use inherit::InheritedValues;

use crate::dispatch::{InFlight, PendingConfirm};
use crate::events::Listener;
use crate::response::{SettleJob, SwapJob};
use crate::state::NodeState;
use crate::timers::{TimerTask, Timers};
use crate::triggers::{ListenerId, TriggerListener};
use dom::{Document, NodeId};
use grammar::{ParsedRequest, ParsedTrigger, ParserCache};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// Host-provided blocking interactions for `confirm` and `prompt`.
pub trait UserAgent {
    fn confirm(&self, message: &str) -> bool {
        let _ = message;
        true
    }

    fn prompt(&self, message: &str) -> Option<String> {
        let _ = message;
        Some(String::new())
    }
}

/// Approves every confirmation and answers prompts with an empty string.
pub struct NullUserAgent;

impl UserAgent for NullUserAgent {}

pub(crate) enum ReadyTask {
    FireListener { listener: ListenerId, data: EventData },
}

pub struct Engine {
    pub doc: Document,
    pub(crate) config: Config,
    pub(crate) location: String,
    pub(crate) states: HashMap<NodeId, NodeState>,
    pub(crate) request_cache: ParserCache<NodeId, ParsedRequest>,
    pub(crate) trigger_cache: ParserCache<NodeId, ParsedTrigger>,
    pub(crate) timers: Timers,
    pub(crate) now_ms: u64,
    pub(crate) ready: VecDeque<ReadyTask>,
    pub(crate) commands: VecDeque<EngineCommand>,
    pub(crate) next_request_id: RequestId,
    pub(crate) in_flight: HashMap<RequestId, InFlight>,
    pub(crate) pending_confirms: HashMap<u64, PendingConfirm>,
    pub(crate) next_token: u64,
    pub(crate) listeners: HashMap<ListenerId, TriggerListener>,
    pub(crate) next_listener: ListenerId,
    pub(crate) event_listeners: Vec<Listener>,
    pub(crate) emitted: Vec<EmittedEvent>,
    pub(crate) extensions: Vec<Rc<dyn Extension>>,
    pub(crate) callbacks: HashMap<String, Rc<dyn Fn(&EmittedEvent) -> EventOutcome>>,
    pub(crate) user_agent: Box<dyn UserAgent>,
    pub(crate) visible: HashSet<NodeId>,
    pub(crate) pending_swaps: HashMap<u64, SwapJob>,
    pub(crate) pending_settles: HashMap<u64, SettleJob>,
    pub(crate) next_job: u64,
}

impl Engine {
    /// Parse `html` (a full document or a fragment) and activate every
    /// element carrying engine attributes. `load` triggers fire on the
    /// first [`Engine::pump`] or [`Engine::advance`].
    pub fn new(html: &str, config: Config) -> Self {
        let mut doc = Document::new();
        let root = doc.root();
        if dom::is_full_document(html) {
            let parsed = dom::parse_document(&mut doc, html);
            let children: Vec<NodeId> = doc.children(parsed.container).to_vec();
            for child in &children {
                doc.detach(*child);
                doc.append_child(root, *child);
            }
            doc.remove_subtree(parsed.container);
        } else {
            for node in dom::parse_fragment(&mut doc, html) {
                doc.append_child(root, node);
            }
        }

        let mut engine = Self {
            doc,
            config,
            location: "http://localhost/".to_string(),
            states: HashMap::new(),
            request_cache: ParserCache::new(),
            trigger_cache: ParserCache::new(),
            timers: Timers::new(),
            now_ms: 0,
            ready: VecDeque::new(),
            commands: VecDeque::new(),
            next_request_id: 1,
            in_flight: HashMap::new(),
            pending_confirms: HashMap::new(),
            next_token: 1,
            listeners: HashMap::new(),
            next_listener: 1,
            event_listeners: Vec::new(),
            emitted: Vec::new(),
            extensions: Vec::new(),
            callbacks: HashMap::new(),
            user_agent: Box::new(NullUserAgent),
            visible: HashSet::new(),
            pending_swaps: HashMap::new(),
            pending_settles: HashMap::new(),
            next_job: 1,
        };
        let root = engine.doc.root();
        engine.process_tree(root);
        engine
    }

    pub fn with_user_agent(mut self, user_agent: Box<dyn UserAgent>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_location(&mut self, url: &str) {
        self.location = url.to_string();
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Register a handler for lifecycle events; `pattern` is an exact event
    /// name or `"*"`.
    pub fn on<F>(&mut self, pattern: &str, handler: F)
    where
        F: Fn(&EmittedEvent) -> EventOutcome + 'static,
    {
        self.event_listeners.push(Listener {
            pattern: pattern.to_string(),
            handler: Box::new(handler),
        });
    }

    /// Register a named callback for `p-on` attributes.
    pub fn register_callback<F>(&mut self, name: &str, callback: F)
    where
        F: Fn(&EmittedEvent) -> EventOutcome + 'static,
    {
        self.callbacks.insert(name.to_string(), Rc::new(callback));
    }

    pub fn register_extension(&mut self, extension: Rc<dyn Extension>) {
        self.extensions.push(extension);
    }

    /// Nodes with `revealed` triggers. The host should watch these and
    /// report transitions through [`Engine::set_visible`].
    pub fn visibility_requests(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .states
            .iter()
            .filter(|(_, s)| s.observed_visibility)
            .map(|(node, _)| *node)
            .collect();
        nodes.sort_unstable();
        nodes
    }

    /// Outbound commands accumulated since the last drain.
    pub fn drain_commands(&mut self) -> Vec<EngineCommand> {
        self.commands.drain(..).collect()
    }

    /// Lifecycle events accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<EmittedEvent> {
        std::mem::take(&mut self.emitted)
    }

    /// Advance the virtual clock, firing due timers in deadline order.
    pub fn advance(&mut self, ms: u64) {
        let target = self.now_ms.saturating_add(ms);
        self.run_ready();
        while let Some((deadline, task)) = self.timers.pop_due(target) {
            self.now_ms = deadline;
            self.run_timer(task);
            self.run_ready();
        }
        self.now_ms = target;
    }

    /// Run queued work (`load` triggers and similar) without moving time.
    pub fn pump(&mut self) {
        self.run_ready();
    }

    fn run_ready(&mut self) {
        while let Some(task) = self.ready.pop_front() {
            match task {
                ReadyTask::FireListener { listener, data } => {
                    self.run_listener(listener, &data);
                }
            }
        }
    }

    fn run_timer(&mut self, task: TimerTask) {
        match task {
            TimerTask::ListenerDelay { listener, data } => self.listener_timing(listener, data),
            TimerTask::ListenerDebounce { listener, data } => self.fire_debounced(listener, data),
            TimerTask::Poll { node, interval_ms } => self.fire_poll(node, interval_ms),
            TimerTask::FetchTimeout { request } => self.fire_fetch_timeout(request),
            TimerTask::ConfirmExpire { token } => self.expire_confirm(token),
            TimerTask::SwapDelay { job } => self.fire_swap_delay(job),
            TimerTask::SettleClear { job } => self.fire_settle(job),
        }
    }

    /// Emit one lifecycle event through extensions, global handlers, and the
    /// node's `p-on` callbacks. Returns false when a handler prevented the
    /// default action.
    pub(crate) fn emit_event(&mut self, event: EmittedEvent) -> bool {
        let mut allowed = true;
        for extension in &self.extensions {
            if extension.on_event(&event) == EventOutcome::Prevent {
                allowed = false;
            }
        }
        for listener in &self.event_listeners {
            if listener.matches(&event.name)
                && (listener.handler)(&event) == EventOutcome::Prevent
            {
                allowed = false;
            }
        }
        let named: Vec<String> = self
            .states
            .get(&event.node)
            .map(|s| {
                s.on_handlers
                    .iter()
                    .filter(|(name, _)| {
                        event.name == *name || event.name == format!("pulse:{name}")
                    })
                    .map(|(_, callback)| callback.clone())
                    .collect()
            })
            .unwrap_or_default();
        for name in named {
            match self.callbacks.get(&name) {
                Some(callback) => {
                    if callback(&event) == EventOutcome::Prevent {
                        allowed = false;
                    }
                }
                None => log::warn!("p-on names unknown callback \"{name}\""),
            }
        }
        log::debug!("event {} on {:?}", event.name, event.node);
        self.emitted.push(event);
        allowed
    }

    pub(crate) fn push_command(&mut self, command: EngineCommand) {
        self.commands.push_back(command);
    }

    pub(crate) fn query_first(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        let list = dom::SelectorList::parse(selector)?;
        dom::select_first(&self.doc, scope, &list)
    }

    pub(crate) fn query_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        match dom::SelectorList::parse(selector) {
            Some(list) => dom::select_all(&self.doc, scope, &list),
            None => Vec::new(),
        }
    }

    pub(crate) fn query_closest(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let list = dom::SelectorList::parse(selector)?;
        dom::closest(&self.doc, node, &list)
    }

    #[cfg(test)]
    pub(crate) fn for_tests(html: &str) -> Engine {
        let mut engine = Engine::new(html, Config::default());
        engine.pump();
        engine
    }
}

/// `"500"`, `"500ms"`, or `"2s"` to milliseconds.
pub(crate) fn parse_duration(value: &str) -> Option<u64> {
    let value = value.trim();
    if let Some(millis) = value.strip_suffix("ms") {
        return millis.trim().parse::<u64>().ok();
    }
    if let Some(seconds) = value.strip_suffix('s') {
        return seconds
            .trim()
            .parse::<f64>()
            .ok()
            .map(|s| (s * 1000.0).round() as u64);
    }
    value.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_values_accept_unit_suffixes() {
        assert_eq!(parse_duration("5000"), Some(5000));
        assert_eq!(parse_duration("2s"), Some(2000));
        assert_eq!(parse_duration("150ms"), Some(150));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn activates_elements_on_construction() {
        let engine = Engine::for_tests(
            "<button id=\"b\" p-request=\"GET /hello\">go</button>",
        );
        let button = engine.doc.element_by_id(engine.doc.root(), "b").unwrap();
        assert!(engine.states.contains_key(&button));
    }

    #[test]
    fn ignored_subtrees_are_not_activated() {
        let engine = Engine::for_tests(
            "<div p-ignore><button id=\"b\" p-request=\"GET /x\">go</button></div>",
        );
        let button = engine.doc.element_by_id(engine.doc.root(), "b").unwrap();
        assert!(!engine.states.contains_key(&button));
    }
}
