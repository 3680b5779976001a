//! Lifecycle notifications and host event input.
//!
//! Outbound: every notable point in a request's life emits an
//! [`EmittedEvent`]. Registered handlers see it synchronously and may veto
//! cancelable events by returning [`EventOutcome::Prevent`]; the engine also
//! appends every event to a log the host can drain.
//!
//! Inbound: the host feeds page events in as [`EventData`], a name plus the
//! bindings trigger filters can reference (`ctrlKey`, `key`, `value`, ...).

use dom::NodeId;
use grammar::expr::{Bindings, Value};

#[derive(Clone, Debug, Default)]
pub struct EventData {
    pub bindings: Bindings,
}

impl EventData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bool(mut self, name: &str, value: bool) -> Self {
        self.bindings.insert(name.to_string(), Value::Bool(value));
        self
    }

    pub fn with_str(mut self, name: &str, value: &str) -> Self {
        self.bindings
            .insert(name.to_string(), Value::Str(value.to_string()));
        self
    }

    pub fn with_num(mut self, name: &str, value: f64) -> Self {
        self.bindings.insert(name.to_string(), Value::Num(value));
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmittedEvent {
    pub name: String,
    /// Node the event is about; the document root for page-level events.
    pub node: NodeId,
    pub message: Option<String>,
    pub status: Option<u16>,
    pub successful: Option<bool>,
    /// Set on `pulse:confirm`; pass to [`crate::Engine::resolve_confirm`].
    pub confirm_token: Option<u64>,
    /// JSON detail payload for server-triggered events.
    pub detail: Option<String>,
}

impl EmittedEvent {
    pub(crate) fn new(name: &str, node: NodeId) -> Self {
        Self {
            name: name.to_string(),
            node,
            message: None,
            status: None,
            successful: None,
            confirm_token: None,
            detail: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Continue,
    /// Cancel the default action; only meaningful for cancelable events.
    Prevent,
}

pub type EventHandler = Box<dyn Fn(&EmittedEvent) -> EventOutcome>;

pub(crate) struct Listener {
    /// Exact event name, or "*" for all.
    pub pattern: String,
    pub handler: EventHandler,
}

impl Listener {
    pub fn matches(&self, name: &str) -> bool {
        self.pattern == "*" || self.pattern == name
    }
}
