//! Per-node runtime state. Keyed off the DOM arena's node ids and dropped on
//! cleanup, so removed subtrees leak nothing.

use crate::commands::RequestId;
use crate::inherit::InheritedValues;
use crate::triggers::ListenerId;
use crate::timers::TimerId;
use grammar::ParsedRequest;
use std::collections::VecDeque;
use std::rc::Rc;

/// Everything a dispatch attempt carries from trigger to cleanup. Queued
/// attempts park the whole context and resume at the send phase.
#[derive(Clone)]
pub(crate) struct RequestContext {
    pub node: dom::NodeId,
    pub parsed: Rc<ParsedRequest>,
    pub inherited: InheritedValues,
    pub trigger_name: Option<String>,
    pub prompt_value: Option<String>,
    pub boosted: bool,
    /// Nodes the `disable` modifier touched; re-enabled on cleanup.
    pub disabled: Vec<dom::NodeId>,
    /// Indicator node the `indicator` modifier classed; cleared on cleanup.
    pub indicator: Option<dom::NodeId>,
}

impl RequestContext {
    pub fn new(node: dom::NodeId, parsed: Rc<ParsedRequest>, inherited: InheritedValues) -> Self {
        Self {
            node,
            parsed,
            inherited,
            trigger_name: None,
            prompt_value: None,
            boosted: false,
            disabled: Vec::new(),
            indicator: None,
        }
    }
}

#[derive(Default)]
pub(crate) struct NodeState {
    pub parsed_request: Option<Rc<ParsedRequest>>,
    pub inherited: InheritedValues,
    /// Request currently in flight for this node, if any.
    pub in_flight: Option<RequestId>,
    /// Attempts parked by the `sync` queue policies.
    pub queue: VecDeque<RequestContext>,
    /// Last seen input value, for the `changed` trigger guard.
    pub last_value: Option<String>,
    /// Event listeners owned by this node.
    pub listeners: Vec<ListenerId>,
    /// Driver timers (polling) owned by this node.
    pub timers: Vec<TimerId>,
    /// `p-on` pairs: lifecycle event name to named callback.
    pub on_handlers: Vec<(String, String)>,
    /// Set when a `revealed`/`intersect` clause is installed; the host should
    /// report visibility transitions for this node.
    pub observed_visibility: bool,
}
