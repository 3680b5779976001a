//! Extension seams. An extension can rewrite response text before parsing,
//! claim a swap behavior outright, and observe (or veto) lifecycle events.

use crate::events::{EmittedEvent, EventOutcome};
use dom::{Document, NodeId};
use grammar::SwapBehavior;

pub trait Extension {
    fn name(&self) -> &str;

    /// Rewrite the raw response body before it is parsed. `node` is the
    /// element that initiated the request.
    fn transform_response(&self, body: String, node: NodeId) -> String {
        let _ = node;
        body
    }

    /// Take over a swap. Return `true` to claim it; the engine then skips
    /// its own mutation. `content` holds the detached fragment roots.
    fn handle_swap(
        &self,
        behavior: SwapBehavior,
        doc: &mut Document,
        target: NodeId,
        content: &[NodeId],
    ) -> bool {
        let _ = (behavior, doc, target, content);
        false
    }

    /// Observe a lifecycle event; `Prevent` vetoes cancelable events.
    fn on_event(&self, event: &EmittedEvent) -> EventOutcome {
        let _ = event;
        EventOutcome::Continue
    }
}
