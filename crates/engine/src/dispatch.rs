//! Request dispatch controller: pre-request modifiers, the cancelable
//! before gate, per-node concurrency policy, send, and post-request
//! cleanup with queue release.

use crate::commands::{EngineCommand, FetchResponse, RequestId};
use crate::constants::{EV_AFTER_REQUEST, EV_BEFORE, EV_BEFORE_SEND, EV_CONFIRM, EV_ERROR};
use crate::events::{EmittedEvent, EventData};
use crate::state::RequestContext;
use crate::timers::TimerTask;
use crate::Engine;
use dom::NodeId;
use grammar::{get_modifier, has_modifier, modifier_value};

pub(crate) struct InFlight {
    pub ctx: RequestContext,
    pub timeout_timer: Option<crate::timers::TimerId>,
}

pub(crate) struct PendingConfirm {
    pub ctx: RequestContext,
    pub timer: crate::timers::TimerId,
}

impl Engine {
    /// Start a dispatch attempt for a node. `event` carries the trigger's
    /// bindings when an actual page event fired it.
    pub fn dispatch(&mut self, node: NodeId, event: Option<EventData>) {
        let _ = event;
        let Some(state) = self.states.get(&node) else {
            return;
        };
        let Some(parsed) = state.parsed_request.clone() else {
            return;
        };
        let inherited = state.inherited.clone();
        let mut ctx = RequestContext::new(node, parsed, inherited);
        ctx.boosted = ctx.inherited.boost == Some(true);
        ctx.trigger_name = self.doc.attr(node, "name").map(str::to_string);

        if let Some(confirm) = get_modifier(&ctx.parsed.modifiers, "confirm") {
            let message = confirm
                .value
                .clone()
                .unwrap_or_else(|| "Are you sure?".to_string());
            let token = self.next_token;
            self.next_token += 1;
            let mut ev = EmittedEvent::new(EV_CONFIRM, node);
            ev.message = Some(message.clone());
            ev.confirm_token = Some(token);
            if !self.emit_event(ev) {
                // a handler took ownership of the confirmation; park the
                // attempt until resolve_confirm or the safety timer
                let deadline = self.now_ms + self.config.confirm_timeout_ms;
                let timer = self
                    .timers
                    .schedule(deadline, TimerTask::ConfirmExpire { token });
                self.pending_confirms
                    .insert(token, PendingConfirm { ctx, timer });
                return;
            }
            if !self.user_agent.confirm(&message) {
                return;
            }
        }

        self.continue_premodifiers(ctx);
    }

    /// Resolve an externally held confirmation.
    pub fn resolve_confirm(&mut self, token: u64, approved: bool) {
        let Some(pending) = self.pending_confirms.remove(&token) else {
            return;
        };
        self.timers.cancel(pending.timer);
        if approved {
            self.continue_premodifiers(pending.ctx);
        }
    }

    pub(crate) fn expire_confirm(&mut self, token: u64) {
        if self.pending_confirms.remove(&token).is_some() {
            log::warn!("confirmation {token} expired unresolved");
        }
    }

    fn continue_premodifiers(&mut self, mut ctx: RequestContext) {
        if let Some(prompt) = get_modifier(&ctx.parsed.modifiers, "prompt") {
            let message = prompt.value.clone().unwrap_or_default();
            match self.user_agent.prompt(&message) {
                Some(value) => ctx.prompt_value = Some(value),
                None => return,
            }
        }

        if has_modifier(&ctx.parsed.modifiers, "validate") && !self.form_is_valid(ctx.node) {
            self.push_command(EngineCommand::ReportValidity(ctx.node));
            return;
        }

        if let Some(disable) = get_modifier(&ctx.parsed.modifiers, "disable") {
            // selector form scopes to the triggering element's subtree
            let targets = match disable.value.as_deref() {
                Some(selector) => self.query_all(ctx.node, selector),
                None => vec![ctx.node],
            };
            for target in &targets {
                self.doc.set_bool_attr(*target, "disabled");
            }
            ctx.disabled = targets;
        }

        if let Some(selector) = modifier_value(&ctx.parsed.modifiers, "indicator") {
            let request_class = self.config.request_class.clone();
            self.doc.add_class(ctx.node, &request_class);
            let selector = selector.to_string();
            if let Some(indicator) = self.query_first(self.doc.root(), &selector) {
                let class = self.config.indicator_class.clone();
                self.doc.add_class(indicator, &class);
                ctx.indicator = Some(indicator);
            }
        }

        self.gate_and_send(ctx);
    }

    /// The cancelable before gate, then the per-node sync policy.
    fn gate_and_send(&mut self, ctx: RequestContext) {
        if !self.emit_event(EmittedEvent::new(EV_BEFORE, ctx.node)) {
            self.cleanup_post(&ctx);
            return;
        }

        let policy = modifier_value(&ctx.parsed.modifiers, "sync")
            .unwrap_or("abort")
            .to_string();
        let in_flight = self.states.get(&ctx.node).and_then(|s| s.in_flight);

        match policy.as_str() {
            "drop" => {
                if in_flight.is_some() {
                    self.cleanup_post(&ctx);
                    return;
                }
            }
            "queue" | "queue:all" => {
                if in_flight.is_some() {
                    if let Some(state) = self.states.get_mut(&ctx.node) {
                        state.queue.push_back(ctx);
                    }
                    return;
                }
            }
            "queue:first" => {
                if in_flight.is_some() {
                    let occupied = self
                        .states
                        .get(&ctx.node)
                        .is_some_and(|s| !s.queue.is_empty());
                    if occupied {
                        // a slot is already waiting; this attempt is a no-op
                        self.cleanup_post(&ctx);
                        return;
                    }
                    if let Some(state) = self.states.get_mut(&ctx.node) {
                        state.queue.push_back(ctx);
                    }
                    return;
                }
            }
            "queue:last" => {
                if in_flight.is_some() {
                    let dropped: Vec<RequestContext> = self
                        .states
                        .get_mut(&ctx.node)
                        .map(|s| s.queue.drain(..).collect())
                        .unwrap_or_default();
                    for old in &dropped {
                        self.cleanup_post(old);
                    }
                    if let Some(state) = self.states.get_mut(&ctx.node) {
                        state.queue.push_back(ctx);
                    }
                    return;
                }
            }
            _ => {
                // "abort" and anything unrecognized: supersede the in-flight
                // attempt
                if let Some(id) = in_flight {
                    self.cancel_in_flight(id);
                }
            }
        }

        self.send(ctx);
    }

    pub(crate) fn send(&mut self, mut ctx: RequestContext) {
        if !self.emit_event(EmittedEvent::new(EV_BEFORE_SEND, ctx.node)) {
            self.finish_attempt(ctx);
            return;
        }

        let request = match self.build_fetch_request(&mut ctx) {
            Ok(request) => request,
            Err(message) => {
                let mut ev = EmittedEvent::new(EV_ERROR, ctx.node);
                ev.message = Some(message);
                self.emit_event(ev);
                self.finish_attempt(ctx);
                return;
            }
        };

        let timeout_ms = modifier_value(&ctx.parsed.modifiers, "timeout")
            .and_then(crate::parse_duration)
            .unwrap_or(self.config.timeout_ms);
        let id = request.id;
        let timer = if timeout_ms > 0 {
            Some(self.timers.schedule(
                self.now_ms + timeout_ms,
                TimerTask::FetchTimeout { request: id },
            ))
        } else {
            None
        };

        if let Some(state) = self.states.get_mut(&ctx.node) {
            state.in_flight = Some(id);
        }
        self.in_flight.insert(
            id,
            InFlight {
                ctx,
                timeout_timer: timer,
            },
        );
        self.push_command(EngineCommand::Fetch(request));
    }

    /// Host callback with the outcome of a previously issued fetch. Replies
    /// for cancelled or timed-out requests are ignored.
    pub fn complete_fetch(&mut self, id: RequestId, result: Result<FetchResponse, String>) {
        let Some(entry) = self.in_flight.remove(&id) else {
            return;
        };
        if let Some(timer) = entry.timeout_timer {
            self.timers.cancel(timer);
        }
        if let Some(state) = self.states.get_mut(&entry.ctx.node) {
            if state.in_flight == Some(id) {
                state.in_flight = None;
            }
        }

        match result {
            Ok(response) => {
                let status = response.status;
                let successful = response.ok();
                self.process_response(response, &entry.ctx);
                let mut ev = EmittedEvent::new(EV_AFTER_REQUEST, entry.ctx.node);
                ev.status = Some(status);
                ev.successful = Some(successful);
                self.emit_event(ev);
            }
            Err(message) => {
                let mut ev = EmittedEvent::new(EV_ERROR, entry.ctx.node);
                ev.message = Some(message);
                self.emit_event(ev);
            }
        }

        self.finish_attempt(entry.ctx);
    }

    /// Abort the in-flight request without releasing the node's queue; the
    /// caller is about to occupy the slot itself.
    pub(crate) fn cancel_in_flight(&mut self, id: RequestId) {
        let Some(entry) = self.in_flight.remove(&id) else {
            return;
        };
        if let Some(timer) = entry.timeout_timer {
            self.timers.cancel(timer);
        }
        if let Some(state) = self.states.get_mut(&entry.ctx.node) {
            if state.in_flight == Some(id) {
                state.in_flight = None;
            }
        }
        self.push_command(EngineCommand::CancelFetch(id));
        self.cleanup_post(&entry.ctx);
    }

    pub(crate) fn fire_fetch_timeout(&mut self, id: RequestId) {
        let Some(entry) = self.in_flight.remove(&id) else {
            return;
        };
        if let Some(state) = self.states.get_mut(&entry.ctx.node) {
            if state.in_flight == Some(id) {
                state.in_flight = None;
            }
        }
        self.push_command(EngineCommand::CancelFetch(id));
        log::warn!("request {id} timed out");
        self.finish_attempt(entry.ctx);
    }

    /// Post-request cleanup, then release exactly one queued attempt.
    pub(crate) fn finish_attempt(&mut self, ctx: RequestContext) {
        self.cleanup_post(&ctx);
        let next = self
            .states
            .get_mut(&ctx.node)
            .and_then(|s| s.queue.pop_front());
        if let Some(next) = next {
            self.send(next);
        }
    }

    /// Reverse disable/indicator marks. Idempotent.
    pub(crate) fn cleanup_post(&mut self, ctx: &RequestContext) {
        let request_class = self.config.request_class.clone();
        self.doc.remove_class(ctx.node, &request_class);
        for node in &ctx.disabled {
            self.doc.remove_attr(*node, "disabled");
        }
        if let Some(indicator) = ctx.indicator {
            let class = self.config.indicator_class.clone();
            self.doc.remove_class(indicator, &class);
        }
    }
}
