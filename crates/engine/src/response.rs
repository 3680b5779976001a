//! Response pipeline: header directives, response-handling rules, fragment
//! parsing, out-of-band extraction, the swap itself, and settling.

use crate::commands::{EngineCommand, FetchResponse};
use crate::constants::{
    EV_AFTER_SETTLE, EV_AFTER_SWAP, EV_BEFORE_SWAP, EV_ERROR, HDR_LOCATION, HDR_PUSH,
    HDR_REDIRECT, HDR_REFRESH, HDR_REPLACE, HDR_RESELECT, HDR_RESWAP, HDR_RETARGET,
    HDR_TRIGGER_AFTER_SETTLE, HDR_TRIGGER_AFTER_SWAP, HDR_TRIGGER_RESP, ATTR_OOB,
};
use crate::events::EmittedEvent;
use crate::state::RequestContext;
use crate::swap::{free_fragment, perform_swap};
use crate::timers::TimerTask;
use crate::Engine;
use dom::NodeId;
use grammar::{modifier_value, HttpMethod, ParsedRequest, SwapBehavior, Target};
use std::rc::Rc;

pub(crate) struct OobEntry {
    pub selector: String,
    pub behavior: SwapBehavior,
    pub content: Vec<NodeId>,
}

/// Work parked by a swap delay; everything needed to finish the pipeline.
pub(crate) struct SwapJob {
    pub node: NodeId,
    pub target: NodeId,
    pub content: Vec<NodeId>,
    pub behavior: SwapBehavior,
    pub oob: Vec<OobEntry>,
    pub preserve_ids: Vec<String>,
    pub boosted: bool,
    pub push_url: Option<String>,
    pub replace_url: Option<String>,
    pub scroll: Option<String>,
    pub trigger_after_swap: Option<String>,
    pub trigger_after_settle: Option<String>,
}

pub(crate) struct SettleJob {
    pub node: NodeId,
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub trigger_after_settle: Option<String>,
}

impl Engine {
    pub(crate) fn process_response(&mut self, response: FetchResponse, ctx: &RequestContext) {
        // Header directives that preempt everything else.
        if let Some(value) = response.header(HDR_LOCATION) {
            let value = value.to_string();
            self.location_override(&value);
            return;
        }
        if let Some(url) = response.header(HDR_REDIRECT) {
            self.push_command(EngineCommand::Navigate(url.to_string()));
            return;
        }
        if response.header(HDR_REFRESH) == Some("true") {
            self.push_command(EngineCommand::Reload);
            return;
        }

        // Soft overrides.
        let retarget = response.header(HDR_RETARGET).map(str::to_string);
        let reswap = response.header(HDR_RESWAP).and_then(|v| {
            let parsed = SwapBehavior::parse(v);
            if parsed.is_none() {
                log::warn!("ignoring invalid P-Reswap value \"{v}\"");
            }
            parsed
        });
        let reselect = response.header(HDR_RESELECT).map(str::to_string);
        let push_url = response.header(HDR_PUSH).map(str::to_string);
        let replace_url = response.header(HDR_REPLACE).map(str::to_string);
        let trigger_now = response.header(HDR_TRIGGER_RESP).map(str::to_string);
        let trigger_after_swap = response.header(HDR_TRIGGER_AFTER_SWAP).map(str::to_string);
        let trigger_after_settle = response
            .header(HDR_TRIGGER_AFTER_SETTLE)
            .map(str::to_string);

        if let Some(spec) = trigger_now {
            self.server_triggers(&spec, ctx.node);
        }

        // Response-handling rules by status code.
        let rule = self.config.rule_for(response.status).cloned();
        let mut ignore_title = self.config.ignore_title;
        let mut rule_select = None;
        let mut rule_target = None;
        if let Some(rule) = &rule {
            if rule.error {
                let mut ev = EmittedEvent::new(EV_ERROR, ctx.node);
                ev.message = Some(format!("HTTP {}", response.status));
                ev.status = Some(response.status);
                self.emit_event(ev);
            }
            if !rule.swap {
                return;
            }
            ignore_title = ignore_title || rule.ignore_title;
            rule_select = rule.select.clone();
            rule_target = rule.target.clone();
        }

        let attr_target = self.effective_target(&ctx.parsed);
        let behavior = reswap.unwrap_or(attr_target.behavior);
        if response.body.is_empty()
            && !matches!(behavior, SwapBehavior::Remove | SwapBehavior::None)
        {
            return;
        }

        let mut body = response.body;
        for ext in &self.extensions {
            body = ext.transform_response(body, ctx.node);
        }

        // Parse into the live arena as detached roots.
        let mut content: Vec<NodeId> = if dom::is_full_document(&body) {
            let parsed = dom::parse_document(&mut self.doc, &body);
            if let (Some(live_head), Some(new_head)) =
                (self.live_head(), parsed.head)
            {
                crate::head::merge_head(&mut self.doc, live_head, new_head, ignore_title);
            }
            let scope = parsed.body.unwrap_or(parsed.container);
            let roots: Vec<NodeId> = self.doc.children(scope).to_vec();
            for root in &roots {
                self.doc.detach(*root);
            }
            self.doc.remove_subtree(parsed.container);
            roots
        } else {
            dom::parse_fragment(&mut self.doc, &body)
        };

        // Narrow to a selected element.
        let select = rule_select
            .or(reselect)
            .or_else(|| modifier_value(&ctx.parsed.modifiers, "select").map(str::to_string));
        if let Some(selector) = select {
            content = self.apply_select(content, &selector);
        }

        let oob = self.extract_oob(&mut content);

        // Resolve the swap target.
        let target = match rule_target.or(retarget) {
            Some(selector) => self.query_first(self.doc.root(), &selector),
            None => self.resolve_relative(ctx.node, &attr_target.selector),
        };
        // Unresolved targets fall back to the triggering node.
        let target = match target {
            Some(target) => target,
            None => {
                log::warn!("swap target not found; falling back to the triggering node");
                ctx.node
            }
        };
        if !self.doc.is_live(target) {
            free_fragment(&mut self.doc, content);
            for entry in oob {
                free_fragment(&mut self.doc, entry.content);
            }
            return;
        }

        // `:preserve` snapshots every id-bearing element under the target,
        // matched by id into the new content.
        let preserve_ids = if grammar::has_modifier(&ctx.parsed.modifiers, "preserve") {
            self.doc
                .descendant_elements(target)
                .into_iter()
                .filter_map(|el| self.doc.id_attr(el).map(str::to_string))
                .collect()
        } else {
            Vec::new()
        };

        if !self.emit_event(EmittedEvent::new(EV_BEFORE_SWAP, ctx.node)) {
            free_fragment(&mut self.doc, content);
            for entry in oob {
                free_fragment(&mut self.doc, entry.content);
            }
            return;
        }

        let job = SwapJob {
            node: ctx.node,
            target,
            content,
            behavior,
            oob,
            preserve_ids,
            boosted: ctx.boosted,
            push_url,
            replace_url,
            scroll: modifier_value(&ctx.parsed.modifiers, "scroll").map(str::to_string),
            trigger_after_swap,
            trigger_after_settle,
        };

        let delay = modifier_value(&ctx.parsed.modifiers, "swap")
            .and_then(crate::parse_duration)
            .unwrap_or(self.config.swap_delay_ms);
        if delay > 0 {
            let key = self.next_job;
            self.next_job += 1;
            self.pending_swaps.insert(key, job);
            self.timers
                .schedule(self.now_ms + delay, TimerTask::SwapDelay { job: key });
            return;
        }
        self.apply_swap_job(job);
    }

    pub(crate) fn apply_swap_job(&mut self, job: SwapJob) {
        if !self.doc.is_live(job.target) {
            free_fragment(&mut self.doc, job.content);
            for entry in job.oob {
                free_fragment(&mut self.doc, entry.content);
            }
            return;
        }

        // Detach preserved elements before the swap can free them.
        let mut preserved: Vec<(String, NodeId)> = Vec::new();
        for id in &job.preserve_ids {
            if let Some(el) = self.doc.element_by_id(job.target, id) {
                self.doc.detach(el);
                preserved.push((id.clone(), el));
            }
        }

        let swapping_class = self.config.swapping_class.clone();
        self.doc.add_class(job.target, &swapping_class);

        let claimed = {
            let doc = &mut self.doc;
            self.extensions
                .iter()
                .any(|ext| ext.handle_swap(job.behavior, doc, job.target, &job.content))
        };
        let inserted = if claimed {
            Vec::new()
        } else {
            perform_swap(&mut self.doc, job.target, job.content, job.behavior)
        };

        if self.doc.is_live(job.target) {
            self.doc.remove_class(job.target, &swapping_class);
        }

        // Put preserved elements back in place of their placeholders.
        let restore_scope = if self.doc.is_live(job.target) {
            job.target
        } else {
            self.doc.root()
        };
        for (id, el) in preserved {
            match self.doc.element_by_id(restore_scope, &id) {
                Some(placeholder) if placeholder != el => {
                    if let Some(parent) = self.doc.parent(placeholder) {
                        self.doc.insert_before(parent, el, placeholder);
                    }
                    self.doc.remove_subtree(placeholder);
                }
                Some(_) => {}
                None => self.doc.remove_subtree(el),
            }
        }

        // Out-of-band pieces land independently of the main target.
        for entry in job.oob {
            match self.query_first(self.doc.root(), &entry.selector) {
                Some(oob_target) => {
                    let added = perform_swap(&mut self.doc, oob_target, entry.content, entry.behavior);
                    self.activate_scripts(&added);
                }
                None => {
                    log::warn!("out-of-band target \"{}\" not found", entry.selector);
                    free_fragment(&mut self.doc, entry.content);
                }
            }
        }

        self.activate_scripts(&inserted);

        // Settle marks; cleared by timer.
        let settling_class = self.config.settling_class.clone();
        let added_class = self.config.added_class.clone();
        let mut added = Vec::new();
        if self.doc.is_live(job.target) {
            self.doc.add_class(job.target, &settling_class);
        }
        for root in &inserted {
            if !self.doc.is_live(*root) {
                continue;
            }
            if self.doc.is_element(*root) {
                self.doc.add_class(*root, &added_class);
                added.push(*root);
            }
            for el in self.doc.descendant_elements(*root) {
                self.doc.add_class(el, &added_class);
                added.push(el);
            }
        }
        let key = self.next_job;
        self.next_job += 1;
        self.pending_settles.insert(
            key,
            SettleJob {
                node: job.node,
                target: job.target,
                added,
                trigger_after_settle: job.trigger_after_settle,
            },
        );
        self.timers.schedule(
            self.now_ms + self.config.settle_delay_ms,
            TimerTask::SettleClear { job: key },
        );

        if let Some(spec) = &job.trigger_after_swap {
            let spec = spec.clone();
            self.server_triggers(&spec, job.node);
        }

        if let Some(url) = job.push_url {
            let url = self.resolve_location(&url);
            self.location = url.clone();
            self.push_command(EngineCommand::PushUrl(url));
        } else if let Some(url) = job.replace_url {
            let url = self.resolve_location(&url);
            self.location = url.clone();
            self.push_command(EngineCommand::ReplaceUrl(url));
        }

        if let Some(scroll) = &job.scroll {
            match scroll.as_str() {
                "top" => self.push_command(EngineCommand::ScrollTop),
                "bottom" => self.push_command(EngineCommand::ScrollBottom),
                selector => match self.query_first(self.doc.root(), selector) {
                    Some(found) => self.push_command(EngineCommand::ScrollIntoView(found)),
                    None => log::warn!("scroll target \"{selector}\" not found"),
                },
            }
        } else if job.boosted
            && self.config.scroll_into_view_on_boost
            && self.doc.is_live(job.target)
        {
            self.push_command(EngineCommand::ScrollIntoView(job.target));
        }

        // Anything the swap destroyed loses its runtime state.
        self.purge_dead();

        // Activate whatever the swap brought in.
        if self.doc.is_live(job.target) {
            self.process_tree(job.target);
        }

        self.emit_event(EmittedEvent::new(EV_AFTER_SWAP, job.node));
    }

    pub(crate) fn fire_settle(&mut self, key: u64) {
        let Some(job) = self.pending_settles.remove(&key) else {
            return;
        };
        let settling_class = self.config.settling_class.clone();
        let added_class = self.config.added_class.clone();
        if self.doc.is_live(job.target) {
            self.doc.remove_class(job.target, &settling_class);
        }
        for node in &job.added {
            if self.doc.is_live(*node) {
                self.doc.remove_class(*node, &added_class);
            }
        }
        if let Some(spec) = &job.trigger_after_settle {
            let spec = spec.clone();
            self.server_triggers(&spec, job.node);
        }
        self.emit_event(EmittedEvent::new(EV_AFTER_SETTLE, job.node));
    }

    pub(crate) fn fire_swap_delay(&mut self, key: u64) {
        if let Some(job) = self.pending_swaps.remove(&key) {
            self.apply_swap_job(job);
        }
    }

    /// Narrow fragment roots to the first element matching `selector`.
    fn apply_select(&mut self, content: Vec<NodeId>, selector: &str) -> Vec<NodeId> {
        let Some(list) = dom::SelectorList::parse(selector) else {
            log::warn!("invalid select selector \"{selector}\"");
            return content;
        };
        let mut found = None;
        for root in &content {
            if dom::matches(&self.doc, *root, &list) {
                found = Some(*root);
                break;
            }
            if let Some(hit) = dom::select_first(&self.doc, *root, &list) {
                found = Some(hit);
                break;
            }
        }
        let Some(found) = found else {
            log::warn!("select \"{selector}\" matched nothing in the response");
            return content;
        };
        self.doc.detach(found);
        for root in content {
            if root != found {
                self.doc.remove_subtree(root);
            }
        }
        vec![found]
    }

    /// Pull `p-oob` flagged elements out of the fragment. The flagged
    /// element's children become the out-of-band content.
    fn extract_oob(&mut self, content: &mut Vec<NodeId>) -> Vec<OobEntry> {
        let mut flagged = Vec::new();
        for root in content.iter() {
            if self.doc.has_attr(*root, ATTR_OOB) {
                flagged.push(*root);
            }
            for el in self.doc.descendant_elements(*root) {
                if self.doc.has_attr(el, ATTR_OOB) {
                    flagged.push(el);
                }
            }
        }

        let mut entries = Vec::new();
        for el in flagged {
            let Some(raw) = self.doc.attr(el, ATTR_OOB).map(str::to_string) else {
                continue;
            };
            let (selector, behavior) = parse_oob_value(&raw);
            let children: Vec<NodeId> = self.doc.children(el).to_vec();
            for child in &children {
                self.doc.detach(*child);
            }
            content.retain(|root| *root != el);
            self.doc.remove_subtree(el);
            entries.push(OobEntry {
                selector,
                behavior,
                content: children,
            });
        }
        entries
    }

    /// `P-Location`: a bare path or a JSON object with `path`, `target`,
    /// `swap`, and `headers`. Issues an internal GET instead of navigating.
    fn location_override(&mut self, value: &str) {
        let mut path = value.to_string();
        let mut target_selector = "body".to_string();
        let mut behavior = SwapBehavior::Replace;
        let mut headers: Vec<(String, String)> = Vec::new();
        if value.trim_start().starts_with('{') {
            match serde_json::from_str::<serde_json::Value>(value) {
                Ok(spec) => {
                    if let Some(p) = spec.get("path").and_then(|v| v.as_str()) {
                        path = p.to_string();
                    }
                    if let Some(t) = spec.get("target").and_then(|v| v.as_str()) {
                        target_selector = t.to_string();
                    }
                    if let Some(s) = spec.get("swap").and_then(|v| v.as_str()) {
                        if let Some(parsed) = SwapBehavior::parse(s) {
                            behavior = parsed;
                        }
                    }
                    if let Some(map) = spec.get("headers").and_then(|v| v.as_object()) {
                        for (name, v) in map {
                            if let Some(v) = v.as_str() {
                                headers.push((name.clone(), v.to_string()));
                            }
                        }
                    }
                }
                Err(err) => {
                    log::warn!("bad P-Location payload: {err}");
                    return;
                }
            }
        }

        let node = self
            .query_first(self.doc.root(), &target_selector)
            .or_else(|| self.doc.find_tag(self.doc.root(), "body"))
            .unwrap_or(self.doc.root());
        let parsed = ParsedRequest {
            headers,
            method: HttpMethod::Get,
            url: path,
            body: None,
            target: Target {
                selector: target_selector,
                behavior,
            },
            modifiers: Vec::new(),
        };
        let inherited = self.states.get(&node).map(|s| s.inherited.clone()).unwrap_or_default();
        let ctx = RequestContext::new(node, Rc::new(parsed), inherited);
        self.send(ctx);
    }

    /// Server-sent application events: a JSON object of name to detail, or
    /// a comma-separated list of names.
    pub(crate) fn server_triggers(&mut self, spec: &str, node: NodeId) {
        if spec.trim_start().starts_with('{') {
            if let Ok(serde_json::Value::Object(map)) =
                serde_json::from_str::<serde_json::Value>(spec)
            {
                for (name, detail) in map {
                    let mut ev = EmittedEvent::new(&name, node);
                    ev.detail = Some(detail.to_string());
                    self.emit_event(ev);
                }
                return;
            }
            log::warn!("bad server trigger payload: {spec}");
            return;
        }
        for name in spec.split(',') {
            let name = name.trim();
            if !name.is_empty() {
                self.emit_event(EmittedEvent::new(name, node));
            }
        }
    }

    /// Re-create script elements so the host re-executes them, or strip
    /// them when scripts are disallowed.
    fn activate_scripts(&mut self, roots: &[NodeId]) {
        let mut scripts = Vec::new();
        for root in roots {
            if !self.doc.is_live(*root) {
                continue;
            }
            if self.doc.tag_is(*root, "script") {
                scripts.push(*root);
            }
            for el in self.doc.descendant_elements(*root) {
                if self.doc.tag_is(el, "script") {
                    scripts.push(el);
                }
            }
        }
        for script in scripts {
            if !self.config.allow_script_tags {
                self.doc.remove_subtree(script);
                continue;
            }
            let attrs: Vec<(String, Option<String>)> = self.doc.attributes(script).to_vec();
            let text = self.doc.text_content(script);
            let fresh = self.doc.create_element("script");
            for (name, value) in attrs {
                match value {
                    Some(value) => self.doc.set_attr(fresh, &name, &value),
                    None => self.doc.set_bool_attr(fresh, &name),
                }
            }
            if !self.config.inline_script_nonce.is_empty() {
                let nonce = self.config.inline_script_nonce.clone();
                self.doc.set_attr(fresh, "nonce", &nonce);
            }
            if !text.is_empty() {
                let text_node = self.doc.create_text(&text);
                self.doc.append_child(fresh, text_node);
            }
            if let Some(parent) = self.doc.parent(script) {
                self.doc.insert_before(parent, fresh, script);
            }
            self.doc.remove_subtree(script);
        }
    }

    fn live_head(&self) -> Option<NodeId> {
        self.doc.find_tag(self.doc.root(), "head")
    }

    /// Resolve a history URL against the current location.
    fn resolve_location(&self, url: &str) -> String {
        match url::Url::parse(&self.location).and_then(|base| base.join(url)) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => url.to_string(),
        }
    }
}

fn parse_oob_value(raw: &str) -> (String, SwapBehavior) {
    let raw = raw.trim();
    if let Some(dot) = raw.rfind('.') {
        let (selector, suffix) = raw.split_at(dot);
        if let Some(behavior) = SwapBehavior::parse(&suffix[1..]) {
            if !selector.is_empty() {
                return (selector.to_string(), behavior);
            }
        }
    }
    (raw.to_string(), SwapBehavior::Replace)
}
