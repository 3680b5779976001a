//! Fetch request assembly: header merge, URL resolution, and body
//! collection from form controls.
//!
//! Header precedence, lowest to highest: engine-generated headers,
//! inherited headers (farthest ancestor first), then the node's own
//! explicit headers.

use crate::commands::{FetchBody, FetchRequest};
use crate::constants::{
    HDR_BOOSTED, HDR_CURRENT_URL, HDR_PROMPT, HDR_REQUEST, HDR_TARGET, HDR_TRIGGER,
    HDR_TRIGGER_NAME,
};
use crate::state::RequestContext;
use crate::Engine;
use dom::NodeId;
use grammar::{has_modifier, FilterMode, HttpMethod, ParsedBody, ParsedRequest, Target};
use url::Url;

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    if let Some(slot) = headers
        .iter_mut()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
    {
        slot.1 = value.to_string();
    } else {
        headers.push((name.to_string(), value.to_string()));
    }
}

fn append_query(url: &mut String, fields: &[(String, String)]) {
    if let Ok(mut parsed) = Url::parse(url) {
        {
            let mut pairs = parsed.query_pairs_mut();
            for (name, value) in fields {
                pairs.append_pair(name, value);
            }
        }
        *url = parsed.to_string();
        return;
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(&query);
}

impl Engine {
    pub(crate) fn build_fetch_request(
        &mut self,
        ctx: &mut RequestContext,
    ) -> Result<FetchRequest, String> {
        let mut headers: Vec<(String, String)> = Vec::new();
        set_header(&mut headers, HDR_REQUEST, "true");
        set_header(&mut headers, HDR_CURRENT_URL, &self.location);

        // The target's element id; omitted when the target has none.
        let target_selector = self.effective_target(&ctx.parsed).selector;
        if let Some(id) = self
            .resolve_relative(ctx.node, &target_selector)
            .and_then(|target| self.doc.id_attr(target))
        {
            let id = id.to_string();
            set_header(&mut headers, HDR_TARGET, &id);
        }
        if let Some(id) = self.doc.id_attr(ctx.node) {
            set_header(&mut headers, HDR_TRIGGER, &id);
        }
        if let Some(name) = &ctx.trigger_name {
            set_header(&mut headers, HDR_TRIGGER_NAME, name);
        }
        if ctx.boosted {
            set_header(&mut headers, HDR_BOOSTED, "true");
        }
        if let Some(prompt) = &ctx.prompt_value {
            set_header(&mut headers, HDR_PROMPT, prompt);
        }
        for (name, value) in &ctx.inherited.headers {
            set_header(&mut headers, name, value);
        }
        for (name, value) in &ctx.parsed.headers {
            set_header(&mut headers, name, value);
        }

        let mut url = match Url::parse(&self.location).and_then(|base| base.join(&ctx.parsed.url))
        {
            Ok(resolved) => resolved.to_string(),
            Err(_) => ctx.parsed.url.clone(),
        };

        let fields = self.body_fields(ctx);
        let method = ctx.parsed.method;
        let multipart = has_modifier(&ctx.parsed.modifiers, "multipart");
        let body = match method {
            HttpMethod::Get | HttpMethod::Delete => {
                if !fields.is_empty() {
                    append_query(&mut url, &fields);
                }
                None
            }
            _ if fields.is_empty() => None,
            _ if multipart => Some(FetchBody::Form(fields)),
            _ => {
                let mut map = serde_json::Map::new();
                for (name, value) in fields {
                    map.insert(name, serde_json::Value::String(value));
                }
                set_header(&mut headers, "Content-Type", "application/json");
                Some(FetchBody::Json(serde_json::Value::Object(map).to_string()))
            }
        };

        let id = self.next_request_id;
        self.next_request_id += 1;
        Ok(FetchRequest {
            id,
            method,
            url,
            headers,
            body,
            with_credentials: self.config.with_credentials,
        })
    }

    /// The parsed target, or the configured default when the attribute left
    /// it at the grammar default.
    pub(crate) fn effective_target(&self, parsed: &ParsedRequest) -> Target {
        if parsed.target == Target::default() {
            Target {
                selector: self.config.default_target.clone(),
                behavior: self.config.default_swap,
            }
        } else {
            parsed.target.clone()
        }
    }

    /// Resolve a selector relative to a node: `this`, `closest X`, `find X`,
    /// or a document-wide query.
    pub(crate) fn resolve_relative(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        let selector = selector.trim();
        if selector == "this" || selector.is_empty() {
            return Some(node);
        }
        if let Some(rest) = selector.strip_prefix("closest ") {
            return self.query_closest(node, rest.trim());
        }
        if let Some(rest) = selector.strip_prefix("find ") {
            return self.query_first(node, rest.trim());
        }
        if selector == "document" || selector == "body" {
            return self
                .doc
                .find_tag(self.doc.root(), "body")
                .or(Some(self.doc.root()));
        }
        self.query_first(self.doc.root(), selector)
    }

    fn body_fields(&self, ctx: &RequestContext) -> Vec<(String, String)> {
        match &ctx.parsed.body {
            None => self.default_fields(ctx.node),
            Some(ParsedBody::Json(pairs)) => pairs.clone(),
            Some(ParsedBody::Selectors(selectors)) => {
                let mut fields = Vec::new();
                for selector in selectors {
                    match self.resolve_relative(ctx.node, selector) {
                        Some(found) => fields.extend(self.collect_fields(found)),
                        None => log::warn!("body selector \"{selector}\" matched nothing"),
                    }
                }
                fields
            }
            Some(ParsedBody::Filter { mode, fields: names }) => {
                let mut fields = self.default_fields(ctx.node);
                match mode {
                    FilterMode::Only => fields.retain(|(n, _)| names.contains(n)),
                    FilterMode::Not => fields.retain(|(n, _)| !names.contains(n)),
                }
                fields
            }
        }
    }

    fn default_fields(&self, node: NodeId) -> Vec<(String, String)> {
        // the enclosing form when there is one, the control itself otherwise
        let scope = self.query_closest(node, "form").unwrap_or(node);
        self.collect_fields(scope)
    }

    pub(crate) fn collect_fields(&self, root: NodeId) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        if let Some(own) = self.control_field(root) {
            fields.push(own);
        }
        for el in self.doc.descendant_elements(root) {
            if let Some(field) = self.control_field(el) {
                fields.push(field);
            }
        }
        fields
    }

    fn control_field(&self, node: NodeId) -> Option<(String, String)> {
        let name = self.doc.attr(node, "name")?.to_string();
        if name.is_empty() {
            return None;
        }
        let value = self.control_value(node)?;
        Some((name, value))
    }

    fn control_value(&self, node: NodeId) -> Option<String> {
        if self.doc.tag_is(node, "input") {
            let kind = self.doc.attr(node, "type").unwrap_or_default();
            return match kind {
                "checkbox" | "radio" => {
                    if !self.doc.has_attr(node, "checked") {
                        return None;
                    }
                    Some(
                        self.doc
                            .attr(node, "value")
                            .unwrap_or("on")
                            .to_string(),
                    )
                }
                "submit" | "button" | "reset" | "file" | "image" => None,
                _ => Some(self.doc.attr(node, "value").unwrap_or_default().to_string()),
            };
        }
        if self.doc.tag_is(node, "textarea") {
            return Some(self.doc.text_content(node));
        }
        if self.doc.tag_is(node, "select") {
            let options: Vec<NodeId> = self
                .doc
                .descendant_elements(node)
                .into_iter()
                .filter(|o| self.doc.tag_is(*o, "option"))
                .collect();
            let chosen = options
                .iter()
                .find(|o| self.doc.has_attr(**o, "selected"))
                .or_else(|| options.first())?;
            return Some(match self.doc.attr(*chosen, "value") {
                Some(value) => value.to_string(),
                None => self.doc.text_content(*chosen),
            });
        }
        None
    }

    /// Required-control check for the `validate` modifier.
    pub(crate) fn form_is_valid(&self, node: NodeId) -> bool {
        let scope = self.query_closest(node, "form").unwrap_or(node);
        let mut controls = vec![scope];
        controls.extend(self.doc.descendant_elements(scope));
        for el in controls {
            if !self.doc.has_attr(el, "required") {
                continue;
            }
            let filled = match self.control_value(el) {
                Some(value) => !value.is_empty(),
                None => false,
            };
            if !filled {
                return false;
            }
        }
        true
    }
}
