#![allow(dead_code)]

use engine::{Config, Engine, EngineCommand, EventData, FetchRequest, FetchResponse};

pub fn engine_with(html: &str) -> Engine {
    let mut engine = Engine::new(html, Config::default());
    engine.pump();
    engine
}

pub fn node(engine: &Engine, id: &str) -> dom::NodeId {
    engine
        .doc
        .element_by_id(engine.doc.root(), id)
        .unwrap_or_else(|| panic!("no element #{id}"))
}

pub fn click(engine: &mut Engine, id: &str) {
    let target = node(engine, id);
    engine.dispatch_event(target, "click", EventData::new());
}

/// Fetch commands issued since the last drain; non-fetch commands are
/// dropped.
pub fn take_fetches(engine: &mut Engine) -> Vec<FetchRequest> {
    engine
        .drain_commands()
        .into_iter()
        .filter_map(|command| match command {
            EngineCommand::Fetch(request) => Some(request),
            _ => None,
        })
        .collect()
}

pub fn respond(engine: &mut Engine, request: &FetchRequest, status: u16, body: &str) {
    engine.complete_fetch(request.id, Ok(FetchResponse::new(status, body)));
}

pub fn event_names(engine: &mut Engine) -> Vec<String> {
    engine
        .drain_events()
        .into_iter()
        .map(|event| event.name)
        .collect()
}

pub fn header<'a>(request: &'a FetchRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

pub fn text_of(engine: &Engine, id: &str) -> String {
    let target = node(engine, id);
    engine.doc.text_content(target)
}
