//! Trigger subsystem: event sources, guards, and the timing chain.

mod common;

use common::*;
use engine::EventData;

#[test]
fn inputs_default_to_the_input_event_and_submit_as_query_params() {
    let mut engine = engine_with(
        r#"<input id="q" name="q" value="ru" p-request="GET /search > #out">
           <div id="out"></div>"#,
    );
    let input = node(&engine, "q");
    engine.dispatch_event(input, "click", EventData::new());
    assert!(take_fetches(&mut engine).is_empty());

    engine.dispatch_event(input, "input", EventData::new());
    let fetches = take_fetches(&mut engine);
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].url, "http://localhost/search?q=ru");
}

#[test]
fn polling_fires_on_the_interval_and_keeps_going() {
    let mut engine = engine_with(
        r#"<div id="feed" p-request="GET /news > #feed" p-trigger="every 1s">...</div>"#,
    );
    assert!(take_fetches(&mut engine).is_empty());

    engine.advance(1000);
    let first = take_fetches(&mut engine);
    assert_eq!(first.len(), 1);
    respond(&mut engine, &first[0], 200, "<p>latest</p>");

    engine.advance(1000);
    assert_eq!(take_fetches(&mut engine).len(), 1);
}

#[test]
fn load_triggers_fire_on_the_first_pump() {
    let mut engine = engine_with(
        r#"<div id="lazy" p-request="GET /panel > #lazy" p-trigger="load">...</div>"#,
    );
    let fetches = take_fetches(&mut engine);
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].url, "http://localhost/panel");
}

#[test]
fn revealed_fires_only_on_the_hidden_to_visible_transition() {
    let mut engine = engine_with(
        r#"<div id="lazy" p-request="GET /panel > #lazy" p-trigger="revealed">...</div>"#,
    );
    let lazy = node(&engine, "lazy");
    assert_eq!(engine.visibility_requests(), vec![lazy]);

    engine.set_visible(lazy, true);
    let first = take_fetches(&mut engine);
    assert_eq!(first.len(), 1);
    respond(&mut engine, &first[0], 200, "<p>here</p>");

    // still visible: no re-fire
    engine.set_visible(lazy, true);
    assert!(take_fetches(&mut engine).is_empty());

    engine.set_visible(lazy, false);
    engine.set_visible(lazy, true);
    assert_eq!(take_fetches(&mut engine).len(), 1);
}

#[test]
fn debounce_collapses_a_burst_into_one_request() {
    let mut engine = engine_with(
        r#"<input id="q" name="q" value="r" p-request="GET /search > #out"
                  p-trigger="input debounce 300ms">
           <div id="out"></div>"#,
    );
    let input = node(&engine, "q");

    engine.dispatch_event(input, "input", EventData::new());
    engine.advance(100);
    engine.dispatch_event(input, "input", EventData::new());
    engine.advance(299);
    assert!(take_fetches(&mut engine).is_empty());

    engine.advance(1);
    assert_eq!(take_fetches(&mut engine).len(), 1);
}

#[test]
fn throttle_drops_events_inside_the_window() {
    let mut engine = engine_with(
        r#"<button id="b" p-request="GET /x > #out" p-trigger="click throttle 1s">go</button>
           <div id="out"></div>"#,
    );
    click(&mut engine, "b");
    assert_eq!(take_fetches(&mut engine).len(), 1);

    engine.advance(500);
    click(&mut engine, "b");
    assert!(take_fetches(&mut engine).is_empty());

    engine.advance(500);
    click(&mut engine, "b");
    assert_eq!(take_fetches(&mut engine).len(), 1);
}

#[test]
fn delay_postpones_the_dispatch() {
    let mut engine = engine_with(
        r#"<button id="b" p-request="GET /x > #out" p-trigger="click delay 500ms">go</button>
           <div id="out"></div>"#,
    );
    click(&mut engine, "b");
    assert!(take_fetches(&mut engine).is_empty());

    engine.advance(500);
    assert_eq!(take_fetches(&mut engine).len(), 1);
}

#[test]
fn once_fires_a_single_time() {
    let mut engine = engine_with(
        r#"<button id="b" p-request="GET /x > #out" p-trigger="click once">go</button>
           <div id="out"></div>"#,
    );
    click(&mut engine, "b");
    let first = take_fetches(&mut engine);
    assert_eq!(first.len(), 1);
    respond(&mut engine, &first[0], 200, "<b>done</b>");

    click(&mut engine, "b");
    assert!(take_fetches(&mut engine).is_empty());
}

#[test]
fn changed_requires_the_value_to_move() {
    let mut engine = engine_with(
        r#"<input id="q" name="q" value="a" p-request="GET /search > #out"
                  p-trigger="input changed">
           <div id="out"></div>"#,
    );
    let input = node(&engine, "q");

    engine.dispatch_event(input, "input", EventData::new());
    let first = take_fetches(&mut engine);
    assert_eq!(first.len(), 1);
    respond(&mut engine, &first[0], 200, "<p>a</p>");

    engine.dispatch_event(input, "input", EventData::new());
    assert!(take_fetches(&mut engine).is_empty());

    engine.doc.set_attr(input, "value", "ab");
    engine.dispatch_event(input, "input", EventData::new());
    assert_eq!(take_fetches(&mut engine).len(), 1);
}

#[test]
fn filter_expressions_gate_on_event_bindings() {
    let mut engine = engine_with(
        r#"<button id="b" p-request="GET /x > #out" p-trigger="click[ctrlKey]">go</button>
           <div id="out"></div>"#,
    );
    let button = node(&engine, "b");

    engine.dispatch_event(button, "click", EventData::new().with_bool("ctrlKey", false));
    assert!(take_fetches(&mut engine).is_empty());

    engine.dispatch_event(button, "click", EventData::new().with_bool("ctrlKey", true));
    assert_eq!(take_fetches(&mut engine).len(), 1);
}

#[test]
fn from_clause_listens_on_another_element() {
    let mut engine = engine_with(
        r#"<button id="other">elsewhere</button>
           <div id="panel" p-request="GET /panel > #panel" p-trigger="click from #other">x</div>"#,
    );
    click(&mut engine, "panel");
    assert!(take_fetches(&mut engine).is_empty());

    click(&mut engine, "other");
    let fetches = take_fetches(&mut engine);
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].url, "http://localhost/panel");
}

#[test]
fn consume_stops_the_event_from_bubbling() {
    let mut engine = engine_with(
        r#"<div id="outer" p-request="GET /outer > #out">
             <button id="inner" p-request="GET /inner > #out" p-trigger="click consume">go</button>
           </div>
           <div id="out"></div>"#,
    );
    click(&mut engine, "inner");
    let fetches = take_fetches(&mut engine);
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].url, "http://localhost/inner");
}

#[test]
fn events_bubble_to_ancestor_listeners() {
    let mut engine = engine_with(
        r#"<div id="outer" p-request="GET /outer > #out">
             <button id="inner">plain</button>
           </div>
           <div id="out"></div>"#,
    );
    click(&mut engine, "inner");
    let fetches = take_fetches(&mut engine);
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].url, "http://localhost/outer");
}
