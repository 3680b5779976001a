//! Pulse: a declarative hypermedia engine.
//!
//! Elements describe HTTP requests and content swaps in `p-*` attributes;
//! the engine parses them, listens for triggers, talks to the server
//! through its host, and swaps response fragments into the page.
//!
//! ```no_run
//! use pulse::{Config, Engine, FetchResponse};
//!
//! let mut engine = Engine::new(
//!     r#"<button id="save" p-request="POST /save > #status">Save</button>
//!        <div id="status"></div>"#,
//!     Config::default(),
//! );
//! let button = engine.doc.element_by_id(engine.doc.root(), "save").unwrap();
//! engine.dispatch_event(button, "click", pulse::EventData::new());
//!
//! // the host executes the fetch and reports back
//! for command in engine.drain_commands() {
//!     if let pulse::EngineCommand::Fetch(request) = command {
//!         engine.complete_fetch(request.id, Ok(FetchResponse::new(200, "<b>saved</b>")));
//!     }
//! }
//! ```

pub use dom;
pub use engine::{
    Config, EmittedEvent, Engine, EngineCommand, EventData, EventHandler, EventOutcome,
    Extension, FetchBody, FetchRequest, FetchResponse, NullUserAgent, RequestId, ResponseRule,
    UserAgent,
};
pub use grammar;
pub use net;
