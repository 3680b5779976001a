//! Outbound command queue. The engine never performs IO or touches the host
//! page itself; it records what the host should do and the host drains the
//! queue after each call into the engine.

use dom::NodeId;
use grammar::HttpMethod;

pub type RequestId = u64;

#[derive(Clone, Debug, PartialEq)]
pub enum FetchBody {
    /// Serialized JSON object.
    Json(String),
    /// Multipart form fields.
    Form(Vec<(String, String)>),
}

/// A network request the host must execute. Completion comes back through
/// [`crate::Engine::complete_fetch`] with the same id.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
    pub id: RequestId,
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<FetchBody>,
    pub with_credentials: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EngineCommand {
    Fetch(FetchRequest),
    CancelFetch(RequestId),
    /// Full navigation to a new URL.
    Navigate(String),
    Reload,
    PushUrl(String),
    ReplaceUrl(String),
    ScrollTop,
    ScrollBottom,
    ScrollIntoView(NodeId),
    /// Ask the host to surface native validation UI for the node.
    ReportValidity(NodeId),
}
