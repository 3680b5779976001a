//! Descriptor values produced by the attribute parsers. Immutable once
//! parsed; shared between node state and the parse cache via `Rc`.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Closed set of swap behaviors; the swap step matches exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwapBehavior {
    Replace,
    Outer,
    Append,
    Prepend,
    Before,
    After,
    Remove,
    None,
}

impl SwapBehavior {
    pub const ALL: [SwapBehavior; 8] = [
        SwapBehavior::Replace,
        SwapBehavior::Outer,
        SwapBehavior::Append,
        SwapBehavior::Prepend,
        SwapBehavior::Before,
        SwapBehavior::After,
        SwapBehavior::Remove,
        SwapBehavior::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SwapBehavior::Replace => "replace",
            SwapBehavior::Outer => "outer",
            SwapBehavior::Append => "append",
            SwapBehavior::Prepend => "prepend",
            SwapBehavior::Before => "before",
            SwapBehavior::After => "after",
            SwapBehavior::Remove => "remove",
            SwapBehavior::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<SwapBehavior> {
        SwapBehavior::ALL.into_iter().find(|b| b.as_str() == s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub selector: String,
    pub behavior: SwapBehavior,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            selector: "this".to_string(),
            behavior: SwapBehavior::Replace,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedModifier {
    pub name: String,
    pub value: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Only,
    Not,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedBody {
    /// `{'key': 'value', ...}`
    Json(Vec<(String, String)>),
    /// `{#sel1, #sel2}` / `{this}` / `{closest form}`
    Selectors(Vec<String>),
    /// `{only a, b}` / `{not c}`
    Filter {
        mode: FilterMode,
        fields: Vec<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedRequest {
    pub headers: Vec<(String, String)>,
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<ParsedBody>,
    pub target: Target,
    pub modifiers: Vec<ParsedModifier>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriggerModifiers {
    pub once: bool,
    pub changed: bool,
    pub consume: bool,
    pub debounce_ms: Option<u64>,
    pub throttle_ms: Option<u64>,
    pub delay_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTriggerEvent {
    pub name: String,
    pub is_polling: bool,
    pub polling_interval_ms: Option<u64>,
    pub filter: Option<String>,
    pub modifiers: TriggerModifiers,
    pub from: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedTrigger {
    pub events: Vec<ParsedTriggerEvent>,
}
