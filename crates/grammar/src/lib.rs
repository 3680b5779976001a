pub mod body;
pub mod cache;
pub mod expr;
pub mod modifier;
pub mod request;
pub mod scanner;
pub mod trigger;

mod types;

pub use body::parse_body_content;
pub use cache::ParserCache;
pub use modifier::{get_modifier, has_modifier, modifier_value, parse_modifiers};
pub use request::parse_request;
pub use scanner::{GrammarError, Scanner};
pub use trigger::parse_trigger;
pub use types::{
    FilterMode, HttpMethod, ParsedBody, ParsedModifier, ParsedRequest, ParsedTrigger,
    ParsedTriggerEvent, SwapBehavior, Target, TriggerModifiers,
};
