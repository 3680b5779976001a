//! Attribute, header, and lifecycle-event names shared across the engine.

pub const ATTR_REQUEST: &str = "p-request";
pub const ATTR_TRIGGER: &str = "p-trigger";
pub const ATTR_ON: &str = "p-on";
pub const ATTR_OOB: &str = "p-oob";
pub const ATTR_IGNORE: &str = "p-ignore";
pub const ATTR_INHERIT: &str = "p-inherit";
pub const ATTR_BOOST: &str = "p-boost";

// Request headers.
pub const HDR_REQUEST: &str = "P-Request";
pub const HDR_CURRENT_URL: &str = "P-Current-URL";
pub const HDR_TARGET: &str = "P-Target";
pub const HDR_TRIGGER: &str = "P-Trigger";
pub const HDR_TRIGGER_NAME: &str = "P-Trigger-Name";
pub const HDR_BOOSTED: &str = "P-Boosted";
pub const HDR_PROMPT: &str = "P-Prompt";

// Response headers.
pub const HDR_LOCATION: &str = "P-Location";
pub const HDR_REDIRECT: &str = "P-Redirect";
pub const HDR_REFRESH: &str = "P-Refresh";
pub const HDR_RETARGET: &str = "P-Retarget";
pub const HDR_RESWAP: &str = "P-Reswap";
pub const HDR_RESELECT: &str = "P-Reselect";
pub const HDR_PUSH: &str = "P-Push";
pub const HDR_REPLACE: &str = "P-Replace";
pub const HDR_TRIGGER_RESP: &str = "P-Trigger";
pub const HDR_TRIGGER_AFTER_SWAP: &str = "P-Trigger-After-Swap";
pub const HDR_TRIGGER_AFTER_SETTLE: &str = "P-Trigger-After-Settle";

// Lifecycle events.
pub const EV_CONFIRM: &str = "pulse:confirm";
pub const EV_BEFORE: &str = "pulse:before";
pub const EV_BEFORE_SEND: &str = "pulse:beforeSend";
pub const EV_BEFORE_SWAP: &str = "pulse:beforeSwap";
pub const EV_AFTER_SWAP: &str = "pulse:afterSwap";
pub const EV_AFTER_SETTLE: &str = "pulse:afterSettle";
pub const EV_AFTER_REQUEST: &str = "pulse:afterRequest";
pub const EV_ERROR: &str = "pulse:error";
