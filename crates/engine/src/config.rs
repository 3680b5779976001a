//! Engine configuration. Passed explicitly to [`crate::Engine::new`]; there
//! is no global.

use grammar::SwapBehavior;

/// One response-handling rule. `code` is an exact status ("404"), a class
/// pattern ("4xx"), or the catch-all "*". The first matching rule wins.
#[derive(Clone, Debug)]
pub struct ResponseRule {
    pub code: String,
    /// Apply the swap at all.
    pub swap: bool,
    /// Emit an error notification.
    pub error: bool,
    /// Skip title updates from full-document responses.
    pub ignore_title: bool,
    /// Override the fragment selection.
    pub select: Option<String>,
    /// Override the swap target selector.
    pub target: Option<String>,
}

impl ResponseRule {
    pub fn new(code: &str, swap: bool, error: bool) -> Self {
        Self {
            code: code.to_string(),
            swap,
            error,
            ignore_title: false,
            select: None,
            target: None,
        }
    }

    pub fn matches(&self, status: u16) -> bool {
        let code = self.code.as_str();
        if code == "*" {
            return true;
        }
        let digits = status.to_string();
        if code.len() == 3 && code.ends_with("xx") {
            return digits.as_bytes().first() == code.as_bytes().first();
        }
        digits == code
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub default_swap: SwapBehavior,
    pub default_target: String,
    /// Request timeout in milliseconds; 0 disables the timer.
    pub timeout_ms: u64,
    pub swap_delay_ms: u64,
    pub settle_delay_ms: u64,
    /// How long an externally held confirmation may stay pending before it
    /// is abandoned.
    pub confirm_timeout_ms: u64,
    pub default_polling_interval_ms: u64,
    pub request_class: String,
    pub swapping_class: String,
    pub settling_class: String,
    pub added_class: String,
    pub indicator_class: String,
    pub allow_script_tags: bool,
    pub inline_script_nonce: String,
    pub with_credentials: bool,
    pub ignore_title: bool,
    pub scroll_into_view_on_boost: bool,
    pub response_rules: Vec<ResponseRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_swap: SwapBehavior::Replace,
            default_target: "this".to_string(),
            timeout_ms: 0,
            swap_delay_ms: 0,
            settle_delay_ms: 20,
            confirm_timeout_ms: 300_000,
            default_polling_interval_ms: 1_000,
            request_class: "pulse-request".to_string(),
            swapping_class: "pulse-swapping".to_string(),
            settling_class: "pulse-settling".to_string(),
            added_class: "pulse-added".to_string(),
            indicator_class: "pulse-indicator".to_string(),
            allow_script_tags: true,
            inline_script_nonce: String::new(),
            with_credentials: false,
            ignore_title: false,
            scroll_into_view_on_boost: true,
            response_rules: vec![
                ResponseRule::new("2xx", true, false),
                ResponseRule::new("4xx", false, true),
                ResponseRule::new("5xx", false, true),
            ],
        }
    }
}

impl Config {
    pub fn rule_for(&self, status: u16) -> Option<&ResponseRule> {
        self.response_rules.iter().find(|r| r.matches(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_matching_prefers_first_match() {
        let mut config = Config::default();
        config
            .response_rules
            .insert(0, ResponseRule::new("404", true, false));
        assert!(config.rule_for(404).is_some_and(|r| r.swap));
        assert!(config.rule_for(422).is_some_and(|r| !r.swap && r.error));
        assert!(config.rule_for(200).is_some_and(|r| r.swap && !r.error));
        assert!(config.rule_for(503).is_some_and(|r| r.error));
    }

    #[test]
    fn wildcard_rule_catches_everything() {
        let rule = ResponseRule::new("*", true, false);
        assert!(rule.matches(100));
        assert!(rule.matches(599));
    }

    #[test]
    fn unmatched_status_yields_none() {
        let config = Config::default();
        assert!(config.rule_for(302).is_none());
    }
}
