//!
//! Protocol-neutral request and response representation.
//!
//! Every client protocol decodes into [CanonicalRequest], every upstream adapter
//! classifies its events into [CanonicalFragment], and every synthesizer encodes
//! fragments back out. This is the single normalized seam between the inbound
//! and outbound halves of the proxy.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::{Deserialize, Serialize};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Message role in a chat conversation.
///
/// The canonical vocabulary; adapters remap roles the upstream does not accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

///
/// One message of a chat conversation, immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalMessage {
    /** message role */
    pub role: Role,
    /** plain message text */
    pub text: String,
}

///
/// Protocol-neutral chat request.
///
/// Owned by one request path for the duration of a single HTTP call and
/// never persisted.
#[derive(Debug, Clone)]
pub struct CanonicalRequest {
    /** requested model name (after remapping) */
    pub model: String,
    /** ordered conversation history */
    pub messages: Vec<CanonicalMessage>,
    /** whether the client expects a streamed response */
    pub stream: bool,
}

///
/// Token usage counters reported by an upstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    /** tokens consumed by the prompt */
    pub prompt_tokens: u32,
    /** tokens generated in the completion */
    pub completion_tokens: u32,
    /** prompt + completion */
    pub total_tokens: u32,
}

///
/// One normalized unit of streamed assistant output.
///
/// Invariant: exactly one fragment per stream has `is_terminal = true` and it is
/// always the last one emitted. Non-terminal fragments carry `delta_text` that
/// the client appends, never replaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalFragment {
    /** true for the end-of-turn fragment */
    pub is_terminal: bool,
    /** incremental assistant text (empty on terminal fragments) */
    pub delta_text: String,
    /** finish reason, set on terminal fragments */
    pub finish_reason: Option<String>,
    /** token usage, set when the upstream reported real counters */
    pub usage: Option<Usage>,
}

/* --- start of code -------------------------------------------------------------------------- */

impl Role {
    ///
    /// Parse a wire role name into the canonical vocabulary.
    ///
    /// # Arguments
    ///  * `s` - role name as it appears in a client request
    ///
    /// # Returns
    ///  * Canonical role, or None for an unknown role name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }

    ///
    /// Wire name of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl CanonicalFragment {
    ///
    /// Build a non-terminal fragment carrying an incremental text delta.
    ///
    /// # Arguments
    ///  * `text` - text the client should append
    ///
    /// # Returns
    ///  * Non-terminal fragment
    pub fn delta(text: impl Into<String>) -> Self {
        Self { is_terminal: false, delta_text: text.into(), finish_reason: None, usage: None }
    }

    ///
    /// Build the terminal end-of-turn fragment.
    ///
    /// # Arguments
    ///  * `finish_reason` - upstream finish reason (e.g. "stop")
    ///  * `usage` - real token counters when the upstream reported them
    ///
    /// # Returns
    ///  * Terminal fragment
    pub fn terminal(finish_reason: impl Into<String>, usage: Option<Usage>) -> Self {
        Self {
            is_terminal: true,
            delta_text: String::new(),
            finish_reason: Some(finish_reason.into()),
            usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_known() {
        assert_eq!(Role::parse("system"), Some(Role::System));
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
    }

    #[test]
    fn test_role_parse_unknown() {
        assert_eq!(Role::parse("tool"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn test_delta_fragment_is_not_terminal() {
        let frag = CanonicalFragment::delta("Hi");
        assert!(!frag.is_terminal);
        assert_eq!(frag.delta_text, "Hi");
        assert!(frag.finish_reason.is_none());
        assert!(frag.usage.is_none());
    }

    #[test]
    fn test_terminal_fragment_carries_no_delta() {
        let usage = Usage { prompt_tokens: 9, completion_tokens: 12, total_tokens: 21 };
        let frag = CanonicalFragment::terminal("stop", Some(usage));
        assert!(frag.is_terminal);
        assert!(frag.delta_text.is_empty());
        assert_eq!(frag.finish_reason.as_deref(), Some("stop"));
        assert_eq!(frag.usage, Some(usage));
    }
}
