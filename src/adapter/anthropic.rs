//!
//! Anthropic-style messages API adapter.
//!
//! Encodes canonical requests as content-block messages and classifies the
//! upstream's typed event stream (message_start, content_block_delta,
//! message_stop, ...) into canonical fragments. This upstream has no system
//! role, so system messages are remapped to assistant rather than rejected.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::{Deserialize, Serialize};

use crate::adapter::UpstreamAdapter;
use crate::canonical::{CanonicalFragment, CanonicalRequest, Role};
use crate::error::Result;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Adapter for Anthropic-style messages upstreams.
pub struct AnthropicAdapter;

///
/// Upstream request body.
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    /** model identifier */
    model: String,
    /** conversation as content-block messages */
    messages: Vec<AnthropicMessage>,
    /** upstream responses are always streamed */
    stream: bool,
    /** generation cap */
    max_tokens: u32,
}

///
/// One message in the upstream's content-block format.
#[derive(Debug, Serialize)]
struct AnthropicMessage {
    /** upstream role (user or assistant) */
    role: &'static str,
    /** content blocks, always a single text block here */
    content: Vec<AnthropicContentBlock>,
}

///
/// Text content block.
#[derive(Debug, Serialize)]
struct AnthropicContentBlock {
    /** block type discriminator */
    #[serde(rename = "type")]
    block_type: &'static str,
    /** the text content */
    text: String,
}

///
/// Streamed event as decoded from one payload line.
#[derive(Debug, Deserialize)]
struct AnthropicStreamEvent {
    /** event kind discriminator */
    #[serde(rename = "type", default)]
    event_type: String,
    /** incremental text delta, present on delta events */
    #[serde(default)]
    delta: Option<AnthropicDelta>,
}

///
/// Delta carried by a content block event.
#[derive(Debug, Deserialize)]
struct AnthropicDelta {
    /** incremental text */
    #[serde(default)]
    text: String,
}

/* --- constants ------------------------------------------------------------------------------ */

/** Generation cap forwarded on every request */
const MAX_TOKENS: u32 = 1024;

/** Version header this upstream requires */
const VERSION_HEADER: (&str, &str) = ("anthropic-version", "2023-06-01");

/* --- start of code -------------------------------------------------------------------------- */

impl AnthropicAdapter {
    ///
    /// Map a canonical role onto this upstream's role vocabulary.
    ///
    /// The upstream accepts only user and assistant; system is remapped to
    /// assistant instead of failing the request.
    fn map_role(role: Role) -> &'static str {
        match role {
            Role::System | Role::Assistant => "assistant",
            Role::User => "user",
        }
    }
}

impl UpstreamAdapter for AnthropicAdapter {
    fn id(&self) -> &'static str {
        "anthropic"
    }

    fn version_header(&self) -> Option<(&'static str, &'static str)> {
        Some(VERSION_HEADER)
    }

    fn encode_request(&self, request: &CanonicalRequest) -> Result<Vec<u8>> {
        let messages = request
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: Self::map_role(m.role),
                content: vec![AnthropicContentBlock { block_type: "text", text: m.text.clone() }],
            })
            .collect();

        let body = AnthropicRequest {
            model: request.model.clone(),
            messages,
            stream: true,
            max_tokens: MAX_TOKENS,
        };
        Ok(serde_json::to_vec(&body)?)
    }

    fn classify(&self, payload: &str) -> Option<CanonicalFragment> {
        let event: AnthropicStreamEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("Skipping malformed upstream event: {}", e);
                return None;
            }
        };

        match event.event_type.as_str() {
            "message_stop" | "content_block_stop" => {
                Some(CanonicalFragment::terminal("stop", None))
            }
            "message_start" | "content_block_start" | "ping" => None,
            _ => event.delta.map(|delta| CanonicalFragment::delta(delta.text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::canonical::CanonicalMessage;

    use super::*;

    fn request_with(messages: Vec<(Role, &str)>) -> CanonicalRequest {
        CanonicalRequest {
            model: "claude-3-7-sonnet-latest".to_string(),
            messages: messages
                .into_iter()
                .map(|(role, text)| CanonicalMessage { role, text: text.to_string() })
                .collect(),
            stream: true,
        }
    }

    #[test]
    fn test_encode_remaps_system_role() {
        let adapter = AnthropicAdapter;
        let request = request_with(vec![(Role::System, "be brief"), (Role::User, "hi")]);
        let bytes = adapter.encode_request(&request).unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["messages"][0]["role"], "assistant");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"][0]["text"], "hi");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 1024);
    }

    #[test]
    fn test_encode_forwards_full_history() {
        let adapter = AnthropicAdapter;
        let request = request_with(vec![
            (Role::User, "one"),
            (Role::Assistant, "two"),
            (Role::User, "three"),
        ]);
        let bytes = adapter.encode_request(&request).unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_classify_delta_event() {
        let adapter = AnthropicAdapter;
        let frag = adapter
            .classify(r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#)
            .unwrap();
        assert!(!frag.is_terminal);
        assert_eq!(frag.delta_text, "Hi");
    }

    #[test]
    fn test_classify_stop_is_terminal() {
        let adapter = AnthropicAdapter;
        let frag = adapter.classify(r#"{"type":"message_stop"}"#).unwrap();
        assert!(frag.is_terminal);
        assert_eq!(frag.finish_reason.as_deref(), Some("stop"));
        assert!(frag.usage.is_none());
    }

    #[test]
    fn test_classify_housekeeping_events_yield_nothing() {
        let adapter = AnthropicAdapter;
        assert!(adapter.classify(r#"{"type":"message_start","message":{}}"#).is_none());
        assert!(adapter.classify(r#"{"type":"content_block_start","index":0}"#).is_none());
        assert!(adapter.classify(r#"{"type":"ping"}"#).is_none());
    }

    #[test]
    fn test_classify_malformed_payload_is_skipped() {
        let adapter = AnthropicAdapter;
        assert!(adapter.classify("{not json").is_none());
        assert!(adapter.classify(r#"{"type":"content_block_delta"}"#).is_none());
    }
}
