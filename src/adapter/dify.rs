//!
//! Dify-style workflow-agent API adapter.
//!
//! This upstream is single-turn and query-based: only the last message's text
//! is forwarded as the query. The event stream interleaves agent thoughts,
//! answer deltas and a message_end event that carries the real token usage.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use serde::{Deserialize, Serialize};

use crate::adapter::UpstreamAdapter;
use crate::canonical::{CanonicalFragment, CanonicalRequest, Usage};
use crate::error::Result;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Adapter for Dify-style workflow-agent upstreams.
pub struct DifyAdapter;

///
/// Upstream request body.
#[derive(Debug, Serialize)]
struct DifyRequest {
    /** streaming is always requested */
    response_mode: &'static str,
    /** blank starts a fresh conversation each call */
    conversation_id: &'static str,
    /** the user query (last message only) */
    query: String,
    /** workflow inputs, unused */
    inputs: serde_json::Map<String, serde_json::Value>,
}

///
/// Streamed event as decoded from one payload line.
#[derive(Debug, Deserialize)]
struct DifyStreamEvent {
    /** event kind discriminator */
    #[serde(default)]
    event: String,
    /** agent reasoning text, on agent_thought events */
    #[serde(default)]
    thought: String,
    /** incremental answer text */
    #[serde(default)]
    answer: String,
    /** terminal metadata, on message_end events */
    #[serde(default)]
    metadata: Option<DifyMetadata>,
}

///
/// Metadata attached to the message_end event.
#[derive(Debug, Deserialize)]
struct DifyMetadata {
    /** real token usage for this call */
    #[serde(default)]
    usage: Option<Usage>,
}

/* --- start of code -------------------------------------------------------------------------- */

impl UpstreamAdapter for DifyAdapter {
    fn id(&self) -> &'static str {
        "dify"
    }

    fn requires_pool_token(&self) -> bool {
        true
    }

    fn encode_request(&self, request: &CanonicalRequest) -> Result<Vec<u8>> {
        let query = request.messages.last().map(|m| m.text.clone()).unwrap_or_default();

        let body = DifyRequest {
            response_mode: "streaming",
            conversation_id: "",
            query,
            inputs: serde_json::Map::new(),
        };
        Ok(serde_json::to_vec(&body)?)
    }

    fn classify(&self, payload: &str) -> Option<CanonicalFragment> {
        let event: DifyStreamEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!("Skipping malformed upstream event: {}", e);
                return None;
            }
        };

        match event.event.as_str() {
            "message_end" => {
                let usage = event.metadata.and_then(|m| m.usage);
                Some(CanonicalFragment::terminal("stop", usage))
            }
            // content_block_start events carry their text in `thought` too.
            "agent_thought" | "content_block_start" => {
                // Empty thought placeholders carry nothing worth forwarding.
                if event.thought.is_empty() {
                    None
                } else {
                    Some(CanonicalFragment::delta(event.thought))
                }
            }
            _ => {
                if event.answer.is_empty() {
                    None
                } else {
                    Some(CanonicalFragment::delta(event.answer))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::canonical::{CanonicalMessage, Role};

    use super::*;

    #[test]
    fn test_encode_forwards_only_last_message() {
        let adapter = DifyAdapter;
        let request = CanonicalRequest {
            model: "gpt-4".to_string(),
            messages: vec![
                CanonicalMessage { role: Role::System, text: "ignored".to_string() },
                CanonicalMessage { role: Role::User, text: "earlier".to_string() },
                CanonicalMessage { role: Role::User, text: "what is rust?".to_string() },
            ],
            stream: true,
        };
        let bytes = adapter.encode_request(&request).unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["query"], "what is rust?");
        assert_eq!(body["response_mode"], "streaming");
        assert_eq!(body["conversation_id"], "");
    }

    #[test]
    fn test_encode_empty_history_yields_empty_query() {
        let adapter = DifyAdapter;
        let request =
            CanonicalRequest { model: "gpt-4".to_string(), messages: vec![], stream: true };
        let bytes = adapter.encode_request(&request).unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["query"], "");
    }

    #[test]
    fn test_classify_answer_delta() {
        let adapter = DifyAdapter;
        let frag = adapter
            .classify(r#"{"event":"agent_message","answer":"Hello","conversation_id":"c1"}"#)
            .unwrap();
        assert!(!frag.is_terminal);
        assert_eq!(frag.delta_text, "Hello");
    }

    #[test]
    fn test_classify_message_end_carries_real_usage() {
        let adapter = DifyAdapter;
        let payload = r#"{
            "event": "message_end",
            "metadata": {
                "usage": {"prompt_tokens": 7, "completion_tokens": 21, "total_tokens": 28}
            }
        }"#;
        let frag = adapter.classify(payload).unwrap();
        assert!(frag.is_terminal);
        let usage = frag.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 7);
        assert_eq!(usage.completion_tokens, 21);
        assert_eq!(usage.total_tokens, 28);
    }

    #[test]
    fn test_classify_empty_thought_yields_nothing() {
        let adapter = DifyAdapter;
        assert!(adapter.classify(r#"{"event":"agent_thought","thought":""}"#).is_none());
    }

    #[test]
    fn test_classify_nonempty_thought_is_forwarded() {
        let adapter = DifyAdapter;
        let frag = adapter
            .classify(r#"{"event":"agent_thought","thought":"Considering the question."}"#)
            .unwrap();
        assert_eq!(frag.delta_text, "Considering the question.");
    }

    #[test]
    fn test_classify_content_block_start_forwards_thought() {
        let adapter = DifyAdapter;
        let frag = adapter
            .classify(r#"{"event":"content_block_start","thought":"Step one.","answer":""}"#)
            .unwrap();
        assert!(!frag.is_terminal);
        assert_eq!(frag.delta_text, "Step one.");
        assert!(adapter.classify(r#"{"event":"content_block_start","thought":""}"#).is_none());
    }

    #[test]
    fn test_classify_empty_answer_yields_nothing() {
        let adapter = DifyAdapter;
        assert!(adapter.classify(r#"{"event":"agent_message","answer":""}"#).is_none());
    }

    #[test]
    fn test_classify_malformed_payload_is_skipped() {
        let adapter = DifyAdapter;
        assert!(adapter.classify("not json at all").is_none());
    }
}
