//!
//! OpenAI-style chat completions adapter.
//!
//! The closest format to the canonical one: full history is forwarded with
//! roles verbatim, and the upstream streams chat.completion.chunk objects
//! whose first choice carries either a content delta or a finish reason.
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
/// Adapter for OpenAI-compatible chat upstreams.
pub struct OpenAiAdapter;

///
/// Upstream request body.
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    /** model identifier */
    model: String,
    /** full conversation history */
    messages: Vec<OpenAiMessage>,
    /** upstream responses are always streamed */
    stream: bool,
}

///
/// One message in the upstream's flat format.
#[derive(Debug, Serialize)]
struct OpenAiMessage {
    /** role, forwarded verbatim */
    role: &'static str,
    /** message text */
    content: String,
}

///
/// Streamed chunk as decoded from one payload line.
#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    /** per-stream choices, first one is used */
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    /** token usage, reported on or after the final chunk by some upstreams */
    #[serde(default)]
    usage: Option<Usage>,
}

///
/// One streamed choice.
#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    /** incremental delta */
    #[serde(default)]
    delta: OpenAiStreamDelta,
    /** set on the final chunk of the stream */
    #[serde(default)]
    finish_reason: Option<String>,
}

///
/// Delta of one streamed choice.
#[derive(Debug, Default, Deserialize)]
struct OpenAiStreamDelta {
    /** incremental content text */
    #[serde(default)]
    content: Option<String>,
}

/* --- start of code -------------------------------------------------------------------------- */

impl UpstreamAdapter for OpenAiAdapter {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn encode_request(&self, request: &CanonicalRequest) -> Result<Vec<u8>> {
        let messages = request
            .messages
            .iter()
            .map(|m| OpenAiMessage { role: m.role.as_str(), content: m.text.clone() })
            .collect();

        let body = OpenAiRequest { model: request.model.clone(), messages, stream: true };
        Ok(serde_json::to_vec(&body)?)
    }

    fn classify(&self, payload: &str) -> Option<CanonicalFragment> {
        let chunk: OpenAiStreamChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!("Skipping malformed upstream event: {}", e);
                return None;
            }
        };

        let choice = chunk.choices.into_iter().next()?;

        if let Some(reason) = choice.finish_reason {
            return Some(CanonicalFragment::terminal(reason, chunk.usage));
        }

        match choice.delta.content {
            Some(content) if !content.is_empty() => Some(CanonicalFragment::delta(content)),
            _ => None,
        }
    }
}
