//!
//! Client-protocol response synthesis.
//!
//! Converts canonical fragments into the target client protocol's wire
//! format: one NDJSON object per fragment for Ollama-style clients, one SSE
//! data frame per fragment for OpenAI-style streaming clients, or a single
//! aggregated completion object for non-streaming clients. Every emitted
//! frame is a self-contained object; no object is ever split across writes.
//!
//! Terminal frames synthesize the fixed placeholder performance counters the
//! upstream did not report, so clients that expect those fields never see
//! them absent.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::canonical::{CanonicalFragment, Usage};
use crate::error::Result;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Synthesizer for the Ollama NDJSON chat protocol.
///
/// Each fragment becomes one newline-terminated JSON object.
pub struct OllamaSynthesizer;

///
/// Synthesizer for the OpenAI SSE streaming protocol.
///
/// Each fragment becomes one `data:` frame; the terminal fragment also emits
/// the `[DONE]` end-of-stream sentinel.
pub struct OpenAiSynthesizer;

///
/// Accumulating synthesizer for non-streaming OpenAI clients.
///
/// Intermediate fragments produce no output; the terminal fragment yields a
/// single completion object with the concatenated text.
#[derive(Debug, Default)]
pub struct AggregateSynthesizer {
    /** assistant text accumulated so far */
    content: String,
}

///
/// One NDJSON response object in the Ollama chat protocol.
#[derive(Debug, Serialize)]
struct OllamaResponse {
    /** model identifier echoed back */
    model: String,
    /** response creation timestamp */
    created_at: String,
    /** incremental assistant message */
    message: OllamaMessage,
    /** true only on the terminal object */
    done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    done_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    load_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_eval_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt_eval_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eval_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eval_duration: Option<i64>,
}

///
/// Assistant message within an Ollama response object.
#[derive(Debug, Serialize)]
struct OllamaMessage {
    /** always assistant on the response side */
    role: &'static str,
    /** incremental content */
    content: String,
}

///
/// One streamed chunk in the OpenAI chat protocol.
#[derive(Debug, Serialize)]
struct OpenAiStreamChunk {
    id: String,
    object: &'static str,
    created: i64,
    model: String,
    choices: Vec<OpenAiStreamChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<Usage>,
}

///
/// One choice of a streamed chunk.
#[derive(Debug, Serialize)]
struct OpenAiStreamChoice {
    index: u32,
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

///
/// Delta of a streamed choice.
#[derive(Debug, Serialize)]
struct OpenAiStreamDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

///
/// Aggregated completion object for non-streaming clients.
#[derive(Debug, Serialize)]
struct OpenAiCompletion {
    id: String,
    object: &'static str,
    created: i64,
    model: String,
    choices: Vec<OpenAiCompletionChoice>,
    usage: Usage,
}

///
/// One choice of an aggregated completion.
#[derive(Debug, Serialize)]
struct OpenAiCompletionChoice {
    index: u32,
    message: OpenAiCompletionMessage,
    finish_reason: String,
}

///
/// Full assistant message of an aggregated completion.
#[derive(Debug, Serialize)]
struct OpenAiCompletionMessage {
    role: &'static str,
    content: String,
}

/* --- constants ------------------------------------------------------------------------------ */

/** Placeholder total duration in nanoseconds for terminal objects */
pub(crate) const PLACEHOLDER_TOTAL_DURATION: i64 = 13_937_866_250;

/** Placeholder model load duration in nanoseconds */
pub(crate) const PLACEHOLDER_LOAD_DURATION: i64 = 5_978_299_625;

/** Placeholder prompt evaluation count */
pub(crate) const PLACEHOLDER_PROMPT_EVAL_COUNT: u32 = 9;

/** Placeholder prompt evaluation duration in nanoseconds */
pub(crate) const PLACEHOLDER_PROMPT_EVAL_DURATION: i64 = 3_912_791_542;

/** Placeholder completion evaluation count */
pub(crate) const PLACEHOLDER_EVAL_COUNT: u32 = 12;

/** Placeholder completion evaluation duration in nanoseconds */
pub(crate) const PLACEHOLDER_EVAL_DURATION: i64 = 10_937_866_250;

/** Default finish reason when the upstream did not report one */
const DEFAULT_FINISH_REASON: &str = "stop";

/* --- start of code -------------------------------------------------------------------------- */

impl OllamaSynthesizer {
    ///
    /// Encode one fragment as a newline-terminated NDJSON object.
    ///
    /// # Arguments
    ///  * `fragment` - canonical fragment to encode
    ///  * `model` - model name echoed to the client
    ///
    /// # Returns
    ///  * Encoded frame bytes and whether this was the final frame
    pub fn encode(&self, fragment: &CanonicalFragment, model: &str) -> Result<(Bytes, bool)> {
        let response = if fragment.is_terminal {
            let usage = fragment.usage;
            OllamaResponse {
                model: model.to_string(),
                created_at: now_rfc3339(),
                message: OllamaMessage { role: "assistant", content: String::new() },
                done: true,
                done_reason: Some(
                    fragment
                        .finish_reason
                        .clone()
                        .unwrap_or_else(|| DEFAULT_FINISH_REASON.to_string()),
                ),
                total_duration: Some(PLACEHOLDER_TOTAL_DURATION),
                load_duration: Some(PLACEHOLDER_LOAD_DURATION),
                prompt_eval_count: Some(
                    usage.map_or(PLACEHOLDER_PROMPT_EVAL_COUNT, |u| u.prompt_tokens),
                ),
                prompt_eval_duration: Some(PLACEHOLDER_PROMPT_EVAL_DURATION),
                eval_count: Some(usage.map_or(PLACEHOLDER_EVAL_COUNT, |u| u.completion_tokens)),
                eval_duration: Some(PLACEHOLDER_EVAL_DURATION),
            }
        } else {
            OllamaResponse {
                model: model.to_string(),
                created_at: now_rfc3339(),
                message: OllamaMessage {
                    role: "assistant",
                    content: fragment.delta_text.clone(),
                },
                done: false,
                done_reason: None,
                total_duration: None,
                load_duration: None,
                prompt_eval_count: None,
                prompt_eval_duration: None,
                eval_count: None,
                eval_duration: None,
            }
        };

        let mut frame = serde_json::to_vec(&response)?;
        frame.push(b'\n');
        Ok((Bytes::from(frame), fragment.is_terminal))
    }
}

impl OpenAiSynthesizer {
    ///
    /// Encode one fragment as an SSE data frame.
    ///
    /// The terminal fragment emits the finish chunk followed by the
    /// end-of-stream sentinel in the same frame, keeping each JSON object
    /// whole within a single transport write.
    ///
    /// # Arguments
    ///  * `fragment` - canonical fragment to encode
    ///  * `model` - model name echoed to the client
    ///
    /// # Returns
    ///  * Encoded frame bytes and whether this was the final frame
    pub fn encode(&self, fragment: &CanonicalFragment, model: &str) -> Result<(Bytes, bool)> {
        let created = Utc::now().timestamp();
        let id = chunk_id(created);

        let chunk = if fragment.is_terminal {
            OpenAiStreamChunk {
                id,
                object: "chat.completion.chunk",
                created,
                model: model.to_string(),
                choices: vec![OpenAiStreamChoice {
                    index: 0,
                    delta: OpenAiStreamDelta { role: None, content: None },
                    finish_reason: Some(
                        fragment
                            .finish_reason
                            .clone()
                            .unwrap_or_else(|| DEFAULT_FINISH_REASON.to_string()),
                    ),
                }],
                usage: fragment.usage,
            }
        } else {
            OpenAiStreamChunk {
                id,
                object: "chat.completion.chunk",
                created,
                model: model.to_string(),
                choices: vec![OpenAiStreamChoice {
                    index: 0,
                    delta: OpenAiStreamDelta {
                        role: Some("assistant"),
                        content: Some(fragment.delta_text.clone()),
                    },
                    finish_reason: None,
                }],
                usage: None,
            }
        };

        let json = serde_json::to_string(&chunk)?;
        let frame = if fragment.is_terminal {
            format!("data: {}\n\ndata: [DONE]\n\n", json)
        } else {
            format!("data: {}\n\n", json)
        };
        Ok((Bytes::from(frame), fragment.is_terminal))
    }
}

impl AggregateSynthesizer {
    ///
    /// Create a new accumulator with no content.
    pub fn new() -> Self {
        Self::default()
    }

    ///
    /// Consume one fragment, producing output only on the terminal one.
    ///
    /// # Arguments
    ///  * `fragment` - canonical fragment to accumulate or finalize
    ///  * `model` - model name echoed to the client
    ///
    /// # Returns
    ///  * The single aggregated completion object on the terminal fragment,
    ///    None otherwise
    pub fn push(&mut self, fragment: &CanonicalFragment, model: &str) -> Result<Option<Bytes>> {
        if !fragment.is_terminal {
            self.content.push_str(&fragment.delta_text);
            return Ok(None);
        }

        let created = Utc::now().timestamp();
        let completion = OpenAiCompletion {
            id: chunk_id(created),
            object: "chat.completion",
            created,
            model: model.to_string(),
            choices: vec![OpenAiCompletionChoice {
                index: 0,
                message: OpenAiCompletionMessage {
                    role: "assistant",
                    content: std::mem::take(&mut self.content),
                },
                finish_reason: fragment
                    .finish_reason
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FINISH_REASON.to_string()),
            }],
            usage: fragment.usage.unwrap_or_default(),
        };

        Ok(Some(Bytes::from(serde_json::to_vec(&completion)?)))
    }
}

///
/// Current time in RFC3339 with nanosecond precision.
fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

///
/// Chunk/completion identifier derived from the creation timestamp.
fn chunk_id(created: i64) -> String {
    format!("chatcmpl-{}", created)
}
