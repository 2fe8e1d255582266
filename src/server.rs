//!
//! HTTP server implementation for the ChatBridge streaming translation proxy.
//!
//! Handles incoming Ollama-style and OpenAI-style chat requests and forwards
//! them to the configured upstream through the active adapter. Implements the
//! full streaming pipeline (upstream bytes -> scanner -> classify -> synthesize
//! -> client frame) with proper error handling and logging.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;

use crate::adapter::{AdapterRegistry, UpstreamAdapter};
use crate::canonical::{CanonicalFragment, CanonicalMessage, CanonicalRequest, Role};
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::router::RouteSelector;
use crate::scanner::EventScanner;
use crate::synthesizer::{
    AggregateSynthesizer, OllamaSynthesizer, OpenAiSynthesizer, PLACEHOLDER_EVAL_COUNT,
    PLACEHOLDER_EVAL_DURATION, PLACEHOLDER_LOAD_DURATION, PLACEHOLDER_PROMPT_EVAL_COUNT,
    PLACEHOLDER_PROMPT_EVAL_DURATION, PLACEHOLDER_TOTAL_DURATION,
};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Application state containing all dependencies.
///
/// The adapter is resolved once from the configured chat type; every request
/// shares it together with the read-only configuration and the selector's
/// credential cache.
pub struct AppState {
    /** application configuration */
    pub config: Arc<Config>,
    /** HTTP client for upstream requests */
    pub http_client: Client,
    /** active upstream adapter */
    pub adapter: Arc<dyn UpstreamAdapter>,
    /** routing selector with the pool-token cache */
    pub selector: RouteSelector,
    /** metrics for monitoring */
    pub metrics: AppMetrics,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

///
/// Application metrics for monitoring and observability.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /** total number of requests processed */
    pub total_requests: AtomicU64,
    /** total number of successful requests */
    pub successful_requests: AtomicU64,
    /** total number of failed requests */
    pub failed_requests: AtomicU64,
    /** total number of upstream/credential failures */
    pub upstream_errors: AtomicU64,
}

///
/// Chat request as both client protocols send it.
///
/// The two inbound protocols share the same shape for the fields this proxy
/// consumes; they differ only in the default of `stream`.
#[derive(Debug, Deserialize)]
struct WireChatRequest {
    /** requested model name */
    model: String,
    /** conversation history */
    #[serde(default)]
    messages: Vec<WireMessage>,
    /** streaming flag, protocol-dependent default */
    #[serde(default)]
    stream: Option<bool>,
}

///
/// One inbound chat message.
#[derive(Debug, Deserialize)]
struct WireMessage {
    /** role name as sent by the client */
    role: String,
    /** message text */
    content: String,
}

///
/// Remote model-listing response body.
#[derive(Debug, Deserialize)]
struct RemoteModelList {
    /** listed models */
    #[serde(default)]
    data: Vec<RemoteModel>,
}

///
/// One remote model entry; only the identifier is consumed.
#[derive(Debug, Deserialize)]
struct RemoteModel {
    /** model identifier */
    id: String,
}

/* --- constants ------------------------------------------------------------------------------ */

/** HTTP client timeout in seconds */
const HTTP_CLIENT_TIMEOUT_SECS: u64 = 300;

/** Channel buffer size for streaming responses */
const STREAMING_CHANNEL_BUFFER: usize = 100;

/** Content type header for JSON requests */
const CONTENT_TYPE_JSON: &str = "application/json";

/** Content type for Ollama NDJSON streams */
const CONTENT_TYPE_NDJSON: &str = "application/x-ndjson";

/** Content type for OpenAI SSE streams */
const CONTENT_TYPE_EVENT_STREAM: &str = "text/event-stream";

/** Authorization header name */
const AUTHORIZATION_HEADER: &str = "Authorization";

/** Static-key header forwarded alongside the bearer credential */
const API_KEY_HEADER: &str = "x-api-key";

/** Bearer token prefix */
const BEARER_PREFIX: &str = "Bearer ";

/** Model names served by the listing endpoints in mock mode */
const MOCK_MODELS: &[&str] = &["claude-3-7-sonnet-latest", "gpt-4.1"];

/** Canned assistant text served by mock chat responses */
const MOCK_COMPLETION_TEXT: &str = "ok ,so easy!!";

/** Exclusive ceiling for the synthesized model size in tag listings */
const MODEL_SIZE_CEILING: i64 = 10_000_000_000;

/** Length of the synthesized model digest */
const MODEL_DIGEST_LEN: usize = 12;

/* --- start of code -------------------------------------------------------------------------- */

impl AppState {
    ///
    /// Create new application state with all dependencies.
    ///
    /// Resolves the upstream adapter from the configured chat type and builds
    /// the shared HTTP client and routing selector.
    ///
    /// # Arguments
    ///  * `config` - application configuration
    ///
    /// # Returns
    ///  * Application state with initialized dependencies
    ///  * `ProxyError::Config` if the chat type names no adapter
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let adapter = AdapterRegistry::with_builtin().get(&config.chat_type).ok_or_else(|| {
            ProxyError::Config(format!("Unknown chat type: '{}'", config.chat_type))
        })?;
        let http_client = Self::create_http_client()?;
        let selector = RouteSelector::new(config.clone(), http_client.clone());
        let metrics = AppMetrics::default();

        Ok(Self { config, http_client, adapter, selector, metrics })
    }

    ///
    /// Create HTTP client with appropriate timeouts.
    ///
    /// # Returns
    ///  * Configured HTTP client
    ///  * `ProxyError::Config` if client creation fails
    fn create_http_client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProxyError::Config(format!("Failed to create HTTP client: {}", e)))
    }
}

///
/// Handle the root liveness endpoint.
///
/// Local-model clients probe this before issuing chat requests.
pub async fn root() -> &'static str {
    "Ollama is running ok"
}

///
/// Handle health check endpoint.
///
/// Returns a simple health status for service monitoring with basic metrics.
///
/// # Arguments
///  * `state` - shared application state with metrics
///
/// # Returns
///  * JSON response with health status and metrics
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let total_requests = state.metrics.total_requests.load(Ordering::Relaxed);
    let successful_requests = state.metrics.successful_requests.load(Ordering::Relaxed);
    let failed_requests = state.metrics.failed_requests.load(Ordering::Relaxed);
    let upstream_errors = state.metrics.upstream_errors.load(Ordering::Relaxed);

    Json(json!({
      "status": "ok",
      "adapter": state.adapter.id(),
      "metrics": {
        "total_requests": total_requests,
        "successful_requests": successful_requests,
        "failed_requests": failed_requests,
        "upstream_errors": upstream_errors,
        "success_rate": if total_requests > 0 {
          (successful_requests as f64 / total_requests as f64 * 100.0).round()
        } else {
          100.0
        }
      }
    }))
}

///
/// Handle the Ollama-style chat endpoint.
///
/// Translates the request through the active adapter and streams the reply
/// back as NDJSON, one self-contained object per fragment.
///
/// # Arguments
///  * `state` - shared application state
///  * `request` - Ollama format request JSON
///
/// # Returns
///  * NDJSON streaming response or error
pub async fn ollama_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<Value>,
) -> Response {
    state.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

    match process_ollama_chat(state.clone(), request).await {
        Ok(response) => {
            state.metrics.successful_requests.fetch_add(1, Ordering::Relaxed);
            response
        }
        Err(e) => {
            record_failure(&state, &e);
            create_error_response(&e)
        }
    }
}

///
/// Handle the OpenAI-compatible chat completions endpoint.
///
/// Streams SSE chunks when the client requested streaming, otherwise
/// aggregates the upstream reply into a single completion object.
///
/// # Arguments
///  * `state` - shared application state
///  * `request` - OpenAI format request JSON
///
/// # Returns
///  * SSE stream or JSON completion, or error
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    Json(request): Json<Value>,
) -> Response {
    state.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

    match process_chat_completions(state.clone(), request).await {
        Ok(response) => {
            state.metrics.successful_requests.fetch_add(1, Ordering::Relaxed);
            response
        }
        Err(e) => {
            record_failure(&state, &e);
            create_error_response(&e)
        }
    }
}

///
/// Handle the Ollama model-listing endpoint.
///
/// Lists the available models with synthesized tag metadata.
///
/// # Arguments
///  * `state` - shared application state
///
/// # Returns
///  * JSON response in Ollama `tags` format
pub async fn ollama_tags(State(state): State<Arc<AppState>>) -> Json<Value> {
    let names = list_model_names(&state).await;
    let models: Vec<Value> = names.iter().map(|name| tags_entry(name)).collect();
    Json(json!({ "models": models }))
}

///
/// Handle the OpenAI model-listing endpoint.
///
/// # Arguments
///  * `state` - shared application state
///
/// # Returns
///  * JSON response with model list
pub async fn openai_models(State(state): State<Arc<AppState>>) -> Json<Value> {
    let names = list_model_names(&state).await;
    let data: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
              "id": name,
              "object": "model",
              "created": Utc::now().timestamp(),
              "owned_by": model_family(name)
            })
        })
        .collect();
    Json(json!({ "object": "list", "data": data }))
}

///
/// Process an Ollama chat request end-to-end.
///
/// # Arguments
///  * `state` - shared application state
///  * `request` - raw JSON request
///
/// # Returns
///  * NDJSON streaming response on success
///  * `ProxyError` on failure before streaming begins
async fn process_ollama_chat(state: Arc<AppState>, request: Value) -> Result<Response> {
    if state.config.debug {
        tracing::debug!("Raw /api/chat body: {}", request);
    }

    // Local-model clients stream unless told otherwise.
    let canonical = parse_canonical(request, true, &state.config)?;
    log_incoming_request("ollama", &canonical);

    if state.config.mock {
        let frame = mock_ollama_frame()?;
        return Ok(streaming_response(CONTENT_TYPE_NDJSON, Body::from(frame)));
    }

    let upstream = forward_upstream(&state, &canonical).await?;

    let (tx, rx) = mpsc::channel::<Bytes>(STREAMING_CHANNEL_BUFFER);
    let adapter = state.adapter.clone();
    let model = canonical.model.clone();
    tokio::spawn(async move {
        let synthesizer = OllamaSynthesizer;
        pump_stream(upstream, adapter, tx, move |fragment| synthesizer.encode(fragment, &model))
            .await;
    });

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
    Ok(streaming_response(CONTENT_TYPE_NDJSON, body))
}

///
/// Process an OpenAI chat completions request end-to-end.
///
/// # Arguments
///  * `state` - shared application state
///  * `request` - raw JSON request
///
/// # Returns
///  * SSE stream or aggregated completion on success
///  * `ProxyError` on failure before streaming begins
async fn process_chat_completions(state: Arc<AppState>, request: Value) -> Result<Response> {
    if state.config.debug {
        tracing::debug!("Raw /v1/chat/completions body: {}", request);
    }

    let canonical = parse_canonical(request, false, &state.config)?;
    log_incoming_request("openai", &canonical);

    if state.config.mock {
        return Ok(Json(mock_completion()).into_response());
    }

    let upstream = forward_upstream(&state, &canonical).await?;

    if canonical.stream {
        let (tx, rx) = mpsc::channel::<Bytes>(STREAMING_CHANNEL_BUFFER);
        let adapter = state.adapter.clone();
        let model = canonical.model.clone();
        tokio::spawn(async move {
            let synthesizer = OpenAiSynthesizer;
            pump_stream(upstream, adapter, tx, move |fragment| {
                synthesizer.encode(fragment, &model)
            })
            .await;
        });

        let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));
        Ok(streaming_response(CONTENT_TYPE_EVENT_STREAM, body))
    } else {
        let body = collect_aggregate(upstream, state.adapter.clone(), &canonical.model).await?;
        Ok(([(header::CONTENT_TYPE, CONTENT_TYPE_JSON)], body).into_response())
    }
}

///
/// Parse a client request body into the canonical representation.
///
/// Applies the model-name remapping table before routing sees the name.
/// An unknown message role rejects the whole request.
///
/// # Arguments
///  * `request` - raw JSON request
///  * `default_stream` - protocol default when the client omits `stream`
///  * `config` - configuration carrying the remapping table
///
/// # Returns
///  * Canonical request
///  * `ProxyError::InvalidRequest` if the body or a role is malformed
fn parse_canonical(request: Value, default_stream: bool, config: &Config) -> Result<CanonicalRequest> {
    let wire: WireChatRequest = serde_json::from_value(request)
        .map_err(|e| ProxyError::InvalidRequest(format!("Invalid request format: {}", e)))?;

    let mut messages = Vec::with_capacity(wire.messages.len());
    for message in wire.messages {
        let role = Role::parse(&message.role).ok_or_else(|| {
            ProxyError::InvalidRequest(format!("Unknown message role: '{}'", message.role))
        })?;
        messages.push(CanonicalMessage { role, text: message.content });
    }

    Ok(CanonicalRequest {
        model: config.remap_model(&wire.model),
        messages,
        stream: wire.stream.unwrap_or(default_stream),
    })
}

///
/// Log a summary of the incoming request.
///
/// # Arguments
///  * `protocol` - inbound protocol name
///  * `request` - canonical request to log
fn log_incoming_request(protocol: &str, request: &CanonicalRequest) {
    tracing::debug!(
        "Incoming {} request: model={}, messages={}, stream={}",
        protocol,
        request.model,
        request.messages.len(),
        request.stream
    );
}

///
/// Record a failed request in the metrics.
///
/// # Arguments
///  * `state` - application state with metrics
///  * `error` - the failure being recorded
fn record_failure(state: &Arc<AppState>, error: &ProxyError) {
    state.metrics.failed_requests.fetch_add(1, Ordering::Relaxed);
    if matches!(
        error,
        ProxyError::Upstream(_) | ProxyError::Request(_) | ProxyError::CredentialUnavailable(_)
    ) {
        state.metrics.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }
    tracing::error!("Request failed: {}", error);
}

///
/// Encode and send the canonical request to the routed upstream.
///
/// Routing, credential resolution and request encoding all happen here, before
/// any byte reaches the client, so every failure on this path still maps to a
/// clean HTTP error response.
///
/// # Arguments
///  * `state` - application state
///  * `request` - canonical request to forward
///
/// # Returns
///  * Streaming upstream response
///  * `ProxyError` if routing, credentials, encoding or transport fail
async fn forward_upstream(
    state: &Arc<AppState>,
    request: &CanonicalRequest,
) -> Result<reqwest::Response> {
    let decision = state.selector.select(&request.model);
    tracing::debug!(
        "Routing model '{}' to {} (secondary pool: {})",
        request.model,
        decision.base_url,
        decision.uses_secondary_pool
    );

    let credential = if state.adapter.requires_pool_token() {
        state.selector.resolve_pool_token(&request.model, &decision).await?
    } else {
        state.config.api_key.clone()
    };

    let body = state.adapter.encode_request(request)?;

    let mut upstream = state
        .http_client
        .post(&decision.base_url)
        .header(AUTHORIZATION_HEADER, format!("{}{}", BEARER_PREFIX, credential))
        .header(API_KEY_HEADER, &state.config.api_key)
        .header("Content-Type", CONTENT_TYPE_JSON)
        .body(body);
    if let Some((name, value)) = state.adapter.version_header() {
        upstream = upstream.header(name, value);
    }

    let response = upstream.send().await.map_err(|e| {
        ProxyError::Upstream(format!("Upstream request to {} failed: {}", decision.base_url, e))
    })?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        tracing::error!("Upstream error ({}): {}", status, error_text);
        return Err(ProxyError::Upstream(format!("Upstream returned status {}", status)));
    }

    Ok(response)
}

///
/// Translate the upstream event stream into client frames.
///
/// One upstream event yields zero or one client frames; frames are written to
/// the channel in classification order and never reordered. A transport or
/// scan error terminates the stream after everything already translated has
/// been flushed. A final event the upstream sent without a trailing line feed
/// is still surfaced when its connection closes. A failed channel send means
/// the client disconnected, which drops the upstream response and closes its
/// connection.
///
/// # Arguments
///  * `response` - streaming upstream response
///  * `adapter` - active adapter for event classification
///  * `tx` - channel carrying encoded frames to the response body
///  * `encode` - synthesizer encoding step for the target protocol
async fn pump_stream(
    response: reqwest::Response,
    adapter: Arc<dyn UpstreamAdapter>,
    tx: mpsc::Sender<Bytes>,
    mut encode: impl FnMut(&CanonicalFragment) -> Result<(Bytes, bool)>,
) {
    let mut stream = response.bytes_stream();
    let mut scanner = EventScanner::new();

    while let Some(chunk_result) = stream.next().await {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::error!("Upstream stream error: {}", e);
                break;
            }
        };

        let payloads = match scanner.push(&chunk) {
            Ok(payloads) => payloads,
            Err(e) => {
                tracing::error!("Stream scan error: {}", e);
                break;
            }
        };

        for payload in payloads {
            let Some(fragment) = adapter.classify(&payload) else {
                continue;
            };
            match encode(&fragment) {
                Ok((frame, is_final)) => {
                    if tx.send(frame).await.is_err() {
                        tracing::debug!("Client disconnected, dropping upstream stream");
                        return;
                    }
                    if is_final {
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!("Frame encode error: {}", e);
                    return;
                }
            }
        }

        if scanner.is_done() {
            break;
        }
    }

    if let Some(payload) = scanner.finish() {
        if let Some(fragment) = adapter.classify(&payload) {
            match encode(&fragment) {
                Ok((frame, _)) => {
                    let _ = tx.send(frame).await;
                }
                Err(e) => tracing::error!("Frame encode error: {}", e),
            }
        }
    }
}

///
/// Drain the upstream stream into a single aggregated completion.
///
/// Nothing has been written to the client yet on this path, so any upstream
/// failure still surfaces as a whole error response.
///
/// # Arguments
///  * `response` - streaming upstream response
///  * `adapter` - active adapter for event classification
///  * `model` - model name echoed to the client
///
/// # Returns
///  * Serialized completion object
///  * `ProxyError::Upstream` if the stream fails or ends without completing
async fn collect_aggregate(
    response: reqwest::Response,
    adapter: Arc<dyn UpstreamAdapter>,
    model: &str,
) -> Result<Bytes> {
    let mut stream = response.bytes_stream();
    let mut scanner = EventScanner::new();
    let mut synthesizer = AggregateSynthesizer::new();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result
            .map_err(|e| ProxyError::Upstream(format!("Upstream stream error: {}", e)))?;

        for payload in scanner.push(&chunk)? {
            let Some(fragment) = adapter.classify(&payload) else {
                continue;
            };
            if let Some(body) = synthesizer.push(&fragment, model)? {
                return Ok(body);
            }
        }

        if scanner.is_done() {
            break;
        }
    }

    if let Some(payload) = scanner.finish() {
        if let Some(fragment) = adapter.classify(&payload) {
            if let Some(body) = synthesizer.push(&fragment, model)? {
                return Ok(body);
            }
        }
    }

    Err(ProxyError::Upstream("Upstream stream ended before completion".to_string()))
}

///
/// Build a streaming response with the headers both stream protocols require.
///
/// # Arguments
///  * `content_type` - frame content type
///  * `body` - streaming body
///
/// # Returns
///  * HTTP response with caching disabled and the connection kept alive
fn streaming_response(content_type: &'static str, body: Body) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}

///
/// Create an error response for client errors.
///
/// # Arguments
///  * `error` - error to convert to HTTP response
///
/// # Returns
///  * HTTP error response with JSON error details
fn create_error_response(error: &ProxyError) -> Response {
    let (status_code, error_type) = match error {
        ProxyError::Config(_) | ProxyError::InvalidRequest(_) => {
            (StatusCode::BAD_REQUEST, "invalid_request_error")
        }
        ProxyError::CredentialUnavailable(_) => (StatusCode::BAD_GATEWAY, "credential_error"),
        ProxyError::Upstream(_) | ProxyError::Request(_) | ProxyError::EventTooLarge { .. } => {
            (StatusCode::BAD_GATEWAY, "upstream_error")
        }
        ProxyError::Serialization(_) | ProxyError::Io(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
        }
    };

    let error_response = json!({
      "error": {
        "message": error.to_string(),
        "type": error_type,
        "code": status_code.as_u16()
      }
    });

    (status_code, Json(error_response)).into_response()
}

///
/// Model names served by the listing endpoints.
///
/// Mock mode serves a fixed set; pool-token upstreams list the configured pool
/// models; everything else asks the remote model-listing endpoint. A failed
/// remote fetch degrades to an empty listing rather than an error.
///
/// # Arguments
///  * `state` - application state
///
/// # Returns
///  * Model names to list
async fn list_model_names(state: &Arc<AppState>) -> Vec<String> {
    if state.config.mock {
        return MOCK_MODELS.iter().map(|s| s.to_string()).collect();
    }
    if state.adapter.requires_pool_token() {
        return state.config.pool_models();
    }
    match fetch_remote_models(state).await {
        Ok(names) => names,
        Err(e) => {
            tracing::error!("Model listing fetch failed: {}", e);
            Vec::new()
        }
    }
}

///
/// Fetch the model list from the configured remote listing endpoint.
///
/// # Arguments
///  * `state` - application state
///
/// # Returns
///  * Remote model identifiers
///  * `ProxyError` on transport or decode failure
async fn fetch_remote_models(state: &Arc<AppState>) -> Result<Vec<String>> {
    let response = state
        .http_client
        .get(&state.config.models_url)
        .header(AUTHORIZATION_HEADER, format!("{}{}", BEARER_PREFIX, state.config.api_key))
        .header(API_KEY_HEADER, &state.config.api_key)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProxyError::Upstream(format!(
            "Model listing endpoint returned status {}",
            response.status()
        )));
    }

    let list: RemoteModelList = response.json().await?;
    Ok(list.data.into_iter().map(|m| m.id).collect())
}

///
/// Build one Ollama `tags` entry with synthesized metadata.
///
/// # Arguments
///  * `name` - model name
///
/// # Returns
///  * Tag entry JSON object
fn tags_entry(name: &str) -> Value {
    let family = model_family(name);
    let mut rng = rand::rng();
    let size: i64 = rng.random_range(0..MODEL_SIZE_CEILING);
    let digest: String =
        (&mut rng).sample_iter(Alphanumeric).take(MODEL_DIGEST_LEN).map(char::from).collect();

    json!({
      "name": name,
      "model": name,
      "modified_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
      "size": size,
      "digest": digest,
      "details": {
        "format": "unknown",
        "family": family,
        "families": [family],
        "parameter_size": "unknown",
        "quantization_level": "unknown"
      }
    })
}

///
/// Model family derived from the name's first segment.
fn model_family(name: &str) -> &str {
    name.split(['-', ' ']).next().unwrap_or(name)
}

///
/// Canned NDJSON frame served by the Ollama chat endpoint in mock mode.
fn mock_ollama_frame() -> Result<Vec<u8>> {
    let frame = json!({
      "model": MOCK_MODELS[0],
      "created_at": Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
      "message": { "role": "assistant", "content": MOCK_COMPLETION_TEXT },
      "done": true,
      "done_reason": "stop",
      "total_duration": PLACEHOLDER_TOTAL_DURATION,
      "load_duration": PLACEHOLDER_LOAD_DURATION,
      "prompt_eval_count": PLACEHOLDER_PROMPT_EVAL_COUNT,
      "prompt_eval_duration": PLACEHOLDER_PROMPT_EVAL_DURATION,
      "eval_count": PLACEHOLDER_EVAL_COUNT,
      "eval_duration": PLACEHOLDER_EVAL_DURATION
    });

    let mut bytes = serde_json::to_vec(&frame)?;
    bytes.push(b'\n');
    Ok(bytes)
}

///
/// Canned completion served by the OpenAI chat endpoint in mock mode.
fn mock_completion() -> Value {
    json!({
      "id": "chatcmpl-mock",
      "object": "chat.completion",
      "created": Utc::now().timestamp(),
      "model": MOCK_MODELS[1],
      "choices": [{
        "index": 0,
        "message": { "role": "assistant", "content": MOCK_COMPLETION_TEXT },
        "finish_reason": "stop"
      }],
      "usage": { "prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0 }
    })
}
