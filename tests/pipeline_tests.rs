//! Streaming translation pipeline tests
//!
//! End-to-end tests of the full translation path: a fake upstream serves a
//! scripted event stream on an ephemeral loopback port, the proxy translates
//! it, and the client-side frames are checked for content, ordering and
//! completion semantics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use chatbridge::config::Config;
use serde_json::{Value, json};

/// Serve a router on an ephemeral loopback port and return its base URL.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
    let addr = listener.local_addr().expect("No local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server error");
    });
    format!("http://{}", addr)
}

/// Serve the proxy app and return its base URL.
async fn spawn_app(config: Config) -> String {
    spawn(chatbridge::create_app(config).expect("Failed to create app")).await
}

/// Fake upstream that answers every POST /chat with a fixed body.
async fn spawn_upstream(body: &'static str) -> String {
    let base = spawn(Router::new().route("/chat", post(move || async move { body }))).await;
    format!("{}/chat", base)
}

/// Parse an NDJSON response body into JSON objects, one per line.
fn parse_ndjson(text: &str) -> Vec<Value> {
    text.lines()
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).expect("Invalid NDJSON line"))
        .collect()
}

const ANTHROPIC_STREAM: &str = "\
data: {\"type\":\"message_start\",\"message\":{}}\n\
data: {\"type\":\"content_block_start\",\"index\":0}\n\
data: {\"type\":\"ping\"}\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n\
data: {\"type\":\"message_stop\"}\n";

/// The upstream closes the connection right after the terminal event,
/// without a trailing line feed.
const ANTHROPIC_STREAM_UNTERMINATED: &str = "\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hi\"}}\n\
data: {\"type\":\"message_stop\"}";

const OPENAI_STREAM: &str = "\
data: {\"id\":\"1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\
data: {\"id\":\"1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n\
data: {\"id\":\"1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" there\"},\"finish_reason\":null}]}\n\
data: {\"id\":\"1\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}],\"usage\":{\"prompt_tokens\":5,\"completion_tokens\":2,\"total_tokens\":7}}\n\
data: [DONE]\n";

/// One malformed event among five; the stream must recover around it.
const OPENAI_STREAM_WITH_NOISE: &str = "\
data: {\"id\":\"1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"A\"},\"finish_reason\":null}]}\n\
data: {\"id\":\"1\",\"choices\":[{\"index\":0,\n\
data: {\"id\":\"1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"B\"},\"finish_reason\":null}]}\n\
data: {\"id\":\"1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"C\"},\"finish_reason\":null}]}\n\
data: {\"id\":\"1\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\
data: [DONE]\n";

const DIFY_STREAM: &str = "\
data: {\"event\":\"agent_thought\",\"thought\":\"\"}\n\
data: {\"event\":\"agent_message\",\"answer\":\"Hi\"}\n\
data: {\"event\":\"agent_message\",\"answer\":\" there\"}\n\
data: {\"event\":\"message_end\",\"metadata\":{\"usage\":{\"prompt_tokens\":7,\"completion_tokens\":21,\"total_tokens\":28}}}\n";

fn proxy_config(chat_type: &str, api_url: String) -> Config {
    Config { chat_type: chat_type.to_string(), api_url, ..Config::default() }
}

/// Test the Anthropic-upstream to Ollama-NDJSON translation path
#[tokio::test]
async fn test_anthropic_stream_to_ndjson() {
    let api_url = spawn_upstream(ANTHROPIC_STREAM).await;
    let base = spawn_app(proxy_config("anthropic", api_url)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({"model": "claude-3-7-sonnet-latest",
                      "messages": [{"role": "user", "content": "greet me"}]}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let frames = parse_ndjson(&response.text().await.unwrap());
    assert_eq!(frames.len(), 3, "frames: {:?}", frames);

    // Deltas in order, terminal frame last and only once.
    assert_eq!(frames[0]["done"], false);
    assert_eq!(frames[0]["message"]["content"], "Hi");
    assert_eq!(frames[1]["message"]["content"], " there");
    assert_eq!(frames[2]["done"], true);
    assert_eq!(frames[2]["done_reason"], "stop");
    // No usage from this upstream, so the placeholder counters appear.
    assert_eq!(frames[2]["prompt_eval_count"], 9);
    assert_eq!(frames[2]["eval_count"], 12);
}

/// Test that a terminal event without a trailing line feed is not lost
#[tokio::test]
async fn test_unterminated_final_event_still_completes_stream() {
    let api_url = spawn_upstream(ANTHROPIC_STREAM_UNTERMINATED).await;
    let base = spawn_app(proxy_config("anthropic", api_url)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({"model": "claude-3-7-sonnet-latest",
                      "messages": [{"role": "user", "content": "greet me"}]}))
        .send()
        .await
        .unwrap();

    let frames = parse_ndjson(&response.text().await.unwrap());
    assert_eq!(frames.len(), 2, "frames: {:?}", frames);
    assert_eq!(frames[0]["message"]["content"], "Hi");
    assert_eq!(frames[1]["done"], true);
    assert_eq!(frames[1]["done_reason"], "stop");
}

/// Test that one malformed upstream event is skipped without ending the stream
#[tokio::test]
async fn test_malformed_event_is_recovered() {
    let api_url = spawn_upstream(OPENAI_STREAM_WITH_NOISE).await;
    let base = spawn_app(proxy_config("openai", api_url)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({"model": "m", "messages": [{"role": "user", "content": "x"}]}))
        .send()
        .await
        .unwrap();

    let frames = parse_ndjson(&response.text().await.unwrap());
    assert_eq!(frames.len(), 4, "frames: {:?}", frames);

    let content: String = frames[..3]
        .iter()
        .map(|f| f["message"]["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(content, "ABC");
    assert_eq!(frames[3]["done"], true);
}

/// Test the OpenAI-upstream to SSE translation path
#[tokio::test]
async fn test_openai_stream_to_sse() {
    let api_url = spawn_upstream(OPENAI_STREAM).await;
    let base = spawn_app(proxy_config("openai", api_url)).await;

    let response = reqwest::Client::new()
        .post(format!("{}/v1/chat/completions", base))
        .json(&json!({"model": "gpt-4", "stream": true,
                      "messages": [{"role": "user", "content": "greet me"}]}))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    let content_type = response.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"), "got: {}", content_type);

    let text = response.text().await.unwrap();
    assert!(text.ends_with("data: [DONE]\n\n"), "got: {}", text);

    let chunks: Vec<Value> = text
        .split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .filter(|payload| *payload != "[DONE]")
        .map(|payload| serde_json::from_str(payload).expect("Invalid chunk"))
        .collect();
    assert_eq!(chunks.len(), 3, "chunks: {:?}", chunks);

    let content: String = chunks[..2]
        .iter()
        .map(|c| c["choices"][0]["delta"]["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(content, "Hi there");
    assert_eq!(chunks[2]["choices"][0]["finish_reason"], "stop");
    assert_eq!(chunks[2]["usage"]["total_tokens"], 7);
}

/// Test the aggregated non-streaming completion path
#[tokio::test]
async fn test_openai_stream_aggregated() {
    let api_url = spawn_upstream(OPENAI_STREAM).await;
    let base = spawn_app(proxy_config("openai", api_url)).await;

    let completion: Value = reqwest::Client::new()
        .post(format!("{}/v1/chat/completions", base))
        .json(&json!({"model": "gpt-4", "stream": false,
                      "messages": [{"role": "user", "content": "greet me"}]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(completion["object"], "chat.completion");
    assert_eq!(completion["choices"][0]["message"]["content"], "Hi there");
    assert_eq!(completion["choices"][0]["finish_reason"], "stop");
    assert_eq!(completion["usage"]["prompt_tokens"], 5);
    assert_eq!(completion["usage"]["total_tokens"], 7);
}

/// Test the Dify path end-to-end, including the pool-token fetch
#[tokio::test]
async fn test_dify_stream_with_pool_token() {
    let seen_auth: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let seen_auth_upstream = seen_auth.clone();

    let upstream = Router::new()
        .route(
            "/chat",
            post(move |headers: HeaderMap| {
                let seen_auth = seen_auth_upstream.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    *seen_auth.lock().unwrap() = auth;
                    DIFY_STREAM
                }
            }),
        )
        .route(
            "/token",
            get(|| async { axum::Json(json!({ "access_token": "tok-pool-1" })) }),
        );
    let upstream_base = spawn(upstream).await;

    let config = Config {
        chat_type: "dify".to_string(),
        api_url: format!("{}/chat", upstream_base),
        token_url: format!("{}/token", upstream_base),
        app_map: HashMap::from([("gpt-4".to_string(), "app-a".to_string())]),
        ..Config::default()
    };
    let base = spawn_app(config).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({"model": "gpt-4", "messages": [{"role": "user", "content": "greet me"}]}))
        .send()
        .await
        .unwrap();

    let frames = parse_ndjson(&response.text().await.unwrap());
    assert_eq!(frames.len(), 3, "frames: {:?}", frames);
    assert_eq!(frames[0]["message"]["content"], "Hi");
    assert_eq!(frames[1]["message"]["content"], " there");
    assert_eq!(frames[2]["done"], true);
    // Real usage from message_end, not placeholders.
    assert_eq!(frames[2]["prompt_eval_count"], 7);
    assert_eq!(frames[2]["eval_count"], 21);

    // The upstream call authenticated with the fetched pool token.
    let auth = seen_auth.lock().unwrap().clone();
    assert_eq!(auth.as_deref(), Some("Bearer tok-pool-1"));
}

/// Test that an upstream error status maps to 502 before streaming begins
#[tokio::test]
async fn test_upstream_failure_is_bad_gateway() {
    let upstream = Router::new().route(
        "/chat",
        post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let upstream_base = spawn(upstream).await;

    let base =
        spawn_app(proxy_config("openai", format!("{}/chat", upstream_base))).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/chat", base))
        .json(&json!({"model": "m", "messages": [{"role": "user", "content": "x"}]}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"]["type"], "upstream_error");
}
