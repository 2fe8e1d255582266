//! # ChatBridge - Streaming Chat Translation Proxy Library
//!
//! This crate provides a streaming translation proxy between heterogeneous
//! chat-completion protocols: Ollama-style and OpenAI-style clients on the
//! inbound side, Anthropic-style, Dify-style and OpenAI-style providers on
//! the upstream side. While primarily designed as a binary application, this
//! library exposes its core functionality for programmatic use.
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use chatbridge::{Config, create_app};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration
//!     let config = Config::load("config.json")?;
//!
//!     // Create the application
//!     let app = create_app(config)?;
//!
//!     // Start server
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Configuration loading (JSON file + env overrides) and validation
//! - [`canonical`] - Protocol-neutral request/fragment data model
//! - [`scanner`] - Incremental event-stream scanner
//! - [`router`] - Upstream routing and pool-credential cache
//! - [`adapter`] - Upstream provider adapters ([`adapter::UpstreamAdapter`])
//! - [`synthesizer`] - Client-protocol response synthesis
//! - [`server`] - HTTP server setup and route handlers
//! - [`error`] - Error types and handling

pub mod adapter;
pub mod canonical;
pub mod config;
pub mod error;
pub mod router;
pub mod scanner;
pub mod server;
pub mod synthesizer;

// Re-export commonly used types
pub use config::{Config, ValidationIssue, ValidationSeverity};
pub use error::ProxyError;

/// Creates a new ChatBridge application with the given configuration.
///
/// This is a convenience function that sets up the full application stack
/// including the upstream adapter, routing, and middleware.
///
/// # Arguments
///
/// * `config` - Application configuration
///
/// # Returns
///
/// Returns an Axum Router that can be served directly.
///
/// # Errors
///
/// Returns a `ProxyError` if the configured chat type names no adapter or
/// other initialization issues occur.
///
/// # Examples
///
/// ```rust,no_run
/// use chatbridge::{Config, create_app};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::load("config.json")?;
///     let app = create_app(config)?;
///
///     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
///     axum::serve(listener, app).await?;
///     Ok(())
/// }
/// ```
pub fn create_app(config: Config) -> Result<axum::Router, ProxyError> {
    use axum::Router;
    use axum::routing::{get, post};
    use std::sync::Arc;
    use tower_http::cors::CorsLayer;
    use tower_http::trace::TraceLayer;

    let app_state = Arc::new(server::AppState::new(config)?);

    Ok(Router::new()
        .route("/", get(server::root))
        .route("/api/chat", post(server::ollama_chat))
        .route("/api/tags", get(server::ollama_tags))
        .route("/v1/chat/completions", post(server::chat_completions))
        .route("/v1/models", get(server::openai_models))
        .route("/health", get(server::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state))
}
