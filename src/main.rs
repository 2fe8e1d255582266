//! # ChatBridge - Streaming Chat Translation Proxy Server
//!
//! A streaming translation proxy between heterogeneous chat-completion
//! protocols. Ollama-style and OpenAI-style clients talk to one local
//! endpoint; requests are routed, re-encoded and forwarded to an
//! Anthropic-style, Dify-style or OpenAI-style upstream, and the upstream's
//! event stream is translated back incrementally.
//!
//! ## Features
//!
//! - **Ollama-compatible API**: `/api/chat` NDJSON streaming and `/api/tags`
//! - **OpenAI-compatible API**: `/v1/chat/completions` (SSE or aggregated) and `/v1/models`
//! - **Pluggable upstreams**: Anthropic, Dify and OpenAI wire formats behind one adapter trait
//! - **Pool routing**: per-model routing between a primary and a secondary upstream pool
//! - **Credential cache**: pool bearer tokens fetched once per model and reused
//! - **Streaming Translation**: incremental event scanning, one client frame per upstream event
//! - **Error Handling**: comprehensive error handling with proper Result types
//! - **Configurable Logging**: structured logging with tracing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatbridge::{Config, create_app};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load configuration file
//!     let config = Config::load("config.json")?;
//!
//!     // Create the application
//!     let app = create_app(config)?;
//!
//!     // Start the server
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Configure the server with a JSON file (default `config.json`):
//!
//! ```json
//! {
//!   "port": 3000,
//!   "chatType": "dify",
//!   "apiUrl": "https://upstream.example.com/v1/chat-messages",
//!   "apiUrlProd": "https://prod.example.com/v1/chat-messages",
//!   "tokenUrl": "https://upstream.example.com/token",
//!   "appMap": { "gpt-4": "app-code-a" },
//!   "appMapProd": { "grok-3-beta": "app-code-b" },
//!   "mapping": { "gpt-4o": "gpt-4" }
//! }
//! ```
//!
//! `PORT` and `LOG_LEVEL` environment variables override the file.
//!
//! ## API Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/api/chat \
//!   -H "Content-Type: application/json" \
//!   -d '{
//!     "model": "gpt-4",
//!     "messages": [{"role": "user", "content": "Hello!"}]
//!   }'
//! ```
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.
//!
//! Authors: Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp
//!

/* --- uses ------------------------------------------------------------------------------------ */

use std::env;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{Level, info, warn};

use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::server::AppState;

/* --- modules --------------------------------------------------------------------------------- */

mod adapter;
mod canonical;
mod config;
mod error;
mod router;
mod scanner;
mod server;
mod synthesizer;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Parsed command line invocation.
struct CliArgs {
    /** subcommand to run instead of the server, if any */
    command: Option<String>,
    /** path to the JSON configuration file */
    config_path: String,
}

/* --- constants ------------------------------------------------------------------------------ */

/** the version as defined in cargo.toml */
const VERSION: &str = env!("CARGO_PKG_VERSION");

/** default configuration file path */
const DEFAULT_CONFIG_PATH: &str = "config.json";

/* --- start of code -------------------------------------------------------------------------- */

///
/// Main application entry point for the ChatBridge translation proxy server.
///
/// Parses CLI arguments, loads configuration from the JSON file, initializes
/// logging, and starts the HTTP server with proper routing and middleware.
#[tokio::main]
async fn main() {
    let args = parse_cli_args();

    if let Some(command) = &args.command {
        match command.as_str() {
            "validate" => std::process::exit(run_validate(&args.config_path)),
            _ => {
                eprintln!("Error: Unknown command: {}", command);
                eprintln!();
                eprintln!("Available commands:");
                eprintln!("  validate  - Validate configuration");
                eprintln!();
                eprintln!("Run 'chatbridge --help' for more information.");
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = run(&args.config_path).await {
        // Print error message line by line to ensure proper formatting
        let error_msg = format!("{}", e);
        eprintln!("Error:");
        for line in error_msg.lines() {
            eprintln!("{}", line);
        }
        std::process::exit(1);
    }
}

async fn run(config_path: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    initialize_logging(&config);
    check_config(&config)?;

    let app_state = Arc::new(AppState::new(config.clone())?);
    let app = create_router(app_state);

    start_server(&config, app).await
}

///
/// Parse command line arguments, exiting early for --version and --help.
///
/// # Returns
///  * Parsed invocation with the resolved configuration path
fn parse_cli_args() -> CliArgs {
    let args: Vec<String> = env::args().collect();
    let mut parsed = CliArgs { command: None, config_path: DEFAULT_CONFIG_PATH.to_string() };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--version" | "-V" => {
                println!("chatbridge {}", VERSION);
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: {} requires a file path", args[i]);
                    std::process::exit(1);
                }
                parsed.config_path = args[i + 1].clone();
                i += 1;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
            command => {
                parsed.command = Some(command.to_string());
            }
        }
        i += 1;
    }

    parsed
}

///
/// Print help information for the ChatBridge CLI.
fn print_help() {
    println!("ChatBridge v{}", VERSION);
    println!("Streaming translation proxy between chat-completion protocols");
    println!();
    println!("USAGE:");
    println!("    chatbridge [COMMAND] [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    validate            Validate configuration and exit");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config FILE   Path to the JSON config file (default: config.json)");
    println!("    -h, --help          Print help information");
    println!("    -V, --version       Print version information");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    PORT                Server port (overrides the config file)");
    println!(
        "    LOG_LEVEL           Log level: trace, debug, info, warn, error (default: info)"
    );
    println!();
    println!("EXAMPLES:");
    println!("    chatbridge                          Start the proxy server");
    println!("    chatbridge --config /etc/cb.json    Start with an explicit config file");
    println!("    chatbridge validate                 Validate and exit");
}

///
/// Run the validate command to validate configuration and exit.
///
/// Returns exit code 0 if valid, 1 if invalid.
fn run_validate(config_path: &str) -> i32 {
    match Config::load(config_path) {
        Ok(config) => {
            let issues = config.validate();
            let errors: Vec<_> = issues
                .iter()
                .filter(|i| i.severity == config::ValidationSeverity::Error)
                .collect();

            if errors.is_empty() {
                println!("[OK] Configuration is valid");
                for issue in &issues {
                    println!("  • {}: {}", issue.field, issue.message);
                    if let Some(suggestion) = &issue.suggestion {
                        println!("    Suggestion: {}", suggestion);
                    }
                }
                0
            } else {
                eprintln!("[ERROR] Configuration validation failed:");
                for issue in &errors {
                    eprintln!("  • {}: {}", issue.field, issue.message);
                    if let Some(suggestion) = &issue.suggestion {
                        eprintln!("    Suggestion: {}", suggestion);
                    }
                }
                1
            }
        }
        Err(e) => {
            eprintln!("[ERROR] Configuration error: {}", e);
            1
        }
    }
}

///
/// Initialize logging with the specified log level.
///
/// Sets up tracing subscriber with appropriate log level based on configuration.
///
/// # Arguments
///  * `config` - application configuration containing log level settings
fn initialize_logging(config: &Config) {
    let log_level = match config.log_level {
        config::LogLevel::Trace => Level::TRACE,
        config::LogLevel::Debug => Level::DEBUG,
        config::LogLevel::Info => Level::INFO,
        config::LogLevel::Warn => Level::WARN,
        config::LogLevel::Error => Level::ERROR,
    };

    tracing_subscriber::fmt().with_max_level(log_level).with_target(false).init();
}

///
/// Fail startup on configuration errors, log warnings otherwise.
///
/// # Arguments
///  * `config` - loaded configuration
///
/// # Returns
///  * `Ok(())` when no error-severity issues exist
///  * `ProxyError::Config` listing every error otherwise
fn check_config(config: &Config) -> Result<()> {
    let issues = config.validate();
    let mut errors = Vec::new();

    for issue in &issues {
        match issue.severity {
            config::ValidationSeverity::Error => {
                errors.push(format!("{}: {}", issue.field, issue.message));
            }
            config::ValidationSeverity::Warning => {
                warn!("Config warning - {}: {}", issue.field, issue.message);
            }
            config::ValidationSeverity::Info => {
                info!("Config note - {}: {}", issue.field, issue.message);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ProxyError::Config(format!(
            "Configuration validation failed:\n  {}\n\nRun 'chatbridge validate' for details.",
            errors.join("\n  ")
        )))
    }
}

///
/// Create the Axum router with all routes and middleware.
///
/// Sets up the Ollama-style and OpenAI-style endpoints, model listings, and
/// health checks with proper CORS and tracing middleware.
///
/// # Arguments
///  * `app_state` - shared application state
///
/// # Returns
///  * Configured Axum router ready for serving
fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(server::root))
        .route("/api/chat", post(server::ollama_chat))
        .route("/api/tags", get(server::ollama_tags))
        .route("/v1/chat/completions", post(server::chat_completions))
        .route("/v1/models", get(server::openai_models))
        .route("/health", get(server::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

///
/// Start the HTTP server and log startup information.
///
/// Binds to the configured port and starts serving requests. Logs important
/// information about the server configuration and available endpoints.
///
/// # Arguments
///  * `config` - application configuration
///  * `app` - configured Axum application
///
/// # Returns
///  * `Ok(())` when server shuts down gracefully
///  * `ProxyError` if server binding or startup fails
async fn start_server(config: &Config, app: Router) -> Result<()> {
    let listener =
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await.map_err(|e| {
            ProxyError::Config(format!(
                "Failed to bind to port {}: {}\n\n\
                 To fix this:\n\
                 • Check whether another instance is already running (lsof -i :{})\n\
                 • Try a different port: export PORT=3001\n",
                config.port, e, config.port
            ))
        })?;

    log_startup_info(config);

    axum::serve(listener, app).await?;

    Ok(())
}

///
/// Log startup information and configuration details.
///
/// # Arguments
///  * `config` - application configuration
fn log_startup_info(config: &Config) {
    info!("ChatBridge v{} running on port {}", VERSION, config.port);
    info!("Upstream adapter: {}", config.chat_type);
    info!("Ollama-compatible endpoint: http://localhost:{}/api/chat", config.port);
    info!("OpenAI-compatible endpoint: http://localhost:{}/v1", config.port);

    if config.mock {
        warn!("Mock mode is enabled - serving canned responses, no upstream will be contacted");
    }
    if config.log_level.is_trace_enabled() {
        info!(
            "[TRACE] Trace logging is ENABLED (LOG_LEVEL={:?}) - per-event stream translation \
             will be logged",
            config.log_level
        );
    }
}
