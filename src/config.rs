//!
//! Configuration management for the ChatBridge proxy server.
//!
//! Loads the static configuration from a JSON file (with a handful of
//! environment overrides) exactly once at startup. The loaded structure is
//! shared read-only between requests; per-request routing state is computed
//! from it rather than mutated into it.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::collections::HashMap;
use std::env;

use serde::Deserialize;

use crate::error::{ProxyError, Result};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Application configuration structure.
///
/// The upstream adapter is selected by `chat_type`; the primary/secondary base
/// URLs and app maps drive per-request routing. Read once at startup and never
/// mutated afterwards.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /** HTTP server port number */
    pub port: u16,
    /** upstream adapter identifier (anthropic, dify, openai) */
    pub chat_type: String,
    /** primary upstream chat URL */
    pub api_url: String,
    /** secondary-pool upstream chat URL */
    pub api_url_prod: String,
    /** upstream model-listing URL (optional) */
    pub models_url: String,
    /** static upstream API key */
    pub api_key: String,
    /** verbose per-event debug logging */
    pub debug: bool,
    /** serve canned responses without contacting any upstream */
    pub mock: bool,
    /** primary pool: model name to application code */
    pub app_map: HashMap<String, String>,
    /** secondary pool: model name to application code */
    pub app_map_prod: HashMap<String, String>,
    /** primary token endpoint for pool credentials */
    pub token_url: String,
    /** secondary-pool token endpoint */
    pub token_url_prod: String,
    /** model-name remapping applied before routing */
    pub mapping: HashMap<String, String>,
    /** application logging level (env override: LOG_LEVEL) */
    #[serde(skip)]
    pub log_level: LogLevel,
}

///
/// Logging level enumeration.
///
/// Defines available log levels with helper methods for level checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

///
/// Configuration validation issue.
///
/// Represents a single validation problem found during configuration check.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Configuration field name
    pub field: String,
    /// Severity of the issue
    pub severity: ValidationSeverity,
    /// Description of the issue
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

///
/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Error - configuration is invalid and will cause failures
    Error,
    /// Warning - configuration may work but has potential issues
    Warning,
    /// Info - informational note about configuration
    Info,
}

/* --- constants ------------------------------------------------------------------------------ */

/** Default server port when neither file nor environment specify one */
const DEFAULT_PORT: u16 = 3000;

/** Adapter identifiers accepted in `chat_type` */
pub const KNOWN_CHAT_TYPES: &[&str] = &["anthropic", "dify", "openai"];

/* --- start of code -------------------------------------------------------------------------- */

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            chat_type: "anthropic".to_string(),
            api_url: String::new(),
            api_url_prod: String::new(),
            models_url: String::new(),
            api_key: String::new(),
            debug: false,
            mock: false,
            app_map: HashMap::new(),
            app_map_prod: HashMap::new(),
            token_url: String::new(),
            token_url_prod: String::new(),
            mapping: HashMap::new(),
            log_level: LogLevel::Info,
        }
    }
}

impl LogLevel {
    ///
    /// Check if trace-level logging is enabled.
    ///
    /// Returns true for Trace and Debug levels, which enable detailed logging
    /// of per-event stream translation.
    ///
    /// # Returns
    ///  * `true` if trace logging should be enabled
    ///  * `false` otherwise
    pub fn is_trace_enabled(self) -> bool {
        matches!(self, LogLevel::Trace | LogLevel::Debug)
    }
}

impl From<&str> for LogLevel {
    ///
    /// Convert string representation to LogLevel enum.
    ///
    /// Case-insensitive conversion with Info as the default fallback.
    ///
    /// # Arguments
    ///  * `s` - string representation of log level
    ///
    /// # Returns
    ///  * Corresponding LogLevel enum value
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

impl Config {
    ///
    /// Load configuration from a JSON file with environment overrides.
    ///
    /// Attempts to load a .env file first, then reads and parses the config
    /// file, then applies `PORT` and `LOG_LEVEL` overrides from the
    /// environment. A missing or unparsable file is fatal at startup.
    ///
    /// # Arguments
    ///  * `path` - path to the JSON configuration file
    ///
    /// # Returns
    ///  * Configuration object with all settings loaded
    ///  * `ProxyError::Config` if the file is missing or invalid
    pub fn load(path: &str) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let data = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::Config(format!(
                "Failed to read config file '{}': {}\n\
                 \n\
                 To fix this:\n\
                   1. Create a config.json next to the binary, or\n\
                   2. Pass an explicit path: chatbridge --config /path/to/config.json\n\
                 \n\
                 Run 'chatbridge validate' to check an existing file.",
                path, e
            ))
        })?;

        let mut config: Config = serde_json::from_str(&data).map_err(|e| {
            ProxyError::Config(format!("Failed to parse config file '{}': {}", path, e))
        })?;

        config.apply_env_overrides();
        Ok(config)
    }

    ///
    /// Apply environment-variable overrides to a loaded configuration.
    ///
    /// `PORT` and `LOG_LEVEL` win over file values when set.
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = env::var("PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.port = port;
            }
        }
        let log_level_str = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        self.log_level = LogLevel::from(log_level_str.as_str());
    }

    ///
    /// Apply the model-name remapping table to a requested model name.
    ///
    /// # Arguments
    ///  * `model` - model name as the client sent it
    ///
    /// # Returns
    ///  * Remapped name when a mapping exists, the original otherwise
    pub fn remap_model(&self, model: &str) -> String {
        self.mapping.get(model).cloned().unwrap_or_else(|| model.to_string())
    }

    ///
    /// All model names known to either pool, primary pool first.
    ///
    /// # Returns
    ///  * Model names from both app maps
    pub fn pool_models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.app_map.keys().cloned().collect();
        models.extend(self.app_map_prod.keys().cloned());
        models
    }

    ///
    /// Validate configuration and return detailed validation results.
    ///
    /// Checks all configuration values for correctness and provides helpful
    /// suggestions for any issues found.
    ///
    /// # Returns
    ///  * Vector of validation issues (empty if all valid)
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if !KNOWN_CHAT_TYPES.contains(&self.chat_type.as_str()) {
            issues.push(ValidationIssue {
                field: "chatType".to_string(),
                severity: ValidationSeverity::Error,
                message: format!("Unknown chat type: '{}'", self.chat_type),
                suggestion: Some(format!("Use one of: {}", KNOWN_CHAT_TYPES.join(", "))),
            });
        }

        if self.api_url.is_empty() && !self.mock {
            issues.push(ValidationIssue {
                field: "apiUrl".to_string(),
                severity: ValidationSeverity::Error,
                message: "Primary upstream URL is empty".to_string(),
                suggestion: Some("Set apiUrl to the upstream chat endpoint".to_string()),
            });
        }

        if !self.api_url.is_empty() && !self.api_url.starts_with("https://") {
            issues.push(ValidationIssue {
                field: "apiUrl".to_string(),
                severity: ValidationSeverity::Warning,
                message: format!("Upstream URL should use HTTPS: {}", self.api_url),
                suggestion: Some("Use https:// for secure connections".to_string()),
            });
        }

        if self.chat_type == "dify" {
            if self.app_map.is_empty() && self.app_map_prod.is_empty() {
                issues.push(ValidationIssue {
                    field: "appMap".to_string(),
                    severity: ValidationSeverity::Error,
                    message: "Dify chat type configured but both app maps are empty".to_string(),
                    suggestion: Some(
                        "Add model-to-app-code entries to appMap or appMapProd".to_string(),
                    ),
                });
            }
            if self.token_url.is_empty() && self.token_url_prod.is_empty() {
                issues.push(ValidationIssue {
                    field: "tokenUrl".to_string(),
                    severity: ValidationSeverity::Error,
                    message: "Dify chat type configured but no token endpoint set".to_string(),
                    suggestion: Some("Set tokenUrl (and tokenUrlProd for the secondary pool)".to_string()),
                });
            }
        } else if self.api_key.is_empty() && !self.mock {
            issues.push(ValidationIssue {
                field: "apiKey".to_string(),
                severity: ValidationSeverity::Warning,
                message: "No API key configured; upstream requests will be unauthenticated"
                    .to_string(),
                suggestion: Some("Set apiKey if the upstream requires a credential".to_string()),
            });
        }

        // Note: port is u16, so max value is 65535 (enforced by type system)
        if self.port == 0 {
            issues.push(ValidationIssue {
                field: "port".to_string(),
                severity: ValidationSeverity::Error,
                message: "Port cannot be 0".to_string(),
                suggestion: Some("Use a valid port number between 1 and 65535".to_string()),
            });
        }

        if self.mock {
            issues.push(ValidationIssue {
                field: "mock".to_string(),
                severity: ValidationSeverity::Info,
                message: "Mock mode is enabled; no upstream will be contacted".to_string(),
                suggestion: None,
            });
        }

        issues
    }
}
