//!
//! Upstream routing and pool-credential resolution.
//!
//! Routing is a pure function of the requested model name and the static
//! configuration: membership in the secondary pool routes to the secondary
//! base URL, everything else degrades to the primary. Credential resolution
//! is a separate step that may populate the mutex-guarded token cache.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- uses ------------------------------------------------------------------------------------ */

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{ProxyError, Result};

/* --- types ----------------------------------------------------------------------------------- */

///
/// Where one request goes and how it authenticates.
///
/// Computed once per request from the model name and configuration; immutable
/// and never cached across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /** upstream chat URL for this request */
    pub base_url: String,
    /** token endpoint for pool-credential resolution */
    pub token_url: String,
    /** application code identifying the model's app, when pooled */
    pub app_code: Option<String>,
    /** true when the model belongs to the secondary pool */
    pub uses_secondary_pool: bool,
}

///
/// Routing selector with the shared pool-token cache.
///
/// The cache maps model names to bearer tokens with no TTL tracking: an entry
/// is created on first use, replaced on refresh, and trusted until a call
/// fails. Lookup-then-fetch happens under one async mutex so concurrent
/// requests for the same model coalesce into a single in-flight fetch.
pub struct RouteSelector {
    /** static application configuration */
    config: Arc<Config>,
    /** HTTP client for token fetches */
    http_client: Client,
    /** model name to cached bearer token */
    tokens: Mutex<HashMap<String, String>>,
}

///
/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    /** the bearer token to cache */
    access_token: String,
}

/* --- constants ------------------------------------------------------------------------------ */

/** Header identifying the application to the token endpoint */
const APP_CODE_HEADER: &str = "X-App-Code";

/* --- start of code -------------------------------------------------------------------------- */

impl RouteSelector {
    ///
    /// Create a new selector over the given configuration.
    ///
    /// # Arguments
    ///  * `config` - shared static configuration
    ///  * `http_client` - client used for token fetches
    ///
    /// # Returns
    ///  * Selector with an empty credential cache
    pub fn new(config: Arc<Config>, http_client: Client) -> Self {
        Self { config, http_client, tokens: Mutex::new(HashMap::new()) }
    }

    ///
    /// Decide which upstream handles the given model.
    ///
    /// Pure with respect to the configuration: secondary-pool membership
    /// short-circuits on first match; absence of any match means primary.
    /// A misconfigured model name therefore degrades to best-effort
    /// forwarding rather than rejecting the request.
    ///
    /// # Arguments
    ///  * `model` - requested model name (already remapped)
    ///
    /// # Returns
    ///  * Routing decision for this request
    pub fn select(&self, model: &str) -> RoutingDecision {
        if let Some(app_code) = self.config.app_map_prod.get(model) {
            return RoutingDecision {
                base_url: self.config.api_url_prod.clone(),
                token_url: self.config.token_url_prod.clone(),
                app_code: Some(app_code.clone()),
                uses_secondary_pool: true,
            };
        }

        RoutingDecision {
            base_url: self.config.api_url.clone(),
            token_url: self.config.token_url.clone(),
            app_code: self.config.app_map.get(model).cloned(),
            uses_secondary_pool: false,
        }
    }

    ///
    /// Resolve the pool bearer token for a model, fetching on first use.
    ///
    /// Holds the cache mutex across the check-fetch-store sequence so that
    /// two requests racing for the same model perform exactly one fetch and
    /// end with exactly one stored token. Tokens have no expiry tracking;
    /// a revoked token stays cached until the entry is replaced.
    ///
    /// # Arguments
    ///  * `model` - model name keying the cache entry
    ///  * `decision` - routing decision carrying the token endpoint
    ///
    /// # Returns
    ///  * Bearer token string
    ///  * `ProxyError::CredentialUnavailable` if the fetch fails
    pub async fn resolve_pool_token(
        &self,
        model: &str,
        decision: &RoutingDecision,
    ) -> Result<String> {
        let mut tokens = self.tokens.lock().await;

        if let Some(token) = tokens.get(model) {
            return Ok(token.clone());
        }

        let token = self.fetch_token(decision).await?;
        tracing::debug!("Fetched pool token for model '{}'", model);
        tokens.insert(model.to_string(), token.clone());
        Ok(token)
    }

    ///
    /// Number of cached tokens, for diagnostics.
    pub async fn cached_token_count(&self) -> usize {
        self.tokens.lock().await.len()
    }

    ///
    /// Fetch a fresh token from the configured token endpoint.
    ///
    /// # Arguments
    ///  * `decision` - routing decision carrying the endpoint and app code
    ///
    /// # Returns
    ///  * Bearer token string
    ///  * `ProxyError::CredentialUnavailable` on any transport or decode failure
    async fn fetch_token(&self, decision: &RoutingDecision) -> Result<String> {
        let mut request = self.http_client.get(&decision.token_url);
        if let Some(app_code) = &decision.app_code {
            request = request.header(APP_CODE_HEADER, app_code);
        }

        let response = request.send().await.map_err(|e| {
            ProxyError::CredentialUnavailable(format!(
                "Token fetch from {} failed: {}",
                decision.token_url, e
            ))
        })?;

        if !response.status().is_success() {
            return Err(ProxyError::CredentialUnavailable(format!(
                "Token endpoint {} returned status {}",
                decision.token_url,
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ProxyError::CredentialUnavailable(format!("Token response decode failed: {}", e))
        })?;

        Ok(token.access_token)
    }
}
