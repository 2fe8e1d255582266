//!
//! Upstream provider adapters.
//!
//! Each upstream wire format implements [UpstreamAdapter]: encoding a
//! canonical request into provider bytes, and classifying decoded event
//! payloads into canonical fragments. The adapter is selected once at
//! startup from the configured chat type via [AdapterRegistry], which is the
//! single extension point for adding providers.
//!
//! Authors:
//!   Jaro <yarenty@gmail.com>
//!
//! Copyright (c) 2026 SkyCorp

/* --- modules --------------------------------------------------------------------------------- */

pub mod anthropic;
pub mod dify;
pub mod openai;

/* --- uses ------------------------------------------------------------------------------------ */

use std::collections::HashMap;
use std::sync::Arc;

use crate::canonical::{CanonicalFragment, CanonicalRequest};
use crate::error::Result;

pub use anthropic::AnthropicAdapter;
pub use dify::DifyAdapter;
pub use openai::OpenAiAdapter;

/* --- types ----------------------------------------------------------------------------------- */

///
/// Capability pair every upstream wire format must implement.
///
/// Both operations are pure: `encode_request` maps the canonical request onto
/// the upstream schema (remapping any role the upstream does not accept),
/// and `classify` turns one decoded event payload into zero or one canonical
/// fragments. Classification failure on a malformed payload is non-fatal and
/// yields None so the stream continues with the next event.
pub trait UpstreamAdapter: Send + Sync {
    ///
    /// Provider identifier, matching the `chatType` configuration value.
    fn id(&self) -> &'static str;

    ///
    /// Whether requests to this upstream authenticate with a per-model pool
    /// token instead of the static API key.
    fn requires_pool_token(&self) -> bool {
        false
    }

    ///
    /// Version header this upstream requires on every request, if any.
    fn version_header(&self) -> Option<(&'static str, &'static str)> {
        None
    }

    ///
    /// Encode a canonical request into the upstream's request body.
    ///
    /// # Arguments
    ///  * `request` - canonical request to encode
    ///
    /// # Returns
    ///  * Serialized request body bytes
    fn encode_request(&self, request: &CanonicalRequest) -> Result<Vec<u8>>;

    ///
    /// Classify one decoded event payload into a canonical fragment.
    ///
    /// # Arguments
    ///  * `payload` - event payload with framing already stripped
    ///
    /// # Returns
    ///  * A fragment, or None for housekeeping and malformed events
    fn classify(&self, payload: &str) -> Option<CanonicalFragment>;
}

///
/// Registry of available upstream adapters, keyed by provider identifier.
pub struct AdapterRegistry {
    /** registered adapters by id */
    adapters: HashMap<&'static str, Arc<dyn UpstreamAdapter>>,
}

/* --- start of code -------------------------------------------------------------------------- */

impl AdapterRegistry {
    ///
    /// Build a registry containing all built-in adapters.
    pub fn with_builtin() -> Self {
        let mut registry = Self { adapters: HashMap::new() };
        registry.register(Arc::new(AnthropicAdapter));
        registry.register(Arc::new(DifyAdapter));
        registry.register(Arc::new(OpenAiAdapter));
        registry
    }

    ///
    /// Register an adapter under its identifier.
    ///
    /// # Arguments
    ///  * `adapter` - adapter to register
    pub fn register(&mut self, adapter: Arc<dyn UpstreamAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    ///
    /// Look up an adapter by provider identifier.
    ///
    /// # Arguments
    ///  * `id` - provider identifier (configuration `chatType`)
    ///
    /// # Returns
    ///  * The adapter, or None when unknown
    pub fn get(&self, id: &str) -> Option<Arc<dyn UpstreamAdapter>> {
        self.adapters.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contains_all_providers() {
        let registry = AdapterRegistry::with_builtin();
        assert!(registry.get("anthropic").is_some());
        assert!(registry.get("dify").is_some());
        assert!(registry.get("openai").is_some());
        assert!(registry.get("mystery").is_none());
    }

    #[test]
    fn test_only_dify_requires_pool_token() {
        let registry = AdapterRegistry::with_builtin();
        assert!(registry.get("dify").unwrap().requires_pool_token());
        assert!(!registry.get("anthropic").unwrap().requires_pool_token());
        assert!(!registry.get("openai").unwrap().requires_pool_token());
    }
}
