//! Invocation-scoped configuration defaults.
//!
//! Registry, namespace and tag defaults travel as a plain value into planning
//! and name resolution; nothing here is process-global.

use crate::constants::{DEFAULT_NAMESPACE, DEFAULT_TAG};

/// Environment variable overriding the default registry.
pub const ENV_REGISTRY: &str = "STACKBUILD_REGISTRY";
/// Environment variable overriding the default namespace.
pub const ENV_NAMESPACE: &str = "STACKBUILD_NAMESPACE";
/// Environment variable overriding the default tag.
pub const ENV_TAG: &str = "STACKBUILD_TAG";

/// Resolved registry / namespace / tag defaults for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Raw registry, empty for the engine's default registry.
    pub registry: String,
    /// Raw namespace prepended to every descriptor name.
    pub namespace: String,
    /// Raw tag appended to every image reference.
    pub tag: String,
}

impl Config {
    /// Fill the gaps a caller left open with the built-in defaults.
    ///
    /// Environment overrides are handled upstream by the CLI layer, so a
    /// `None` here really means "nothing configured anywhere".
    pub fn resolve(registry: Option<String>, namespace: Option<String>, tag: Option<String>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
            namespace: namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            tag: tag.unwrap_or_else(|| DEFAULT_TAG.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let config = Config::resolve(None, None, None);
        assert_eq!(config.registry, "");
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.tag, DEFAULT_TAG);
    }

    #[test]
    fn test_resolve_keeps_explicit_values() {
        let config = Config::resolve(
            Some("ghcr.io".to_string()),
            Some("acme".to_string()),
            Some("v2".to_string()),
        );
        assert_eq!(config.registry, "ghcr.io");
        assert_eq!(config.namespace, "acme");
        assert_eq!(config.tag, "v2");
    }
}
