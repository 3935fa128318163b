//! Fully qualified image reference templating.

use std::collections::BTreeMap;

use crate::constants::DEFAULT_TAG;

/// Registry / namespace / tag fragments normalized for concatenation.
///
/// Registry and namespace, when non-empty, always end with a path separator;
/// the tag, when non-empty, always starts with the version separator. The
/// fully qualified reference of a descriptor is the plain concatenation
/// `registry + namespace + name + tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageNaming {
    pub registry: String,
    pub namespace: String,
    pub tag: String,
    /// Value of the version label stamped on every built image, derived from
    /// the raw tag.
    pub version: String,
}

impl ImageNaming {
    pub fn new(registry: &str, namespace: &str, tag: &str) -> Self {
        let mut registry = registry.to_string();
        if !registry.is_empty() && !registry.ends_with('/') {
            registry.push('/');
        }
        let mut namespace = namespace.to_string();
        if !namespace.is_empty() && !namespace.ends_with('/') {
            namespace.push('/');
        }
        let version = if tag == DEFAULT_TAG {
            "dev".to_string()
        } else {
            tag.to_string()
        };
        let mut tag = tag.to_string();
        if !tag.is_empty() && !tag.starts_with(':') {
            tag.insert(0, ':');
        }
        Self {
            registry,
            namespace,
            tag,
            version,
        }
    }

    /// Render the fully qualified reference for a descriptor name.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}{}{}{}", self.registry, self.namespace, name, self.tag)
    }
}

/// Substitute `${VAR}` and `$VAR` occurrences with the given values.
pub fn expand_vars(text: &str, vars: &BTreeMap<String, String>) -> String {
    let mut text = text.to_string();
    for (var, value) in vars {
        text = text.replace(&format!("${{{var}}}"), value);
        text = text.replace(&format!("${var}"), value);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_concatenates_fragments() {
        let naming = ImageNaming::new("", "acme/", ":v1");
        assert_eq!(naming.qualify("base"), "acme/base:v1");
    }

    #[test]
    fn test_separators_are_added() {
        let naming = ImageNaming::new("ghcr.io", "acme", "v1");
        assert_eq!(naming.registry, "ghcr.io/");
        assert_eq!(naming.namespace, "acme/");
        assert_eq!(naming.tag, ":v1");
        assert_eq!(naming.qualify("base"), "ghcr.io/acme/base:v1");
    }

    #[test]
    fn test_empty_fragments_stay_empty() {
        let naming = ImageNaming::new("", "", "");
        assert_eq!(naming.qualify("base"), "base");
    }

    #[test]
    fn test_qualify_is_idempotent() {
        let naming = ImageNaming::new("ghcr.io", "acme", "v1");
        assert_eq!(naming.qualify("py-builder"), naming.qualify("py-builder"));
    }

    #[test]
    fn test_latest_tag_maps_to_dev_version() {
        assert_eq!(ImageNaming::new("", "", "latest").version, "dev");
        assert_eq!(ImageNaming::new("", "", "v3").version, "v3");
    }

    #[test]
    fn test_expand_vars_both_forms() {
        let vars = BTreeMap::from([
            ("NAMESPACE".to_string(), "acme/".to_string()),
            ("TAG".to_string(), ":v1".to_string()),
        ]);
        assert_eq!(expand_vars("${NAMESPACE}base${TAG}", &vars), "acme/base:v1");
        assert_eq!(expand_vars("$NAMESPACE", &vars), "acme/");
        assert_eq!(expand_vars("plain", &vars), "plain");
    }
}
