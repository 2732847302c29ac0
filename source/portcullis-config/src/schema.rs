use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// The adapter configuration for a single matched endpoint pattern. Either
/// list may be empty on the wire; both default to empty when omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    #[serde(default)]
    pub pre: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
}

/// Wire shape of the YAML file. Kept separate from [`Configuration`] so
/// that `serde`'s `deny_unknown_fields` can reject typos like `prehook`
/// without us hand-rolling key validation.
#[derive(Debug, Deserialize)]
struct RawConfiguration {
    endpoints: serde_yaml::Mapping,
    adapters: serde_yaml::Mapping,
}

/// An immutable, validated configuration snapshot. One instance is built at
/// startup and shared (read-only) by every in-flight request; no locking is
/// required for reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    /// `"<METHOD-GLOB> <PATH-GLOB>"` -> hook lists, in the order they
    /// appeared in the YAML file. Iteration order across endpoints that
    /// both match a request is this vector's order: unspecified in the
    /// wire format, but deterministic per run.
    endpoints: Vec<(String, EndpointConfig)>,
    adapters: Vec<(String, String)>,
}

impl Configuration {
    /// Parse and validate a configuration from its YAML text.
    ///
    /// Validation mirrors Powerstrip's `PluginConfiguration._parse_adapters`:
    /// required top-level keys, no unknown per-endpoint keys, no dangling
    /// adapter references, and no endpoint left with both `pre` and `post`
    /// empty after defaulting.
    pub fn parse(yaml: &str) -> Result<Self> {
        let raw: RawConfiguration = serde_yaml::from_str(yaml).map_err(ConfigError::Yaml)?;

        let mut adapters = Vec::with_capacity(raw.adapters.len());
        for (key, value) in &raw.adapters {
            let name = key.as_str().ok_or_else(|| {
                ConfigError::invalid("adapter name must be a string")
            })?;
            let uri = value.as_str().ok_or_else(|| {
                ConfigError::invalid(format!("adapter '{name}' must map to a string URL"))
            })?;
            adapters.push((name.to_string(), uri.to_string()));
        }

        let known_adapters: BTreeSet<&str> =
            adapters.iter().map(|(name, _)| name.as_str()).collect();

        let mut endpoints = Vec::with_capacity(raw.endpoints.len());
        for (key, value) in &raw.endpoints {
            let pattern = key.as_str().ok_or_else(|| {
                ConfigError::invalid("endpoint key must be a string")
            })?;

            let cfg: EndpointConfig = serde_yaml::from_value(value.clone()).map_err(|e| {
                ConfigError::invalid(format!(
                    "endpoint '{pattern}' has an invalid configuration: {e}"
                ))
            })?;

            if cfg.pre.is_empty() && cfg.post.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "endpoint '{pattern}' has no 'pre' or 'post' adapters configured"
                )));
            }

            for name in cfg.pre.iter().chain(cfg.post.iter()) {
                if !known_adapters.contains(name.as_str()) {
                    return Err(ConfigError::invalid(format!(
                        "endpoint '{pattern}' references unknown adapter '{name}'"
                    )));
                }
            }

            endpoints.push((pattern.to_string(), cfg));
        }

        Ok(Configuration { endpoints, adapters })
    }

    /// All configured endpoint patterns, in file order.
    pub fn endpoint_patterns(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(|(pattern, _)| pattern.as_str())
    }

    pub fn endpoint_config(&self, pattern: &str) -> Option<&EndpointConfig> {
        self.endpoints
            .iter()
            .find(|(p, _)| p == pattern)
            .map(|(_, cfg)| cfg)
    }

    /// Resolve an adapter name to its URL.
    pub fn adapter_uri(&self, name: &str) -> Option<&str> {
        self.adapters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, uri)| uri.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config() {
        let cfg = Configuration::parse(
            r#"
endpoints:
  "POST /towel":
    pre: [adder]
adapters:
  adder: "http://127.0.0.1:9999/adapter"
"#,
        )
        .unwrap();

        assert_eq!(cfg.endpoint_patterns().collect::<Vec<_>>(), vec!["POST /towel"]);
        assert_eq!(cfg.adapter_uri("adder"), Some("http://127.0.0.1:9999/adapter"));
    }

    #[test]
    fn empty_config_is_valid() {
        let cfg = Configuration::parse("endpoints: {}\nadapters: {}\n").unwrap();
        assert_eq!(cfg.endpoint_patterns().count(), 0);
    }

    #[test]
    fn defaults_missing_hook_lists_to_empty() {
        let cfg = Configuration::parse(
            r#"
endpoints:
  "* /ping":
    pre: [a]
adapters:
  a: "http://a"
"#,
        )
        .unwrap();
        assert_eq!(cfg.endpoint_config("* /ping").unwrap().post, Vec::<String>::new());
    }

    #[test]
    fn rejects_unknown_endpoint_key() {
        let err = Configuration::parse(
            r#"
endpoints:
  "* /ping":
    prehook: [a]
adapters:
  a: "http://a"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ConfigInvalid { .. }));
    }

    #[test]
    fn rejects_dangling_adapter_reference() {
        let err = Configuration::parse(
            r#"
endpoints:
  "* /ping":
    pre: [ghost]
adapters: {}
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ConfigInvalid { .. }));
    }

    #[test]
    fn rejects_endpoint_with_no_hooks() {
        let err = Configuration::parse(
            r#"
endpoints:
  "* /ping": {}
adapters: {}
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ConfigInvalid { .. }));
    }

    #[test]
    fn rejects_missing_top_level_keys() {
        let err = Configuration::parse("adapters: {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
