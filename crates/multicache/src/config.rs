//! Facade configuration
//!
//! A [`CacheConfig`] can be built in code, decoded from JSON with the same
//! camelCase keys the factory options use, and overridden from `MULTICACHE_*`
//! environment variables.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{strict::Template, CacheError, Result};

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "$ns$";

/// Scope separator used when none is configured
pub const DEFAULT_SCOPE_SEPARATOR: &str = "/";

/// Facade configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Namespace embedded in every bucket key
    #[serde(alias = "ns")]
    pub namespace: String,
    /// Validate scopes and keys against `template`
    pub strict: bool,
    /// Declared keys and pages, required in strict mode
    pub template: Option<Template>,
    /// Separator between the page and subpath parts of a scope
    pub scope_separator: String,
    /// Also validate reads in strict mode
    pub getter_strict: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            strict: false,
            template: None,
            scope_separator: DEFAULT_SCOPE_SEPARATOR.to_string(),
            getter_strict: true,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a configuration from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CacheError::schema(format!("invalid cache configuration: {}", e)))
    }

    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Enable strict mode with the given template
    #[must_use]
    pub fn strict(mut self, template: Template) -> Self {
        self.strict = true;
        self.template = Some(template);
        self
    }

    #[must_use]
    pub fn scope_separator(mut self, separator: impl Into<String>) -> Self {
        self.scope_separator = separator.into();
        self
    }

    #[must_use]
    pub fn getter_strict(mut self, getter_strict: bool) -> Self {
        self.getter_strict = getter_strict;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.strict && self.template.is_none() {
            return Err(CacheError::schema(
                "when \"strict\" is true, template is needed. template is a simple object.",
            ));
        }
        if self.scope_separator.is_empty() {
            return Err(CacheError::invalid_scope("scope separator must not be empty."));
        }
        Ok(())
    }
}

/// Environment variable overrides
pub struct EnvOverrides;

impl EnvOverrides {
    const PREFIX: &'static str = "MULTICACHE_";

    /// Collect `MULTICACHE_*` variables, keyed without the prefix
    pub fn parse() -> HashMap<String, String> {
        std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix(Self::PREFIX)
                    .map(|name| (name.to_string(), value))
            })
            .collect()
    }

    /// Apply the process environment to `config`
    pub fn apply(config: &mut CacheConfig) {
        let overrides = Self::parse();
        Self::apply_overrides(config, &overrides);
    }

    /// Apply specific overrides to `config`
    ///
    /// Unknown names and unparsable booleans are ignored.
    pub fn apply_overrides(config: &mut CacheConfig, overrides: &HashMap<String, String>) {
        for (name, value) in overrides {
            match name.as_str() {
                "NAMESPACE" => config.namespace = value.clone(),
                "SCOPE_SEPARATOR" => config.scope_separator = value.clone(),
                "STRICT" => {
                    if let Some(flag) = parse_flag(value) {
                        config.strict = flag;
                    }
                }
                "GETTER_STRICT" => {
                    if let Some(flag) = parse_flag(value) {
                        config.getter_strict = flag;
                    }
                }
                _ => {}
            }
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.namespace, "$ns$");
        assert!(!config.strict);
        assert_eq!(config.scope_separator, "/");
        assert!(config.getter_strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_with_partial_keys() {
        let config = CacheConfig::from_json_str(
            r#"{"ns":"tmc","strict":true,"template":{"globalKeys":["age"],"pages":["home"]}}"#,
        )
        .unwrap();
        assert_eq!(config.namespace, "tmc");
        assert!(config.strict);
        assert_eq!(config.scope_separator, "/");
        assert_eq!(
            config.template,
            Some(Template::new().global_keys(["age"]).pages(["home"]))
        );
    }

    #[test]
    fn test_from_json_rejects_malformed_template() {
        let err = CacheConfig::from_json_str(r#"{"template":{"pages":"home"}}"#).unwrap_err();
        assert!(matches!(err, CacheError::Schema { .. }));
    }

    #[test]
    fn test_strict_without_template_is_invalid() {
        let config = CacheConfig {
            strict: true,
            ..CacheConfig::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::Schema { .. })));
    }

    #[test]
    fn test_empty_separator_is_invalid() {
        let config = CacheConfig::default().scope_separator("");
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidScope { .. })
        ));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = CacheConfig::default();
        let overrides = HashMap::from([
            ("NAMESPACE".to_string(), "shop".to_string()),
            ("SCOPE_SEPARATOR".to_string(), "::".to_string()),
            ("GETTER_STRICT".to_string(), "off".to_string()),
            ("STRICT".to_string(), "maybe".to_string()),
            ("UNKNOWN".to_string(), "x".to_string()),
        ]);

        EnvOverrides::apply_overrides(&mut config, &overrides);

        assert_eq!(config.namespace, "shop");
        assert_eq!(config.scope_separator, "::");
        assert!(!config.getter_strict);
        assert!(!config.strict);
    }
}
