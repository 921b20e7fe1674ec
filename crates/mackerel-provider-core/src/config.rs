//! Configuration types for the provider
//!
//! Server options are read from the environment exactly once, at startup,
//! and passed to the multiplexer. Provider credentials come from the
//! provider configuration block merged with the environment.

use crate::error::{Error, Result};
use crate::registry::TypeFilter;
use crate::schema::{Attribute, Schema};
use crate::traits::client::{ClientConfig, DEFAULT_API_BASE};
use crate::validators;
use crate::value::{AttributePath, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Toggle for the strongly-typed engine generation
pub const ENV_EXPERIMENTAL_FRAMEWORK: &str = "MACKEREL_EXPERIMENTAL_TFFRAMEWORK";
/// Comma list overriding which resource types the current generation serves
pub const ENV_FRAMEWORK_RESOURCES: &str = "MACKEREL_TFFRAMEWORK_RESOURCES";
/// Comma list overriding which data source types the current generation serves
pub const ENV_FRAMEWORK_DATA_SOURCES: &str = "MACKEREL_TFFRAMEWORK_DATA_SOURCES";
/// Comma list of resource types removed from the whole server
pub const ENV_DISABLED_RESOURCES: &str = "MACKEREL_DISABLED_RESOURCES";
/// Comma list of data source types removed from the whole server
pub const ENV_DISABLED_DATA_SOURCES: &str = "MACKEREL_DISABLED_DATA_SOURCES";
/// API key variables, in lookup order
pub const ENV_API_KEYS: [&str; 2] = ["MACKEREL_APIKEY", "MACKEREL_API_KEY"];
pub const ENV_API_BASE: &str = "API_BASE";
pub const ENV_LOG_LEVEL: &str = "MACKEREL_LOG_LEVEL";

/// Types served by the current generation when the toggle is on
pub const BASELINE_FRAMEWORK_TYPES: [&str; 1] = ["mackerel_service"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Credentials found in the environment
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvCredentials {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub api_base: Option<String>,
}

impl fmt::Debug for EnvCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvCredentials")
            .field("api_key", &redacted(&self.api_key))
            .field("api_base", &self.api_base)
            .finish()
    }
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

/// Options of one engine generation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub resources: TypeFilter,
    pub data_sources: TypeFilter,
}

/// Startup options of the provider server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerOptions {
    /// Serve overridden types from the current generation
    pub framework_enabled: bool,
    /// Filters of the current generation
    pub current: GenerationOptions,
    /// Resource types removed from both generations
    #[serde(default)]
    pub disabled_resources: Vec<String>,
    /// Data source types removed from both generations
    #[serde(default)]
    pub disabled_data_sources: Vec<String>,
    #[serde(default)]
    pub credentials: EnvCredentials,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerOptions {
    fn default() -> Self {
        let baseline = TypeFilter::default().enable(BASELINE_FRAMEWORK_TYPES);
        Self {
            framework_enabled: false,
            current: GenerationOptions {
                resources: baseline.clone(),
                data_sources: baseline,
            },
            disabled_resources: Vec::new(),
            disabled_data_sources: Vec::new(),
            credentials: EnvCredentials::default(),
            log_level: default_log_level(),
        }
    }
}

impl ServerOptions {
    /// Read options from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read options through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        options.framework_enabled = non_empty(ENV_EXPERIMENTAL_FRAMEWORK).is_some_and(|v| parse_toggle(&v));

        if let Some(list) = non_empty(ENV_FRAMEWORK_RESOURCES) {
            options.current.resources.enabled = parse_list(&list);
        }
        if let Some(list) = non_empty(ENV_FRAMEWORK_DATA_SOURCES) {
            options.current.data_sources.enabled = parse_list(&list);
        }
        if let Some(list) = non_empty(ENV_DISABLED_RESOURCES) {
            options.disabled_resources = parse_list(&list);
        }
        if let Some(list) = non_empty(ENV_DISABLED_DATA_SOURCES) {
            options.disabled_data_sources = parse_list(&list);
        }

        options.credentials = EnvCredentials {
            api_key: ENV_API_KEYS.iter().find_map(|key| non_empty(*key)),
            api_base: non_empty(ENV_API_BASE),
        };
        if let Some(level) = non_empty(ENV_LOG_LEVEL) {
            options.log_level = level.trim().to_lowercase();
        }
        options
    }

    /// Validate the options
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(Error::setup(format!(
                "{ENV_LOG_LEVEL} must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.log_level
            )));
        }

        let lists = [
            (ENV_FRAMEWORK_RESOURCES, &self.current.resources.enabled),
            (ENV_FRAMEWORK_DATA_SOURCES, &self.current.data_sources.enabled),
            (ENV_DISABLED_RESOURCES, &self.disabled_resources),
            (ENV_DISABLED_DATA_SOURCES, &self.disabled_data_sources),
        ];
        for (var, names) in lists {
            if let Some(bad) = names.iter().find(|n| !n.starts_with("mackerel_")) {
                return Err(Error::setup(format!(
                    "{var} contains {bad:?}; type names look like \"mackerel_service\""
                )));
            }
        }

        if let Some(base) = &self.credentials.api_base {
            validators::is_url_with_http_or_https()
                .validate(&Value::string(base.clone()))
                .map_err(|e| Error::setup(format!("{ENV_API_BASE}: {e}")))?;
        }
        Ok(())
    }

    /// Resource filter of the current generation
    pub fn current_resource_filter(&self) -> TypeFilter {
        TypeFilter {
            enabled: self.current.resources.enabled.clone(),
            disabled: self.disabled_resources.clone(),
        }
    }

    /// Data source filter of the current generation
    pub fn current_data_source_filter(&self) -> TypeFilter {
        TypeFilter {
            enabled: self.current.data_sources.enabled.clone(),
            disabled: self.disabled_data_sources.clone(),
        }
    }
}

fn parse_toggle(value: &str) -> bool {
    matches!(value.trim(), "1" | "true")
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Provider configuration block
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfigModel {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
}

impl fmt::Debug for ProviderConfigModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfigModel")
            .field("api_key", &redacted(&self.api_key))
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Which source wins when both configuration and environment set a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPrecedence {
    /// Configured value wins, environment fills the gap
    ConfigFirst,
    /// Environment wins, configured value fills the gap
    EnvFirst,
}

impl ProviderConfigModel {
    pub fn from_value(config: &Value) -> Result<Self> {
        let model: Self = config.decode()?;
        Ok(Self {
            api_key: model.api_key.filter(|k| !k.is_empty()),
            api_base: model.api_base.filter(|b| !b.is_empty()),
        })
    }

    /// Merge with environment credentials into a client configuration
    pub fn resolve(&self, env: &EnvCredentials, precedence: CredentialPrecedence) -> Result<ClientConfig> {
        let pick = |configured: &Option<String>, from_env: &Option<String>| match precedence {
            CredentialPrecedence::ConfigFirst => configured.clone().or_else(|| from_env.clone()),
            CredentialPrecedence::EnvFirst => from_env.clone().or_else(|| configured.clone()),
        };

        let api_key = pick(&self.api_key, &env.api_key).ok_or_else(|| {
            Error::Configuration(vec![
                crate::error::Diagnostic::error(
                    "No API Key",
                    format!(
                        "An API key must be set in the provider configuration or in {}.",
                        ENV_API_KEYS.join(" / ")
                    ),
                )
                .with_path(Some(AttributePath::root("api_key"))),
            ])
        })?;
        let api_base = pick(&self.api_base, &env.api_base).unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        validators::is_url_with_http_or_https()
            .validate(&Value::string(api_base.clone()))
            .map_err(|e| Error::configuration(Some(AttributePath::root("api_base")), e))?;

        Ok(ClientConfig::new(api_key).with_api_base(api_base))
    }
}

/// Schema of the provider configuration block
pub fn provider_schema() -> Schema {
    Schema::new("Mackerel provider")
        .attribute(
            "api_key",
            Attribute::string().optional().sensitive().describe("Mackerel API Key"),
        )
        .attribute(
            "api_base",
            Attribute::string()
                .optional()
                .sensitive()
                .validator(validators::is_url_with_http_or_https())
                .describe("Mackerel API BASE URL"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = ServerOptions::from_lookup(lookup(&[]));
        assert!(!options.framework_enabled);
        assert_eq!(options.current.resources.enabled, vec!["mackerel_service".to_string()]);
        assert_eq!(options.log_level, "info");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_toggle_values() {
        for (value, expected) in [("1", true), ("true", true), ("0", false), ("yes", false), ("", false)] {
            let options = ServerOptions::from_lookup(lookup(&[(ENV_EXPERIMENTAL_FRAMEWORK, value)]));
            assert_eq!(options.framework_enabled, expected, "value {value:?}");
        }
    }

    #[test]
    fn test_lists_and_credentials() {
        let options = ServerOptions::from_lookup(lookup(&[
            (ENV_FRAMEWORK_RESOURCES, "mackerel_service, mackerel_role"),
            (ENV_DISABLED_DATA_SOURCES, "mackerel_channel"),
            ("MACKEREL_API_KEY", "k2"),
            (ENV_API_BASE, "http://localhost:8080"),
        ]));
        assert_eq!(options.current.resources.enabled.len(), 2);
        assert_eq!(options.disabled_data_sources, vec!["mackerel_channel".to_string()]);
        assert_eq!(options.credentials.api_key.as_deref(), Some("k2"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_level = ServerOptions::from_lookup(lookup(&[(ENV_LOG_LEVEL, "loud")]));
        assert!(bad_level.validate().is_err());

        let bad_name = ServerOptions::from_lookup(lookup(&[(ENV_DISABLED_RESOURCES, "service")]));
        assert!(bad_name.validate().is_err());

        let bad_base = ServerOptions::from_lookup(lookup(&[(ENV_API_BASE, "ftp://x")]));
        assert!(bad_base.validate().is_err());
    }

    #[test]
    fn test_credential_precedence() {
        let env = EnvCredentials {
            api_key: Some("env-key".to_string()),
            api_base: None,
        };
        let configured = ProviderConfigModel {
            api_key: Some("cfg-key".to_string()),
            api_base: None,
        };
        let legacy = configured.resolve(&env, CredentialPrecedence::ConfigFirst).unwrap();
        assert_eq!(legacy.api_key, "cfg-key");
        assert_eq!(legacy.api_base, DEFAULT_API_BASE);

        let current = configured.resolve(&env, CredentialPrecedence::EnvFirst).unwrap();
        assert_eq!(current.api_key, "env-key");
    }

    #[test]
    fn test_debug_never_prints_api_key() {
        let options = ServerOptions::from_lookup(lookup(&[("MACKEREL_APIKEY", "top-secret")]));
        assert!(!format!("{options:?}").contains("top-secret"));
    }

    #[test]
    fn test_missing_api_key() {
        let err = ProviderConfigModel::default()
            .resolve(&EnvCredentials::default(), CredentialPrecedence::EnvFirst)
            .unwrap_err();
        let diags = err.into_diagnostics();
        assert_eq!(diags[0].summary, "No API Key");
    }
}
