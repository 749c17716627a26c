// crates/abac-pep-config/src/config.rs
// ============================================================================
// Module: ABAC PEP Configuration
// Description: Configuration loading and validation for the enforcement client.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: abac-pep-core, abac-pep-pdp, serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed; nothing is contacted until
//! [`AbacPepConfig::validate`] has passed.
//! Security posture: config inputs are untrusted and credentials are never
//! echoed back in error messages.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use abac_pep_core::EnforcementAuditSink;
use abac_pep_core::FileAuditSink;
use abac_pep_core::NoopAuditSink;
use abac_pep_core::StderrAuditSink;
use abac_pep_pdp::DEFAULT_DECIDE_ONCE_PATH;
use abac_pep_pdp::DEFAULT_DECIDE_PATH;
use abac_pep_pdp::DEFAULT_MAX_MESSAGE_BYTES;
use abac_pep_pdp::PdpAuth;
use abac_pep_pdp::PdpClientConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "abac-pep.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ABAC_PEP_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default PDP request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Upper bound for the PDP request timeout in milliseconds.
const MAX_TIMEOUT_MS: u64 = 300_000;
/// Default stream reconnect delay in milliseconds.
const DEFAULT_RECONNECT_DELAY_MS: u64 = 100;
/// Upper bound for the stream reconnect delay in milliseconds.
const MAX_RECONNECT_DELAY_MS: u64 = 60_000;
/// Upper bound for a single PDP message in bytes.
const MAX_MESSAGE_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Maximum length of a credential value.
const MAX_CREDENTIAL_LENGTH: usize = 1024;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Complete client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AbacPepConfig {
    /// Policy decision point connection.
    pub pdp: PdpConfig,
    /// Enforcement audit output.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl AbacPepConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let mut config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        self.pdp.validate()?;
        self.audit.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: PDP Config
// ============================================================================

/// Connection settings for the policy decision point.
///
/// # Invariants
/// - After validation `base_uri` parses as an `http` or `https` URL.
/// - At most one credential style is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PdpConfig {
    /// PDP base URI.
    pub base_uri: String,
    /// Path of the one-shot decision endpoint.
    #[serde(default = "default_decide_once_path")]
    pub decide_once_path: String,
    /// Path of the streaming decision endpoint.
    #[serde(default = "default_decide_path")]
    pub decide_path: String,
    /// Bearer API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Basic auth user name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Basic auth password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Delay between stream reconnect attempts in milliseconds.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Maximum size of one PDP message in bytes.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl PdpConfig {
    /// Validates PDP connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.parsed_base_uri()?;
        if !url.username().is_empty() || url.password().is_some() {
            return Err(ConfigError::Invalid(
                "pdp.base_uri must not embed credentials".to_string(),
            ));
        }
        validate_endpoint_path("pdp.decide_once_path", &self.decide_once_path)?;
        validate_endpoint_path("pdp.decide_path", &self.decide_path)?;
        self.validate_credentials()?;
        if self.timeout_ms == 0 || self.timeout_ms > MAX_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "pdp.timeout_ms must be between 1 and {MAX_TIMEOUT_MS}"
            )));
        }
        if self.reconnect_delay_ms == 0 || self.reconnect_delay_ms > MAX_RECONNECT_DELAY_MS {
            return Err(ConfigError::Invalid(format!(
                "pdp.reconnect_delay_ms must be between 1 and {MAX_RECONNECT_DELAY_MS}"
            )));
        }
        if self.max_message_bytes == 0 || self.max_message_bytes > MAX_MESSAGE_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "pdp.max_message_bytes must be between 1 and {MAX_MESSAGE_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }

    /// Returns the configured credentials.
    #[must_use]
    pub fn auth(&self) -> PdpAuth {
        match (&self.api_key, &self.username, &self.password) {
            (Some(key), _, _) => PdpAuth::Bearer(key.clone()),
            (None, Some(username), Some(password)) => PdpAuth::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => PdpAuth::None,
        }
    }

    /// Returns the stream reconnect delay.
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Builds the HTTP client settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the base URI does not parse.
    pub fn client_config(&self) -> Result<PdpClientConfig, ConfigError> {
        let mut config = PdpClientConfig::new(self.parsed_base_uri()?).with_auth(self.auth());
        config.decide_once_path.clone_from(&self.decide_once_path);
        config.decide_path.clone_from(&self.decide_path);
        config.timeout = Duration::from_millis(self.timeout_ms);
        config.max_message_bytes = self.max_message_bytes;
        Ok(config)
    }

    /// Parses `base_uri`, requiring an http(s) scheme and a host.
    fn parsed_base_uri(&self) -> Result<Url, ConfigError> {
        let trimmed = self.base_uri.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid("pdp.base_uri must be non-empty".to_string()));
        }
        let url = Url::parse(trimmed)
            .map_err(|err| ConfigError::Invalid(format!("pdp.base_uri is invalid: {err}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("pdp.base_uri must use http or https".to_string()));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(ConfigError::Invalid("pdp.base_uri must include a host".to_string()));
        }
        Ok(url)
    }

    /// Enforces the credential combinations.
    fn validate_credentials(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("pdp.api_key", &self.api_key),
            ("pdp.username", &self.username),
            ("pdp.password", &self.password),
        ] {
            if let Some(value) = value {
                if value.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
                }
                if value.len() > MAX_CREDENTIAL_LENGTH {
                    return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
                }
            }
        }
        let basic = self.username.is_some() || self.password.is_some();
        if self.api_key.is_some() && basic {
            return Err(ConfigError::Invalid(
                "pdp.api_key and pdp.username/pdp.password are mutually exclusive".to_string(),
            ));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(ConfigError::Invalid(
                "pdp.username and pdp.password must be set together".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit Config
// ============================================================================

/// Enforcement audit output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Whether enforcement outcomes are recorded.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Append-only JSON lines file; stderr when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the path is malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("audit.path", path)?;
        }
        Ok(())
    }

    /// Builds the configured audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the audit file cannot be opened.
    pub fn build_sink(&self) -> Result<Arc<dyn EnforcementAuditSink>, ConfigError> {
        if !self.enabled {
            return Ok(Arc::new(NoopAuditSink));
        }
        match &self.path {
            Some(path) => {
                let sink = FileAuditSink::new(Path::new(path.trim()))
                    .map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Arc::new(sink))
            }
            None => Ok(Arc::new(StderrAuditSink)),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default one-shot endpoint path.
fn default_decide_once_path() -> String {
    DEFAULT_DECIDE_ONCE_PATH.to_string()
}

/// Default streaming endpoint path.
fn default_decide_path() -> String {
    DEFAULT_DECIDE_PATH.to_string()
}

/// Default request timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default reconnect delay.
const fn default_reconnect_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

/// Default message size limit.
const fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

/// Audit is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an endpoint path appended to the base URI.
fn validate_endpoint_path(field: &str, value: &str) -> Result<(), ConfigError> {
    if !value.starts_with('/') {
        return Err(ConfigError::Invalid(format!("{field} must start with '/'")));
    }
    if value.contains(['?', '#']) || value.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!(
            "{field} must not contain a query, fragment, or whitespace"
        )));
    }
    if value.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}
