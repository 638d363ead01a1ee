//! Configuration management.

use serde::Deserialize;
use std::collections::HashSet;

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Record-store configuration
    pub database: DatabaseConfig,

    /// Auto-closure policies
    #[serde(default)]
    pub closure: ClosureConfig,

    /// Notification gateway endpoints
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Third-party ticket sync credentials
    #[serde(default)]
    pub sync: SyncConfig,

    /// Auth token endpoint for the feedback-receipt service
    #[serde(default)]
    pub auth: AuthConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// MySQL connection URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Grace periods and routing tables for the auto-closure passes.
#[derive(Debug, Clone, Deserialize)]
pub struct ClosureConfig {
    /// Branch code this runner operates on
    #[serde(default = "default_branch_id")]
    pub branch_id: String,

    /// Idle seconds before a helpdesk-resolved ticket closes
    #[serde(default = "default_grace_helpdesk_secs")]
    pub grace_helpdesk_secs: u64,

    /// Idle seconds before an engineer-resolved ticket closes
    #[serde(default = "default_grace_engineer_secs")]
    pub grace_engineer_secs: u64,

    /// Department codes credited to the helpdesk function
    #[serde(default = "default_helpdesk_departments")]
    pub helpdesk_departments: HashSet<String>,

    /// Department codes credited to the engineering function
    #[serde(default = "default_engineer_departments")]
    pub engineer_departments: HashSet<String>,
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            branch_id: default_branch_id(),
            grace_helpdesk_secs: default_grace_helpdesk_secs(),
            grace_engineer_secs: default_grace_engineer_secs(),
            helpdesk_departments: default_helpdesk_departments(),
            engineer_departments: default_engineer_departments(),
        }
    }
}

impl ClosureConfig {
    pub fn grace_helpdesk(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.grace_helpdesk_secs as i64)
    }

    pub fn grace_engineer(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.grace_engineer_secs as i64)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Templated-message send endpoint
    #[serde(default)]
    pub template_api_url: String,

    /// API key for the templated-message endpoint
    #[serde(default)]
    pub template_api_key: String,

    /// Template namespace registered with the gateway
    #[serde(default)]
    pub template_namespace: String,

    /// Feedback-score template name
    #[serde(default = "default_template_name")]
    pub template_name: String,

    /// Template language code
    #[serde(default = "default_template_language")]
    pub template_language: String,

    /// Feedback-receipt persistence endpoint
    #[serde(default)]
    pub receipt_api_url: String,

    /// Question text recorded with each feedback receipt
    #[serde(default)]
    pub feedback_question: String,

    /// Attempt ceiling for rate-limited template sends
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base delay for the linear backoff between attempts
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            template_api_url: String::new(),
            template_api_key: String::new(),
            template_namespace: String::new(),
            template_name: default_template_name(),
            template_language: default_template_language(),
            receipt_api_url: String::new(),
            feedback_question: String::new(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    /// T2T sync endpoint
    #[serde(default)]
    pub endpoint_url: String,

    /// API key for the sync endpoint
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Token endpoint URL
    #[serde(default)]
    pub token_url: String,

    /// OAuth grant type
    #[serde(default = "default_grant_type")]
    pub grant_type: String,

    /// Client credentials
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,

    /// Seconds before expiry at which a token is refreshed eagerly
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: String::new(),
            grant_type: default_grant_type(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_margin_secs: default_refresh_margin_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

// Default value functions
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_branch_id() -> String { "020".to_string() }
fn default_grace_helpdesk_secs() -> u64 { 2025 }
fn default_grace_engineer_secs() -> u64 { 2025 }
fn default_helpdesk_departments() -> HashSet<String> {
    ["01", "17", "29"].iter().map(|s| s.to_string()).collect()
}
fn default_engineer_departments() -> HashSet<String> {
    ["04", "34"].iter().map(|s| s.to_string()).collect()
}
fn default_template_name() -> String { "feedback_score_v05".to_string() }
fn default_template_language() -> String { "id".to_string() }
fn default_retry_attempts() -> u32 { 3 }
fn default_retry_base_delay_ms() -> u64 { 1000 }
fn default_grant_type() -> String { "client_credentials".to_string() }
fn default_refresh_margin_secs() -> u64 { 3600 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> crate::error::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("TICKETOPS").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }

    /// Load from a specific file path, with environment overrides.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("TICKETOPS").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_department_sets() {
        let closure = ClosureConfig::default();
        assert!(closure.helpdesk_departments.contains("01"));
        assert!(closure.helpdesk_departments.contains("17"));
        assert!(closure.helpdesk_departments.contains("29"));
        assert!(closure.engineer_departments.contains("04"));
        assert!(closure.engineer_departments.contains("34"));
        assert!(!closure.helpdesk_departments.contains("04"));
    }

    #[test]
    fn default_gateway_retry_settings() {
        let gateway = GatewayConfig::default();
        assert_eq!(gateway.retry_attempts, 3);
        assert_eq!(gateway.retry_base_delay_ms, 1000);
        assert_eq!(gateway.template_language, "id");
    }
}
