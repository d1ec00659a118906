//! API configuration

use std::time::Duration;

use serde::Deserialize;

use domain_billing::BoletoProviderConfig;
use infra_db::DatabaseConfig;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_min_connections: u32,
    /// Seconds a request waits for a pooled connection
    pub database_acquire_timeout_secs: u64,
    pub database_idle_timeout_secs: u64,
    /// Log level
    pub log_level: String,
    /// Boleto provider connection
    pub provider: BoletoProviderSettings,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/clinic_billing".to_string(),
            database_max_connections: 10,
            database_min_connections: 2,
            database_acquire_timeout_secs: 30,
            database_idle_timeout_secs: 600,
            log_level: "info".to_string(),
            provider: BoletoProviderSettings::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from the environment
    ///
    /// Top-level keys use the `API_` prefix (`API_PORT`); provider keys are
    /// nested with a double underscore (`API_PROVIDER__CLIENT_ID`). Missing
    /// keys keep their defaults.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pool settings for the billing database
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url)
            .max_connections(self.database_max_connections)
            .min_connections(self.database_min_connections)
            .acquire_timeout(Duration::from_secs(self.database_acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(self.database_idle_timeout_secs))
    }
}

/// Boleto provider settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoletoProviderSettings {
    pub base_url: String,
    pub token_path: String,
    pub invoice_path: String,
    pub client_id: String,
    /// PEM client certificate for mutual TLS
    pub certificate_path: Option<String>,
    /// PEM private key matching `certificate_path`
    pub private_key_path: Option<String>,
    pub timeout_secs: u64,
    pub token_safety_margin_secs: i64,
    /// State used when the patient's address has none
    pub default_state: String,
}

impl Default for BoletoProviderSettings {
    fn default() -> Self {
        let provider = BoletoProviderConfig::default();
        Self {
            base_url: provider.base_url,
            token_path: provider.token_path,
            invoice_path: provider.invoice_path,
            client_id: provider.client_id,
            certificate_path: None,
            private_key_path: None,
            timeout_secs: provider.timeout_secs,
            token_safety_margin_secs: provider.token_safety_margin_secs,
            default_state: "SP".to_string(),
        }
    }
}

impl BoletoProviderSettings {
    /// Builds the adapter configuration
    pub fn to_provider_config(&self) -> BoletoProviderConfig {
        let mut config = BoletoProviderConfig::new(&self.base_url, &self.client_id)
            .with_timeout_secs(self.timeout_secs)
            .with_token_safety_margin_secs(self.token_safety_margin_secs);
        config.token_path = self.token_path.clone();
        config.invoice_path = self.invoice_path.clone();
        if let (Some(certificate), Some(key)) = (&self.certificate_path, &self.private_key_path) {
            config = config.with_client_identity(certificate, key);
        }
        config
    }
}
