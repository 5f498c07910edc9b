//! Node configuration loading and management.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use warden_core::AuthenticatorConfig;

/// Full configuration for the Warden node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WardenConfig {
    /// Identity of the protected service.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Capability token settings.
    #[serde(default)]
    pub token: TokenConfig,

    /// Chain gateway and dataverse contract settings.
    #[serde(default)]
    pub dataverse: DataverseConfig,

    /// Credential verification settings.
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    /// DID of the service this node protects.
    #[serde(default)]
    pub id: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Hex-encoded HS256 signing secret.
    #[serde(default)]
    pub secret_hex: String,
    /// Token lifetime in seconds.
    #[serde(default = "default_token_validity")]
    pub validity_secs: u64,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret_hex", &"<redacted>")
            .field("validity_secs", &self.validity_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataverseConfig {
    /// Base URL of the chain REST (LCD) gateway.
    #[serde(default = "default_lcd_endpoint")]
    pub lcd_endpoint: String,
    /// Address of the dataverse contract.
    #[serde(default)]
    pub dataverse_addr: String,
    /// Timeout applied to each gateway call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Maximum number of JSON-LD context documents kept in memory.
    #[serde(default = "default_context_cache_size")]
    pub context_cache_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_token_validity() -> u64 {
    warden_core::DEFAULT_TOKEN_VALIDITY_SECS
}
fn default_lcd_endpoint() -> String {
    "http://127.0.0.1:1317".into()
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_context_cache_size() -> usize {
    warden_credentials::loader::DEFAULT_CONTEXT_CACHE_SIZE
}
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    9010
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret_hex: String::new(),
            validity_secs: default_token_validity(),
        }
    }
}

impl Default for DataverseConfig {
    fn default() -> Self {
        Self {
            lcd_endpoint: default_lcd_endpoint(),
            dataverse_addr: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            context_cache_size: default_context_cache_size(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl WardenConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: WardenConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check the settings that have no usable default.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.service.id.trim().is_empty() {
            anyhow::bail!("service.id is not set");
        }
        if self.token.secret_hex.trim().is_empty() {
            anyhow::bail!("token.secret_hex is not set");
        }
        if self.dataverse.dataverse_addr.trim().is_empty() {
            anyhow::bail!("dataverse.dataverse_addr is not set");
        }
        if self.token.validity_secs == 0 {
            anyhow::bail!("token.validity_secs must be positive");
        }
        Ok(())
    }

    /// Socket address the API server binds to.
    pub fn api_socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.api.listen_addr, self.api.port).parse()?)
    }

    pub fn dataverse_timeout(&self) -> Duration {
        Duration::from_secs(self.dataverse.timeout_secs)
    }

    /// Settings handed to the authenticator.
    pub fn authenticator_config(&self) -> AuthenticatorConfig {
        AuthenticatorConfig::new(self.service.id.clone())
            .with_token_validity(Duration::from_secs(self.token.validity_secs))
    }
}
