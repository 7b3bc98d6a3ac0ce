//! # Storefront Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     COMPTOIR_PORT=8080                                                 │
//! │     STRIPE_SECRET_KEY=sk_live_...                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $COMPTOIR_CONFIG, or                                               │
//! │     ~/.config/comptoir/storefront.toml (Linux)                         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     port 3000, ./comptoir.db, EUR, no processors                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 3000
//!
//! [database]
//! path = "comptoir.db"
//! max_connections = 5
//! session_max_age_days = 30   # visitor sessions idle longer are purged at startup
//!
//! [shop]
//! currency = "EUR"
//! tax_rate_bps = 0
//! public_url = "https://shop.example.com"
//!
//! [stripe]
//! secret_key = "sk_test_..."
//!
//! [paypal]
//! client_id = "..."
//! client_secret = "..."
//! mode = "sandbox"   # sandbox | live
//! ```

use std::path::PathBuf;
use std::time::Duration;

use comptoir_checkout::ShopSettings;
use comptoir_core::validation::{validate_currency, validate_tax_rate_bps};
use comptoir_core::TaxRate;
use comptoir_payments::{PayPalConfig, PayPalMode, StripeConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_session_max_age_days")]
    pub session_max_age_days: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("comptoir.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_session_max_age_days() -> u32 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: default_db_path(),
            max_connections: default_max_connections(),
            session_max_age_days: default_session_max_age_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Tax added on top of the subtotal, in basis points.
    #[serde(default)]
    pub tax_rate_bps: u32,
    /// Absolute URL of this server as customers see it.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_currency() -> String {
    comptoir_core::DEFAULT_CURRENCY.to_string()
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ShopConfig {
    fn default() -> Self {
        ShopConfig {
            currency: default_currency(),
            tax_rate_bps: 0,
            public_url: default_public_url(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StripeSection {
    pub secret_key: String,
    #[serde(default)]
    pub publishable_key: Option<String>,
    /// Overrides the API host (test doubles).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Hosted page language, e.g. "fr". Stripe picks one when absent.
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct PayPalSection {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub mode: PayPalMode,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl std::fmt::Debug for StripeSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeSection")
            .field("secret_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl std::fmt::Debug for PayPalSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalSection")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("mode", &self.mode)
            .finish()
    }
}

impl StripeSection {
    pub fn gateway_config(&self) -> StripeConfig {
        let mut config = StripeConfig::new(&self.secret_key);
        config.publishable_key = self.publishable_key.clone();
        config.locale = self.locale.clone();
        config.timeout = Duration::from_secs(self.timeout_secs);
        match &self.base_url {
            Some(url) => config.base_url(url),
            None => config,
        }
    }
}

impl PayPalSection {
    pub fn gateway_config(&self) -> PayPalConfig {
        let mut config = PayPalConfig::new(&self.client_id, &self.client_secret, self.mode);
        config.brand_name = self.brand_name.clone();
        config.timeout = Duration::from_secs(self.timeout_secs);
        match &self.base_url {
            Some(url) => config.base_url(url),
            None => config,
        }
    }
}

// =============================================================================
// Storefront Config
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub shop: ShopConfig,
    #[serde(default)]
    pub stripe: Option<StripeSection>,
    #[serde(default)]
    pub paypal: Option<PayPalSection>,
}

impl StorefrontConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`$COMPTOIR_CONFIG` or the platform config dir)
    /// 3. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = std::env::var("COMPTOIR_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(Self::default_config_path);

        if let Some(path) = path {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                config = Self::from_toml(&std::fs::read_to_string(&path)?)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_currency(&self.shop.currency).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        validate_tax_rate_bps(self.shop.tax_rate_bps)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let url = &self.shop.public_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "shop.public_url must start with http:// or https://, got: {}",
                url
            )));
        }

        if self.database.session_max_age_days == 0 {
            return Err(ConfigError::Invalid(
                "database.session_max_age_days must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if matches!(&self.stripe, Some(s) if s.secret_key.trim().is_empty()) {
            return Err(ConfigError::Invalid("stripe.secret_key is empty".into()));
        }
        if matches!(&self.paypal, Some(p) if p.client_id.trim().is_empty() || p.client_secret.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "paypal.client_id and paypal.client_secret are required".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("COMPTOIR_PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!(port = %port, "Ignoring invalid COMPTOIR_PORT"),
            }
        }

        if let Ok(addr) = std::env::var("COMPTOIR_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Ok(path) = std::env::var("COMPTOIR_DATABASE") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("COMPTOIR_PUBLIC_URL") {
            self.shop.public_url = url;
        }

        if let Ok(currency) = std::env::var("COMPTOIR_CURRENCY") {
            self.shop.currency = currency;
        }

        if let Ok(secret) = std::env::var("STRIPE_SECRET_KEY") {
            if let Some(stripe) = self.stripe.as_mut() {
                stripe.secret_key = secret;
            } else {
                self.stripe = Some(StripeSection {
                    secret_key: secret,
                    publishable_key: None,
                    base_url: None,
                    locale: None,
                    timeout_secs: default_timeout(),
                });
            }
        }

        let paypal_id = std::env::var("PAYPAL_CLIENT_ID").ok();
        let paypal_secret = std::env::var("PAYPAL_CLIENT_SECRET").ok();
        if let Some(paypal) = self.paypal.as_mut() {
            if let Some(id) = paypal_id {
                paypal.client_id = id;
            }
            if let Some(secret) = paypal_secret {
                paypal.client_secret = secret;
            }
        } else if let (Some(client_id), Some(client_secret)) = (paypal_id, paypal_secret) {
            self.paypal = Some(PayPalSection {
                client_id,
                client_secret,
                mode: PayPalMode::default(),
                base_url: None,
                brand_name: None,
                timeout_secs: default_timeout(),
            });
        }

        if let Ok(mode) = std::env::var("PAYPAL_MODE") {
            match (mode.parse::<PayPalMode>(), &mut self.paypal) {
                (Ok(parsed), Some(paypal)) => paypal.mode = parsed,
                (Err(e), _) => warn!(error = %e, "Ignoring invalid PAYPAL_MODE"),
                _ => {}
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "comptoir", "comptoir")
            .map(|dirs| dirs.config_dir().join("storefront.toml"))
    }

    /// What the checkout services need to know about the shop.
    pub fn shop_settings(&self) -> ShopSettings {
        ShopSettings {
            currency: self.shop.currency.to_uppercase(),
            tax_rate: TaxRate::from_bps(self.shop.tax_rate_bps),
            public_url: self.shop.public_url.trim_end_matches('/').to_string(),
        }
    }
}
