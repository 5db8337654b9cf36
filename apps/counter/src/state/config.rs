//! # Counter Configuration
//!
//! Shop identity, backend connection, search tuning and display settings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RXPOS_SHOP_ID=shop-7                                               │
//! │     RXPOS_API_URL=https://api.medshop.in                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or                                                │
//! │     ~/.config/rxpos/counter.toml (Linux)                               │
//! │     ~/Library/Application Support/in.rxpos.counter/counter.toml (mac)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [shop]
//! id = "shop-7"
//! name = "Sri Sai Medicals"
//! default_tax_rate = 12
//!
//! [api]
//! base_url = "https://api.medshop.in"
//! token = "..."
//! timeout_secs = 30
//!
//! [search]
//! debounce_ms = 300
//! min_chars = 2
//! customer_limit = 5
//! medicine_limit = 20
//! medicine_timeout_secs = 10
//!
//! [display]
//! currency_symbol = "₹"
//! ```
//!
//! ## Thread Safety
//! Read-only after startup; shared behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use rxpos_client::ClientConfig;
use rxpos_core::validation::{validate_required, validate_tax_rate};
use rxpos_core::{Money, SearchPolicy, TaxRate, CUSTOMER_SEARCH_LIMIT};

use crate::error::{ConfigError, ConfigResult};

/// Name of the config file inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "counter.toml";

// =============================================================================
// Shop
// =============================================================================

/// The shop this counter bills for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Backend shop identifier, sent with every invoice.
    pub id: String,

    /// Printed on receipts.
    #[serde(default = "default_shop_name")]
    pub name: String,

    /// GST rate for medicines that carry none.
    #[serde(default = "TaxRate::standard")]
    pub default_tax_rate: TaxRate,
}

fn default_shop_name() -> String {
    "Pharmacy".to_string()
}

impl Default for ShopConfig {
    fn default() -> Self {
        ShopConfig {
            id: String::new(),
            name: default_shop_name(),
            default_tax_rate: TaxRate::standard(),
        }
    }
}

// =============================================================================
// API
// =============================================================================

/// Backend connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token; obtained elsewhere and pasted into the config.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Search
// =============================================================================

/// Search-as-you-type tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    #[serde(default = "default_customer_limit")]
    pub customer_limit: usize,

    #[serde(default = "default_medicine_limit")]
    pub medicine_limit: usize,

    #[serde(default = "default_medicine_timeout")]
    pub medicine_timeout_secs: u64,
}

fn default_debounce_ms() -> u64 {
    300
}
fn default_min_chars() -> usize {
    2
}
fn default_customer_limit() -> usize {
    CUSTOMER_SEARCH_LIMIT
}
fn default_medicine_limit() -> usize {
    20
}
fn default_medicine_timeout() -> u64 {
    10
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            debounce_ms: default_debounce_ms(),
            min_chars: default_min_chars(),
            customer_limit: default_customer_limit(),
            medicine_limit: default_medicine_limit(),
            medicine_timeout_secs: default_medicine_timeout(),
        }
    }
}

// =============================================================================
// Display
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            currency_symbol: default_currency_symbol(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete counter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CounterConfig {
    #[serde(default)]
    pub shop: ShopConfig,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub display: DisplaySettings,
}

impl CounterConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`counter.toml`)
    /// 3. Environment variables
    ///
    /// An explicit `config_path` must exist; the default location may not.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(?path, "Loading counter config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses a `counter.toml` document. Missing sections take defaults.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `RXPOS_*` overrides read through `lookup`.
    ///
    /// Unparsable numeric overrides are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(id) = lookup("RXPOS_SHOP_ID") {
            debug!(shop_id = %id, "Overriding shop ID from environment");
            self.shop.id = id;
        }

        if let Some(name) = lookup("RXPOS_SHOP_NAME") {
            self.shop.name = name;
        }

        if let Some(url) = lookup("RXPOS_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(token) = lookup("RXPOS_API_TOKEN") {
            self.api.token = Some(token);
        }

        if let Some(secs) = lookup("RXPOS_TIMEOUT_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(s) => self.api.timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid RXPOS_TIMEOUT_SECS"),
            }
        }

        if let Some(symbol) = lookup("RXPOS_CURRENCY_SYMBOL") {
            self.display.currency_symbol = symbol;
        }

        if let Some(rate) = lookup("RXPOS_DEFAULT_TAX_RATE") {
            match TaxRate::parse(&rate) {
                Ok(r) => self.shop.default_tax_rate = r,
                Err(_) => warn!(value = %rate, "Ignoring invalid RXPOS_DEFAULT_TAX_RATE"),
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_required("shop.id", &self.shop.id)
            .map_err(|e| ConfigError::Invalid(format!("{} (set [shop] id or RXPOS_SHOP_ID)", e)))?;

        self.client_config()?;

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "api.timeout_secs must be greater than 0".into(),
            ));
        }
        if self.search.medicine_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "search.medicine_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.search.min_chars == 0 {
            return Err(ConfigError::Invalid(
                "search.min_chars must be greater than 0".into(),
            ));
        }
        if self.search.customer_limit == 0 || self.search.medicine_limit == 0 {
            return Err(ConfigError::Invalid(
                "search limits must be greater than 0".into(),
            ));
        }

        validate_tax_rate(self.shop.default_tax_rate)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(())
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("in", "rxpos", "counter")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Derived settings
    // =========================================================================

    /// Backend client settings.
    pub fn client_config(&self) -> ConfigResult<ClientConfig> {
        let config = ClientConfig::new(&self.api.base_url)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?
            .with_timeout(Duration::from_secs(self.api.timeout_secs));

        Ok(match &self.api.token {
            Some(token) => config.with_token(token.clone()),
            None => config,
        })
    }

    pub fn customer_policy(&self) -> SearchPolicy {
        SearchPolicy {
            min_chars: self.search.min_chars,
            debounce: Duration::from_millis(self.search.debounce_ms),
            max_results: self.search.customer_limit,
            request_timeout: None,
        }
    }

    pub fn medicine_policy(&self) -> SearchPolicy {
        SearchPolicy {
            min_chars: self.search.min_chars,
            debounce: Duration::from_millis(self.search.debounce_ms),
            max_results: self.search.medicine_limit,
            request_timeout: Some(Duration::from_secs(self.search.medicine_timeout_secs)),
        }
    }

    /// Formats an amount for display, rounded to 2 places.
    ///
    /// ## Example
    /// ```rust
    /// use rxpos_core::Money;
    /// use rxpos_counter::state::CounterConfig;
    ///
    /// let config = CounterConfig::default();
    /// assert_eq!(config.format_money(Money::from_minor(123456)), "₹1234.56");
    /// assert_eq!(config.format_money(Money::from_major(-20)), "-₹20.00");
    /// ```
    pub fn format_money(&self, amount: Money) -> String {
        if amount.rounded() < rust_decimal::Decimal::ZERO {
            format!("-{}{}", self.display.currency_symbol, amount.abs())
        } else {
            format!("{}{}", self.display.currency_symbol, amount.abs())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn valid() -> CounterConfig {
        let mut config = CounterConfig::default();
        config.shop.id = "shop-7".into();
        config
    }

    #[test]
    fn test_defaults() {
        let config = CounterConfig::default();
        assert_eq!(config.shop.default_tax_rate, TaxRate::standard());
        assert_eq!(config.search.debounce_ms, 300);
        assert_eq!(config.search.customer_limit, 5);
        assert_eq!(config.display.currency_symbol, "₹");
    }

    #[test]
    fn test_parse_partial_file() {
        let config = CounterConfig::from_toml_str(
            r#"
            [shop]
            id = "shop-7"
            name = "Sri Sai Medicals"
            default_tax_rate = 5

            [api]
            base_url = "https://api.medshop.in"
            "#,
        )
        .unwrap();
        assert_eq!(config.shop.name, "Sri Sai Medicals");
        assert_eq!(config.shop.default_tax_rate, TaxRate::from_percent(Decimal::from(5)));
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.search.medicine_timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            CounterConfig::from_toml_str("[shop\nid = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("RXPOS_SHOP_ID", "shop-9"),
            ("RXPOS_API_URL", "https://backend.test"),
            ("RXPOS_API_TOKEN", "tok"),
            ("RXPOS_TIMEOUT_SECS", "not-a-number"),
            ("RXPOS_CURRENCY_SYMBOL", "Rs "),
            ("RXPOS_DEFAULT_TAX_RATE", "18"),
        ]
        .into_iter()
        .collect();

        let mut config = CounterConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.shop.id, "shop-9");
        assert_eq!(config.api.base_url, "https://backend.test");
        assert_eq!(config.api.token.as_deref(), Some("tok"));
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.display.currency_symbol, "Rs ");
        assert_eq!(config.shop.default_tax_rate, TaxRate::from_percent(Decimal::from(18)));
    }

    #[test]
    fn test_validation() {
        assert!(CounterConfig::default().validate().is_err());
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.api.base_url = "ftp://files".into();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.api.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.search.min_chars = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("search.min_chars"));

        let mut config = valid();
        config.shop.default_tax_rate = TaxRate::from_percent(Decimal::from(120));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policies_follow_settings() {
        let mut config = valid();
        config.search.debounce_ms = 150;
        let customer = config.customer_policy();
        assert_eq!(customer.debounce, Duration::from_millis(150));
        assert_eq!(customer.max_results, 5);
        assert_eq!(customer.request_timeout, None);
        assert_eq!(
            config.medicine_policy().request_timeout,
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_format_money() {
        let config = CounterConfig::default();
        assert_eq!(config.format_money(Money::ZERO), "₹0.00");
        assert_eq!(config.format_money(Money::from_minor(-1)), "-₹0.01");
        assert_eq!(config.format_money(Money::parse_input("-0.001").unwrap()), "₹0.00");
        assert_eq!(config.format_money(Money::parse_input("10.005").unwrap()), "₹10.01");
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&valid()).unwrap();
        assert!(toml_str.contains("[shop]"));
        assert!(toml_str.contains("[search]"));
    }
}
