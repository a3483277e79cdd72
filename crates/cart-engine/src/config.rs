//! Cart configuration.

use std::path::Path;

use cart_db::Db;
use serde::{Deserialize, Serialize};

use crate::CartError;

/// Cart configuration.
///
/// Every field has a default, so an empty TOML document is a valid config.
///
/// ```toml
/// identifier = "cart"
/// tax = 21.0
/// destroy_on_logout = true
///
/// [database]
/// table = "cart"
///
/// [format]
/// decimals = 2
/// decimal_point = ","
/// thousand_separator = "."
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartConfig {
    /// Session namespace prefix.
    #[serde(default = "default_identifier")]
    pub identifier: String,

    /// Tax rate (percent) for items added without an explicit rate.
    #[serde(default)]
    pub tax: f64,

    /// Snapshot storage.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Clear the cart session state when the user logs out.
    #[serde(default)]
    pub destroy_on_logout: bool,

    /// Number formatting for display.
    #[serde(default)]
    pub format: FormatConfig,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            tax: 0.0,
            database: DatabaseConfig::default(),
            destroy_on_logout: false,
            format: FormatConfig::default(),
        }
    }
}

impl CartConfig {
    /// Load config from a TOML or JSON file (by extension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CartError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CartError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| {
                CartError::Config(format!("Failed to parse JSON config {}: {e}", path.display()))
            })
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parse config from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, CartError> {
        toml::from_str(content)
            .map_err(|e| CartError::Config(format!("Failed to parse TOML config: {e}")))
    }

    /// Open the configured database connection.
    pub fn connect_db(&self) -> Result<Db, CartError> {
        Ok(Db::connect(self.database.connection.as_deref())?)
    }
}

fn default_identifier() -> String {
    "cart".to_string()
}

/// Snapshot storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Connection name: a SQLite path natively, a named database on Spin.
    /// `None` selects the default connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,

    /// Table holding stored carts.
    #[serde(default = "default_table")]
    pub table: String,

    /// Replace an existing snapshot on `store` instead of failing.
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection: None,
            table: default_table(),
            overwrite: default_overwrite(),
        }
    }
}

fn default_table() -> String {
    "cart".to_string()
}

fn default_overwrite() -> bool {
    true
}

/// Number formatting used by [`Cart::formatted`](crate::Cart::formatted).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormatConfig {
    /// Digits after the decimal point.
    #[serde(default = "default_decimals")]
    pub decimals: usize,

    /// Decimal point.
    #[serde(default = "default_decimal_point")]
    pub decimal_point: String,

    /// Thousands separator.
    #[serde(default = "default_thousand_separator")]
    pub thousand_separator: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            decimals: default_decimals(),
            decimal_point: default_decimal_point(),
            thousand_separator: default_thousand_separator(),
        }
    }
}

fn default_decimals() -> usize {
    2
}

fn default_decimal_point() -> String {
    ".".to_string()
}

fn default_thousand_separator() -> String {
    ",".to_string()
}
