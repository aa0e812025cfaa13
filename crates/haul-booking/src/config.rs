//! # Booking Configuration
//!
//! Configuration management for the booking engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HAUL_DB_PATH=/var/lib/greenhaul/booking.db                         │
//! │     HAUL_DAILY_SLOT_CAP=4                                              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/booking/booking.toml (Linux)                             │
//! │     ~/Library/Application Support/com.greenhaul.booking/booking.toml   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     3 slots per day, 1 cleaning day, 10s commit timeout                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # booking.toml
//! [database]
//! path = "/var/lib/greenhaul/booking.db"
//! max_connections = 8
//!
//! [booking]
//! daily_slot_cap = 3
//! cleaning_days = 1
//! transaction_timeout_secs = 10
//!
//! [payment]
//! authorize_timeout_secs = 15
//!
//! [notifications]
//! enabled = true
//! queue_capacity = 256
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use haul_db::DbConfig;

use crate::error::{BookingError, BookingResult};

// =============================================================================
// Database Settings
// =============================================================================

/// Where the booking database lives and how the pool is sized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Maximum pooled connections.
    /// Default: 5
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long to wait for a free pooled connection (seconds).
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// How long a booking waits for another booking's write lock (milliseconds).
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("greenhaul.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Booking Settings
// =============================================================================

/// Rules applied to every booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSettings {
    /// Deliveries (and, separately, pickups) allowed per calendar day.
    #[serde(default = "default_slot_cap")]
    pub daily_slot_cap: i64,

    /// Days a returned unit stays unavailable after its return date.
    #[serde(default = "default_cleaning_days")]
    pub cleaning_days: u64,

    /// Maximum cart lines per order.
    #[serde(default = "default_max_cart_items")]
    pub max_cart_items: usize,

    /// Upper bound on the commit transaction (seconds). On expiry the
    /// transaction is rolled back.
    #[serde(default = "default_transaction_timeout")]
    pub transaction_timeout_secs: u64,
}

fn default_slot_cap() -> i64 {
    haul_core::DAILY_SLOT_CAP
}

fn default_cleaning_days() -> u64 {
    haul_core::CLEANING_DAYS
}

fn default_max_cart_items() -> usize {
    haul_core::MAX_CART_ITEMS
}

fn default_transaction_timeout() -> u64 {
    10
}

impl Default for BookingSettings {
    fn default() -> Self {
        BookingSettings {
            daily_slot_cap: default_slot_cap(),
            cleaning_days: default_cleaning_days(),
            max_cart_items: default_max_cart_items(),
            transaction_timeout_secs: default_transaction_timeout(),
        }
    }
}

impl BookingSettings {
    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout_secs)
    }
}

// =============================================================================
// Payment Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettings {
    /// Upper bound on a single gateway authorization (seconds).
    #[serde(default = "default_authorize_timeout")]
    pub authorize_timeout_secs: u64,
}

fn default_authorize_timeout() -> u64 {
    15
}

impl Default for PaymentSettings {
    fn default() -> Self {
        PaymentSettings {
            authorize_timeout_secs: default_authorize_timeout(),
        }
    }
}

impl PaymentSettings {
    pub fn authorize_timeout(&self) -> Duration {
        Duration::from_secs(self.authorize_timeout_secs)
    }
}

// =============================================================================
// Notification Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Send order confirmations after commit.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Pending confirmations buffered before new ones are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            enabled: true,
            queue_capacity: default_queue_capacity(),
        }
    }
}

// =============================================================================
// Main Booking Configuration
// =============================================================================

/// Complete booking engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub booking: BookingSettings,

    #[serde(default)]
    pub payment: PaymentSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,
}

impl BookingConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (booking.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> BookingResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading booking config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load booking config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> BookingResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| BookingError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Booking config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> BookingResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(BookingError::Config("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(BookingError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.booking.daily_slot_cap < 1 {
            return Err(BookingError::Config(format!(
                "booking.daily_slot_cap must be at least 1, got {}",
                self.booking.daily_slot_cap
            )));
        }

        if self.booking.max_cart_items == 0 {
            return Err(BookingError::Config(
                "booking.max_cart_items must be greater than 0".into(),
            ));
        }

        if self.booking.transaction_timeout_secs == 0 {
            return Err(BookingError::Config(
                "booking.transaction_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.payment.authorize_timeout_secs == 0 {
            return Err(BookingError::Config(
                "payment.authorize_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.notifications.enabled && self.notifications.queue_capacity == 0 {
            return Err(BookingError::Config(
                "notifications.queue_capacity must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("HAUL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("HAUL_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid HAUL_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(cap) = lookup("HAUL_DAILY_SLOT_CAP") {
            match cap.parse::<i64>() {
                Ok(n) => {
                    debug!(cap = n, "Overriding daily slot cap from environment");
                    self.booking.daily_slot_cap = n;
                }
                Err(_) => warn!(value = %cap, "Ignoring invalid HAUL_DAILY_SLOT_CAP"),
            }
        }

        if let Some(days) = lookup("HAUL_CLEANING_DAYS") {
            match days.parse::<u64>() {
                Ok(n) => self.booking.cleaning_days = n,
                Err(_) => warn!(value = %days, "Ignoring invalid HAUL_CLEANING_DAYS"),
            }
        }

        if let Some(secs) = lookup("HAUL_TX_TIMEOUT_SECS") {
            if let Ok(n) = secs.parse::<u64>() {
                self.booking.transaction_timeout_secs = n;
            }
        }

        if let Some(secs) = lookup("HAUL_PAYMENT_TIMEOUT_SECS") {
            if let Ok(n) = secs.parse::<u64>() {
                self.payment.authorize_timeout_secs = n;
            }
        }

        if let Some(enabled) = lookup("HAUL_NOTIFICATIONS") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "on" => self.notifications.enabled = true,
                "0" | "false" | "off" => self.notifications.enabled = false,
                _ => warn!(value = %enabled, "Unknown HAUL_NOTIFICATIONS value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "greenhaul", "booking")
            .map(|dirs| dirs.config_dir().join("booking.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool settings derived from the `[database]` section.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .acquire_timeout(Duration::from_secs(self.database.acquire_timeout_secs))
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = BookingConfig::default();
        assert_eq!(config.booking.daily_slot_cap, 3);
        assert_eq!(config.booking.cleaning_days, 1);
        assert_eq!(config.booking.transaction_timeout_secs, 10);
        assert_eq!(config.payment.authorize_timeout_secs, 15);
        assert!(config.notifications.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = BookingConfig::default();

        config.booking.daily_slot_cap = 0;
        assert!(config.validate().is_err());
        config.booking.daily_slot_cap = 3;

        config.booking.transaction_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.booking.transaction_timeout_secs = 10;

        // An empty queue is fine while notifications are off
        config.notifications.queue_capacity = 0;
        assert!(config.validate().is_err());
        config.notifications.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: BookingConfig = toml::from_str(
            r#"
            [booking]
            daily_slot_cap = 5

            [database]
            path = "/tmp/haul.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.booking.daily_slot_cap, 5);
        assert_eq!(config.booking.cleaning_days, 1);
        assert_eq!(config.database.path, PathBuf::from("/tmp/haul.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.payment.authorize_timeout_secs, 15);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("HAUL_DB_PATH", "/data/booking.db"),
            ("HAUL_DAILY_SLOT_CAP", "4"),
            ("HAUL_CLEANING_DAYS", "not-a-number"),
            ("HAUL_NOTIFICATIONS", "off"),
        ]
        .into_iter()
        .collect();

        let mut config = BookingConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/booking.db"));
        assert_eq!(config.booking.daily_slot_cap, 4);
        assert_eq!(config.booking.cleaning_days, 1);
        assert!(!config.notifications.enabled);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("booking.toml");

        let mut config = BookingConfig::default();
        config.booking.daily_slot_cap = 6;
        config.payment.authorize_timeout_secs = 20;
        config.save(Some(path.clone())).unwrap();

        let loaded: BookingConfig =
            toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.booking.daily_slot_cap, 6);
        assert_eq!(loaded.payment.authorize_timeout_secs, 20);
    }

    #[test]
    fn test_db_config_mapping() {
        let mut config = BookingConfig::default();
        config.database.max_connections = 9;
        config.database.busy_timeout_ms = 250;

        let db = config.db_config();
        assert_eq!(db.max_connections, 9);
        assert_eq!(db.busy_timeout, Duration::from_millis(250));
        assert_eq!(db.database_path, PathBuf::from("greenhaul.db"));
    }
}
