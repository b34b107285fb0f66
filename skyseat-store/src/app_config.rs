use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub locks: LockConfig,
    #[serde(default)]
    pub payment: PaymentConfig,
    #[serde(default)]
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// No URL means the process keeps its inventory in memory.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

/// No URL means seat locks are held in-process (single instance only).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LockConfig {
    #[serde(default = "default_lock_ttl_ms")]
    pub seat_lock_ttl_ms: u64,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            seat_lock_ttl_ms: default_lock_ttl_ms(),
            key_prefix: default_key_prefix(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    /// Base URL of the gateway; `/process` and `/refund` are appended.
    /// Without it the mock gateway approves every payment.
    pub gateway_url: Option<String>,
    #[serde(default = "default_payment_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            timeout_ms: default_payment_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    #[serde(default = "default_max_passengers")]
    pub max_passengers_per_booking: i32,
    #[serde(default = "default_seats_per_row")]
    pub seats_per_row: usize,
    /// 0 disables the stale reservation reaper.
    #[serde(default = "default_reaper_interval")]
    pub reaper_interval_secs: u64,
    #[serde(default = "default_provisioning_queue")]
    pub provisioning_queue_capacity: usize,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            max_passengers_per_booking: default_max_passengers(),
            seats_per_row: default_seats_per_row(),
            reaper_interval_secs: default_reaper_interval(),
            provisioning_queue_capacity: default_provisioning_queue(),
        }
    }
}

fn default_max_connections() -> u32 { 5 }
fn default_lock_ttl_ms() -> u64 { 600_000 }
fn default_key_prefix() -> String { "seat:lock:".to_string() }
fn default_payment_timeout_ms() -> u64 { 30_000 }
fn default_retry_attempts() -> u32 { 3 }
fn default_retry_backoff_ms() -> u64 { 200 }
fn default_max_passengers() -> i32 { 9 }
fn default_seats_per_row() -> usize { 6 }
fn default_reaper_interval() -> u64 { 60 }
fn default_provisioning_queue() -> usize { 256 }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `SKYSEAT__PAYMENT__TIMEOUT_MS=5000`
            .add_source(config::Environment::with_prefix("SKYSEAT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: Config = config::Config::builder()
            .set_override("server.port", 8080)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8080);
        assert!(config.database.url.is_none());
        assert!(config.redis.url.is_none());
        assert_eq!(config.locks.seat_lock_ttl_ms, 600_000);
        assert_eq!(config.locks.key_prefix, "seat:lock:");
        assert_eq!(config.payment.retry_attempts, 3);
        assert_eq!(config.booking.max_passengers_per_booking, 9);
        assert_eq!(config.booking.seats_per_row, 6);
    }
}
