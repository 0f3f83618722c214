use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::controllers::paste::DEFAULT_MAX_ATTEMPTS;

const ENV_PREFIX: &str = "FADEBIN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Public origin used to build paste links. Derived from request headers when unset.
    pub base_url: Option<String>,
    /// Honour the `x-test-now-ms` header as the current time.
    pub test_mode: bool,
    pub store: Store,
    pub limits: Limits,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Store {
    pub kind: StoreKind,
    pub redis: RedisStore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisStore {
    pub url: String,
    pub pool_size: usize,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Compare-and-set attempts per read before giving up.
    pub max_consume_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: None,
            test_mode: false,
            store: Store::default(),
            limits: Limits::default(),
        }
    }
}

impl Default for RedisStore {
    fn default() -> Self {
        RedisStore {
            url: "redis://127.0.0.1:6379".into(),
            pool_size: 10,
            connection_timeout_secs: 5,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_consume_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl Config {
    /// Load configuration from an optional file, `FADEBIN_*` variables, and
    /// the plain `PORT`, `REDIS_URL` and `TEST_MODE` variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("config.toml").required(false),
        };

        let redis_url = std::env::var("REDIS_URL").ok();

        config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("port", std::env::var("PORT").ok())?
            .set_override_option("test_mode", std::env::var("TEST_MODE").ok())?
            .set_override_option("store.kind", redis_url.as_ref().map(|_| "redis"))?
            .set_override_option("store.redis.url", redis_url)?
            .build()
            .context("failed to read config")?
            .try_deserialize()
            .context("failed to deserialize config")
    }
}

#[cfg(test)]
mod tests {
    use config::{File, FileFormat};

    use super::*;

    fn parse(source: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn empty_source_uses_defaults() {
        let config = parse("");
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 3000);
        assert_eq!(config.base_url, None);
        assert!(!config.test_mode);
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert_eq!(config.store.redis.url, "redis://127.0.0.1:6379");
        assert_eq!(config.store.redis.pool_size, 10);
        assert_eq!(config.limits.max_consume_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn nested_tables_override_defaults() {
        let config = parse(
            r#"
            port = 8080
            base_url = "https://paste.example.com"
            test_mode = true

            [store]
            kind = "redis"

            [store.redis]
            url = "redis://cache:6379/2"

            [limits]
            max_consume_attempts = 3
            "#,
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.base_url.as_deref(), Some("https://paste.example.com"));
        assert!(config.test_mode);
        assert_eq!(config.store.kind, StoreKind::Redis);
        assert_eq!(config.store.redis.url, "redis://cache:6379/2");
        assert_eq!(config.store.redis.connection_timeout_secs, 5);
        assert_eq!(config.limits.max_consume_attempts, 3);
    }
}
