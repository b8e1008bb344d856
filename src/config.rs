use std::{net::SocketAddr, time::Duration};

use ::config::{Config, Environment, File};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

/// Environment variable naming the config file (extension optional).
const CONFIG_PATH_VAR: &str = "SHORTLINK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config";
/// Upper bound for `base.cacheTime`: one year, in minutes.
const MAX_CACHE_MINUTES: u64 = 365 * 24 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub base: BaseConfig,
    pub redis: RedisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseConfig {
    /// Public site, e.g. "https://s.example.com". Used to build short URLs
    /// and as the redirect target for unknown codes.
    /// Must NOT have a trailing slash (one is trimmed on load).
    pub website: String,

    /// Port to listen on
    pub port: u16,

    /// Length of generated short codes
    pub length: usize,

    /// How many minutes a resolved link stays in the local cache
    #[serde(rename = "cacheTime", alias = "cachetime")]
    pub cache_time: u64,
}

#[derive(Clone, Deserialize)]
pub struct RedisConfig {
    pub addr: String,
    pub port: u16,
    /// Empty means the server does not require AUTH.
    pub pwd: String,
}

impl std::fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisConfig")
            .field("addr", &self.addr)
            .field("port", &self.port)
            .field("pwd", &if self.pwd.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the file named by `SHORTLINK_CONFIG`
    /// (default `./config.*`), overlaid with `SHORTLINK__SECTION__KEY`
    /// environment variables.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

        let config = Config::builder()
            .add_source(File::with_name(&path))
            .add_source(
                Environment::with_prefix("SHORTLINK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration from '{path}'"))?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> Result<Self> {
        let mut loaded: AppConfig = config
            .try_deserialize()
            .context("configuration is missing a required key or has an invalid value")?;

        loaded.base.website = loaded.base.website.trim_end_matches('/').to_owned();

        if loaded.base.website.is_empty() {
            bail!("base.website must not be empty");
        }
        if !(1..=64).contains(&loaded.base.length) {
            bail!("base.length must be between 1 and 64");
        }
        if !(1..=MAX_CACHE_MINUTES).contains(&loaded.base.cache_time) {
            bail!("base.cacheTime must be between 1 and {MAX_CACHE_MINUTES} minutes");
        }
        if loaded.redis.addr.trim().is_empty() {
            bail!("redis.addr must not be empty");
        }

        Ok(loaded)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.base.port))
    }
}

impl BaseConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_time * 60)
    }
}

impl RedisConfig {
    /// `host:port`, safe to log.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }

    /// Build a `redis://` connection URL, percent-encoding the password.
    pub fn connection_url(&self) -> Result<String> {
        let mut url = Url::parse(&format!("redis://{}", self.endpoint()))
            .with_context(|| format!("invalid redis address '{}'", self.endpoint()))?;

        if !self.pwd.is_empty() {
            url.set_password(Some(&self.pwd))
                .map_err(|_| anyhow::anyhow!("redis password cannot be set on this address"))?;
        }

        Ok(url.into())
    }
}
