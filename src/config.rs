use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;
use url::Url;

use crate::cache::CacheConfig;
use crate::types::models::platform::Platform;

pub const DEFAULT_INDEX_URL: &str = "https://api.geode-sdk.org";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: Url,
    user_agent: String,
    timeout: Duration,
    game_version: Option<String>,
    platform: Platform,
    cache: CacheConfig,
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    level: log::LevelFilter,
    file: Option<String>,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match dotenvy::var(name) {
        Ok(v) => v.parse::<T>().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid value for {}: {}", name, v);
            default
        }),
        Err(_) => default,
    }
}

fn non_empty(name: &str) -> Option<String> {
    dotenvy::var(name).ok().filter(|v| !v.trim().is_empty())
}

pub fn build_config() -> anyhow::Result<ClientConfig> {
    let base_url = dotenvy::var("GEODE_INDEX_URL").unwrap_or(DEFAULT_INDEX_URL.to_string());
    let ttl_secs = env_or("INDEX_CACHE_TTL_SECS", 600u64);
    let max_entries = env_or("INDEX_CACHE_MAX_ENTRIES", 256u64);
    let timeout_secs = env_or("INDEX_REQUEST_TIMEOUT_SECS", 30u64);
    let platform = match non_empty("INDEX_PLATFORM") {
        Some(p) => Platform::from_str(&p)?,
        None => Platform::current(),
    };

    Ok(ClientConfig::new(&base_url)?
        .with_timeout(Duration::from_secs(timeout_secs))
        .with_game_version(non_empty("INDEX_GD_VERSION"))
        .with_platform(platform)
        .with_cache(CacheConfig {
            ttl: (ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)),
            max_entries,
        }))
}

pub fn build_log_config() -> LogConfig {
    LogConfig {
        level: env_or("LOG_LEVEL", log::LevelFilter::Info),
        file: non_empty("LOG_FILE"),
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> anyhow::Result<ClientConfig> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| anyhow!("Invalid index URL {}: {}", base_url, e))?;
        // endpoint paths are joined relative to the base
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(ClientConfig {
            base_url,
            user_agent: format!("geode-index-client/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
            game_version: None,
            platform: Platform::current(),
            cache: CacheConfig::default(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> ClientConfig {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> ClientConfig {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_game_version(mut self, game_version: Option<String>) -> ClientConfig {
        self.game_version = game_version;
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> ClientConfig {
        self.platform = platform;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> ClientConfig {
        self.cache = cache;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn game_version(&self) -> Option<&str> {
        self.game_version.as_deref()
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn cache(&self) -> &CacheConfig {
        &self.cache
    }
}

impl LogConfig {
    pub fn level(&self) -> log::LevelFilter {
        self.level
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }
}
