use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Deserialize;

use crate::cache::default_cache_root;
use crate::error::TimelineError;
use crate::record::DEFAULT_LANGUAGE;
use crate::resolver::{DEFAULT_MAX_HOPS, FALLBACK_CHAIN};
use crate::wikidata::DEFAULT_ENTITY_ENDPOINT;

pub const DEFAULT_CONFIG_FILE: &str = "wht.json";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub entity_fetch_timeout_secs: Option<u64>,
    #[serde(default)]
    pub cache_directory: Option<String>,
    #[serde(default)]
    pub max_fallback_hops: Option<usize>,
    #[serde(default)]
    pub retry_count: Option<u32>,
    #[serde(default)]
    pub retry_base_delay_ms: Option<u64>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub entity_endpoint: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cache_directory: Option<String>,
    pub max_fallback_hops: Option<usize>,
    pub retry_count: Option<u32>,
    pub run_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub entity_fetch_timeout: Duration,
    pub cache_directory: Utf8PathBuf,
    pub max_fallback_hops: usize,
    pub retry_count: u32,
    pub retry_base_delay: Duration,
    pub language: String,
    pub entity_endpoint: String,
    pub user_agent: String,
    pub run_timeout: Option<Duration>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `wht.json` from the current directory when no path is
    /// given. Only an explicitly named file is required to exist.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, TimelineError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| TimelineError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| TimelineError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, TimelineError> {
        let cache_directory = match overrides.cache_directory.or(config.cache_directory) {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_cache_root()?,
        };

        let max_fallback_hops = overrides
            .max_fallback_hops
            .or(config.max_fallback_hops)
            .unwrap_or(DEFAULT_MAX_HOPS);
        if !(1..=FALLBACK_CHAIN.len()).contains(&max_fallback_hops) {
            return Err(TimelineError::InvalidConfig(format!(
                "max_fallback_hops must be between 1 and {}, got {max_fallback_hops}",
                FALLBACK_CHAIN.len()
            )));
        }

        let timeout_secs = config.entity_fetch_timeout_secs.unwrap_or(30);
        if timeout_secs == 0 {
            return Err(TimelineError::InvalidConfig(
                "entity_fetch_timeout_secs must be positive".to_string(),
            ));
        }

        let language = config
            .language
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        if language.trim().is_empty() {
            return Err(TimelineError::InvalidConfig("language is empty".to_string()));
        }

        Ok(ResolvedConfig {
            entity_fetch_timeout: Duration::from_secs(timeout_secs),
            cache_directory,
            max_fallback_hops,
            retry_count: overrides.retry_count.or(config.retry_count).unwrap_or(2),
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms.unwrap_or(250)),
            language,
            entity_endpoint: config
                .entity_endpoint
                .unwrap_or_else(|| DEFAULT_ENTITY_ENDPOINT.to_string()),
            user_agent: config.user_agent.unwrap_or_else(default_user_agent),
            run_timeout: overrides
                .run_timeout_secs
                .or(config.run_timeout_secs)
                .map(Duration::from_secs),
        })
    }
}

pub fn default_user_agent() -> String {
    format!("world-history-timeline/{}", env!("CARGO_PKG_VERSION"))
}
