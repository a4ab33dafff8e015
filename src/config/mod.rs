//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::CacheScope;

mod cli;

pub use cli::{CliArgs, Command, SnapshotArgs, SnapshotOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "portal";
const ENV_PREFIX: &str = "PORTAL";
const DEFAULT_RETRY_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;
const DEFAULT_REFERENCE_TTL_SECS: u64 = 300;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendSettings,
    pub retry: RetrySettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Root of the content service. Required by the binary, optional for
    /// library consumers that inject their own backends.
    pub base_url: Option<Url>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub timeout: Duration,
    pub max_attempts: NonZeroU32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub reference_ttl: Duration,
    pub scope: CacheScope,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Snapshot(args) => raw.apply_snapshot_overrides(&args.overrides),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    backend: RawBackendSettings,
    retry: RawRetrySettings,
    cache: RawCacheSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_snapshot_overrides(&mut self, overrides: &SnapshotOverrides) {
        if let Some(url) = overrides.backend_url.as_ref() {
            self.backend.base_url = Some(url.clone());
        }
        if let Some(key) = overrides.api_key.as_ref() {
            self.backend.api_key = Some(key.clone());
        }
        if let Some(timeout) = overrides.retry_timeout_ms {
            self.retry.timeout_ms = Some(timeout);
        }
        if let Some(attempts) = overrides.retry_max_attempts {
            self.retry.max_attempts = Some(attempts);
        }
        if let Some(ttl) = overrides.cache_reference_ttl_secs {
            self.cache.reference_ttl_secs = Some(ttl);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            backend,
            retry,
            cache,
            logging,
        } = raw;

        Ok(Self {
            backend: build_backend_settings(backend)?,
            retry: build_retry_settings(retry)?,
            cache: build_cache_settings(cache)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_backend_settings(backend: RawBackendSettings) -> Result<BackendSettings, LoadError> {
    let base_url = match non_blank(backend.base_url) {
        Some(value) => {
            let url = Url::parse(&value)
                .map_err(|err| LoadError::invalid("backend.base_url", err.to_string()))?;
            if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "backend.base_url",
                    format!("`{value}` is not an absolute http(s) URL"),
                ));
            }
            Some(url)
        }
        None => None,
    };

    Ok(BackendSettings {
        base_url,
        api_key: non_blank(backend.api_key),
    })
}

fn build_retry_settings(retry: RawRetrySettings) -> Result<RetrySettings, LoadError> {
    let timeout_ms = retry.timeout_ms.unwrap_or(DEFAULT_RETRY_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "retry.timeout_ms",
            "must be greater than zero",
        ));
    }

    let max_attempts = NonZeroU32::new(retry.max_attempts.unwrap_or(DEFAULT_RETRY_MAX_ATTEMPTS))
        .ok_or_else(|| LoadError::invalid("retry.max_attempts", "must be greater than zero"))?;

    let base_delay_ms = retry.base_delay_ms.unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS);
    let max_delay_ms = retry.max_delay_ms.unwrap_or(DEFAULT_RETRY_MAX_DELAY_MS);
    if base_delay_ms > max_delay_ms {
        return Err(LoadError::invalid(
            "retry.base_delay_ms",
            format!("must not exceed retry.max_delay_ms ({max_delay_ms})"),
        ));
    }

    Ok(RetrySettings {
        timeout: Duration::from_millis(timeout_ms),
        max_attempts,
        base_delay: Duration::from_millis(base_delay_ms),
        max_delay: Duration::from_millis(max_delay_ms),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_secs = cache
        .reference_ttl_secs
        .unwrap_or(DEFAULT_REFERENCE_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "cache.reference_ttl_secs",
            "must be greater than zero",
        ));
    }

    let scope = match cache.scope.as_deref() {
        Some(value) => CacheScope::parse(value).ok_or_else(|| {
            LoadError::invalid(
                "cache.scope",
                format!("expected `global` or `session`, got `{value}`"),
            )
        })?,
        None => CacheScope::default(),
    };

    Ok(CacheSettings {
        reference_ttl: Duration::from_secs(ttl_secs),
        scope,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBackendSettings {
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRetrySettings {
    timeout_ms: Option<u64>,
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    reference_ttl_secs: Option<u64>,
    scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}
