//! Cache configuration.
//!
//! Controls the reference-data ttl and whether the cache outlives a subunit
//! switch, via the `[cache]` table in `portal.toml`.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_REFERENCE_TTL_SECS: u64 = 300;

/// Lifetime of the reference-data cache relative to the loaded subunit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    /// Shared across subunit switches; the ttl is the only staleness control.
    #[default]
    Global,
    /// Cleared whenever the loaded subunit changes.
    Session,
}

impl CacheScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "global" => Some(CacheScope::Global),
            "session" => Some(CacheScope::Session),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a reference-data entry stays fresh.
    pub reference_ttl_secs: u64,
    pub scope: CacheScope,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reference_ttl_secs: DEFAULT_REFERENCE_TTL_SECS,
            scope: CacheScope::Global,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            reference_ttl_secs: settings.reference_ttl.as_secs(),
            scope: settings.scope,
        }
    }
}

impl CacheConfig {
    /// Returns the ttl as a Duration, clamping zero to one second.
    pub fn reference_ttl(&self) -> Duration {
        Duration::from_secs(self.reference_ttl_secs.max(1))
    }
}
