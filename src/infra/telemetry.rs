use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so the snapshot JSON on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "portal_cache_hit_total",
            Unit::Count,
            "Total number of reference-data cache hits."
        );
        describe_counter!(
            "portal_cache_miss_total",
            Unit::Count,
            "Total number of reference-data cache misses, absent or expired."
        );
        describe_counter!(
            "portal_fetch_retry_total",
            Unit::Count,
            "Total number of retried fetch attempts after a transient failure."
        );
        describe_counter!(
            "portal_fetch_failure_total",
            Unit::Count,
            "Total number of fetches that failed after exhausting or skipping retries."
        );
        describe_counter!(
            "portal_session_superseded_total",
            Unit::Count,
            "Total number of in-flight fetch sessions cancelled by a newer load or dispose."
        );
        describe_histogram!(
            "portal_load_ms",
            Unit::Milliseconds,
            "Latency of a full subunit load in milliseconds."
        );
    });
}
