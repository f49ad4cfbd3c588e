use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing::level_filters::LevelFilter;
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
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let level: LevelFilter = logging.level.into();
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "mortar_cache_hit_total",
            Unit::Count,
            "Total number of entity cache hits, labelled by namespace."
        );
        describe_counter!(
            "mortar_cache_miss_total",
            Unit::Count,
            "Total number of entity cache misses, labelled by namespace."
        );
        describe_counter!(
            "mortar_cache_load_total",
            Unit::Count,
            "Total number of completed backing-store loads, labelled by namespace."
        );
        describe_counter!(
            "mortar_cache_load_error_total",
            Unit::Count,
            "Total number of failed backing-store loads, labelled by namespace."
        );
        describe_histogram!(
            "mortar_cache_load_ms",
            Unit::Milliseconds,
            "Backing-store load latency in milliseconds."
        );
    });
}
