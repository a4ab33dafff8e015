use std::{io::Write, process, sync::Arc};

use portal_sync::{
    application::{
        AggregationContext, AppError, Backends, LoadOutcome, ReferenceCache, RetryPolicy,
    },
    cache::CacheConfig,
    config::{self, SnapshotArgs},
    domain::types::ContentKind,
    infra::{error::InfraError, rest::RestBackend, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    match cli_args.command {
        config::Command::Snapshot(args) => run_snapshot(settings, args).await,
    }
}

async fn run_snapshot(settings: config::Settings, args: SnapshotArgs) -> Result<(), AppError> {
    let draft_kinds = parse_draft_kinds(&args.drafts)?;

    let backend = Arc::new(RestBackend::from_settings(&settings.backend)?);
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = Arc::new(ReferenceCache::new(cache_config.reference_ttl()));
    let context = AggregationContext::new(
        Backends::from_shared(backend),
        RetryPolicy::from(&settings.retry),
        cache,
        cache_config.scope,
    );

    match context.load(&args.subunit).await {
        LoadOutcome::Completed(report) => {
            for failure in report.primary_failures() {
                warn!(scope = %failure.scope, error = %failure.message, "content unavailable");
            }
            info!(
                subunit = %args.subunit,
                phase = ?context.phase(),
                "snapshot ready"
            );
        }
        LoadOutcome::AlreadyLoading | LoadOutcome::Superseded => {
            return Err(AppError::unexpected("subunit load did not complete"));
        }
    }

    for kind in draft_kinds {
        context.set_show_drafts_of(kind, true);
    }

    let snapshot = context.snapshot();
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&snapshot)
    } else {
        serde_json::to_string(&snapshot)
    }
    .map_err(|err| AppError::unexpected(format!("failed to encode snapshot: {err}")))?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}").map_err(InfraError::from)?;

    context.dispose();
    Ok(())
}

/// Accepts plural kind names or `all`.
fn parse_draft_kinds(values: &[String]) -> Result<Vec<ContentKind>, AppError> {
    let mut kinds = Vec::new();
    for value in values.iter().map(|value| value.trim()) {
        if value.is_empty() {
            continue;
        }
        if value.eq_ignore_ascii_case("all") {
            return Ok(ContentKind::ALL.to_vec());
        }
        let kind = ContentKind::try_from(value)
            .map_err(|()| AppError::validation(format!("unknown content kind `{value}`")))?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}
