//! Structured logging setup and stage-level log helpers.

use tracing::{Level, error, info, span};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing with compact or verbose output.
///
/// `RUST_LOG` wins when set. Otherwise verbose mode enables debug output for
/// the embedgen crates and span close events with timings.
///
/// Calling this twice returns an error from the subscriber registry.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("embedgen=debug,embedgen_engine=debug,embedgen_llm=debug,info")
            } else {
                EnvFilter::try_new("embedgen=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Span wrapping one stage execution.
pub fn stage_span(run_id: &str, stage: &str) -> tracing::Span {
    span!(Level::INFO, "stage", run_id = %run_id, stage = %stage)
}

pub fn log_stage_start(run_id: &str, stage: &str) {
    info!(run_id = %run_id, stage = %stage, "Starting stage");
}

pub fn log_stage_complete(run_id: &str, stage: &str, duration_ms: u128) {
    info!(
        run_id = %run_id,
        stage = %stage,
        duration_ms = %duration_ms,
        "Stage completed"
    );
}

pub fn log_stage_error(run_id: &str, stage: &str, error: &str, duration_ms: u128) {
    error!(
        run_id = %run_id,
        stage = %stage,
        duration_ms = %duration_ms,
        error = %error,
        "Stage failed"
    );
}
