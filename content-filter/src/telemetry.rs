//! Tracing initialization: stdout human-readable logs plus an hourly
//! rolling JSONL file, matching the teacher's `telemetry.rs` exactly
//! (`RUST_LOG` controls level via `EnvFilter`; the opentelemetry layers the
//! teacher's dependency tree also carried are dropped along with the rest
//! of its proxy-serving stack — this crate has no trace-export
//! destination to ship spans to).

use anyhow::Result;
use once_cell::sync::OnceCell;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initializes the global tracing subscriber. Call once at process start.
///
/// - stdout: human-readable logs.
/// - file: JSONL logs at `<log_dir>/<service>.jsonl`, rotated hourly.
/// - env: `RUST_LOG` controls level (e.g. `info,content_filter=debug`).
///
/// The returned guard is kept in a process-lifetime static; dropping it
/// early would silently drop buffered log lines.
pub fn init_tracing(service: &str, log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_appender = tracing_appender::rolling::hourly(log_dir, format!("{service}.jsonl"));
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let _ = TRACING_GUARD.set(guard);

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(json_layer)
        .init();

    Ok(())
}
