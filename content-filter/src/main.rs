//! Thin host binary.
//!
//! The packet-queue reader, TCP reassembly, and HTTP parser that would
//! normally hand requests to this engine are out-of-scope external
//! collaborators (spec.md §1). This binary stands in for them: it reads
//! one URL per line from stdin, builds a synthetic `HttpRequest`, and
//! drives it through `request_start` → `request_verdict` → `filter_stream`
//! → `file_scan` → `Logger::log` exactly as a real worker thread would,
//! printing the resulting verdict.

use clap::Parser;
use content_filter::config;
use content_filter::engine::ContentFilterHandle;
use content_filter::{ConfigWatcher, FilterRegistry, HttpRequest, Logger};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "nfq-content-filter", version, about = "Transparent HTTP content filter engine")]
struct Args {
    /// Path to the filter-objects/rules configuration document.
    #[arg(long, default_value = "content-filter.yaml")]
    config: PathBuf,

    /// Directory for stdout-mirrored JSONL logs.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Additional plug-in library search path, may be repeated.
    #[arg(long = "plugin-path")]
    plugin_paths: Vec<PathBuf>,

    /// Poll interval, in seconds, for configuration reload.
    #[arg(long, default_value_t = 5)]
    reload_interval_secs: u64,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    content_filter::telemetry::init_tracing("nfq-content-filter", &args.log_dir)?;
    if args.verbose > 0 {
        tracing::info!(level = args.verbose, "verbose logging requested via -v");
    }

    let registry = Arc::new(FilterRegistry::with_builtins());
    for path in &args.plugin_paths {
        registry.add_search_path(path.clone());
    }

    let initial = config::load_file(&args.config, &registry)?;
    let handle = ContentFilterHandle::new(initial);
    let logger = Logger::with_jsonl_sink(&args.log_dir)?;

    let _watcher = ConfigWatcher::spawn(
        args.config.clone(),
        Arc::clone(&registry),
        handle.clone(),
        Duration::from_secs(args.reload_interval_secs),
    );

    tracing::info!(config = %args.config.display(), "content filter engine started");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let url = match line {
            Ok(l) if !l.trim().is_empty() => l.trim().to_string(),
            Ok(_) => continue,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };

        let host = parse_host(&url);
        let engine = handle.current();
        let mut req = HttpRequest::new(url.clone(), host);

        engine.request_start(&req);
        let mut verdict = engine.request_verdict(&mut req);

        if verdict == content_filter::Action::NoMatch && engine.has_stream_filter() {
            verdict = engine.filter_stream(&mut req, b"");
        }
        if verdict == content_filter::Action::NoMatch && engine.has_file_filter() {
            verdict = engine.file_scan(&mut req, b"");
        }
        if verdict == content_filter::Action::NoMatch {
            verdict = engine.default_action();
        }

        println!("{url} -> {verdict}");
        logger.log(&req, verdict);
    }

    Ok(())
}

fn parse_host(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}
