//! Request-teardown logger — one structured line per matched, loggable
//! request, per spec.md §4.8's emission condition (`rule.log || rule.notify`)
//! and field set.
//!
//! Grounded on the teacher's `obs.rs::ObsSink`: an hourly-rolling JSONL
//! sink built on `tracing-appender`, guarded for the process lifetime via
//! a `OnceCell<WorkerGuard>` so buffered lines are not lost on drop.

use crate::action::Action;
use crate::error::FilterError;
use crate::request::HttpRequest;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::MakeWriter;

static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

#[derive(Serialize)]
struct RequestLogLine<'a> {
    #[serde(rename = "@timestamp")]
    ts: DateTime<Utc>,
    rule_id: u32,
    url: &'a str,
    verdict: &'a str,
    content_length: u64,
    content_received: u64,
    elapsed_secs: u64,
    elapsed_millis: u32,
}

/// Emits `tracing::info!` events for every matched, loggable request, and
/// optionally mirrors them as JSONL lines to a rolling file.
#[derive(Clone)]
pub struct Logger {
    sink: Option<NonBlocking>,
}

impl Logger {
    /// Events go to whatever `tracing-subscriber` layers are installed;
    /// no durable file copy.
    pub fn stdout_only() -> Self {
        Self { sink: None }
    }

    /// Also writes an hourly-rolling `requests.jsonl` file under `log_dir`.
    pub fn with_jsonl_sink(log_dir: &Path) -> Result<Self, FilterError> {
        std::fs::create_dir_all(log_dir).map_err(|e| FilterError::Io {
            kind: "logger",
            source: e,
        })?;
        let appender = tracing_appender::rolling::hourly(log_dir, "requests.jsonl");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        Ok(Self { sink: Some(writer) })
    }

    /// Called at request teardown with the verdict the engine returned.
    /// No-op unless `req.rule_matched` is set and that rule's `log`/
    /// `notify` flags say to emit — per spec.md §4.8, a request that never
    /// matched a loggable rule produces no line at all.
    pub fn log(&self, req: &HttpRequest, verdict: Action) {
        let Some(rule) = &req.rule_matched else {
            return;
        };
        if !rule.should_log() {
            return;
        }

        let elapsed = req.start_time.elapsed();
        let rule_id = rule.id();

        tracing::info!(
            rule_id,
            url = %req.url,
            verdict = %verdict,
            content_length = req.content_length,
            content_received = req.content_received,
            elapsed_secs = elapsed.as_secs(),
            elapsed_millis = elapsed.subsec_millis(),
            "matched rule"
        );

        if let Some(sink) = &self.sink {
            let line = RequestLogLine {
                ts: Utc::now(),
                rule_id,
                url: &req.url,
                verdict: verdict.to_text(),
                content_length: req.content_length,
                content_received: req.content_received,
                elapsed_secs: elapsed.as_secs(),
                elapsed_millis: elapsed.subsec_millis(),
            };
            if let Ok(json) = serde_json::to_string(&line) {
                let mut w = sink.make_writer();
                let _ = w.write_all(json.as_bytes());
                let _ = w.write_all(b"\n");
            }
        }
    }
}
