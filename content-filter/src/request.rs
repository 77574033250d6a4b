//! The subset of request state the engine reads and writes.
//!
//! The engine never mutates fields other than `rule_matched`.

use crate::rule::Rule;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Process-unique, monotonically increasing identity. Not part of the
    /// source's request projection; filters that accumulate per-request
    /// scratch state (`stream_filter` buffers) need some key to index that
    /// state by, per spec.md §4.2's "scratch block the filter itself
    /// allocates keyed by request identity."
    pub id: u64,
    pub url: String,
    pub host: String,
    pub client_ip: Option<IpAddr>,
    pub start_time: Instant,
    pub content_length: u64,
    pub content_received: u64,
    pub rule_matched: Option<Arc<Rule>>,
}

impl HttpRequest {
    pub fn new(url: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            url: url.into(),
            host: host.into(),
            client_ip: None,
            start_time: Instant::now(),
            content_length: 0,
            content_received: 0,
            rule_matched: None,
        }
    }

    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }

    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = len;
        self
    }
}
