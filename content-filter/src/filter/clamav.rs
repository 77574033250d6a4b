//! Streaming content scanner — the original design's "send HTTP request
//! contents to antivirus such as clamav," where the response body is fed to
//! the scanner incrementally rather than buffered whole (contrast
//! `content_hash.rs`, which only scans once the complete file is
//! available).
//!
//! A real integration would stream bytes over a unix socket to `clamd`;
//! this stand-in instead watches each request's growing buffer for a
//! configured Aho-Corasick signature set. Per-request buffers are scratch
//! state the filter owns itself, keyed by `HttpRequest::id`, exactly as
//! spec.md §4.2 describes for filters that "need to accumulate bytes."

use super::{FilterConfigNode, FilterObject};
use crate::action::Action;
use crate::error::ConfigError;
use crate::request::HttpRequest;
use aho_corasick::AhoCorasick;
use dashmap::DashMap;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ClamAvFields {
    signatures: Vec<String>,
    #[serde(default = "default_action")]
    action: Action,
}

fn default_action() -> Action {
    Action::Virus
}

/// Upper bound on how many in-flight requests' buffers this filter tracks
/// at once. `request_start` evicts anything older than this window so a
/// request whose body never matches (and is never explicitly torn down,
/// since the trait has no teardown callback) does not leak forever.
const MAX_TRACKED_REQUESTS: u64 = 4096;

#[derive(Debug)]
pub struct ClamAvFilter {
    id: u32,
    ac: AhoCorasick,
    action: Action,
    scratch: DashMap<u64, Vec<u8>>,
    mark: Option<(u32, u32)>,
}

impl ClamAvFilter {
    pub fn from_config(node: &FilterConfigNode) -> Result<Self, ConfigError> {
        let fields: ClamAvFields =
            serde_yaml::from_value(node.fields.clone()).map_err(|e| ConfigError::Parse {
                path: "<inline>".into(),
                source: e,
            })?;

        let ac = AhoCorasick::builder().build(&fields.signatures).map_err(|e| {
            ConfigError::InvalidPattern {
                filter_id: node.id,
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            id: node.id,
            ac,
            action: fields.action,
            scratch: DashMap::new(),
            mark: super::resolve_mark(node),
        })
    }
}

impl FilterObject for ClamAvFilter {
    fn id(&self) -> u32 {
        self.id
    }

    fn type_name(&self) -> &'static str {
        "clamav"
    }

    fn mark(&self) -> Option<(u32, u32)> {
        self.mark
    }

    fn has_stream_filter(&self) -> bool {
        true
    }

    fn request_start(&self, req: &HttpRequest) {
        if req.id > MAX_TRACKED_REQUESTS {
            let floor = req.id - MAX_TRACKED_REQUESTS;
            self.scratch.retain(|id, _| *id >= floor);
        }
    }

    fn stream_filter(&self, req: &HttpRequest, chunk: &[u8]) -> Action {
        let mut buf = self.scratch.entry(req.id).or_default();
        buf.extend_from_slice(chunk);

        if self.ac.is_match(&buf[..]) {
            drop(buf);
            self.scratch.remove(&req.id);
            self.action
        } else {
            Action::NoMatch
        }
    }
}
