//! The filter-object plugin model: a capability-based abstraction over
//! heterogeneous matchers (host, IP/CIDR, URL substring, content-hash,
//! always-trust, and anything a dynamically loaded plugin registers).
//!
//! A filter is constructed once when a configuration loads, shared
//! (read-only) by every rule that references it, and destroyed when the
//! owning `ContentFilter` is destroyed. Per-request mutable state lives on
//! the request, not the filter; a filter that needs to remember things
//! across requests (an AV-style verdict cache, say) owns that state itself
//! behind its own synchronization.

pub mod always_trust;
pub mod clamav;
pub mod content_hash;
pub mod host;
pub mod ip;
pub mod registry;
pub mod url_substring;

use crate::action::Action;
use crate::error::ConfigError;
use crate::request::HttpRequest;
use std::fmt;
use std::sync::Arc;

/// A configuration fragment for one `FilterObject`. Concrete filters read
/// their type-specific fields out of `fields` via `serde_yaml`.
#[derive(Debug, Clone)]
pub struct FilterConfigNode {
    pub id: u32,
    pub type_name: String,
    pub mark: Option<u32>,
    pub mask: Option<u32>,
    pub fields: serde_yaml::Value,
}

/// Resolves a `FilterObject`'s mark/mask pair the way `from_config` does
/// for every concrete filter: no pair unless `mark` is set, and `mask`
/// defaults to all-ones when `mark` is set but `mask` is absent, mirroring
/// `Rule`'s own mark/mask default (spec.md §6).
pub fn resolve_mark(node: &FilterConfigNode) -> Option<(u32, u32)> {
    node.mark.map(|mark| (mark, node.mask.unwrap_or(u32::MAX)))
}

/// Uniform capability set every concrete matcher implements a subset of.
///
/// A callback returning `Action::NoMatch` means "did not hit, keep
/// evaluating". Any other `Action` is a hit carrying the verdict the
/// filter would impose if the rule's decision rested solely on it — the
/// owning rule may still override it with the rule's own configured
/// action.
pub trait FilterObject: Send + Sync + fmt::Debug {
    /// Stable id, unique within one configuration.
    fn id(&self) -> u32;

    /// The plug-in type name this instance was constructed from.
    fn type_name(&self) -> &'static str;

    /// Optional connection-mark/mark-mask pair for downstream kernel
    /// tagging. Defaults to "no mark".
    fn mark(&self) -> Option<(u32, u32)> {
        None
    }

    /// True iff `stream_filter` does real work. The engine reads this once
    /// at load time to compute `ContentFilter::has_stream_filter`.
    fn has_stream_filter(&self) -> bool {
        false
    }

    /// True iff `file_filter` does real work, analogous to
    /// `has_stream_filter`.
    fn has_file_filter(&self) -> bool {
        false
    }

    /// Notification only; no verdict. Gives a filter a chance to
    /// initialize per-request scratch state (e.g. open an AV session).
    fn request_start(&self, _req: &HttpRequest) {}

    /// Synchronous decision before any body bytes are available.
    fn request_filter(&self, _req: &HttpRequest) -> Action {
        Action::NoMatch
    }

    /// Invoked per body chunk, in byte-offset order, until it returns a
    /// non-`NoMatch` verdict, the stream ends, or the request is
    /// cancelled.
    fn stream_filter(&self, _req: &HttpRequest, _chunk: &[u8]) -> Action {
        Action::NoMatch
    }

    /// Invoked at most once per request, after the full response body is
    /// buffered.
    fn file_filter(&self, _req: &HttpRequest, _body: &[u8]) -> Action {
        Action::NoMatch
    }
}

/// A constructor takes the configuration sub-node for one filter and
/// yields a fresh, independently owned filter object. Builtins and
/// dynamically loaded plug-ins both implement this shape; builtins are
/// plain function pointers wrapped in a boxed closure at registration
/// time so the registry can store one uniform type.
pub type FilterConstructor =
    Arc<dyn Fn(&FilterConfigNode) -> Result<Arc<dyn FilterObject>, ConfigError> + Send + Sync>;
