//! URL substring matcher, built on Aho–Corasick the same way the teacher's
//! WAF rule compiler matches against URIs (`waf/rules/matcher.rs::AcMatcher`).
//!
//! The original design calls out the performance cost of this filter
//! explicitly: matching requires the whole URL, so a connection cannot be
//! accepted until the filter set has been consulted.

use super::{FilterConfigNode, FilterObject};
use crate::action::Action;
use crate::error::ConfigError;
use crate::request::HttpRequest;
use aho_corasick::AhoCorasick;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct UrlSubstringFields {
    patterns: Vec<String>,
    #[serde(default = "default_action")]
    action: Action,
}

fn default_action() -> Action {
    Action::Reject
}

#[derive(Debug)]
pub struct UrlSubstringFilter {
    id: u32,
    ac: AhoCorasick,
    action: Action,
    mark: Option<(u32, u32)>,
}

impl UrlSubstringFilter {
    pub fn from_config(node: &FilterConfigNode) -> Result<Self, ConfigError> {
        let fields: UrlSubstringFields =
            serde_yaml::from_value(node.fields.clone()).map_err(|e| ConfigError::Parse {
                path: "<inline>".into(),
                source: e,
            })?;

        let ac = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&fields.patterns)
            .map_err(|e| ConfigError::InvalidPattern {
                filter_id: node.id,
                message: e.to_string(),
            })?;

        Ok(Self {
            id: node.id,
            ac,
            action: fields.action,
            mark: super::resolve_mark(node),
        })
    }
}

impl FilterObject for UrlSubstringFilter {
    fn id(&self) -> u32 {
        self.id
    }

    fn type_name(&self) -> &'static str {
        "url_substring"
    }

    fn mark(&self) -> Option<(u32, u32)> {
        self.mark
    }

    fn request_filter(&self, req: &HttpRequest) -> Action {
        if self.ac.is_match(req.url.as_bytes()) {
            self.action
        } else {
            Action::NoMatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(patterns: &[&str]) -> FilterConfigNode {
        FilterConfigNode {
            id: 3,
            type_name: "url_substring".into(),
            mark: None,
            mask: None,
            fields: serde_yaml::from_str(&format!(
                "patterns: [{}]",
                patterns.iter().map(|p| format!("\"{p}\"")).collect::<Vec<_>>().join(", ")
            ))
            .unwrap(),
        }
    }

    #[test]
    fn matches_substring_anywhere_in_url() {
        let f = UrlSubstringFilter::from_config(&node(&["/ads/"])).unwrap();
        let req = HttpRequest::new("http://safe.com/ads/banner", "safe.com");
        assert_eq!(f.request_filter(&req), Action::Reject);
    }

    #[test]
    fn no_match_when_absent() {
        let f = UrlSubstringFilter::from_config(&node(&["/ads/"])).unwrap();
        let req = HttpRequest::new("http://safe.com/index", "safe.com");
        assert_eq!(f.request_filter(&req), Action::NoMatch);
    }
}
