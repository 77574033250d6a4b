//! Host/domain matcher — the `HostFilter` of the original `web_filter.c`
//! design (`Filters on host.domain`).

use super::{FilterConfigNode, FilterObject};
use crate::action::Action;
use crate::error::ConfigError;
use crate::request::HttpRequest;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct HostFilterFields {
    hosts: Vec<String>,
    #[serde(default = "default_action")]
    action: Action,
}

fn default_action() -> Action {
    Action::Reject
}

#[derive(Debug)]
pub struct HostFilter {
    id: u32,
    hosts: Vec<String>,
    action: Action,
    mark: Option<(u32, u32)>,
}

impl HostFilter {
    pub fn from_config(node: &FilterConfigNode) -> Result<Self, ConfigError> {
        let fields: HostFilterFields =
            serde_yaml::from_value(node.fields.clone()).map_err(|e| ConfigError::Parse {
                path: "<inline>".into(),
                source: e,
            })?;
        Ok(Self {
            id: node.id,
            hosts: fields.hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect(),
            action: fields.action,
            mark: super::resolve_mark(node),
        })
    }

    fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.hosts.iter().any(|h| {
            if let Some(suffix) = h.strip_prefix("*.") {
                host == suffix || host.ends_with(&format!(".{suffix}"))
            } else {
                host == *h
            }
        })
    }
}

impl FilterObject for HostFilter {
    fn id(&self) -> u32 {
        self.id
    }

    fn type_name(&self) -> &'static str {
        "host"
    }

    fn mark(&self) -> Option<(u32, u32)> {
        self.mark
    }

    fn request_filter(&self, req: &HttpRequest) -> Action {
        if self.matches(&req.host) {
            self.action
        } else {
            Action::NoMatch
        }
    }
}
