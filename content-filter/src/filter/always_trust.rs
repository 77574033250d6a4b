//! Always-trust filter — the original design's "trust a domain, IP or
//! network... bypass all AV and filtering to get a performance boost on
//! this domain", wired to the fixed `Action::AlwaysTrust` verdict.

use super::{FilterConfigNode, FilterObject};
use crate::action::Action;
use crate::error::ConfigError;
use crate::request::HttpRequest;
use ipnetwork::IpNetwork;
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
struct AlwaysTrustFields {
    #[serde(default)]
    hosts: Vec<String>,
    #[serde(default)]
    networks: Vec<String>,
}

#[derive(Debug)]
pub struct AlwaysTrustFilter {
    id: u32,
    hosts: Vec<String>,
    networks: Vec<IpNetwork>,
    mark: Option<(u32, u32)>,
}

impl AlwaysTrustFilter {
    pub fn from_config(node: &FilterConfigNode) -> Result<Self, ConfigError> {
        let fields: AlwaysTrustFields =
            serde_yaml::from_value(node.fields.clone()).map_err(|e| ConfigError::Parse {
                path: "<inline>".into(),
                source: e,
            })?;

        let mut networks = Vec::with_capacity(fields.networks.len());
        for raw in &fields.networks {
            match raw.parse::<IpNetwork>() {
                Ok(n) => networks.push(n),
                Err(_) => {
                    tracing::warn!(filter_id = node.id, network = %raw, "unparseable network, skipping");
                }
            }
        }

        Ok(Self {
            id: node.id,
            hosts: fields.hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect(),
            networks,
            mark: super::resolve_mark(node),
        })
    }
}

impl FilterObject for AlwaysTrustFilter {
    fn id(&self) -> u32 {
        self.id
    }

    fn type_name(&self) -> &'static str {
        "always_trust"
    }

    fn mark(&self) -> Option<(u32, u32)> {
        self.mark
    }

    fn request_filter(&self, req: &HttpRequest) -> Action {
        let host_hit = self.hosts.iter().any(|h| h == &req.host.to_ascii_lowercase());
        let ip_hit = req
            .client_ip
            .map(|ip| self.networks.iter().any(|n| n.contains(ip)))
            .unwrap_or(false);

        if host_hit || ip_hit {
            Action::AlwaysTrust
        } else {
            Action::NoMatch
        }
    }
}
