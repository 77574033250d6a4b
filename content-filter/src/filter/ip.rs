//! IP/CIDR matcher — the `IPFilter` of the original design ("Filters on IP
//! or Network").

use super::{FilterConfigNode, FilterObject};
use crate::action::Action;
use crate::error::ConfigError;
use crate::request::HttpRequest;
use ipnetwork::IpNetwork;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct IpNetFilterFields {
    networks: Vec<String>,
    #[serde(default = "default_action")]
    action: Action,
}

fn default_action() -> Action {
    Action::Reject
}

#[derive(Debug)]
pub struct IpNetFilter {
    id: u32,
    networks: Vec<IpNetwork>,
    action: Action,
    mark: Option<(u32, u32)>,
}

impl IpNetFilter {
    pub fn from_config(node: &FilterConfigNode) -> Result<Self, ConfigError> {
        let fields: IpNetFilterFields =
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
            networks,
            action: fields.action,
            mark: super::resolve_mark(node),
        })
    }
}

impl FilterObject for IpNetFilter {
    fn id(&self) -> u32 {
        self.id
    }

    fn type_name(&self) -> &'static str {
        "ip_net"
    }

    fn mark(&self) -> Option<(u32, u32)> {
        self.mark
    }

    fn request_filter(&self, req: &HttpRequest) -> Action {
        let Some(ip) = req.client_ip else {
            return Action::NoMatch;
        };
        if self.networks.iter().any(|n| n.contains(ip)) {
            self.action
        } else {
            Action::NoMatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(nets: &[&str]) -> FilterConfigNode {
        FilterConfigNode {
            id: 7,
            type_name: "ip_net".into(),
            mark: None,
            mask: None,
            fields: serde_yaml::from_str(&format!(
                "networks: [{}]",
                nets.iter().map(|n| format!("\"{n}\"")).collect::<Vec<_>>().join(", ")
            ))
            .unwrap(),
        }
    }

    #[test]
    fn matches_address_in_cidr() {
        let f = IpNetFilter::from_config(&node(&["10.0.0.0/8"])).unwrap();
        let req = HttpRequest::new("http://x/", "x").with_client_ip("10.1.2.3".parse().unwrap());
        assert_eq!(f.request_filter(&req), Action::Reject);
    }

    #[test]
    fn no_match_outside_cidr() {
        let f = IpNetFilter::from_config(&node(&["10.0.0.0/8"])).unwrap();
        let req = HttpRequest::new("http://x/", "x").with_client_ip("192.168.1.1".parse().unwrap());
        assert_eq!(f.request_filter(&req), Action::NoMatch);
    }

    #[test]
    fn no_client_ip_is_nomatch() {
        let f = IpNetFilter::from_config(&node(&["10.0.0.0/8"])).unwrap();
        let req = HttpRequest::new("http://x/", "x");
        assert_eq!(f.request_filter(&req), Action::NoMatch);
    }
}
