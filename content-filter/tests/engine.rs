//! End-to-end scenarios from spec.md §8, driven through the public
//! `config::load_str` + `ContentFilter` entry-points exactly as a worker
//! thread would call them.

use content_filter::config;
use content_filter::engine::ContentFilterHandle;
use content_filter::filter::registry::FilterRegistry;
use content_filter::{Action, HttpRequest};

fn load(yaml: &str) -> content_filter::ContentFilter {
    let registry = FilterRegistry::with_builtins();
    config::load_str(yaml, &registry).expect("config loads")
}

/// Scenario 1: single rule, single group, host match.
#[test]
fn host_rule_rejects_matching_request() {
    let engine = load(
        r#"
default_action: accept
filter_objects:
  - id: 1
    type: host
    hosts: ["example.com"]
rules:
  - id: 1
    action: reject
    filters:
      - id: 1
        group: 0
"#,
    );

    let mut req = HttpRequest::new("http://example.com/", "example.com");
    assert_eq!(engine.request_verdict(&mut req), Action::Reject);
    assert_eq!(req.rule_matched.unwrap().id(), 1);
}

/// Scenario 2: same config, non-matching host falls back to default_action.
#[test]
fn non_matching_host_gets_default_action() {
    let engine = load(
        r#"
default_action: accept
filter_objects:
  - id: 1
    type: host
    hosts: ["example.com"]
rules:
  - id: 1
    action: reject
    filters:
      - id: 1
        group: 0
"#,
    );

    let mut req = HttpRequest::new("http://other.com/", "other.com");
    assert_eq!(engine.request_verdict(&mut req), Action::Accept);
    assert!(req.rule_matched.is_none());
}

/// Scenario 3: first-match-wins across two rules.
#[test]
fn first_matching_rule_wins_across_rules() {
    let engine = load(
        r#"
default_action: accept
filter_objects:
  - id: 1
    type: host
    hosts: ["safe.com"]
    action: accept
  - id: 2
    type: url_substring
    patterns: ["/ads/"]
rules:
  - id: 10
    action: accept
    filters:
      - id: 1
        group: 0
  - id: 20
    action: reject
    filters:
      - id: 2
        group: 0
"#,
    );

    let mut req = HttpRequest::new("http://safe.com/ads/banner", "safe.com");
    assert_eq!(engine.request_verdict(&mut req), Action::Accept);
    assert_eq!(req.rule_matched.unwrap().id(), 10);
}

/// Scenario 4: two-group rule is an AND; either group failing to hit means
/// no match.
#[test]
fn two_group_rule_requires_both_groups_to_hit() {
    let engine = load(
        r#"
default_action: accept
filter_objects:
  - id: 1
    type: host
    hosts: ["x.com"]
    action: reject
  - id: 2
    type: url_substring
    patterns: ["/bad"]
rules:
  - id: 1
    action: reject
    filters:
      - id: 1
        group: 0
      - id: 2
        group: 1
"#,
    );

    let mut hit = HttpRequest::new("http://x.com/bad", "x.com");
    assert_eq!(engine.request_verdict(&mut hit), Action::Reject);

    let mut miss = HttpRequest::new("http://x.com/good", "x.com");
    assert_eq!(engine.request_verdict(&mut miss), Action::Accept);
    assert!(miss.rule_matched.is_none());
}

/// Scenario 5: a streaming filter that only hits once a signature spans
/// two chunks, attributing the eventual hit back to its owning rule.
#[test]
fn stream_filter_attributes_hit_to_owning_rule_across_chunks() {
    let engine = load(
        r#"
default_action: accept
filter_objects:
  - id: 1
    type: clamav
    signatures: ["EICAR-SIGNATURE"]
rules:
  - id: 30
    action: virus
    filters:
      - id: 1
        group: 0
"#,
    );

    assert!(engine.has_stream_filter());
    let mut req = HttpRequest::new("http://x.com/payload", "x.com");
    engine.request_start(&req);

    assert_eq!(engine.filter_stream(&mut req, b"clean prefix, more EICAR-SIG"), Action::NoMatch);
    assert!(req.rule_matched.is_none());

    assert_eq!(engine.filter_stream(&mut req, b"NATURE tail"), Action::Virus);
    assert_eq!(req.rule_matched.unwrap().id(), 30);
}

/// Scenario 6: reload does not disturb a snapshot already taken by an
/// in-flight request.
#[test]
fn reload_does_not_disturb_in_flight_snapshot() {
    let e1 = load("default_action: accept\nfilter_objects: []\nrules: []\n");
    let handle = ContentFilterHandle::new(e1);

    // Request R takes its snapshot before the reload.
    let in_flight = handle.current();

    let e2 = load("default_action: reject\nfilter_objects: []\nrules: []\n");
    handle.swap(e2);

    // R's subsequent calls still see the old engine...
    let mut req = HttpRequest::new("http://anything/", "anything");
    assert_eq!(in_flight.request_verdict(&mut req), Action::Accept);

    // ...but a new request dispatched after the swap sees the new one.
    let mut new_req = HttpRequest::new("http://anything/", "anything");
    assert_eq!(handle.current().request_verdict(&mut new_req), Action::Reject);
}

/// Boundary: an engine with no rules always returns default_action.
#[test]
fn empty_rule_list_always_returns_default_action() {
    let engine = load("default_action: reject\nfilter_objects: []\nrules: []\n");
    let mut req = HttpRequest::new("http://anywhere/", "anywhere");
    assert_eq!(engine.request_verdict(&mut req), Action::Reject);
}
