//! `ContentFilter`: the immutable, reference-counted engine holding one
//! published configuration's rules and filter objects.
//!
//! Hot-swap follows the teacher's `waf/engine.rs::WafEngine` pattern
//! exactly — an `Arc<ArcSwap<ContentFilter>>` held by the process, with
//! in-flight requests keeping their own `Arc` clone taken at dispatch.

use crate::action::Action;
use crate::filter_list::FilterList;
use crate::request::HttpRequest;
use crate::rule::Rule;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// One fully loaded, frozen configuration: an ordered rule list plus the
/// filter objects those rules reference.
#[derive(Debug)]
pub struct ContentFilter {
    default_action: Action,
    rule_list: Vec<Arc<Rule>>,
    filter_list: FilterList,
    has_stream_filter: bool,
    has_file_filter: bool,
}

impl ContentFilter {
    /// Freezes a fully populated rule list and filter list into a
    /// publishable engine. `has_stream_filter`/`has_file_filter` are
    /// computed once here and never recomputed, per spec.md §9 — the
    /// filters are immutable from this point on.
    pub fn new(default_action: Action, rule_list: Vec<Arc<Rule>>, filter_list: FilterList) -> Self {
        let has_stream_filter = filter_list.any_has_stream_filter();
        let has_file_filter = filter_list.any_has_file_filter();
        Self {
            default_action,
            rule_list,
            filter_list,
            has_stream_filter,
            has_file_filter,
        }
    }

    pub fn default_action(&self) -> Action {
        self.default_action
    }

    pub fn has_stream_filter(&self) -> bool {
        self.has_stream_filter
    }

    pub fn has_file_filter(&self) -> bool {
        self.has_file_filter
    }

    pub fn rule_count(&self) -> usize {
        self.rule_list.len()
    }

    pub fn filter_list(&self) -> &FilterList {
        &self.filter_list
    }

    /// Fan out to every filter implementing `request_start`. Advisory
    /// only; the engine never short-circuits on this call.
    pub fn request_start(&self, req: &HttpRequest) {
        for filter in self.filter_list.iter() {
            filter.request_start(req);
        }
    }

    /// Scans `rule_list` in order; the first rule whose `verdict` is a hit
    /// wins. Falls back to `default_action`, which is never `NoMatch`
    /// (spec.md §8's "engine never returns NoMatch" invariant).
    pub fn request_verdict(&self, req: &mut HttpRequest) -> Action {
        for rule in &self.rule_list {
            let verdict = rule.verdict(req);
            if verdict.is_match() {
                req.rule_matched = Some(Arc::clone(rule));
                return verdict;
            }
        }
        self.default_action
    }

    /// No-op returning `NoMatch` unless `has_stream_filter`. Otherwise
    /// invokes every stream-capable filter, in filter-list order, with
    /// this chunk; the first hit's owning rule is attributed and its
    /// filter verdict (not the rule's configured action) is returned.
    pub fn filter_stream(&self, req: &mut HttpRequest, chunk: &[u8]) -> Action {
        if !self.has_stream_filter {
            return Action::NoMatch;
        }
        self.scan_filters(req, |filter, req| filter.stream_filter(req, chunk))
    }

    /// Identical control flow to `filter_stream` but against the
    /// file-scan capability, invoked at most once per request after the
    /// full body is buffered.
    pub fn file_scan(&self, req: &mut HttpRequest, body: &[u8]) -> Action {
        if !self.has_file_filter {
            return Action::NoMatch;
        }
        self.scan_filters(req, |filter, req| filter.file_filter(req, body))
    }

    /// Shared attribution algorithm for `filter_stream`/`file_scan`: invoke
    /// `call` against every filter in filter-list order and collect every
    /// hit. Per spec.md §4.6, the winner is the hit whose **earliest
    /// referencing rule has the lowest position**; filter-list order is
    /// only the tie-break when two hits share the same earliest rule. A
    /// hit with no referencing rule is logged and excluded from
    /// contention — it never wins over a properly attributed hit.
    fn scan_filters(
        &self,
        req: &mut HttpRequest,
        call: impl Fn(&dyn crate::filter::FilterObject, &HttpRequest) -> Action,
    ) -> Action {
        let mut best: Option<(usize, usize, Action, &Arc<Rule>)> = None;

        for (filter_pos, filter) in self.filter_list.iter().enumerate() {
            let verdict = call(filter.as_ref(), req);
            if !verdict.is_match() {
                continue;
            }

            let filter_id = filter.id();
            let Some(rule_pos) = self.rule_list.iter().position(|rule| rule.contains_filter(filter_id).0) else {
                tracing::error!(filter_id, "filter hit but no rule references it");
                continue;
            };

            let candidate = (rule_pos, filter_pos);
            let is_better = match &best {
                None => true,
                Some((best_rule_pos, best_filter_pos, ..)) => candidate < (*best_rule_pos, *best_filter_pos),
            };
            if is_better {
                best = Some((rule_pos, filter_pos, verdict, &self.rule_list[rule_pos]));
            }
        }

        match best {
            Some((_, _, verdict, rule)) => {
                req.rule_matched = Some(Arc::clone(rule));
                verdict
            }
            None => Action::NoMatch,
        }
    }
}

/// The process-wide handle: an `ArcSwap` slot holding the currently
/// published `ContentFilter`, plus a fixed `Arc` wrapper so clones of the
/// handle (one per worker) share the same slot.
#[derive(Clone)]
pub struct ContentFilterHandle {
    slot: Arc<ArcSwap<ContentFilter>>,
}

impl ContentFilterHandle {
    pub fn new(initial: ContentFilter) -> Self {
        Self {
            slot: Arc::new(ArcSwap::from_pointee(initial)),
        }
    }

    /// Atomically replaces the published configuration. In-flight
    /// requests that already hold an `Arc<ContentFilter>` from `current()`
    /// are unaffected; only subsequent `current()` calls see the new one.
    pub fn swap(&self, new_engine: ContentFilter) {
        self.slot.store(Arc::new(new_engine));
    }

    /// Takes a reference-counted snapshot of the currently published
    /// engine, to be held for the lifetime of one request.
    pub fn current(&self) -> Arc<ContentFilter> {
        self.slot.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::host::HostFilter;
    use crate::filter::url_substring::UrlSubstringFilter;
    use crate::filter::{FilterConfigNode, FilterObject};
    use std::sync::Arc;

    fn host_filter(id: u32, host: &str) -> Arc<dyn FilterObject> {
        let node = FilterConfigNode {
            id,
            type_name: "host".into(),
            mark: None,
            mask: None,
            fields: serde_yaml::from_str(&format!("hosts: [\"{host}\"]")).unwrap(),
        };
        Arc::new(HostFilter::from_config(&node).unwrap())
    }

    fn url_filter(id: u32, pattern: &str) -> Arc<dyn FilterObject> {
        let node = FilterConfigNode {
            id,
            type_name: "url_substring".into(),
            mark: None,
            mask: None,
            fields: serde_yaml::from_str(&format!("patterns: [\"{pattern}\"]")).unwrap(),
        };
        Arc::new(UrlSubstringFilter::from_config(&node).unwrap())
    }

    #[test]
    fn empty_rule_list_always_returns_default_action() {
        let engine = ContentFilter::new(Action::Accept, vec![], FilterList::new());
        let mut req = HttpRequest::new("http://anything/", "anything");
        assert_eq!(engine.request_verdict(&mut req), Action::Accept);
        assert!(req.rule_matched.is_none());
    }

    #[test]
    fn host_match_rejects_and_records_rule() {
        let mut filters = FilterList::new();
        filters.append(host_filter(1, "example.com"));
        let mut rule = Rule::new(1);
        rule.set_action(Action::Reject);
        rule.add_filter(0, Arc::clone(filters.find_by_id(1).unwrap())).unwrap();

        let engine = ContentFilter::new(Action::Accept, vec![Arc::new(rule)], filters);
        let mut req = HttpRequest::new("http://example.com/", "example.com");
        assert_eq!(engine.request_verdict(&mut req), Action::Reject);
        assert_eq!(req.rule_matched.as_ref().unwrap().id(), 1);
    }

    #[test]
    fn first_match_wins_across_rules() {
        let mut filters = FilterList::new();
        filters.append(host_filter(1, "safe.com"));
        filters.append(url_filter(2, "/ads/"));

        let mut rule_a = Rule::new(10);
        rule_a.set_action(Action::Accept);
        rule_a.add_filter(0, Arc::clone(filters.find_by_id(1).unwrap())).unwrap();

        let mut rule_b = Rule::new(20);
        rule_b.set_action(Action::Reject);
        rule_b.add_filter(0, Arc::clone(filters.find_by_id(2).unwrap())).unwrap();

        let engine =
            ContentFilter::new(Action::Accept, vec![Arc::new(rule_a), Arc::new(rule_b)], filters);
        let mut req = HttpRequest::new("http://safe.com/ads/banner", "safe.com");
        assert_eq!(engine.request_verdict(&mut req), Action::Accept);
        assert_eq!(req.rule_matched.as_ref().unwrap().id(), 10);
    }

    #[test]
    fn stream_filter_is_noop_without_capability() {
        let engine = ContentFilter::new(Action::Accept, vec![], FilterList::new());
        let mut req = HttpRequest::new("http://x/", "x");
        assert_eq!(engine.filter_stream(&mut req, b"chunk"), Action::NoMatch);
    }

    #[test]
    fn stream_hit_attributed_by_earliest_referencing_rule_not_filter_list_order() {
        use crate::filter::clamav::ClamAvFilter;

        fn clamav_filter(id: u32, signature: &str) -> Arc<dyn FilterObject> {
            let node = FilterConfigNode {
                id,
                type_name: "clamav".into(),
                mark: None,
                mask: None,
                fields: serde_yaml::from_str(&format!("signatures: [\"{signature}\"]")).unwrap(),
            };
            Arc::new(ClamAvFilter::from_config(&node).unwrap())
        }

        // Filter A is first in filter-list order but is only referenced by
        // the rule at position 9; filter B is second in filter-list order
        // but is referenced by the rule at position 0. Both hit the same
        // chunk. Spec.md §4.6 requires B's verdict, attributed to rule 0.
        let mut filters = FilterList::new();
        filters.append(clamav_filter(1, "AAA"));
        filters.append(clamav_filter(2, "BBB"));

        let mut rule_b = Rule::new(0);
        rule_b.set_action(Action::Reject);
        rule_b.add_filter(0, Arc::clone(filters.find_by_id(2).unwrap())).unwrap();

        let mut rule_a = Rule::new(9);
        rule_a.set_action(Action::Virus);
        rule_a.add_filter(0, Arc::clone(filters.find_by_id(1).unwrap())).unwrap();

        let engine = ContentFilter::new(Action::Accept, vec![Arc::new(rule_b), Arc::new(rule_a)], filters);
        let mut req = HttpRequest::new("http://x/payload", "x");
        assert_eq!(engine.filter_stream(&mut req, b"AAA and BBB both here"), Action::Reject);
        assert_eq!(req.rule_matched.as_ref().unwrap().id(), 0);
    }

    #[test]
    fn handle_swap_does_not_disturb_an_already_taken_snapshot() {
        let e1 = ContentFilter::new(Action::Accept, vec![], FilterList::new());
        let handle = ContentFilterHandle::new(e1);
        let snapshot = handle.current();

        let e2 = ContentFilter::new(Action::Reject, vec![], FilterList::new());
        handle.swap(e2);

        assert_eq!(snapshot.default_action(), Action::Accept);
        assert_eq!(handle.current().default_action(), Action::Reject);
    }
}
