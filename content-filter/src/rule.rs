//! The group/filter matrix: the single non-obvious piece of combinatorial
//! logic in the engine (spec.md §9 singles it out as deserving "its own
//! type with a small, tested evaluator").
//!
//! Semantics: a rule matches iff every non-empty group has at least one
//! filter returning a non-`NoMatch` verdict. Groups are ANDed; filters
//! within a group are ORed. A rule with no groups (or only empty ones)
//! never matches.

use crate::action::Action;
use crate::error::ConfigError;
use crate::filter::FilterObject;
use crate::request::HttpRequest;
use std::sync::Arc;

/// The source's fixed group count; kept as a plain constant rather than a
/// generic bound since it is a configuration-format limit, not a type-level
/// one.
pub const MAX_FILTER_GROUPS: usize = 8;

#[derive(Debug)]
pub struct Rule {
    id: u32,
    action: Option<Action>,
    log: bool,
    notify: bool,
    comment: Option<String>,
    mark: Option<u32>,
    mask: u32,
    groups: [Vec<Arc<dyn FilterObject>>; MAX_FILTER_GROUPS],
}

impl Rule {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            action: None,
            log: false,
            notify: false,
            comment: None,
            mark: None,
            mask: u32::MAX,
            groups: Default::default(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn set_action(&mut self, action: Action) {
        self.action = Some(action);
    }

    pub fn set_log(&mut self, log: bool) {
        self.log = log;
    }

    pub fn set_notify(&mut self, notify: bool) {
        self.notify = notify;
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = Some(comment.into());
    }

    pub fn set_mark(&mut self, mark: u32) {
        self.mark = Some(mark);
    }

    pub fn set_mask(&mut self, mask: u32) {
        self.mask = mask;
    }

    pub fn mark(&self) -> Option<u32> {
        self.mark
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Whether a matched request should produce a log line — `log` or
    /// `notify`, per spec.md §4.8's emission condition.
    pub fn should_log(&self) -> bool {
        self.log || self.notify
    }

    pub fn action(&self) -> Action {
        self.action
            .expect("rule must be validated before it is published")
    }

    /// Confirms the rule is ready for publication. The loader calls this
    /// once, for every rule, before freezing a `ContentFilter`; `action()`
    /// and `verdict()` assume it already succeeded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.action.is_none() {
            return Err(ConfigError::MissingAction { rule_id: self.id });
        }
        Ok(())
    }

    /// Appends a filter reference to the given group. Out-of-range group
    /// indices are a fatal configuration error, per spec.md §4.5.
    pub fn add_filter(
        &mut self,
        group_index: usize,
        filter: Arc<dyn FilterObject>,
    ) -> Result<(), ConfigError> {
        if group_index >= MAX_FILTER_GROUPS {
            return Err(ConfigError::GroupOutOfRange {
                rule_id: self.id,
                group: group_index,
                max: MAX_FILTER_GROUPS,
            });
        }
        self.groups[group_index].push(filter);
        Ok(())
    }

    /// Linear search across every group for a reference to `filter_id`.
    /// Returns the group index of the first hit.
    pub fn contains_filter(&self, filter_id: u32) -> (bool, Option<usize>) {
        for (index, group) in self.groups.iter().enumerate() {
            if group.iter().any(|f| f.id() == filter_id) {
                return (true, Some(index));
            }
        }
        (false, None)
    }

    /// `verdict(req)`:
    /// 1. For each non-empty group, call each filter's `request_filter` in
    ///    group order until one returns a non-`NoMatch` verdict.
    /// 2. If any non-empty group has no matching filter, return `NoMatch`.
    /// 3. Otherwise return the rule's own `action`.
    ///
    /// A rule with no non-empty groups never matches.
    pub fn verdict(&self, req: &HttpRequest) -> Action {
        let mut saw_non_empty_group = false;
        for group in &self.groups {
            if group.is_empty() {
                continue;
            }
            saw_non_empty_group = true;
            let hit = group.iter().any(|f| f.request_filter(req).is_match());
            if !hit {
                return Action::NoMatch;
            }
        }
        if saw_non_empty_group {
            self.action()
        } else {
            Action::NoMatch
        }
    }
}
