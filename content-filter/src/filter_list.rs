//! Ordered, id-indexed collection of every `FilterObject` a configuration
//! defines.
//!
//! Insertion order is preserved because rule attribution (engine.rs) breaks
//! ties between rules referencing the same hit filter by filter-list order.
//! Lookup by id is O(1) via an `ahash`-keyed index, upgrading the source's
//! linear scan the way spec.md §4.4 invites ("an implementer may promote to
//! a hashed index").

use crate::filter::FilterObject;
use ahash::AHashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct FilterList {
    filters: Vec<Arc<dyn FilterObject>>,
    by_id: AHashMap<u32, usize>,
}

impl FilterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter object. The caller (the config loader) is
    /// responsible for rejecting duplicate ids before this is called;
    /// a duplicate here silently shadows the earlier entry's index, which
    /// would only happen on a loader bug.
    pub fn append(&mut self, filter: Arc<dyn FilterObject>) {
        let index = self.filters.len();
        self.by_id.insert(filter.id(), index);
        self.filters.push(filter);
    }

    pub fn find_by_id(&self, id: u32) -> Option<&Arc<dyn FilterObject>> {
        self.by_id.get(&id).map(|&i| &self.filters[i])
    }

    /// Position of `id` in insertion order, used by the engine's rule
    /// attribution tie-break. `None` if `id` is not present.
    pub fn position_of(&self, id: u32) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn FilterObject>> {
        self.filters.iter()
    }

    /// True iff any filter in the list implements a real `stream_filter`.
    /// Computed once by the engine at build time, not cached here.
    pub fn any_has_stream_filter(&self) -> bool {
        self.filters.iter().any(|f| f.has_stream_filter())
    }

    /// True iff any filter in the list implements a real `file_filter`.
    pub fn any_has_file_filter(&self) -> bool {
        self.filters.iter().any(|f| f.has_file_filter())
    }
}
