//! Resolution cache of memoized positive resolutions per element.
//!
//! The outer map is guarded by a [`RwLock`] and is only write-locked to
//! create a missing entry set, so check-then-create is atomic. Each entry set
//! is an [`ArcSwap`] snapshot updated copy-on-write: readers never block and
//! always see either the old or the new snapshot, and racing writers retry
//! instead of losing each other's additions.
//!
//! [`ResolutionCache::clear`] is meant to run between scan passes. A `store`
//! racing a `clear` may land in an entry set that was just dropped from the
//! map, in which case that one result is not memoized and is recomputed on
//! the next lookup.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use tracing::trace;

use crate::model::{Element, Tag, TagTypeId};

/// Resolved tags for one element, unique by tag type.
#[derive(Debug, Default)]
struct EntrySet {
    tags: ArcSwap<Vec<Arc<Tag>>>,
}

impl EntrySet {
    fn find(&self, tag_type: &TagTypeId) -> Option<Arc<Tag>> {
        self.tags
            .load()
            .iter()
            .find(|tag| &tag.tag_type == tag_type)
            .cloned()
    }

    /// Returns `false` if a tag of the same type was already present.
    fn insert(&self, tag: Arc<Tag>) -> bool {
        let mut added = false;
        self.tags.rcu(|current| {
            if current.iter().any(|t| t.tag_type == tag.tag_type) {
                added = false;
                return Arc::clone(current);
            }
            added = true;
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&tag));
            Arc::new(next)
        });
        added
    }

    fn snapshot(&self) -> Vec<Arc<Tag>> {
        self.tags.load_full().to_vec()
    }
}

/// Shared memo of `(element, tag type) -> tag`.
///
/// Owned by a [`Resolver`](crate::resolver::Resolver); independent instances
/// never share entries.
#[derive(Debug)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<Element, Arc<EntrySet>>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-size the cache for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// The memoized tag of `tag_type` for `element`, if any.
    pub fn lookup(&self, element: &Element, tag_type: &TagTypeId) -> Option<Arc<Tag>> {
        let set = self.entries.read().get(element).cloned()?;
        set.find(tag_type)
    }

    /// Memoize `tag` for `element`. Returns `false` if the element already
    /// had a tag of the same type, which is kept.
    pub fn store(&self, element: &Element, tag: Arc<Tag>) -> bool {
        let existing = self.entries.read().get(element).cloned();
        let set = match existing {
            Some(set) => set,
            None => Arc::clone(self.entries.write().entry(element.clone()).or_default()),
        };
        let added = set.insert(tag);
        trace!(%element, added, "resolution cached");
        added
    }

    /// Everything memoized for an element.
    pub fn entries_for(&self, element: &Element) -> Vec<Arc<Tag>> {
        self.entries
            .read()
            .get(element)
            .map(|set| set.snapshot())
            .unwrap_or_default()
    }

    /// Drop every memoized entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of elements with at least one memoized entry.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}
