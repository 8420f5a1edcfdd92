//! Finds the tag of a requested type that applies to an element.
//!
//! A tag applies when it is attached directly, when it is reachable through
//! meta-tags (tags on the types of attached tags, recursively), or when a
//! forward or reverse bridge converts an attached tag into it. Attachment
//! order decides every tie: the first qualifying match wins.
//!
//! Tag types may tag each other in cycles. Each recursion level extends an
//! immutable [`IgnoreSet`] with the candidates it is about to search, and a
//! per-call set of exhausted tag types keeps any tag type from being
//! searched twice, so resolution terminates on any graph.
//!
//! Only unrestricted top-level results go through the cache. Nested searches
//! run under an ignore set, so their results depend on the path that reached
//! them and are neither read from nor written to it.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::ResolutionCache;
use crate::model::{Attrs, Conversion, Element, Tag, TagModel, TagTypeId};

/// Tag types excluded from the candidate list of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet(HashSet<TagTypeId>);

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, tag_type: &TagTypeId) -> bool {
        self.0.contains(tag_type)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A new set holding these tag types and `more`.
    pub fn extended<'a, I>(&self, more: I) -> Self
    where
        I: IntoIterator<Item = &'a TagTypeId>,
    {
        let mut next = self.0.clone();
        next.extend(more.into_iter().cloned());
        Self(next)
    }
}

impl<'a> FromIterator<&'a TagTypeId> for IgnoreSet {
    fn from_iter<I: IntoIterator<Item = &'a TagTypeId>>(iter: I) -> Self {
        Self(iter.into_iter().cloned().collect())
    }
}

/// Resolves tags against a [`TagModel`], memoizing positive results.
pub struct Resolver<M> {
    model: M,
    cache: ResolutionCache,
}

impl<M: TagModel> Resolver<M> {
    pub fn new(model: M) -> Self {
        Self::with_cache(model, ResolutionCache::new())
    }

    pub fn with_cache(model: M, cache: ResolutionCache) -> Self {
        Self { model, cache }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Forget every memoized resolution.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("resolution cache cleared");
    }

    /// The tag of type `tag_type` that applies to `element`, if any.
    ///
    /// Absence is an ordinary outcome, not an error.
    pub fn resolve(&self, element: &Element, tag_type: &TagTypeId) -> Option<Arc<Tag>> {
        self.resolve_ignoring(element, tag_type, &IgnoreSet::new())
    }

    /// Like [`resolve`](Self::resolve), but never searches into attached
    /// tags whose type is in `ignored`. The cache is bypassed unless
    /// `ignored` is empty.
    pub fn resolve_ignoring(
        &self,
        element: &Element,
        tag_type: &TagTypeId,
        ignored: &IgnoreSet,
    ) -> Option<Arc<Tag>> {
        let mut exhausted = HashSet::new();
        if !ignored.is_empty() {
            return self.search(element, tag_type, ignored, &mut exhausted);
        }

        if let Some(hit) = self.cache.lookup(element, tag_type) {
            trace!(%element, %tag_type, "resolution cache hit");
            return Some(hit);
        }

        let found = self.search(element, tag_type, ignored, &mut exhausted);
        if let Some(tag) = &found {
            self.cache.store(element, Arc::clone(tag));
        }
        found
    }

    fn search(
        &self,
        element: &Element,
        tag_type: &TagTypeId,
        ignored: &IgnoreSet,
        exhausted: &mut HashSet<TagTypeId>,
    ) -> Option<Arc<Tag>> {
        let tags = self.model.tags_of(element);

        if let Some(direct) = tags.iter().find(|tag| &tag.tag_type == tag_type) {
            trace!(%element, %tag_type, "direct tag");
            return Some(Arc::clone(direct));
        }

        let candidates = self.candidates(&tags, tag_type, ignored, exhausted);

        // One hop: a candidate's type carries the requested tag itself.
        for candidate in &candidates {
            let meta = self.model.tags_of_type(candidate);
            if let Some(found) = meta.iter().find(|tag| &tag.tag_type == tag_type) {
                trace!(%element, %tag_type, via = %candidate, "meta-tag match");
                return Some(Arc::clone(found));
            }
        }

        if !candidates.is_empty() && self.model.scope_of(tag_type).is_meta_attachable() {
            let next = ignored.extended(&candidates);
            for candidate in &candidates {
                if exhausted.contains(candidate) {
                    continue;
                }
                let meta_element = Element::TagType(candidate.clone());
                match self.search(&meta_element, tag_type, &next, exhausted) {
                    Some(found) => {
                        trace!(%element, %tag_type, via = %candidate, "deep meta-tag match");
                        return Some(found);
                    }
                    None => {
                        exhausted.insert(candidate.clone());
                    }
                }
            }
        }

        self.via_forward_bridge(element, &tags, tag_type)
            .or_else(|| self.via_reverse_bridge(element, &tags, tag_type))
    }

    /// Attached tag types worth searching into, deduplicated, in attachment
    /// order. Native tag types are leaves and never searched.
    fn candidates(
        &self,
        tags: &[Arc<Tag>],
        tag_type: &TagTypeId,
        ignored: &IgnoreSet,
        exhausted: &HashSet<TagTypeId>,
    ) -> Vec<TagTypeId> {
        let mut candidates: Vec<TagTypeId> = Vec::with_capacity(tags.len());
        for tag in tags {
            let ty = &tag.tag_type;
            if ignored.contains(ty) || exhausted.contains(ty) || candidates.contains(ty) {
                continue;
            }
            if ty != tag_type && self.model.is_native(ty) {
                continue;
            }
            candidates.push(ty.clone());
        }
        candidates
    }

    fn via_forward_bridge(
        &self,
        element: &Element,
        tags: &[Arc<Tag>],
        tag_type: &TagTypeId,
    ) -> Option<Arc<Tag>> {
        let bridge = self.model.forward_bridge_of(tag_type)?;
        let carrier = tags.iter().find(|tag| tag.tag_type == bridge.carrier)?;
        let converted = self.convert(&bridge.conversion, carrier, tag_type)?;
        debug!(%element, %tag_type, carrier = %bridge.carrier, "resolved through forward bridge");
        Some(converted)
    }

    fn via_reverse_bridge(
        &self,
        element: &Element,
        tags: &[Arc<Tag>],
        tag_type: &TagTypeId,
    ) -> Option<Arc<Tag>> {
        tags.iter().find_map(|tag| {
            let bridge = self.model.reverse_bridge_of(&tag.tag_type)?;
            if &bridge.target != tag_type {
                return None;
            }
            let converted = self.convert(&bridge.conversion, tag, tag_type)?;
            debug!(%element, %tag_type, carrier = %tag.tag_type, "resolved through reverse bridge");
            Some(converted)
        })
    }

    fn convert(&self, conversion: &Conversion, source: &Tag, target: &TagTypeId) -> Option<Arc<Tag>> {
        let converted = match self.model.declaration(target) {
            Some(decl) => conversion.apply(source, target, &decl.defaults),
            None => conversion.apply(source, target, &Attrs::new()),
        }?;
        if &converted.tag_type != target {
            debug!(
                %target,
                produced = %converted.tag_type,
                "bridge conversion produced the wrong tag type, ignoring it"
            );
            return None;
        }
        Some(Arc::new(converted))
    }
}
