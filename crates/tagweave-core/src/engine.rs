//! The engine facade consumed by containers.
//!
//! [`MetadataEngine`] bundles a [`Resolver`] with the configured marker tag
//! types and message catalog. It is an owned value: a container creates one
//! per lifetime and calls [`clear_cache`](MetadataEngine::clear_cache)
//! between independent scan passes.

use std::sync::Arc;

use tracing::debug;

use tagweave_config::{EngineConfig, MessageCatalog};

use crate::cache::ResolutionCache;
use crate::error::FactoryError;
use crate::factory::FactorySelector;
use crate::model::{Element, MethodDecl, Tag, TagModel, TagTypeId, TypeName};
use crate::program::{NativePredicate, native_namespaces};
use crate::resolver::Resolver;

/// Marker tag types with engine-level meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub factory: TagTypeId,
    pub beans: TagTypeId,
    pub listen: TagTypeId,
}

impl Markers {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            factory: TagTypeId::new(&config.markers.factory),
            beans: TagTypeId::new(&config.markers.beans),
            listen: TagTypeId::new(&config.markers.listen),
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// The native tag predicate described by `config.model`.
pub fn native_predicate(config: &EngineConfig) -> NativePredicate {
    native_namespaces(config.model.native_namespaces.iter().cloned())
}

/// Resolution, factory selection, and bean-marker lookup over one model.
pub struct MetadataEngine<M> {
    resolver: Resolver<M>,
    markers: Markers,
    messages: MessageCatalog,
}

impl<M: TagModel> MetadataEngine<M> {
    /// Build an engine with default markers and English messages.
    pub fn new(model: M) -> Self {
        Self {
            resolver: Resolver::new(model),
            markers: Markers::default(),
            messages: MessageCatalog::default(),
        }
    }

    /// Build an engine configured by `config`.
    pub fn from_config(model: M, config: &EngineConfig) -> Self {
        let cache = ResolutionCache::with_capacity(config.cache.initial_capacity);
        Self {
            resolver: Resolver::with_cache(model, cache),
            markers: Markers::from_config(config),
            messages: config.message_catalog(),
        }
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }

    pub fn resolver(&self) -> &Resolver<M> {
        &self.resolver
    }

    pub fn model(&self) -> &M {
        self.resolver.model()
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn messages(&self) -> &MessageCatalog {
        &self.messages
    }

    /// The tag of type `tag_type` that applies to `element`, if any.
    pub fn resolve(&self, element: &Element, tag_type: &TagTypeId) -> Option<Arc<Tag>> {
        self.resolver.resolve(element, tag_type)
    }

    /// The factory method of `ty`, validated against the factory marker.
    pub fn find_factory_method(&self, ty: &TypeName) -> Result<Option<MethodDecl>, FactoryError> {
        FactorySelector::new(&self.resolver, &self.markers.factory, &self.messages).find(ty)
    }

    /// The beans marker for `ty`.
    ///
    /// Taken from the type itself when it resolves there. Otherwise the first
    /// method carrying the listen marker decides: the beans marker attached
    /// to that listen tag's own type is returned.
    pub fn find_bean_marker(&self, ty: &TypeName) -> Option<Arc<Tag>> {
        let beans = &self.markers.beans;
        if let Some(tag) = self.resolve(&Element::Type(ty.clone()), beans) {
            return Some(tag);
        }

        let model = self.resolver.model();
        for method in model.methods_of(ty) {
            let element = Element::Method(method.method.clone());
            let Some(listen) = self.resolve(&element, &self.markers.listen) else {
                continue;
            };
            debug!(%ty, method = %method.method, "beans marker taken from listener");
            return model
                .tags_of_type(&listen.tag_type)
                .into_iter()
                .find(|tag| &tag.tag_type == beans);
        }
        None
    }

    /// Forget every memoized resolution.
    pub fn clear_cache(&self) {
        self.resolver.clear_cache();
    }
}
