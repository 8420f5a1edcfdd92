#![deny(unsafe_code)]

//! tagweave core: declarative metadata resolution.
//!
//! Given a program element (a type, a method, or a tag type) and a wanted
//! tag type, the [`Resolver`] finds the tag instance that applies to the
//! element: attached directly, reachable through meta-tags, or bridged from
//! a related tag family. Positive results are memoized in a concurrent
//! [`ResolutionCache`]. The [`MetadataEngine`] layers factory-method
//! selection and bean-marker lookup on top for dependency-injection hosts.

/// Concurrent memo of positive resolutions.
pub mod cache;
/// Engine facade combining resolver, markers, and messages.
pub mod engine;
/// Factory configuration violations.
pub mod error;
/// Factory method selection.
pub mod factory;
/// TOML program manifests.
pub mod manifest;
/// Elements, tags, tag type declarations, and the `TagModel` seam.
pub mod model;
/// In-memory program structure.
pub mod program;
/// The resolution algorithm.
pub mod resolver;

pub use cache::ResolutionCache;
pub use engine::{Markers, MetadataEngine};
pub use error::{FactoryError, MessageKey};
pub use factory::FactorySelector;
pub use manifest::{Manifest, ManifestError};
pub use model::{
    AttachmentScope, AttrValue, Attrs, Conversion, Element, ForwardBridge, MethodDecl, MethodRef,
    ReverseBridge, Tag, TagModel, TagTypeDecl, TagTypeId, TypeDecl, TypeName,
};
pub use program::{NativePredicate, ProgramModel, native_namespaces};
pub use resolver::{IgnoreSet, Resolver};
