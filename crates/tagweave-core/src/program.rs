//! In-memory program structure implementing [`TagModel`].
//!
//! [`ProgramModel`] is what hosts populate at load time (from a manifest, or
//! programmatically). It is internally synchronized so declarations can be
//! added while resolvers are reading it, e.g. during a hot reload.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::{
    Element, MethodDecl, Tag, TagModel, TagTypeDecl, TagTypeId, TypeDecl, TypeName,
};

/// Predicate deciding whether a tag type is a host built-in.
pub type NativePredicate = Arc<dyn Fn(&TagTypeId) -> bool + Send + Sync>;

/// Build a [`NativePredicate`] matching tag types whose namespace is one of
/// `namespaces`, or nested below one of them.
pub fn native_namespaces<I, S>(namespaces: I) -> NativePredicate
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let namespaces: Vec<String> = namespaces.into_iter().map(Into::into).collect();
    Arc::new(move |id: &TagTypeId| {
        let ns = id.namespace();
        namespaces.iter().any(|native| {
            ns == native
                || ns
                    .strip_prefix(native.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    })
}

#[derive(Default)]
struct ProgramIndex {
    tags: HashMap<Element, Vec<Arc<Tag>>>,
    tag_types: HashMap<TagTypeId, Arc<TagTypeDecl>>,
    types: HashMap<TypeName, TypeDecl>,
    /// Declaration order of types.
    type_order: Vec<TypeName>,
}

/// A mutable, thread-safe program structure.
pub struct ProgramModel {
    index: RwLock<ProgramIndex>,
    native: NativePredicate,
}

impl ProgramModel {
    /// An empty program with no built-in tag types.
    pub fn new() -> Self {
        Self::with_native(Arc::new(|_: &TagTypeId| false))
    }

    /// An empty program using `native` to recognise built-in tag types.
    pub fn with_native(native: NativePredicate) -> Self {
        Self {
            index: RwLock::new(ProgramIndex::default()),
            native,
        }
    }

    /// Declare (or redeclare) a tag type.
    pub fn declare_tag_type(&self, decl: TagTypeDecl) {
        let mut index = self.index.write();
        index.tag_types.insert(decl.id.clone(), Arc::new(decl));
    }

    /// Declare (or redeclare) a host type and its methods.
    pub fn declare_type(&self, decl: TypeDecl) {
        let mut index = self.index.write();
        if !index.types.contains_key(&decl.name) {
            index.type_order.push(decl.name.clone());
        }
        index.types.insert(decl.name.clone(), decl);
    }

    /// Attach a tag to an element, after any tags already attached.
    pub fn attach(&self, element: impl Into<Element>, tag: Tag) {
        let element = element.into();
        let mut index = self.index.write();
        index.tags.entry(element).or_default().push(Arc::new(tag));
    }

    /// Remove every tag attached to an element.
    pub fn detach_all(&self, element: &Element) {
        self.index.write().tags.remove(element);
    }

    /// Whether a tag type has been declared.
    pub fn has_tag_type(&self, id: &TagTypeId) -> bool {
        self.index.read().tag_types.contains_key(id)
    }

    /// Declared types, in declaration order.
    pub fn type_names(&self) -> Vec<TypeName> {
        self.index.read().type_order.clone()
    }
}

impl Default for ProgramModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProgramModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index = self.index.read();
        f.debug_struct("ProgramModel")
            .field("tag_types", &index.tag_types.len())
            .field("types", &index.types.len())
            .field("tagged_elements", &index.tags.len())
            .finish()
    }
}

impl TagModel for ProgramModel {
    fn tags_of(&self, element: &Element) -> Vec<Arc<Tag>> {
        self.index
            .read()
            .tags
            .get(element)
            .cloned()
            .unwrap_or_default()
    }

    fn declaration(&self, tag_type: &TagTypeId) -> Option<Arc<TagTypeDecl>> {
        self.index.read().tag_types.get(tag_type).cloned()
    }

    fn is_native(&self, tag_type: &TagTypeId) -> bool {
        (self.native)(tag_type)
    }

    fn methods_of(&self, ty: &TypeName) -> Vec<MethodDecl> {
        self.index
            .read()
            .types
            .get(ty)
            .map(|decl| decl.methods.clone())
            .unwrap_or_default()
    }

    fn is_subtype(&self, sub: &TypeName, sup: &TypeName) -> bool {
        if sub == sup {
            return true;
        }
        let index = self.index.read();
        let mut seen = HashSet::new();
        let mut stack = vec![sub];
        while let Some(ty) = stack.pop() {
            if !seen.insert(ty) {
                continue;
            }
            let Some(decl) = index.types.get(ty) else {
                continue;
            };
            for parent in &decl.supertypes {
                if parent == sup {
                    return true;
                }
                stack.push(parent);
            }
        }
        false
    }
}
