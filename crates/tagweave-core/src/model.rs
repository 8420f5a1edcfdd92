//! Tag model: elements, tags, tag type declarations, and the [`TagModel`]
//! seam through which the host program structure is read.
//!
//! Nothing here searches. The resolver only ever sees the program through
//! [`TagModel`], so any host (reflection data, a parsed manifest, a test
//! fixture) can plug in by implementing it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Identifies a family of metadata, e.g. `app.Listen`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagTypeId(Arc<str>);

impl TagTypeId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last `.`, or the empty string for a bare name.
    pub fn namespace(&self) -> &str {
        self.0.rsplit_once('.').map(|(ns, _)| ns).unwrap_or("")
    }
}

impl fmt::Display for TagTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagTypeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Name of a host type, e.g. `app.Widget`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(Arc<str>);

impl TypeName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A method declared on a host type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    pub owner: TypeName,
    pub name: Arc<str>,
}

impl MethodRef {
    pub fn new(owner: impl Into<TypeName>, name: impl AsRef<str>) -> Self {
        Self {
            owner: owner.into(),
            name: Arc::from(name.as_ref()),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.name)
    }
}

/// A declaration site that can carry tags.
///
/// Tag types are elements too: tags attached to them are meta-tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    Type(TypeName),
    Method(MethodRef),
    TagType(TagTypeId),
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Type(ty) => write!(f, "{ty}"),
            Element::Method(method) => write!(f, "{method}"),
            Element::TagType(id) => write!(f, "@{id}"),
        }
    }
}

/// Error returned when an element string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid element {0:?}: expected `Type`, `Type::method` or `@TagType`")]
pub struct ParseElementError(String);

impl FromStr for Element {
    type Err = ParseElementError;

    /// Parses the [`Display`](fmt::Display) form back into an element.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParseElementError(s.to_string());
        if let Some(id) = s.strip_prefix('@') {
            if id.is_empty() {
                return Err(invalid());
            }
            return Ok(Element::TagType(TagTypeId::new(id)));
        }
        match s.split_once("::") {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Ok(Element::Method(MethodRef::new(owner, name)))
            }
            Some(_) => Err(invalid()),
            None if s.is_empty() => Err(invalid()),
            None => Ok(Element::Type(TypeName::new(s))),
        }
    }
}

impl From<TypeName> for Element {
    fn from(ty: TypeName) -> Self {
        Element::Type(ty)
    }
}

impl From<MethodRef> for Element {
    fn from(method: MethodRef) -> Self {
        Element::Method(method)
    }
}

impl From<TagTypeId> for Element {
    fn from(id: TagTypeId) -> Self {
        Element::TagType(id)
    }
}

/// A single attribute value carried by a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<AttrValue>),
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

/// Named attributes, ordered by name.
pub type Attrs = BTreeMap<String, AttrValue>;

/// An instance of a tag type attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "type")]
    pub tag_type: TagTypeId,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Tag {
    pub fn new(tag_type: impl Into<TagTypeId>) -> Self {
        Self {
            tag_type: tag_type.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }
}

bitflags! {
    /// Kinds of declaration site a tag type may be attached to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttachmentScope: u8 {
        const TYPE = 1;
        const METHOD = 1 << 1;
        const TAG_TYPE = 1 << 2;
    }
}

impl AttachmentScope {
    /// Whether tags of this type can sit on other tag types, which gates the
    /// deep meta-tag search. Tag types are host types, so `TYPE` counts.
    pub fn is_meta_attachable(self) -> bool {
        self.intersects(AttachmentScope::TYPE | AttachmentScope::TAG_TYPE)
    }

    /// Parse a scope keyword (`type`, `method`, `tag_type`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "type" => Some(AttachmentScope::TYPE),
            "method" => Some(AttachmentScope::METHOD),
            "tag_type" => Some(AttachmentScope::TAG_TYPE),
            _ => None,
        }
    }
}

type ConvertFn = dyn Fn(&Tag, &TagTypeId, &Attrs) -> Option<Tag> + Send + Sync;

/// How a tag of one type is turned into a tag of a bridged type.
#[derive(Clone, Default)]
pub enum Conversion {
    /// Copy same-named attributes. When the target declares defaults, only
    /// the declared names are kept, falling back to the default value.
    #[default]
    ByName,
    /// Host-supplied conversion.
    With(Arc<ConvertFn>),
}

impl Conversion {
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(&Tag, &TagTypeId, &Attrs) -> Option<Tag> + Send + Sync + 'static,
    {
        Conversion::With(Arc::new(f))
    }

    /// Convert `source` into a tag of type `target`, given the target's
    /// declared attribute defaults.
    pub fn apply(&self, source: &Tag, target: &TagTypeId, defaults: &Attrs) -> Option<Tag> {
        match self {
            Conversion::ByName => {
                let attrs = if defaults.is_empty() {
                    source.attrs.clone()
                } else {
                    defaults
                        .iter()
                        .map(|(name, default)| {
                            let value = source.attrs.get(name).unwrap_or(default);
                            (name.clone(), value.clone())
                        })
                        .collect()
                };
                Some(Tag {
                    tag_type: target.clone(),
                    attrs,
                })
            }
            Conversion::With(f) => f(source, target, defaults),
        }
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conversion::ByName => f.write_str("ByName"),
            Conversion::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// Declared on a tag type `T`: resolve `T` from a `carrier` tag on the same
/// element.
#[derive(Debug, Clone)]
pub struct ForwardBridge {
    pub carrier: TagTypeId,
    pub conversion: Conversion,
}

/// Declared on a carrier tag type: its tags can stand in for `target`.
#[derive(Debug, Clone)]
pub struct ReverseBridge {
    pub target: TagTypeId,
    pub conversion: Conversion,
}

/// Everything the host declares about a tag type besides its meta-tags.
#[derive(Debug, Clone)]
pub struct TagTypeDecl {
    pub id: TagTypeId,
    pub scope: AttachmentScope,
    pub defaults: Attrs,
    pub forward: Option<ForwardBridge>,
    pub reverse: Option<ReverseBridge>,
}

impl TagTypeDecl {
    pub fn new(id: impl Into<TagTypeId>, scope: AttachmentScope) -> Self {
        Self {
            id: id.into(),
            scope,
            defaults: Attrs::new(),
            forward: None,
            reverse: None,
        }
    }

    pub fn with_default(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.defaults.insert(name.to_string(), value.into());
        self
    }

    pub fn with_forward(mut self, carrier: impl Into<TagTypeId>, conversion: Conversion) -> Self {
        self.forward = Some(ForwardBridge {
            carrier: carrier.into(),
            conversion,
        });
        self
    }

    pub fn with_reverse(mut self, target: impl Into<TagTypeId>, conversion: Conversion) -> Self {
        self.reverse = Some(ReverseBridge {
            target: target.into(),
            conversion,
        });
        self
    }
}

/// A method as seen by the factory selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub method: MethodRef,
    pub is_static: bool,
    /// `None` for a method that returns nothing.
    pub returns: Option<TypeName>,
}

/// A host type and the methods declared directly on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: TypeName,
    pub supertypes: Vec<TypeName>,
    pub methods: Vec<MethodDecl>,
}

impl TypeDecl {
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_supertype(mut self, supertype: impl Into<TypeName>) -> Self {
        self.supertypes.push(supertype.into());
        self
    }

    /// Declare a method. `returns` of `None` means the method returns nothing.
    pub fn with_method(mut self, name: &str, is_static: bool, returns: Option<&str>) -> Self {
        self.methods.push(MethodDecl {
            method: MethodRef::new(self.name.clone(), name),
            is_static,
            returns: returns.map(TypeName::new),
        });
        self
    }
}

/// Read-only view of the host program structure.
///
/// Sequences are returned in attachment (or declaration) order; callers rely
/// on that order for first-match-wins tie-breaking.
pub trait TagModel: Send + Sync {
    /// Tags attached to an element, in attachment order.
    fn tags_of(&self, element: &Element) -> Vec<Arc<Tag>>;

    /// The declaration of a tag type, if the host knows it.
    fn declaration(&self, tag_type: &TagTypeId) -> Option<Arc<TagTypeDecl>>;

    /// Whether a tag type belongs to the host's built-in namespace.
    fn is_native(&self, tag_type: &TagTypeId) -> bool;

    /// Methods declared directly on a type, in declaration order.
    fn methods_of(&self, ty: &TypeName) -> Vec<MethodDecl>;

    /// Whether `sub` is `sup` or one of its subtypes.
    fn is_subtype(&self, sub: &TypeName, sup: &TypeName) -> bool;

    /// Meta-tags attached to a tag type.
    fn tags_of_type(&self, tag_type: &TagTypeId) -> Vec<Arc<Tag>> {
        self.tags_of(&Element::TagType(tag_type.clone()))
    }

    fn scope_of(&self, tag_type: &TagTypeId) -> AttachmentScope {
        self.declaration(tag_type)
            .map(|decl| decl.scope)
            .unwrap_or_default()
    }

    fn forward_bridge_of(&self, tag_type: &TagTypeId) -> Option<ForwardBridge> {
        self.declaration(tag_type)
            .and_then(|decl| decl.forward.clone())
    }

    fn reverse_bridge_of(&self, tag_type: &TagTypeId) -> Option<ReverseBridge> {
        self.declaration(tag_type)
            .and_then(|decl| decl.reverse.clone())
    }
}

impl<M: TagModel + ?Sized> TagModel for Arc<M> {
    fn tags_of(&self, element: &Element) -> Vec<Arc<Tag>> {
        (**self).tags_of(element)
    }

    fn declaration(&self, tag_type: &TagTypeId) -> Option<Arc<TagTypeDecl>> {
        (**self).declaration(tag_type)
    }

    fn is_native(&self, tag_type: &TagTypeId) -> bool {
        (**self).is_native(tag_type)
    }

    fn methods_of(&self, ty: &TypeName) -> Vec<MethodDecl> {
        (**self).methods_of(ty)
    }

    fn is_subtype(&self, sub: &TypeName, sup: &TypeName) -> bool {
        (**self).is_subtype(sub, sup)
    }
}
