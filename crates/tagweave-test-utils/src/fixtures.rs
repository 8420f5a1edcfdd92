//! Sample tag graphs for resolver and engine tests.
//!
//! Every fixture returns a fresh [`ProgramModel`], so tests never share
//! state. Identifiers live in the `app` namespace; `lang` is native.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tagweave_core::{
    AttachmentScope, Element, MethodDecl, MethodRef, ProgramModel, Tag, TagModel, TagTypeDecl,
    TagTypeId, TypeDecl, TypeName, native_namespaces,
};

pub const WIDGET: &str = "app.Widget";
pub const GADGET: &str = "app.Gadget";
pub const BEANS: &str = "app.Beans";
pub const LISTEN: &str = "app.Listen";
pub const LISTEN_ALIAS: &str = "app.ListenAlias";
pub const ON_PRIVATE: &str = "app.OnPrivateMsg";
pub const FACTORY: &str = "tagweave.Factory";

/// Scope of a tag type that may be used as a meta-tag.
pub fn meta_scope() -> AttachmentScope {
    AttachmentScope::TYPE | AttachmentScope::TAG_TYPE
}

/// A program whose `lang` namespace is native.
pub fn empty_model() -> ProgramModel {
    ProgramModel::with_native(native_namespaces(["lang"]))
}

pub fn widget() -> Element {
    Element::Type(TypeName::new(WIDGET))
}

pub fn tag_type(id: &str) -> TagTypeId {
    TagTypeId::new(id)
}

/// `app.A` and `app.B` meta-tag each other; `app.B` also carries `app.C`,
/// which carries `app.Target`. `app.Widget` is tagged with `app.A` only.
///
/// `app.Target` is reachable from the widget three levels deep, behind the
/// cycle. `app.Unreachable` is declared but attached nowhere.
pub fn cyclic_model() -> ProgramModel {
    let model = empty_model();
    for id in ["app.A", "app.B", "app.C", "app.Target", "app.Unreachable"] {
        model.declare_tag_type(TagTypeDecl::new(id, meta_scope()));
    }
    model.attach(tag_type("app.A"), Tag::new("app.B"));
    model.attach(tag_type("app.B"), Tag::new("app.A"));
    model.attach(tag_type("app.B"), Tag::new("app.C"));
    model.attach(tag_type("app.C"), Tag::new("app.Target").with_attr("depth", 3i64));
    model.attach(widget(), Tag::new("app.A"));
    model
}

/// `app.Widget` carries `app.X` then `app.Y`; both tag types carry
/// `app.Beans`, with `value` naming which one.
pub fn ordered_meta_model() -> ProgramModel {
    let model = empty_model();
    model.declare_tag_type(TagTypeDecl::new(BEANS, meta_scope()));
    for id in ["app.X", "app.Y"] {
        model.declare_tag_type(TagTypeDecl::new(id, meta_scope()));
        model.attach(tag_type(id), Tag::new(BEANS).with_attr("value", id));
    }
    model.attach(widget(), Tag::new("app.X"));
    model.attach(widget(), Tag::new("app.Y"));
    model
}

/// `app.Listen` declares a forward bridge from `app.ListenAlias`;
/// `app.OnPrivateMsg` declares a reverse bridge into `app.Listen`.
/// Nothing is attached to any element yet.
pub fn bridge_model() -> ProgramModel {
    let model = empty_model();
    model.declare_tag_type(
        TagTypeDecl::new(LISTEN, AttachmentScope::METHOD | AttachmentScope::TAG_TYPE)
            .with_default("value", "")
            .with_default("priority", 0i64)
            .with_forward(LISTEN_ALIAS, Default::default()),
    );
    model.declare_tag_type(TagTypeDecl::new(LISTEN_ALIAS, AttachmentScope::METHOD));
    model.declare_tag_type(
        TagTypeDecl::new(ON_PRIVATE, AttachmentScope::METHOD)
            .with_reverse(LISTEN, Default::default()),
    );
    model
}

/// Ways the `app.Widget` factory method can be declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryShape {
    /// Instance method returning `app.Widget`.
    NotStatic,
    /// Static method returning nothing.
    Void,
    /// Static method returning the unrelated `app.Gadget`.
    Unrelated,
    /// Static method returning `app.Widget`.
    Valid,
    /// Static method returning `app.FancyWidget`, a subtype of `app.Widget`.
    Subtype,
}

/// `app.Widget` with a `make` method tagged with the factory marker, shaped
/// as requested, next to an untagged `helper` method.
pub fn factory_model(shape: FactoryShape) -> ProgramModel {
    let model = empty_model();
    model.declare_tag_type(TagTypeDecl::new(FACTORY, AttachmentScope::METHOD));
    model.declare_type(TypeDecl::new(GADGET));
    model.declare_type(TypeDecl::new("app.FancyWidget").with_supertype(WIDGET));

    let (is_static, returns) = match shape {
        FactoryShape::NotStatic => (false, Some(WIDGET)),
        FactoryShape::Void => (true, None),
        FactoryShape::Unrelated => (true, Some(GADGET)),
        FactoryShape::Valid => (true, Some(WIDGET)),
        FactoryShape::Subtype => (true, Some("app.FancyWidget")),
    };
    model.declare_type(
        TypeDecl::new(WIDGET)
            .with_method("helper", true, Some(WIDGET))
            .with_method("make", is_static, returns),
    );
    model.attach(MethodRef::new(WIDGET, "make"), Tag::new(FACTORY));
    model
}

/// Wraps a model and counts how often each element's tags are read.
pub struct RecordingModel<M> {
    inner: M,
    reads: Mutex<HashMap<Element, usize>>,
}

impl<M: TagModel> RecordingModel<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            reads: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    /// How many times the tags of `element` were read.
    pub fn reads(&self, element: &Element) -> usize {
        self.reads.lock().get(element).copied().unwrap_or(0)
    }

    /// The highest read count of any element.
    pub fn max_reads(&self) -> usize {
        self.reads.lock().values().copied().max().unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.reads.lock().values().sum()
    }

    pub fn reset(&self) {
        self.reads.lock().clear();
    }
}

impl<M: TagModel> TagModel for RecordingModel<M> {
    fn tags_of(&self, element: &Element) -> Vec<Arc<Tag>> {
        *self.reads.lock().entry(element.clone()).or_default() += 1;
        self.inner.tags_of(element)
    }

    fn declaration(&self, tag_type: &TagTypeId) -> Option<Arc<TagTypeDecl>> {
        self.inner.declaration(tag_type)
    }

    fn is_native(&self, tag_type: &TagTypeId) -> bool {
        self.inner.is_native(tag_type)
    }

    fn methods_of(&self, ty: &TypeName) -> Vec<MethodDecl> {
        self.inner.methods_of(ty)
    }

    fn is_subtype(&self, sub: &TypeName, sup: &TypeName) -> bool {
        self.inner.is_subtype(sub, sup)
    }
}
