//! Program manifests: a TOML description of a host program structure.
//!
//! ## TOML Example
//!
//! ```toml
//! [[tag_types]]
//! id = "app.Listen"
//! scope = ["method", "tag_type"]
//! defaults = { value = "" }
//! tags = [{ type = "app.Beans" }]
//!
//! [[tag_types]]
//! id = "app.OnMessage"
//! scope = ["method"]
//! reverse = { target = "app.Listen" }
//!
//! [[types]]
//! name = "app.Widget"
//! supertypes = ["app.Base"]
//! tags = [{ type = "app.Beans", attrs = { single = true } }]
//!
//! [[types.methods]]
//! name = "create"
//! static = true
//! returns = "app.Widget"
//! tags = [{ type = "app.Constr" }]
//! ```
//!
//! Bridges declared in a manifest convert by attribute name.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{
    AttachmentScope, Attrs, Conversion, Element, MethodDecl, MethodRef, Tag, TagTypeDecl,
    TagTypeId, TypeDecl, TypeName,
};
use crate::program::{NativePredicate, ProgramModel};

/// Errors from loading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse manifest TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{element} references undeclared tag type {tag_type}")]
    UnknownTagType { element: String, tag_type: TagTypeId },

    #[error("{kind} {name} is declared more than once")]
    Duplicate { kind: &'static str, name: String },

    #[error("tag type {tag_type} has unknown scope {scope:?}")]
    UnknownScope { tag_type: TagTypeId, scope: String },
}

/// A whole program description.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub tag_types: Vec<TagTypeEntry>,

    #[serde(default)]
    pub types: Vec<TypeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagTypeEntry {
    pub id: TagTypeId,

    /// Scope keywords: `type`, `method`, `tag_type`.
    #[serde(default)]
    pub scope: Vec<String>,

    #[serde(default)]
    pub defaults: Attrs,

    #[serde(default)]
    pub forward: Option<ForwardEntry>,

    #[serde(default)]
    pub reverse: Option<ReverseEntry>,

    /// Meta-tags attached to this tag type.
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardEntry {
    pub carrier: TagTypeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseEntry {
    pub target: TagTypeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: TypeName,

    #[serde(default)]
    pub supertypes: Vec<TypeName>,

    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub methods: Vec<MethodEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodEntry {
    pub name: String,

    #[serde(default, rename = "static")]
    pub is_static: bool,

    /// Omitted for a method returning nothing.
    #[serde(default)]
    pub returns: Option<TypeName>,

    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Manifest {
    /// Load a manifest from a TOML file using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse a manifest from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(s)?;
        Ok(manifest)
    }

    /// Check that ids are unique, scopes are known, and every attached tag
    /// names a declared or native tag type.
    pub fn validate(&self, native: &NativePredicate) -> Result<(), ManifestError> {
        let mut declared = HashSet::new();
        for entry in &self.tag_types {
            if !declared.insert(&entry.id) {
                return Err(ManifestError::Duplicate {
                    kind: "tag type",
                    name: entry.id.to_string(),
                });
            }
            scope_of(entry)?;
        }

        let check = |element: &Element, tags: &[Tag]| -> Result<(), ManifestError> {
            match tags
                .iter()
                .find(|tag| !declared.contains(&tag.tag_type) && !native(&tag.tag_type))
            {
                Some(tag) => Err(ManifestError::UnknownTagType {
                    element: element.to_string(),
                    tag_type: tag.tag_type.clone(),
                }),
                None => Ok(()),
            }
        };

        for entry in &self.tag_types {
            check(&Element::TagType(entry.id.clone()), &entry.tags)?;
            let bridged = entry
                .forward
                .as_ref()
                .map(|f| &f.carrier)
                .into_iter()
                .chain(entry.reverse.as_ref().map(|r| &r.target));
            for id in bridged {
                if !declared.contains(id) && !native(id) {
                    return Err(ManifestError::UnknownTagType {
                        element: Element::TagType(entry.id.clone()).to_string(),
                        tag_type: id.clone(),
                    });
                }
            }
        }

        let mut types = HashSet::new();
        for ty in &self.types {
            if !types.insert(&ty.name) {
                return Err(ManifestError::Duplicate {
                    kind: "type",
                    name: ty.name.to_string(),
                });
            }
            check(&Element::Type(ty.name.clone()), &ty.tags)?;
            let mut methods = HashSet::new();
            for method in &ty.methods {
                let method_ref = MethodRef::new(ty.name.clone(), &method.name);
                if !methods.insert(&method.name) {
                    return Err(ManifestError::Duplicate {
                        kind: "method",
                        name: method_ref.to_string(),
                    });
                }
                check(&Element::Method(method_ref), &method.tags)?;
            }
        }

        Ok(())
    }

    /// Validate the manifest and build a [`ProgramModel`] from it.
    pub fn into_model(self, native: NativePredicate) -> Result<ProgramModel, ManifestError> {
        self.validate(&native)?;
        let model = ProgramModel::with_native(native);

        for entry in self.tag_types {
            let mut decl = TagTypeDecl::new(entry.id.clone(), scope_of(&entry)?);
            decl.defaults = entry.defaults;
            if let Some(forward) = entry.forward {
                decl = decl.with_forward(forward.carrier, Conversion::ByName);
            }
            if let Some(reverse) = entry.reverse {
                decl = decl.with_reverse(reverse.target, Conversion::ByName);
            }
            model.declare_tag_type(decl);
            for tag in entry.tags {
                model.attach(entry.id.clone(), tag);
            }
        }

        for entry in self.types {
            let mut decl = TypeDecl::new(entry.name.clone());
            decl.supertypes = entry.supertypes;
            for method in entry.methods {
                let method_ref = MethodRef::new(entry.name.clone(), &method.name);
                for tag in method.tags {
                    model.attach(method_ref.clone(), tag);
                }
                decl.methods.push(MethodDecl {
                    method: method_ref,
                    is_static: method.is_static,
                    returns: method.returns,
                });
            }
            model.declare_type(decl);
            for tag in entry.tags {
                model.attach(entry.name.clone(), tag);
            }
        }

        Ok(model)
    }
}

fn scope_of(entry: &TagTypeEntry) -> Result<AttachmentScope, ManifestError> {
    entry
        .scope
        .iter()
        .try_fold(AttachmentScope::empty(), |scope, keyword| {
            AttachmentScope::from_keyword(keyword)
                .map(|s| scope | s)
                .ok_or_else(|| ManifestError::UnknownScope {
                    tag_type: entry.id.clone(),
                    scope: keyword.clone(),
                })
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{AttrValue, TagModel};
    use crate::program::native_namespaces;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const PROGRAM: &str = r#"
        [[tag_types]]
        id = "app.Beans"
        scope = ["type", "tag_type"]
        defaults = { value = "", single = true }

        [[tag_types]]
        id = "app.Listen"
        scope = ["method", "tag_type"]
        tags = [{ type = "app.Beans", attrs = { single = false } }]

        [[tag_types]]
        id = "app.Constr"
        scope = ["method"]

        [[tag_types]]
        id = "app.Alias"
        scope = ["type"]
        reverse = { target = "app.Beans" }

        [[types]]
        name = "app.Base"

        [[types]]
        name = "app.Widget"
        supertypes = ["app.Base"]
        tags = [{ type = "app.Alias", attrs = { value = "widget" } }, { type = "lang.Documented" }]

        [[types.methods]]
        name = "create"
        static = true
        returns = "app.Widget"
        tags = [{ type = "app.Constr" }]

        [[types.methods]]
        name = "reset"
    "#;

    fn no_native() -> NativePredicate {
        Arc::new(|_: &TagTypeId| false)
    }

    #[test]
    fn test_parse_and_build_model() {
        let model = Manifest::parse(PROGRAM)
            .unwrap()
            .into_model(native_namespaces(["lang"]))
            .unwrap();

        let widget = TypeName::new("app.Widget");
        let tags = model.tags_of(&Element::Type(widget.clone()));
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].attr("value"), Some(&AttrValue::from("widget")));

        let methods = model.methods_of(&widget);
        assert_eq!(methods.len(), 2);
        assert!(methods[0].is_static);
        assert_eq!(methods[0].returns, Some(widget.clone()));
        assert!(!methods[1].is_static);
        assert_eq!(methods[1].returns, None);

        assert!(model.is_subtype(&widget, &TypeName::new("app.Base")));
        assert_eq!(
            model
                .reverse_bridge_of(&TagTypeId::new("app.Alias"))
                .unwrap()
                .target,
            TagTypeId::new("app.Beans")
        );
        assert_eq!(model.tags_of_type(&TagTypeId::new("app.Listen")).len(), 1);
        assert!(
            model
                .scope_of(&TagTypeId::new("app.Listen"))
                .contains(AttachmentScope::METHOD | AttachmentScope::TAG_TYPE)
        );
    }

    #[test]
    fn test_undeclared_tag_type_rejected() {
        let err = Manifest::parse(PROGRAM)
            .unwrap()
            .into_model(no_native())
            .unwrap_err();
        assert!(
            matches!(&err, ManifestError::UnknownTagType { tag_type, .. } if tag_type.as_str() == "lang.Documented"),
            "{err}"
        );
    }

    #[test]
    fn test_undeclared_bridge_target_rejected() {
        let toml = r#"
            [[tag_types]]
            id = "app.Alias"
            forward = { carrier = "app.Nowhere" }
        "#;
        let err = Manifest::parse(toml).unwrap().validate(&no_native()).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownTagType { .. }));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let toml = r#"
            [[types]]
            name = "app.Widget"

            [[types]]
            name = "app.Widget"
        "#;
        let err = Manifest::parse(toml).unwrap().validate(&no_native()).unwrap_err();
        assert_eq!(err.to_string(), "type app.Widget is declared more than once");
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let toml = r#"
            [[types]]
            name = "app.Widget"

            [[types.methods]]
            name = "make"

            [[types.methods]]
            name = "make"
        "#;
        let err = Manifest::parse(toml).unwrap().validate(&no_native()).unwrap_err();
        assert!(err.to_string().contains("app.Widget::make"));
    }

    #[test]
    fn test_unknown_scope_rejected() {
        let toml = r#"
            [[tag_types]]
            id = "app.Beans"
            scope = ["field"]
        "#;
        let err = Manifest::parse(toml).unwrap().validate(&no_native()).unwrap_err();
        assert!(matches!(err, ManifestError::UnknownScope { .. }));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("program.toml");
        tokio::fs::write(&path, PROGRAM).await.unwrap();

        let manifest = Manifest::load(&path).await.unwrap();
        assert_eq!(manifest.tag_types.len(), 4);
        assert_eq!(manifest.types.len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = Manifest::load(Path::new("/nonexistent/program.toml")).await;
        assert!(matches!(result, Err(ManifestError::Io(_))));
    }
}
