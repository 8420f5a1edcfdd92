//! Configuration violations found while inspecting scanned types.

use std::fmt;

use crate::model::{MethodRef, TagTypeId, TypeName};

/// Prefix shared by the catalog keys of every [`MessageKey`].
pub const MESSAGE_KEY_PREFIX: &str = "exception.annotation";

/// Localizable message identifiers for [`FactoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    NotStatic,
    NeedReturn,
    ReturnTypeWrong,
}

impl MessageKey {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKey::NotStatic => "notStatic",
            MessageKey::NeedReturn => "needReturn",
            MessageKey::ReturnTypeWrong => "returnTypeWrong",
        }
    }

    /// The full key used to look the template up in a message catalog.
    pub fn catalog_key(self) -> String {
        format!("{MESSAGE_KEY_PREFIX}.{}", self.as_str())
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A factory method marker sits on a method that cannot be a factory.
///
/// Each variant is fatal for the scan of `ty`. `message` is the localized
/// description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error("{message} ({method}, marker {marker})")]
    NotStaticFactory {
        ty: TypeName,
        method: MethodRef,
        marker: TagTypeId,
        message: String,
    },

    #[error("{message} ({method}, marker {marker})")]
    FactoryMissingReturn {
        ty: TypeName,
        method: MethodRef,
        marker: TagTypeId,
        message: String,
    },

    #[error("{message} ({method}, marker {marker})")]
    FactoryReturnTypeMismatch {
        ty: TypeName,
        method: MethodRef,
        marker: TagTypeId,
        returns: TypeName,
        message: String,
    },
}

impl FactoryError {
    pub fn key(&self) -> MessageKey {
        match self {
            FactoryError::NotStaticFactory { .. } => MessageKey::NotStatic,
            FactoryError::FactoryMissingReturn { .. } => MessageKey::NeedReturn,
            FactoryError::FactoryReturnTypeMismatch { .. } => MessageKey::ReturnTypeWrong,
        }
    }

    /// The scanned type the violation was found on.
    pub fn type_name(&self) -> &TypeName {
        match self {
            FactoryError::NotStaticFactory { ty, .. }
            | FactoryError::FactoryMissingReturn { ty, .. }
            | FactoryError::FactoryReturnTypeMismatch { ty, .. } => ty,
        }
    }

    pub fn method(&self) -> &MethodRef {
        match self {
            FactoryError::NotStaticFactory { method, .. }
            | FactoryError::FactoryMissingReturn { method, .. }
            | FactoryError::FactoryReturnTypeMismatch { method, .. } => method,
        }
    }

    pub fn marker(&self) -> &TagTypeId {
        match self {
            FactoryError::NotStaticFactory { marker, .. }
            | FactoryError::FactoryMissingReturn { marker, .. }
            | FactoryError::FactoryReturnTypeMismatch { marker, .. } => marker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_keys() {
        assert_eq!(MessageKey::NotStatic.catalog_key(), "exception.annotation.notStatic");
        assert_eq!(MessageKey::NeedReturn.catalog_key(), "exception.annotation.needReturn");
        assert_eq!(
            MessageKey::ReturnTypeWrong.catalog_key(),
            "exception.annotation.returnTypeWrong"
        );
    }

    #[test]
    fn test_error_display_names_method_and_marker() {
        let err = FactoryError::FactoryMissingReturn {
            ty: TypeName::new("app.Widget"),
            method: MethodRef::new("app.Widget", "make"),
            marker: TagTypeId::new("app.Constr"),
            message: "needs a return type".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "needs a return type (app.Widget::make, marker app.Constr)"
        );
        assert_eq!(err.key(), MessageKey::NeedReturn);
        assert_eq!(err.type_name().as_str(), "app.Widget");
    }
}
