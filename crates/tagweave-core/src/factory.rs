//! Factory method selection.
//!
//! A type may designate a static factory by tagging one of its methods with
//! a marker tag type (resolved like any other tag, so meta-tagged and bridged
//! markers count). Marked methods are validated in declaration order: the
//! first violation aborts, and the first valid method is selected without
//! looking at the methods after it.

use tracing::{debug, warn};

use tagweave_config::MessageCatalog;

use crate::error::{FactoryError, MessageKey};
use crate::model::{Element, MethodDecl, TagModel, TagTypeId, TypeName};
use crate::resolver::Resolver;

/// Finds the designated factory method of a type.
pub struct FactorySelector<'a, M> {
    resolver: &'a Resolver<M>,
    marker: &'a TagTypeId,
    messages: &'a MessageCatalog,
}

impl<'a, M: TagModel> FactorySelector<'a, M> {
    pub fn new(resolver: &'a Resolver<M>, marker: &'a TagTypeId, messages: &'a MessageCatalog) -> Self {
        Self {
            resolver,
            marker,
            messages,
        }
    }

    /// The factory method of `ty`, or `None` when no method is marked.
    pub fn find(&self, ty: &TypeName) -> Result<Option<MethodDecl>, FactoryError> {
        for method in self.resolver.model().methods_of(ty) {
            let element = Element::Method(method.method.clone());
            if self.resolver.resolve(&element, self.marker).is_none() {
                continue;
            }
            self.validate(ty, &method)?;
            debug!(%ty, method = %method.method, "factory method selected");
            return Ok(Some(method));
        }
        Ok(None)
    }

    fn validate(&self, ty: &TypeName, method: &MethodDecl) -> Result<(), FactoryError> {
        if !method.is_static {
            let message = self.message(MessageKey::NotStatic, ty, method, None);
            warn!(%ty, method = %method.method, "{message}");
            return Err(FactoryError::NotStaticFactory {
                ty: ty.clone(),
                method: method.method.clone(),
                marker: self.marker.clone(),
                message,
            });
        }

        let Some(returns) = &method.returns else {
            let message = self.message(MessageKey::NeedReturn, ty, method, None);
            warn!(%ty, method = %method.method, "{message}");
            return Err(FactoryError::FactoryMissingReturn {
                ty: ty.clone(),
                method: method.method.clone(),
                marker: self.marker.clone(),
                message,
            });
        };

        if !self.resolver.model().is_subtype(returns, ty) {
            let message = self.message(MessageKey::ReturnTypeWrong, ty, method, Some(returns));
            warn!(%ty, method = %method.method, "{message}");
            return Err(FactoryError::FactoryReturnTypeMismatch {
                ty: ty.clone(),
                method: method.method.clone(),
                marker: self.marker.clone(),
                returns: returns.clone(),
                message,
            });
        }

        Ok(())
    }

    fn message(
        &self,
        key: MessageKey,
        ty: &TypeName,
        method: &MethodDecl,
        returns: Option<&TypeName>,
    ) -> String {
        let method_name = method.method.name.to_string();
        let marker = self.marker.to_string();
        let returns = returns.map(ToString::to_string).unwrap_or_default();
        self.messages.format(
            &key.catalog_key(),
            &[
                ("type", ty.as_str()),
                ("method", method_name.as_str()),
                ("marker", marker.as_str()),
                ("returns", returns.as_str()),
            ],
        )
    }
}
