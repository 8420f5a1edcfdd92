//! Localized diagnostic message templates.
//!
//! Templates are keyed by a dotted message key (for example
//! `exception.annotation.notStatic`) and may reference named placeholders
//! written as `{name}`.

use std::collections::HashMap;

/// Locales with a built-in template table.
pub const LOCALES: &[&str] = &["en", "zh"];

const EN: &[(&str, &str)] = &[
    (
        "exception.annotation.notStatic",
        "factory method {method} on {type} is marked with {marker} but is not static",
    ),
    (
        "exception.annotation.needReturn",
        "factory method {method} on {type} is marked with {marker} but returns nothing",
    ),
    (
        "exception.annotation.returnTypeWrong",
        "factory method {method} on {type} is marked with {marker} but returns {returns}, which is not {type} or a subtype of it",
    ),
];

const ZH: &[(&str, &str)] = &[
    (
        "exception.annotation.notStatic",
        "{type} 中标注了 {marker} 的工厂方法 {method} 必须是静态方法",
    ),
    (
        "exception.annotation.needReturn",
        "{type} 中标注了 {marker} 的工厂方法 {method} 必须有返回值",
    ),
    (
        "exception.annotation.returnTypeWrong",
        "{type} 中标注了 {marker} 的工厂方法 {method} 的返回值 {returns} 不是 {type} 或其子类型",
    ),
];

/// A table of message templates for one locale.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    locale: String,
    templates: HashMap<String, String>,
}

impl MessageCatalog {
    /// Build the catalog for a built-in locale. Unknown locales fall back to
    /// English.
    pub fn for_locale(locale: &str) -> Self {
        let table = match locale {
            "zh" => ZH,
            _ => EN,
        };
        Self {
            locale: if LOCALES.contains(&locale) {
                locale.to_string()
            } else {
                "en".to_string()
            },
            templates: table
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Replace or add templates.
    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.templates.extend(overrides);
        self
    }

    /// The locale this catalog was built for.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Look up the raw template for a key.
    pub fn template(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }

    /// Format the template for `key`, substituting `{name}` placeholders
    /// from `args`. An unknown key formats to the key itself.
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        let Some(template) = self.template(key) else {
            return key.to_string();
        };
        args.iter().fold(template.to_string(), |out, (name, value)| {
            out.replace(&format!("{{{name}}}"), value)
        })
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::for_locale("en")
    }
}
