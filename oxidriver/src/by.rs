//! Element locator strategies.
//!
//! The eight W3C strategies are built in. `id`, `name` and `class name` are
//! rewritten to equivalent CSS selectors before hitting the wire because
//! several driver implementations only honour `css selector` and `xpath`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, WebDriverError};

lazy_static::lazy_static! {
    static ref CUSTOM_STRATEGIES: RwLock<HashMap<String, String>> =
        RwLock::new(HashMap::new());
}

/// A locator strategy paired with its selector value at the call site, e.g.
/// `driver.find_element(By::Css, "div.result")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum By {
    Id,
    XPath,
    LinkText,
    PartialLinkText,
    Name,
    TagName,
    ClassName,
    Css,
    /// A strategy previously registered with [`By::register_custom`].
    Custom(String),
}

impl By {
    /// Registers a custom strategy under `name`, mapping to the given wire
    /// `using` string. Registration may happen from any thread.
    pub fn register_custom(name: impl Into<String>, using: impl Into<String>) {
        CUSTOM_STRATEGIES
            .write()
            .expect("locator registry poisoned")
            .insert(name.into(), using.into());
    }

    /// Removes every registered custom strategy.
    pub fn clear_custom() {
        CUSTOM_STRATEGIES
            .write()
            .expect("locator registry poisoned")
            .clear();
    }

    /// Resolves this strategy and selector into the `using`/`value` pair the
    /// remote end understands, applying the CSS compatibility rewrite.
    pub fn resolve(&self, value: &str) -> Result<(String, String)> {
        let pair = match self {
            By::Id => ("css selector".to_string(), format!("[id=\"{value}\"]")),
            By::Name => ("css selector".to_string(), format!("[name=\"{value}\"]")),
            By::ClassName => ("css selector".to_string(), format!(".{value}")),
            By::XPath => ("xpath".to_string(), value.to_string()),
            By::LinkText => ("link text".to_string(), value.to_string()),
            By::PartialLinkText => ("partial link text".to_string(), value.to_string()),
            By::TagName => ("tag name".to_string(), value.to_string()),
            By::Css => ("css selector".to_string(), value.to_string()),
            By::Custom(name) => {
                let registry = CUSTOM_STRATEGIES
                    .read()
                    .expect("locator registry poisoned");
                let using = registry.get(name).ok_or_else(|| {
                    WebDriverError::invalid_argument(format!(
                        "unregistered locator strategy {name:?}"
                    ))
                })?;
                (using.clone(), value.to_string())
            }
        };
        Ok(pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_compat_rewrites() {
        assert_eq!(
            By::Id.resolve("myID").unwrap(),
            ("css selector".into(), "[id=\"myID\"]".into())
        );
        assert_eq!(
            By::Name.resolve("q").unwrap(),
            ("css selector".into(), "[name=\"q\"]".into())
        );
        assert_eq!(
            By::ClassName.resolve("result").unwrap(),
            ("css selector".into(), ".result".into())
        );
    }

    #[test]
    fn passthrough_strategies() {
        assert_eq!(
            By::XPath.resolve("//div").unwrap(),
            ("xpath".into(), "//div".into())
        );
        assert_eq!(
            By::LinkText.resolve("next").unwrap(),
            ("link text".into(), "next".into())
        );
        assert_eq!(
            By::PartialLinkText.resolve("nex").unwrap(),
            ("partial link text".into(), "nex".into())
        );
        assert_eq!(
            By::TagName.resolve("a").unwrap(),
            ("tag name".into(), "a".into())
        );
        assert_eq!(
            By::Css.resolve("div > span").unwrap(),
            ("css selector".into(), "div > span".into())
        );
    }

    #[test]
    fn custom_strategies_register_and_resolve() {
        By::register_custom("data-test", "css selector");
        let (using, value) = By::Custom("data-test".into()).resolve("x").unwrap();
        assert_eq!(using, "css selector");
        assert_eq!(value, "x");

        assert!(By::Custom("never-registered".into()).resolve("x").is_err());
    }
}
