//! Element handles: an opaque remote identifier plus the session it came
//! from.
//!
//! An element is only valid inside the session that produced it and only as
//! long as the referenced DOM node stays in the tree; once the node is
//! replaced, the remote end answers with `stale element reference` and the
//! handle should be re-found.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use oxidriver_types::{ELEMENT_KEY, SHADOW_ROOT_KEY};

use crate::by::By;
use crate::command::Command;
use crate::conn::{params, Params};
use crate::error::{Result, WebDriverError};
use crate::options::Rect;
use crate::session::WebDriver;
use crate::utils;

/// A handle to a DOM element in a live session.
#[derive(Clone)]
pub struct Element {
    driver: WebDriver,
    id: String,
}

impl Element {
    pub(crate) fn new(driver: WebDriver, id: impl Into<String>) -> Self {
        Element {
            driver,
            id: id.into(),
        }
    }

    /// The opaque identifier the remote end assigned this element.
    pub fn id(&self) -> &str {
        &self.id
    }

    fn scoped(&self, extra: Value) -> Params {
        let mut body = params(extra);
        body.insert("id".to_string(), json!(self.id));
        body
    }

    // ------------------------------------------------------------------
    // Interaction
    // ------------------------------------------------------------------

    pub async fn click(&self) -> Result<()> {
        self.driver
            .void(Command::ClickElement, self.scoped(json!({})))
            .await
    }

    pub async fn clear(&self) -> Result<()> {
        self.driver
            .void(Command::ClearElement, self.scoped(json!({})))
            .await
    }

    /// Types into the element. The wire payload carries the text both whole
    /// and split into single-character strings, which is the form every
    /// driver generation accepts.
    pub async fn send_keys(&self, keys: impl AsRef<str>) -> Result<()> {
        let keys = keys.as_ref();
        let chars: Vec<String> = keys.chars().map(|c| c.to_string()).collect();
        self.driver
            .void(
                Command::SendKeysToElement,
                self.scoped(json!({"text": keys, "value": chars})),
            )
            .await
    }

    pub async fn submit(&self) -> Result<()> {
        self.driver
            .void(Command::SubmitElement, self.scoped(json!({})))
            .await
    }

    // ------------------------------------------------------------------
    // State queries
    // ------------------------------------------------------------------

    pub async fn text(&self) -> Result<String> {
        self.driver
            .string(Command::GetElementText, self.scoped(json!({})))
            .await
    }

    pub async fn tag_name(&self) -> Result<String> {
        self.driver
            .string(Command::GetElementTagName, self.scoped(json!({})))
            .await
    }

    pub async fn rect(&self) -> Result<Rect> {
        let reply = self
            .driver
            .execute(Command::GetElementRect, self.scoped(json!({})))
            .await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    /// The element's whole-pixel location, rounded half away from zero.
    pub async fn location(&self) -> Result<(i64, i64)> {
        Ok(self.rect().await?.location())
    }

    /// The element's whole-pixel size, rounded half away from zero.
    pub async fn size(&self) -> Result<(i64, i64)> {
        Ok(self.rect().await?.size())
    }

    pub async fn attribute(&self, name: impl AsRef<str>) -> Result<Option<String>> {
        let reply = self
            .driver
            .execute(
                Command::GetElementAttribute,
                self.scoped(json!({"name": name.as_ref()})),
            )
            .await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    pub async fn property(&self, name: impl AsRef<str>) -> Result<Option<String>> {
        let reply = self
            .driver
            .execute(
                Command::GetElementProperty,
                self.scoped(json!({"name": name.as_ref()})),
            )
            .await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    /// The computed value of a CSS property.
    pub async fn css_value(&self, property: impl AsRef<str>) -> Result<String> {
        self.driver
            .string(
                Command::GetElementCssValue,
                self.scoped(json!({"propertyName": property.as_ref()})),
            )
            .await
    }

    pub async fn aria_role(&self) -> Result<String> {
        self.driver
            .string(Command::GetElementAriaRole, self.scoped(json!({})))
            .await
    }

    pub async fn aria_label(&self) -> Result<String> {
        self.driver
            .string(Command::GetElementAriaLabel, self.scoped(json!({})))
            .await
    }

    pub async fn is_selected(&self) -> Result<bool> {
        self.driver
            .boolean(Command::IsElementSelected, self.scoped(json!({})))
            .await
    }

    pub async fn is_enabled(&self) -> Result<bool> {
        self.driver
            .boolean(Command::IsElementEnabled, self.scoped(json!({})))
            .await
    }

    pub async fn is_displayed(&self) -> Result<bool> {
        self.driver
            .boolean(Command::IsElementDisplayed, self.scoped(json!({})))
            .await
    }

    /// Captures just this element and returns the decoded image bytes.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let data = self
            .driver
            .string(Command::TakeElementScreenshot, self.scoped(json!({})))
            .await?;
        utils::decode_base64(&data)
    }

    // ------------------------------------------------------------------
    // Scoped finds
    // ------------------------------------------------------------------

    /// Finds the first descendant matching the locator.
    pub async fn find_element(&self, by: By, value: impl AsRef<str>) -> Result<Element> {
        let (using, value) = by.resolve(value.as_ref())?;
        let reply = self
            .driver
            .execute(
                Command::FindChildElement,
                self.scoped(json!({"using": using, "value": value})),
            )
            .await?;
        self.driver.element_from_value(&reply.value)
    }

    /// Finds every descendant matching the locator, in document order.
    pub async fn find_elements(&self, by: By, value: impl AsRef<str>) -> Result<Vec<Element>> {
        let (using, value) = by.resolve(value.as_ref())?;
        let reply = self
            .driver
            .execute(
                Command::FindChildElements,
                self.scoped(json!({"using": using, "value": value})),
            )
            .await?;
        self.driver.elements_from_value(&reply.value)
    }

    /// The element's shadow root, for piercing into shadow DOM trees.
    pub async fn shadow_root(&self) -> Result<ShadowRoot> {
        let reply = self
            .driver
            .execute(Command::GetShadowRoot, self.scoped(json!({})))
            .await?;
        let id = reply
            .value
            .get(SHADOW_ROOT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WebDriverError::unexpected(format!("invalid shadow root reference: {}", reply.value))
            })?;
        Ok(ShadowRoot {
            driver: self.driver.clone(),
            id: id.to_string(),
        })
    }
}

/// Elements serialize to exactly the W3C element reference object.
impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(ELEMENT_KEY, &self.id)?;
        map.end()
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element").field("id", &self.id).finish()
    }
}

/// A shadow root handle, scoping finds to a shadow DOM subtree.
#[derive(Clone)]
pub struct ShadowRoot {
    driver: WebDriver,
    id: String,
}

impl ShadowRoot {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn find_element(&self, by: By, value: impl AsRef<str>) -> Result<Element> {
        let (using, value) = by.resolve(value.as_ref())?;
        let mut body = params(json!({"using": using, "value": value}));
        body.insert("shadowId".to_string(), json!(self.id));
        let reply = self
            .driver
            .execute(Command::FindElementFromShadowRoot, body)
            .await?;
        self.driver.element_from_value(&reply.value)
    }

    pub async fn find_elements(&self, by: By, value: impl AsRef<str>) -> Result<Vec<Element>> {
        let (using, value) = by.resolve(value.as_ref())?;
        let mut body = params(json!({"using": using, "value": value}));
        body.insert("shadowId".to_string(), json!(self.id));
        let reply = self
            .driver
            .execute(Command::FindElementsFromShadowRoot, body)
            .await?;
        self.driver.elements_from_value(&reply.value)
    }
}

impl std::fmt::Debug for ShadowRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowRoot").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn::ClientConfig;

    #[test]
    fn element_marshals_to_the_w3c_reference() {
        let driver = WebDriver::new(ClientConfig::new("http://localhost:4444")).unwrap();
        let element = Element::new(driver, "element123");
        assert_eq!(
            serde_json::to_string(&element).unwrap(),
            format!("{{\"{ELEMENT_KEY}\":\"element123\"}}")
        );
    }
}
