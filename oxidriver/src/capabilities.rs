//! Capability negotiation: the base capability set, vendor option blobs,
//! and the browser presets.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Result, WebDriverError};
use crate::options::{Proxy, Timeouts};

/// The capability keys under which browsers expect their vendor-specific
/// option blobs.
pub mod vendor {
    pub const CHROME: &str = "goog:chromeOptions";
    pub const FIREFOX: &str = "moz:firefoxOptions";
    pub const EDGE: &str = "ms:edgeOptions";
    pub const SAFARI: &str = "safari:options";
    pub const IE: &str = "se:ieOptions";
    pub const WEBKITGTK: &str = "webkitgtk:browserOptions";
    pub const WPEWEBKIT: &str = "wpe:browserOptions";
}

/// An unordered capability map. Unknown keys pass through untouched in both
/// directions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities(pub Map<String, Value>);

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Capabilities {
    fn from(map: Map<String, Value>) -> Self {
        Capabilities(map)
    }
}

/// Anything that can produce a capability map for session creation. This is
/// the seam per-browser option builders plug into.
pub trait BrowserOptions {
    fn to_capabilities(&self) -> Capabilities;
}

impl BrowserOptions for Capabilities {
    fn to_capabilities(&self) -> Capabilities {
        self.clone()
    }
}

/// How eagerly navigation commands return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageLoadStrategy {
    Normal,
    Eager,
    None,
}

/// What the remote end does with an unexpected user prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnhandledPromptBehavior {
    Dismiss,
    Accept,
    DismissAndNotify,
    AcceptAndNotify,
    Ignore,
}

impl UnhandledPromptBehavior {
    pub fn as_str(self) -> &'static str {
        match self {
            UnhandledPromptBehavior::Dismiss => "dismiss",
            UnhandledPromptBehavior::Accept => "accept",
            UnhandledPromptBehavior::DismissAndNotify => "dismiss and notify",
            UnhandledPromptBehavior::AcceptAndNotify => "accept and notify",
            UnhandledPromptBehavior::Ignore => "ignore",
        }
    }
}

/// Assembles the standard W3C capabilities plus vendor blobs into the map
/// sent at session creation.
///
/// ```
/// use oxidriver::capabilities::{BaseCapabilities, BrowserOptions, vendor};
/// use serde_json::json;
///
/// let caps = BaseCapabilities::new("chrome")
///     .accept_insecure_certs(true)
///     .browser_option(vendor::CHROME, json!({"args": ["--headless=new"]}))
///     .to_capabilities();
/// assert_eq!(caps.get_str("browserName"), Some("chrome"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BaseCapabilities {
    browser_name: Option<String>,
    browser_version: Option<String>,
    platform_name: Option<String>,
    accept_insecure_certs: Option<bool>,
    page_load_strategy: Option<PageLoadStrategy>,
    set_window_rect: Option<bool>,
    strict_file_interactability: Option<bool>,
    unhandled_prompt_behavior: Option<UnhandledPromptBehavior>,
    web_socket_url: Option<bool>,
    downloads_enabled: Option<bool>,
    proxy: Option<Proxy>,
    timeouts: Option<Timeouts>,
    browser_options: Vec<(String, Value)>,
    extra: Map<String, Value>,
}

impl BaseCapabilities {
    pub fn new(browser_name: impl Into<String>) -> Self {
        BaseCapabilities {
            browser_name: Some(browser_name.into()),
            ..Default::default()
        }
    }

    pub fn browser_version(mut self, version: impl Into<String>) -> Self {
        self.browser_version = Some(version.into());
        self
    }

    pub fn platform_name(mut self, platform: impl Into<String>) -> Self {
        self.platform_name = Some(platform.into());
        self
    }

    pub fn accept_insecure_certs(mut self, accept: bool) -> Self {
        self.accept_insecure_certs = Some(accept);
        self
    }

    pub fn page_load_strategy(mut self, strategy: PageLoadStrategy) -> Self {
        self.page_load_strategy = Some(strategy);
        self
    }

    pub fn set_window_rect(mut self, enabled: bool) -> Self {
        self.set_window_rect = Some(enabled);
        self
    }

    pub fn strict_file_interactability(mut self, strict: bool) -> Self {
        self.strict_file_interactability = Some(strict);
        self
    }

    pub fn unhandled_prompt_behavior(mut self, behavior: UnhandledPromptBehavior) -> Self {
        self.unhandled_prompt_behavior = Some(behavior);
        self
    }

    /// Requests a BiDi WebSocket endpoint from the remote end.
    pub fn web_socket_url(mut self, enabled: bool) -> Self {
        self.web_socket_url = Some(enabled);
        self
    }

    pub fn downloads_enabled(mut self, enabled: bool) -> Self {
        self.downloads_enabled = Some(enabled);
        self
    }

    pub fn proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Attaches a vendor option blob under its vendor key. Empty blobs are
    /// dropped at assembly time.
    pub fn browser_option(mut self, vendor_key: impl Into<String>, options: Value) -> Self {
        self.browser_options.push((vendor_key.into(), options));
        self
    }

    /// Forwards an arbitrary capability verbatim.
    pub fn capability(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl BrowserOptions for BaseCapabilities {
    fn to_capabilities(&self) -> Capabilities {
        let mut caps = Map::new();

        if let Some(v) = &self.browser_name {
            caps.insert("browserName".to_string(), json!(v));
        }
        if let Some(v) = &self.browser_version {
            caps.insert("browserVersion".to_string(), json!(v));
        }
        if let Some(v) = &self.platform_name {
            caps.insert("platformName".to_string(), json!(v));
        }
        if let Some(v) = self.accept_insecure_certs {
            caps.insert("acceptInsecureCerts".to_string(), json!(v));
        }
        if let Some(v) = self.page_load_strategy {
            caps.insert("pageLoadStrategy".to_string(), json!(v));
        }
        if let Some(v) = self.set_window_rect {
            caps.insert("setWindowRect".to_string(), json!(v));
        }
        if let Some(v) = self.strict_file_interactability {
            caps.insert("strictFileInteractability".to_string(), json!(v));
        }
        if let Some(v) = self.unhandled_prompt_behavior {
            caps.insert("unhandledPromptBehavior".to_string(), json!(v.as_str()));
        }
        if let Some(v) = self.web_socket_url {
            caps.insert("webSocketUrl".to_string(), json!(v));
        }
        if let Some(v) = self.downloads_enabled {
            caps.insert("se:downloadsEnabled".to_string(), json!(v));
        }

        if let Some(proxy) = &self.proxy {
            let map = proxy.to_capabilities();
            if !map.is_empty() {
                caps.insert("proxy".to_string(), Value::Object(map));
            }
        }
        if let Some(timeouts) = &self.timeouts {
            let map = timeouts.to_capabilities();
            if !map.is_empty() {
                caps.insert("timeouts".to_string(), Value::Object(map));
            }
        }

        for (key, options) in &self.browser_options {
            let empty = match options {
                Value::Object(map) => map.is_empty(),
                Value::Null => true,
                _ => false,
            };
            if !empty {
                caps.insert(key.clone(), options.clone());
            }
        }

        for (key, value) in &self.extra {
            caps.insert(key.clone(), value.clone());
        }

        Capabilities(caps)
    }
}

/// Ready-made capability sets for the browsers the protocol is commonly
/// driven against.
#[derive(Debug, Clone, Copy)]
pub struct DesiredCapabilities;

impl DesiredCapabilities {
    pub fn chrome() -> BaseCapabilities {
        BaseCapabilities::new("chrome")
    }

    pub fn firefox() -> BaseCapabilities {
        BaseCapabilities::new("firefox").accept_insecure_certs(true)
    }

    pub fn edge() -> BaseCapabilities {
        BaseCapabilities::new("MicrosoftEdge")
    }

    pub fn safari() -> BaseCapabilities {
        BaseCapabilities::new("safari").platform_name("mac")
    }

    pub fn internet_explorer() -> BaseCapabilities {
        BaseCapabilities::new("internet explorer").platform_name("windows")
    }

    pub fn webkitgtk() -> BaseCapabilities {
        BaseCapabilities::new("MiniBrowser")
    }

    pub fn wpewebkit() -> BaseCapabilities {
        BaseCapabilities::new("MiniBrowser")
    }
}

/// Validates an unhandled-prompt-behavior string coming from user
/// configuration.
pub fn parse_prompt_behavior(s: &str) -> Result<UnhandledPromptBehavior> {
    match s {
        "dismiss" => Ok(UnhandledPromptBehavior::Dismiss),
        "accept" => Ok(UnhandledPromptBehavior::Accept),
        "dismiss and notify" => Ok(UnhandledPromptBehavior::DismissAndNotify),
        "accept and notify" => Ok(UnhandledPromptBehavior::AcceptAndNotify),
        "ignore" => Ok(UnhandledPromptBehavior::Ignore),
        other => Err(WebDriverError::invalid_argument(format!(
            "invalid unhandled prompt behavior {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Proxy;
    use std::time::Duration;

    #[test]
    fn assembles_standard_fields() {
        let caps = DesiredCapabilities::firefox()
            .page_load_strategy(PageLoadStrategy::Eager)
            .to_capabilities();
        assert_eq!(caps.get_str("browserName"), Some("firefox"));
        assert_eq!(caps.get("acceptInsecureCerts"), Some(&json!(true)));
        assert_eq!(caps.get_str("pageLoadStrategy"), Some("eager"));
    }

    #[test]
    fn merges_proxy_and_timeouts() {
        let caps = BaseCapabilities::new("chrome")
            .proxy(Proxy::new().http_proxy("localhost:8080").unwrap())
            .timeouts(Timeouts::new().implicit(Duration::from_secs(2)))
            .to_capabilities();
        assert_eq!(
            caps.get("proxy").unwrap()["httpProxy"],
            json!("localhost:8080")
        );
        assert_eq!(caps.get("timeouts").unwrap()["implicit"], json!(2000));
    }

    #[test]
    fn empty_vendor_blobs_are_omitted() {
        let caps = BaseCapabilities::new("chrome")
            .browser_option(vendor::CHROME, json!({}))
            .browser_option(vendor::FIREFOX, json!({"args": ["-headless"]}))
            .to_capabilities();
        assert!(caps.get(vendor::CHROME).is_none());
        assert_eq!(
            caps.get(vendor::FIREFOX).unwrap()["args"],
            json!(["-headless"])
        );
    }

    #[test]
    fn unknown_capabilities_pass_through() {
        let caps = BaseCapabilities::new("chrome")
            .capability("cloud:buildName", json!("nightly-142"))
            .to_capabilities();
        assert_eq!(caps.get_str("cloud:buildName"), Some("nightly-142"));
    }

    #[test]
    fn prompt_behavior_strings() {
        assert!(parse_prompt_behavior("accept and notify").is_ok());
        assert!(parse_prompt_behavior("explode").is_err());
    }
}
