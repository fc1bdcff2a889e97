//! Session-level value objects: print options, timeouts, proxy
//! configuration, cookies, and window geometry.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{Result, WebDriverError};
use crate::utils::round;

/// Page orientation for printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// A page size in centimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const A4: PageSize = PageSize {
        width: 21.0,
        height: 29.7,
    };
    pub const LEGAL: PageSize = PageSize {
        width: 21.59,
        height: 35.56,
    };
    pub const LETTER: PageSize = PageSize {
        width: 21.59,
        height: 27.94,
    };
    pub const TABLOID: PageSize = PageSize {
        width: 43.18,
        height: 27.94,
    };
}

/// Options for the print-page command. Only explicitly set fields are
/// serialized; everything else is left to the remote end's defaults.
#[derive(Debug, Clone, Default)]
pub struct PrintOptions {
    margin_top: Option<f64>,
    margin_bottom: Option<f64>,
    margin_left: Option<f64>,
    margin_right: Option<f64>,
    page: Option<PageSize>,
    background: Option<bool>,
    orientation: Option<Orientation>,
    scale: Option<f64>,
    shrink_to_fit: Option<bool>,
    page_ranges: Vec<String>,
}

fn non_negative(name: &str, value: f64) -> Result<f64> {
    if value < 0.0 {
        return Err(WebDriverError::invalid_argument(format!(
            "{name} must be non-negative, got {value}"
        )));
    }
    Ok(value)
}

impl PrintOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn margin_top(mut self, cm: f64) -> Result<Self> {
        self.margin_top = Some(non_negative("margin top", cm)?);
        Ok(self)
    }

    pub fn margin_bottom(mut self, cm: f64) -> Result<Self> {
        self.margin_bottom = Some(non_negative("margin bottom", cm)?);
        Ok(self)
    }

    pub fn margin_left(mut self, cm: f64) -> Result<Self> {
        self.margin_left = Some(non_negative("margin left", cm)?);
        Ok(self)
    }

    pub fn margin_right(mut self, cm: f64) -> Result<Self> {
        self.margin_right = Some(non_negative("margin right", cm)?);
        Ok(self)
    }

    pub fn page_size(mut self, page: PageSize) -> Result<Self> {
        non_negative("page width", page.width)?;
        non_negative("page height", page.height)?;
        self.page = Some(page);
        Ok(self)
    }

    pub fn background(mut self, on: bool) -> Self {
        self.background = Some(on);
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Print scale, valid between 0.1 and 2.0.
    pub fn scale(mut self, scale: f64) -> Result<Self> {
        if !(0.1..=2.0).contains(&scale) {
            return Err(WebDriverError::invalid_argument(format!(
                "scale must be between 0.1 and 2.0, got {scale}"
            )));
        }
        self.scale = Some(scale);
        Ok(self)
    }

    pub fn shrink_to_fit(mut self, on: bool) -> Self {
        self.shrink_to_fit = Some(on);
        self
    }

    pub fn page_ranges<I, S>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.page_ranges = ranges.into_iter().map(Into::into).collect();
        self
    }

    /// The wire representation, with unset fields omitted.
    pub fn to_value(&self) -> Value {
        let mut out = Map::new();

        let mut margin = Map::new();
        for (key, value) in [
            ("top", self.margin_top),
            ("bottom", self.margin_bottom),
            ("left", self.margin_left),
            ("right", self.margin_right),
        ] {
            if let Some(v) = value {
                margin.insert(key.to_string(), json!(v));
            }
        }
        if !margin.is_empty() {
            out.insert("margin".to_string(), Value::Object(margin));
        }

        if let Some(page) = self.page {
            out.insert(
                "page".to_string(),
                json!({"width": page.width, "height": page.height}),
            );
        }
        if let Some(background) = self.background {
            out.insert("background".to_string(), json!(background));
        }
        if let Some(orientation) = self.orientation {
            out.insert("orientation".to_string(), json!(orientation));
        }
        if let Some(scale) = self.scale {
            out.insert("scale".to_string(), json!(scale));
        }
        if let Some(shrink) = self.shrink_to_fit {
            out.insert("shrinkToFit".to_string(), json!(shrink));
        }
        if !self.page_ranges.is_empty() {
            out.insert("pageRanges".to_string(), json!(self.page_ranges));
        }

        Value::Object(out)
    }
}

/// The three session timeouts. Serialized in whole milliseconds, and only
/// when set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub implicit: Option<Duration>,
    pub page_load: Option<Duration>,
    pub script: Option<Duration>,
}

impl Timeouts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn implicit(mut self, timeout: Duration) -> Self {
        self.implicit = Some(timeout);
        self
    }

    pub fn page_load(mut self, timeout: Duration) -> Self {
        self.page_load = Some(timeout);
        self
    }

    pub fn script(mut self, timeout: Duration) -> Self {
        self.script = Some(timeout);
        self
    }

    /// The capability/command map: millisecond integers, present only for
    /// positive values.
    pub fn to_capabilities(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in [
            ("implicit", self.implicit),
            ("pageLoad", self.page_load),
            ("script", self.script),
        ] {
            match value {
                Some(d) if !d.is_zero() => {
                    out.insert(key.to_string(), json!(d.as_millis() as u64));
                }
                _ => {}
            }
        }
        out
    }

    /// Parses the reply of the get-timeouts command.
    pub fn from_value(value: &Value) -> Result<Timeouts> {
        let ms = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_f64)
                .map(|v| Duration::from_millis(v as u64))
        };
        if !value.is_object() {
            return Err(WebDriverError::unexpected(format!(
                "timeouts reply is not an object: {value}"
            )));
        }
        Ok(Timeouts {
            implicit: ms("implicit"),
            page_load: ms("pageLoad"),
            script: ms("script"),
        })
    }
}

/// Proxy configuration negotiated as the `proxy` capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    Direct,
    Manual,
    Pac,
    Autodetect,
    System,
}

/// The `proxy` capability value object.
///
/// Setting a field fixes the proxy type; mixing fields of incompatible
/// types (e.g. a PAC URL after an HTTP proxy) is rejected with
/// `InvalidArgument`.
#[derive(Debug, Clone, Default)]
pub struct Proxy {
    proxy_type: Option<ProxyType>,
    http_proxy: Option<String>,
    ssl_proxy: Option<String>,
    ftp_proxy: Option<String>,
    no_proxy: Vec<String>,
    proxy_autoconfig_url: Option<String>,
    socks_proxy: Option<String>,
    socks_version: Option<u8>,
    autodetect: Option<bool>,
}

impl Proxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proxy_type(&self) -> Option<ProxyType> {
        self.proxy_type
    }

    fn require_type(&mut self, required: ProxyType) -> Result<()> {
        match self.proxy_type {
            None => {
                self.proxy_type = Some(required);
                Ok(())
            }
            Some(t) if t == required => Ok(()),
            Some(t) => Err(WebDriverError::invalid_argument(format!(
                "proxy type {t:?} is incompatible with {required:?} settings"
            ))),
        }
    }

    pub fn direct(mut self) -> Result<Self> {
        self.require_type(ProxyType::Direct)?;
        Ok(self)
    }

    pub fn system(mut self) -> Result<Self> {
        self.require_type(ProxyType::System)?;
        Ok(self)
    }

    pub fn http_proxy(mut self, host: impl Into<String>) -> Result<Self> {
        self.require_type(ProxyType::Manual)?;
        self.http_proxy = Some(host.into());
        Ok(self)
    }

    pub fn ssl_proxy(mut self, host: impl Into<String>) -> Result<Self> {
        self.require_type(ProxyType::Manual)?;
        self.ssl_proxy = Some(host.into());
        Ok(self)
    }

    pub fn ftp_proxy(mut self, host: impl Into<String>) -> Result<Self> {
        self.require_type(ProxyType::Manual)?;
        self.ftp_proxy = Some(host.into());
        Ok(self)
    }

    pub fn socks_proxy(mut self, host: impl Into<String>, version: u8) -> Result<Self> {
        self.require_type(ProxyType::Manual)?;
        self.socks_proxy = Some(host.into());
        self.socks_version = Some(version);
        Ok(self)
    }

    pub fn no_proxy<I, S>(mut self, hosts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_type(ProxyType::Manual)?;
        self.no_proxy = hosts.into_iter().map(Into::into).collect();
        Ok(self)
    }

    pub fn pac_url(mut self, url: impl Into<String>) -> Result<Self> {
        self.require_type(ProxyType::Pac)?;
        self.proxy_autoconfig_url = Some(url.into());
        Ok(self)
    }

    pub fn autodetect(mut self) -> Result<Self> {
        self.require_type(ProxyType::Autodetect)?;
        self.autodetect = Some(true);
        Ok(self)
    }

    /// The wire map for the `proxy` capability. Empty when no type has been
    /// fixed.
    pub fn to_capabilities(&self) -> Map<String, Value> {
        let mut out = Map::new();
        let Some(proxy_type) = self.proxy_type else {
            return out;
        };
        out.insert("proxyType".to_string(), json!(proxy_type));
        if let Some(v) = &self.http_proxy {
            out.insert("httpProxy".to_string(), json!(v));
        }
        if let Some(v) = &self.ssl_proxy {
            out.insert("sslProxy".to_string(), json!(v));
        }
        if let Some(v) = &self.ftp_proxy {
            out.insert("ftpProxy".to_string(), json!(v));
        }
        if !self.no_proxy.is_empty() {
            out.insert("noProxy".to_string(), json!(self.no_proxy));
        }
        if let Some(v) = &self.proxy_autoconfig_url {
            out.insert("proxyAutoconfigUrl".to_string(), json!(v));
        }
        if let Some(v) = &self.socks_proxy {
            out.insert("socksProxy".to_string(), json!(v));
        }
        if let Some(v) = self.socks_version {
            out.insert("socksVersion".to_string(), json!(v));
        }
        if let Some(v) = self.autodetect {
            out.insert("autodetect".to_string(), json!(v));
        }
        out
    }
}

/// Cookie SameSite policy. Drivers occasionally report unexpected casing or
/// values; anything unrecognised degrades to `Lax`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    None,
    Lax,
    Strict,
}

impl Serialize for SameSite {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let s = match self {
            SameSite::None => "None",
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for SameSite {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.to_ascii_lowercase().as_str() {
            "none" => SameSite::None,
            "strict" => SameSite::Strict,
            _ => SameSite::Lax,
        })
    }
}

fn forgiving_expiry<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    // Drivers disagree on whether expiry is an integer or a float.
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64)),
        _ => None,
    })
}

/// A browser cookie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_only: Option<bool>,
    /// Seconds since the Unix epoch.
    #[serde(
        default,
        deserialize_with = "forgiving_expiry",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Cookie {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

/// An element or window rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Rect {
    /// The whole-pixel location, rounded half away from zero.
    pub fn location(&self) -> (i64, i64) {
        (round(self.x), round(self.y))
    }

    /// The whole-pixel size, rounded half away from zero.
    pub fn size(&self) -> (i64, i64) {
        (round(self.width), round(self.height))
    }
}

/// What kind of browsing context `new_window` should open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    Tab,
    Window,
}

/// The log streams a remote end may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Browser,
    Client,
    Driver,
    Server,
    Performance,
    Profiler,
}

/// One entry of a retrieved log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub level: String,
    pub message: String,
}

/// Reference to a frame for switch-to-frame: the top-level context, an index
/// into the frame list, or a frame element.
#[derive(Debug, Clone)]
pub enum FrameRef {
    Top,
    Index(u16),
    Element(crate::element::Element),
}
