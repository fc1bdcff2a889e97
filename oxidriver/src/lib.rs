//! A client for driving real browsers over the [W3C WebDriver] HTTP
//! protocol and the [WebDriver BiDi] WebSocket protocol.
//!
//! The crate talks to any conforming remote end: a local driver binary
//! (geckodriver, chromedriver, msedgedriver, safaridriver) or a Selenium
//! grid hub. Sessions are created with negotiated capabilities, elements
//! are located and manipulated through typed handles, low-level input goes
//! through the W3C Actions API, and browser events arrive over a
//! multiplexed BiDi socket.
//!
//! # Example
//! ```no_run
//! use oxidriver::{By, ClientConfig, DesiredCapabilities, WebDriver};
//!
//! #[tokio::main]
//! async fn main() -> oxidriver::Result<()> {
//!     let driver = WebDriver::new(ClientConfig::new("http://localhost:4444"))?;
//!     driver.new_session(&DesiredCapabilities::firefox()).await?;
//!
//!     driver.goto("https://en.wikipedia.org").await?;
//!     let input = driver.find_element(By::Id, "searchInput").await?;
//!     input.send_keys("Rust programming language").await?;
//!     input.submit().await?;
//!
//!     let png = driver.screenshot().await?;
//!     std::fs::write("result.png", png)?;
//!
//!     driver.delete_session().await
//! }
//! ```
//!
//! Driving a locally supervised driver process instead of an already
//! running one:
//! ```no_run
//! use oxidriver::service::{DriverFlavor, DriverService};
//! # async fn run() -> oxidriver::Result<()> {
//! let mut service = DriverService::builder("/usr/bin/geckodriver", DriverFlavor::Geckodriver)
//!     .start()
//!     .await?;
//! let config = oxidriver::ClientConfig::new(service.url());
//! // ... drive the browser ...
//! service.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [W3C WebDriver]: https://www.w3.org/TR/webdriver/
//! [WebDriver BiDi]: https://w3c.github.io/webdriver-bidi/

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod actions;
pub mod bidi;
pub mod by;
pub mod capabilities;
pub mod command;
pub mod conn;
pub mod element;
pub mod error;
pub mod keys;
pub mod options;
pub mod service;
pub mod session;
pub mod utils;
pub mod wait;

pub use crate::actions::{ActionBuilder, ActionChains, MouseButton, Origin, PointerKind};
pub use crate::bidi::{BidiSession, ConsoleMessage, ConsoleType};
pub use crate::by::By;
pub use crate::capabilities::{
    BaseCapabilities, BrowserOptions, Capabilities, DesiredCapabilities,
};
pub use crate::command::{Command, EndpointTable, HttpMethod};
pub use crate::conn::{ClientConfig, RemoteConnection};
pub use crate::element::{Element, ShadowRoot};
pub use crate::error::{ErrorKind, ProtocolError, Result, WebDriverError};
pub use crate::options::{
    Cookie, FrameRef, LogEntry, LogType, Orientation, PageSize, PrintOptions, Proxy, Rect,
    SameSite, Timeouts, WindowType,
};
pub use crate::session::WebDriver;

/// Re-export of the wire-level protocol types.
pub use oxidriver_types as types;
pub use oxidriver_types::ELEMENT_KEY;
