//! The session manager: one [`WebDriver`] handle binds a remote session id
//! to a pooled connection, negotiates capabilities at creation, and exposes
//! the session-scoped protocol operations.

use std::sync::{Arc, RwLock};

use semver::Version;
use serde_json::{json, Value};

use oxidriver_types::{ServerReply, ELEMENT_KEY};

use crate::actions::{PointerKind, StoredAction};
use crate::by::By;
use crate::capabilities::{BrowserOptions, Capabilities};
use crate::command::{Command, HttpMethod};
use crate::conn::{params, ClientConfig, Params, RemoteConnection};
use crate::element::Element;
use crate::error::{Result, WebDriverError};
use crate::options::{
    Cookie, FrameRef, LogEntry, LogType, PrintOptions, Rect, Timeouts, WindowType,
};
use crate::utils;

#[derive(Default)]
struct SessionState {
    session_id: String,
    capabilities: Capabilities,
    browser_name: String,
    browser_version: Option<Version>,
    stored_actions: Vec<Value>,
}

pub(crate) struct SessionInner {
    conn: RemoteConnection,
    state: RwLock<SessionState>,
}

/// A client handle bound to (at most) one remote WebDriver session.
///
/// The handle is cheap to clone and safe to share: the underlying HTTP
/// connection is pooled, and the remote end serialises commands per
/// session.
///
/// ```no_run
/// use oxidriver::{By, ClientConfig, DesiredCapabilities, WebDriver};
///
/// # async fn run() -> oxidriver::Result<()> {
/// let driver = WebDriver::new(ClientConfig::new("http://localhost:4444"))?;
/// driver.new_session(&DesiredCapabilities::firefox()).await?;
/// driver.goto("https://en.wikipedia.org").await?;
/// let input = driver.find_element(By::Id, "searchInput").await?;
/// input.send_keys("Rust programming language").await?;
/// driver.delete_session().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WebDriver {
    inner: Arc<SessionInner>,
}

impl WebDriver {
    /// Creates an unbound handle talking to the given remote end. No
    /// session exists until [`new_session`](WebDriver::new_session).
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(WebDriver {
            inner: Arc::new(SessionInner {
                conn: RemoteConnection::new(config)?,
                state: RwLock::new(SessionState::default()),
            }),
        })
    }

    /// Registers an extra endpoint on this handle's table.
    pub fn add_command(
        &self,
        cmd: Command,
        method: HttpMethod,
        path: impl Into<std::borrow::Cow<'static, str>>,
    ) {
        self.inner.conn.add_command(cmd, method, path);
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Creates a session on the remote end with the produced capabilities.
    ///
    /// Fails with [`WebDriverError::SessionExists`] when this handle is
    /// already bound; a failed creation leaves the handle unbound.
    pub async fn new_session(&self, options: &dyn BrowserOptions) -> Result<String> {
        let requested = options.to_capabilities();
        {
            let state = self.state_read();
            if !state.session_id.is_empty() {
                return Err(WebDriverError::SessionExists);
            }
        }

        let body = params(json!({
            "capabilities": {"alwaysMatch": &requested},
        }));
        let reply = self.inner.conn.execute(&Command::NewSession, &body).await?;

        let mut session_id = reply.session_id.clone().unwrap_or_default();
        if session_id.is_empty() {
            if let Some(id) = reply.value.get("sessionId").and_then(Value::as_str) {
                session_id = id.to_string();
            }
        }
        if session_id.is_empty() {
            return Err(WebDriverError::unexpected(format!(
                "session creation reply carried no session id: {}",
                reply.value
            )));
        }

        let effective: Capabilities = reply
            .value
            .get("capabilities")
            .and_then(|caps| serde_json::from_value(caps.clone()).ok())
            .unwrap_or_else(|| requested.clone());

        let browser_name = effective
            .get_str("browserName")
            .or_else(|| requested.get_str("browserName"))
            .unwrap_or_default()
            .to_string();
        let browser_version = ["browserVersion", "version"]
            .into_iter()
            .filter_map(|key| effective.get_str(key))
            .find_map(|raw| utils::parse_version(raw).ok());

        let mut state = self.state_write();
        state.session_id = session_id.clone();
        state.capabilities = effective;
        state.browser_name = browser_name;
        state.browser_version = browser_version;

        tracing::debug!(session = %session_id, "session created");
        Ok(session_id)
    }

    /// Ends the remote session and unbinds this handle. Safe to call when
    /// no session exists.
    pub async fn delete_session(&self) -> Result<()> {
        let session_id = {
            let state = self.state_read();
            if state.session_id.is_empty() {
                return Ok(());
            }
            state.session_id.clone()
        };
        self.inner
            .conn
            .execute(
                &Command::DeleteSession,
                &params(json!({"sessionId": session_id})),
            )
            .await?;
        *self.state_write() = SessionState::default();
        Ok(())
    }

    /// Ends the session; alias kept for callers coming from other clients.
    pub async fn quit(&self) -> Result<()> {
        self.delete_session().await
    }

    /// Rebinds this handle to an externally created session id without a
    /// round trip. Intended for test injection and session adoption.
    pub fn switch_session(&self, session_id: impl Into<String>) {
        self.state_write().session_id = session_id.into();
    }

    /// The bound session id; empty when unbound.
    pub fn session_id(&self) -> String {
        self.state_read().session_id.clone()
    }

    /// The capabilities the remote end answered session creation with.
    pub fn capabilities(&self) -> Capabilities {
        self.state_read().capabilities.clone()
    }

    pub fn browser_name(&self) -> String {
        self.state_read().browser_name.clone()
    }

    /// The negotiated browser version, parsed tolerantly.
    pub fn browser_version(&self) -> Option<Version> {
        self.state_read().browser_version.clone()
    }

    /// Queries the remote end's readiness. Works without a session.
    pub async fn status(&self) -> Result<Value> {
        let reply = self
            .inner
            .conn
            .execute(&Command::Status, &Params::new())
            .await?;
        Ok(reply.value)
    }

    // ------------------------------------------------------------------
    // Dispatch plumbing
    // ------------------------------------------------------------------

    /// Dispatches a raw command against the bound session. The session id
    /// is injected into the parameter map for path substitution.
    pub async fn execute(&self, cmd: Command, mut body: Params) -> Result<ServerReply> {
        let session_id = {
            let state = self.state_read();
            if state.session_id.is_empty() {
                return Err(WebDriverError::NoSession);
            }
            state.session_id.clone()
        };
        body.insert("sessionId".to_string(), json!(session_id));
        self.inner.conn.execute(&cmd, &body).await
    }

    pub(crate) async fn void(&self, cmd: Command, body: Params) -> Result<()> {
        self.execute(cmd, body).await.map(|_| ())
    }

    pub(crate) async fn string(&self, cmd: Command, body: Params) -> Result<String> {
        let reply = self.execute(cmd, body).await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    pub(crate) async fn boolean(&self, cmd: Command, body: Params) -> Result<bool> {
        let reply = self.execute(cmd, body).await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub async fn goto(&self, url: impl AsRef<str>) -> Result<()> {
        self.void(Command::Get, params(json!({"url": url.as_ref()})))
            .await
    }

    pub async fn current_url(&self) -> Result<String> {
        self.string(Command::GetCurrentUrl, Params::new()).await
    }

    pub async fn back(&self) -> Result<()> {
        self.void(Command::GoBack, Params::new()).await
    }

    pub async fn forward(&self) -> Result<()> {
        self.void(Command::GoForward, Params::new()).await
    }

    pub async fn refresh(&self) -> Result<()> {
        self.void(Command::Refresh, Params::new()).await
    }

    pub async fn title(&self) -> Result<String> {
        self.string(Command::GetTitle, Params::new()).await
    }

    pub async fn page_source(&self) -> Result<String> {
        self.string(Command::GetPageSource, Params::new()).await
    }

    // ------------------------------------------------------------------
    // Element location
    // ------------------------------------------------------------------

    pub(crate) fn element_from_value(&self, value: &Value) -> Result<Element> {
        let id = value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WebDriverError::unexpected(format!("invalid element reference: {value}"))
            })?;
        Ok(Element::new(self.clone(), id))
    }

    pub(crate) fn elements_from_value(&self, value: &Value) -> Result<Vec<Element>> {
        let list = value.as_array().ok_or_else(|| {
            WebDriverError::unexpected(format!("expected an element list, got {value}"))
        })?;
        list.iter().map(|v| self.element_from_value(v)).collect()
    }

    /// Finds the first element matching the locator.
    pub async fn find_element(&self, by: By, value: impl AsRef<str>) -> Result<Element> {
        let (using, value) = by.resolve(value.as_ref())?;
        let reply = self
            .execute(
                Command::FindElement,
                params(json!({"using": using, "value": value})),
            )
            .await?;
        self.element_from_value(&reply.value)
    }

    /// Finds every element matching the locator, in document order.
    pub async fn find_elements(&self, by: By, value: impl AsRef<str>) -> Result<Vec<Element>> {
        let (using, value) = by.resolve(value.as_ref())?;
        let reply = self
            .execute(
                Command::FindElements,
                params(json!({"using": using, "value": value})),
            )
            .await?;
        self.elements_from_value(&reply.value)
    }

    pub async fn active_element(&self) -> Result<Element> {
        let reply = self.execute(Command::GetActiveElement, Params::new()).await?;
        self.element_from_value(&reply.value)
    }

    // ------------------------------------------------------------------
    // Windows and frames
    // ------------------------------------------------------------------

    pub async fn window_handle(&self) -> Result<String> {
        self.string(Command::GetWindowHandle, Params::new()).await
    }

    pub async fn window_handles(&self) -> Result<Vec<String>> {
        let reply = self.execute(Command::GetWindowHandles, Params::new()).await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    /// Opens a new top-level browsing context and returns its handle.
    pub async fn new_window(&self, kind: WindowType) -> Result<String> {
        let reply = self
            .execute(Command::NewWindow, params(json!({"type": kind})))
            .await?;
        reply
            .value
            .get("handle")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                WebDriverError::unexpected(format!("new window reply: {}", reply.value))
            })
    }

    pub async fn close_window(&self) -> Result<()> {
        self.void(Command::CloseWindow, Params::new()).await
    }

    pub async fn switch_to_window(&self, handle: impl AsRef<str>) -> Result<()> {
        self.void(
            Command::SwitchToWindow,
            params(json!({"handle": handle.as_ref()})),
        )
        .await
    }

    pub async fn switch_to_frame(&self, frame: FrameRef) -> Result<()> {
        let id = match frame {
            FrameRef::Top => Value::Null,
            FrameRef::Index(i) => json!(i),
            FrameRef::Element(el) => json!({ELEMENT_KEY: el.id()}),
        };
        self.void(Command::SwitchToFrame, params(json!({"id": id})))
            .await
    }

    pub async fn switch_to_parent_frame(&self) -> Result<()> {
        self.void(Command::SwitchToParentFrame, Params::new()).await
    }

    pub async fn maximize_window(&self) -> Result<()> {
        self.void(Command::MaximizeWindow, Params::new()).await
    }

    pub async fn minimize_window(&self) -> Result<()> {
        self.void(Command::MinimizeWindow, Params::new()).await
    }

    pub async fn fullscreen_window(&self) -> Result<()> {
        self.void(Command::FullscreenWindow, Params::new()).await
    }

    pub async fn window_rect(&self) -> Result<Rect> {
        let reply = self.execute(Command::GetWindowRect, Params::new()).await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    pub async fn set_window_rect(&self, rect: Rect) -> Result<Rect> {
        let reply = self
            .execute(
                Command::SetWindowRect,
                params(json!({
                    "x": rect.x,
                    "y": rect.y,
                    "width": rect.width,
                    "height": rect.height,
                })),
            )
            .await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    // ------------------------------------------------------------------
    // Cookies
    // ------------------------------------------------------------------

    pub async fn cookies(&self) -> Result<Vec<Cookie>> {
        let reply = self.execute(Command::GetAllCookies, Params::new()).await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    /// Retrieves one cookie by name.
    ///
    /// Some chromedriver builds do not implement the single-cookie
    /// endpoint, so for chrome sessions the full jar is fetched and
    /// filtered instead. Geckodriver occasionally answers the single-cookie
    /// endpoint with a list; both shapes are accepted.
    pub async fn cookie(&self, name: impl AsRef<str>) -> Result<Cookie> {
        let name = name.as_ref();
        if self.browser_name() == "chrome" {
            return self
                .cookies()
                .await?
                .into_iter()
                .find(|c| c.name == name)
                .ok_or_else(|| WebDriverError::unexpected(format!("cookie {name:?} not found")));
        }

        let reply = self
            .execute(Command::GetCookie, params(json!({"name": name})))
            .await?;
        if let Ok(cookie) = serde_json::from_value::<Cookie>(reply.value.clone()) {
            return Ok(cookie);
        }
        let mut list: Vec<Cookie> = serde_json::from_value(reply.value)?;
        if list.is_empty() {
            return Err(WebDriverError::unexpected(format!(
                "no cookie returned for {name:?}"
            )));
        }
        Ok(list.remove(0))
    }

    pub async fn add_cookie(&self, cookie: &Cookie) -> Result<()> {
        self.void(Command::AddCookie, params(json!({"cookie": cookie})))
            .await
    }

    pub async fn delete_cookie(&self, name: impl AsRef<str>) -> Result<()> {
        self.void(Command::DeleteCookie, params(json!({"name": name.as_ref()})))
            .await
    }

    pub async fn delete_all_cookies(&self) -> Result<()> {
        self.void(Command::DeleteAllCookies, Params::new()).await
    }

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    pub async fn accept_alert(&self) -> Result<()> {
        self.void(Command::AcceptAlert, Params::new()).await
    }

    pub async fn dismiss_alert(&self) -> Result<()> {
        self.void(Command::DismissAlert, Params::new()).await
    }

    pub async fn alert_text(&self) -> Result<String> {
        self.string(Command::GetAlertText, Params::new()).await
    }

    pub async fn send_alert_text(&self, text: impl AsRef<str>) -> Result<()> {
        self.void(Command::SendAlertText, params(json!({"text": text.as_ref()})))
            .await
    }

    // ------------------------------------------------------------------
    // Script execution
    // ------------------------------------------------------------------

    /// Executes synchronous JavaScript in the current browsing context and
    /// returns its completion value.
    pub async fn execute_script(
        &self,
        script: impl AsRef<str>,
        args: Vec<Value>,
    ) -> Result<Value> {
        let reply = self
            .execute(
                Command::ExecuteScript,
                params(json!({"script": script.as_ref(), "args": args})),
            )
            .await?;
        Ok(reply.value)
    }

    /// Executes JavaScript that signals completion by calling its final
    /// callback argument.
    pub async fn execute_async_script(
        &self,
        script: impl AsRef<str>,
        args: Vec<Value>,
    ) -> Result<Value> {
        let reply = self
            .execute(
                Command::ExecuteAsyncScript,
                params(json!({"script": script.as_ref(), "args": args})),
            )
            .await?;
        Ok(reply.value)
    }

    // ------------------------------------------------------------------
    // Screenshots and printing
    // ------------------------------------------------------------------

    /// Captures the viewport and returns the decoded image bytes.
    pub async fn screenshot(&self) -> Result<Vec<u8>> {
        let data = self.string(Command::TakeScreenshot, Params::new()).await?;
        utils::decode_base64(&data)
    }

    /// Renders the page to a paginated document and returns its bytes.
    pub async fn print(&self, options: &PrintOptions) -> Result<Vec<u8>> {
        let reply = self
            .execute(Command::PrintPage, params(options.to_value()))
            .await?;
        let data: String = serde_json::from_value(reply.value)?;
        utils::decode_base64(&data)
    }

    // ------------------------------------------------------------------
    // Timeouts
    // ------------------------------------------------------------------

    pub async fn timeouts(&self) -> Result<Timeouts> {
        let reply = self.execute(Command::GetTimeouts, Params::new()).await?;
        Timeouts::from_value(&reply.value)
    }

    pub async fn set_timeouts(&self, timeouts: Timeouts) -> Result<()> {
        let map = timeouts.to_capabilities();
        if map.is_empty() {
            return Err(WebDriverError::invalid_argument(
                "no timeout values to set",
            ));
        }
        self.void(Command::SetTimeouts, map).await
    }

    // ------------------------------------------------------------------
    // Virtual authenticators
    // ------------------------------------------------------------------

    /// Creates a virtual WebAuthn authenticator from its option map (e.g.
    /// `{"protocol": "ctap2", "transport": "usb"}`) and returns its id.
    pub async fn add_virtual_authenticator(&self, options: Value) -> Result<String> {
        let body = match options {
            Value::Object(map) => map,
            other => {
                return Err(WebDriverError::invalid_argument(format!(
                    "authenticator options must be an object, got {other}"
                )))
            }
        };
        self.string(Command::AddVirtualAuthenticator, body).await
    }

    pub async fn remove_virtual_authenticator(
        &self,
        authenticator_id: impl AsRef<str>,
    ) -> Result<()> {
        self.void(
            Command::RemoveVirtualAuthenticator,
            params(json!({"authenticatorId": authenticator_id.as_ref()})),
        )
        .await
    }

    /// Injects a credential into a virtual authenticator. The credential
    /// map follows the WebAuthn extension schema (`credentialId`,
    /// `isResidentCredential`, `rpId`, `privateKey`, ...).
    pub async fn add_credential(
        &self,
        authenticator_id: impl AsRef<str>,
        credential: Value,
    ) -> Result<()> {
        let mut body = match credential {
            Value::Object(map) => map,
            other => {
                return Err(WebDriverError::invalid_argument(format!(
                    "credential must be an object, got {other}"
                )))
            }
        };
        body.insert(
            "authenticatorId".to_string(),
            json!(authenticator_id.as_ref()),
        );
        self.void(Command::AddCredential, body).await
    }

    pub async fn credentials(&self, authenticator_id: impl AsRef<str>) -> Result<Vec<Value>> {
        let reply = self
            .execute(
                Command::GetCredentials,
                params(json!({"authenticatorId": authenticator_id.as_ref()})),
            )
            .await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    pub async fn remove_credential(
        &self,
        authenticator_id: impl AsRef<str>,
        credential_id: impl AsRef<str>,
    ) -> Result<()> {
        self.void(
            Command::RemoveCredential,
            params(json!({
                "authenticatorId": authenticator_id.as_ref(),
                "credentialId": credential_id.as_ref(),
            })),
        )
        .await
    }

    pub async fn remove_all_credentials(
        &self,
        authenticator_id: impl AsRef<str>,
    ) -> Result<()> {
        self.void(
            Command::RemoveAllCredentials,
            params(json!({"authenticatorId": authenticator_id.as_ref()})),
        )
        .await
    }

    /// Toggles user-verified state on a virtual authenticator.
    pub async fn set_user_verified(
        &self,
        authenticator_id: impl AsRef<str>,
        verified: bool,
    ) -> Result<()> {
        self.void(
            Command::SetUserVerified,
            params(json!({
                "authenticatorId": authenticator_id.as_ref(),
                "isUserVerified": verified,
            })),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Remote file management
    // ------------------------------------------------------------------

    /// Uploads a zip archive to the remote end and returns the path the
    /// file landed at there. The archive must contain a single file.
    pub async fn upload_file(&self, zipped: &[u8]) -> Result<String> {
        self.string(
            Command::UploadFile,
            params(json!({"file": utils::encode_base64(zipped)})),
        )
        .await
    }

    /// Lists the names of files downloaded by the remote session. Requires
    /// the `se:downloadsEnabled` capability.
    pub async fn downloadable_files(&self) -> Result<Vec<String>> {
        let reply = self
            .execute(Command::GetDownloadableFiles, Params::new())
            .await?;
        Ok(reply
            .value
            .get("names")
            .map(|names| serde_json::from_value(names.clone()))
            .transpose()?
            .unwrap_or_default())
    }

    /// Fetches a downloaded file by name. The reply's `contents` field is a
    /// base64 zip archive; the decoded bytes are returned.
    pub async fn download_file(&self, name: impl AsRef<str>) -> Result<Vec<u8>> {
        let reply = self
            .execute(
                Command::DownloadFile,
                params(json!({"name": name.as_ref()})),
            )
            .await?;
        let contents = reply
            .value
            .get("contents")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WebDriverError::unexpected(format!("download reply: {}", reply.value))
            })?;
        utils::decode_base64(contents)
    }

    /// Removes one downloaded file from the remote end's store.
    pub async fn delete_downloaded_file(&self, name: impl AsRef<str>) -> Result<()> {
        self.void(
            Command::DeleteDownloadedFile,
            params(json!({"name": name.as_ref()})),
        )
        .await
    }

    pub async fn delete_downloadable_files(&self) -> Result<()> {
        self.void(Command::DeleteDownloadableFiles, Params::new())
            .await
    }

    // ------------------------------------------------------------------
    // Federated credential management dialogs
    // ------------------------------------------------------------------

    pub async fn fedcm_title(&self) -> Result<String> {
        let reply = self.execute(Command::GetFedCmTitle, Params::new()).await?;
        reply
            .value
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                WebDriverError::unexpected(format!("fedcm title reply: {}", reply.value))
            })
    }

    /// The kind of dialog currently shown, e.g. `AccountChooser` or
    /// `AutoReauthn`.
    pub async fn fedcm_dialog_type(&self) -> Result<String> {
        self.string(Command::GetFedCmDialogType, Params::new()).await
    }

    /// The accounts offered by the open account chooser.
    pub async fn fedcm_account_list(&self) -> Result<Vec<Value>> {
        let reply = self
            .execute(Command::GetFedCmAccountList, Params::new())
            .await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    pub async fn select_fedcm_account(&self, index: u32) -> Result<()> {
        self.void(
            Command::SelectFedCmAccount,
            params(json!({"accountIndex": index})),
        )
        .await
    }

    pub async fn cancel_fedcm_dialog(&self) -> Result<()> {
        self.void(Command::CancelFedCmDialog, Params::new()).await
    }

    /// Enables or disables the promise-rejection delay so tests can poll
    /// dialog state deterministically.
    pub async fn set_fedcm_delay(&self, enabled: bool) -> Result<()> {
        self.void(Command::SetFedCmDelay, params(json!({"enabled": enabled})))
            .await
    }

    pub async fn click_fedcm_dialog_button(&self, button: impl AsRef<str>) -> Result<()> {
        self.void(
            Command::ClickFedCmDialogButton,
            params(json!({"dialogButton": button.as_ref()})),
        )
        .await
    }

    pub async fn reset_fedcm_cooldown(&self) -> Result<()> {
        self.void(Command::ResetFedCmCooldown, Params::new()).await
    }

    // ------------------------------------------------------------------
    // Mobile network and context
    // ------------------------------------------------------------------

    /// The network connection bitmask (airplane mode, wifi, data).
    pub async fn network_connection(&self) -> Result<u64> {
        let reply = self
            .execute(Command::GetNetworkConnection, Params::new())
            .await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    pub async fn set_network_connection(&self, connection_type: u64) -> Result<u64> {
        let reply = self
            .execute(
                Command::SetNetworkConnection,
                params(json!({"parameters": {"type": connection_type}})),
            )
            .await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    /// The current automation context, e.g. `NATIVE_APP` or a webview id.
    pub async fn current_context(&self) -> Result<String> {
        self.string(Command::GetCurrentContext, Params::new()).await
    }

    pub async fn contexts(&self) -> Result<Vec<String>> {
        let reply = self.execute(Command::GetContexts, Params::new()).await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    pub async fn switch_to_context(&self, name: impl AsRef<str>) -> Result<()> {
        self.void(
            Command::SwitchToContext,
            params(json!({"name": name.as_ref()})),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Logs
    // ------------------------------------------------------------------

    /// Retrieves one of the remote end's log streams.
    pub async fn log(&self, log_type: LogType) -> Result<Vec<LogEntry>> {
        let reply = self
            .execute(Command::GetLog, params(json!({"type": log_type})))
            .await?;
        Ok(serde_json::from_value(reply.value)?)
    }

    // ------------------------------------------------------------------
    // Stored low-level actions
    // ------------------------------------------------------------------

    /// Queues a key-device action list under the given input id. Nothing is
    /// sent until [`perform_actions`](WebDriver::perform_actions).
    pub fn store_key_actions<I>(&self, input_id: impl AsRef<str>, actions: I)
    where
        I: IntoIterator<Item = StoredAction>,
    {
        let actions: Vec<Value> = actions.into_iter().map(StoredAction::into_value).collect();
        self.state_write().stored_actions.push(json!({
            "type": "key",
            "id": input_id.as_ref(),
            "actions": actions,
        }));
    }

    /// Queues a pointer-device action list under the given input id.
    pub fn store_pointer_actions<I>(
        &self,
        input_id: impl AsRef<str>,
        pointer: PointerKind,
        actions: I,
    ) where
        I: IntoIterator<Item = StoredAction>,
    {
        let actions: Vec<Value> = actions.into_iter().map(StoredAction::into_value).collect();
        self.state_write().stored_actions.push(json!({
            "type": "pointer",
            "id": input_id.as_ref(),
            "parameters": {"pointerType": pointer.as_str()},
            "actions": actions,
        }));
    }

    /// Flushes every stored device record as one `/actions` payload. The
    /// queue is cleared once the request has been handed to the transport,
    /// so after a lost reply callers must rebuild from observed state.
    pub async fn perform_actions(&self) -> Result<()> {
        let stored = std::mem::take(&mut self.state_write().stored_actions);
        self.void(Command::PerformActions, params(json!({"actions": stored})))
            .await
    }

    /// Releases every depressed key and button on the remote end.
    pub async fn release_actions(&self) -> Result<()> {
        self.void(Command::ReleaseActions, Params::new()).await
    }

    /// Presses every character of `keys` on a synthetic keyboard, without
    /// releasing. Dispatches immediately, bypassing the stored queue.
    pub async fn key_down(&self, keys: impl AsRef<str>) -> Result<()> {
        self.key_action("keyDown", keys.as_ref()).await
    }

    /// Releases every character of `keys` on the synthetic keyboard.
    pub async fn key_up(&self, keys: impl AsRef<str>) -> Result<()> {
        self.key_action("keyUp", keys.as_ref()).await
    }

    async fn key_action(&self, kind: &str, keys: &str) -> Result<()> {
        let actions: Vec<Value> = keys
            .chars()
            .map(|c| json!({"type": kind, "value": c.to_string()}))
            .collect();
        self.void(
            Command::PerformActions,
            params(json!({
                "actions": [{
                    "type": "key",
                    "id": "default keyboard",
                    "actions": actions,
                }],
            })),
        )
        .await
    }

    #[cfg(test)]
    pub(crate) fn stored_actions_snapshot(&self) -> Vec<Value> {
        self.state_read().stored_actions.clone()
    }

    // ------------------------------------------------------------------

    fn state_read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().expect("session state poisoned")
    }

    fn state_write(&self) -> std::sync::RwLockWriteGuard<'_, SessionState> {
        self.inner.state.write().expect("session state poisoned")
    }
}

impl std::fmt::Debug for WebDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state_read();
        f.debug_struct("WebDriver")
            .field("remote", &self.inner.conn.remote_addr())
            .field("session_id", &state.session_id)
            .field("browser", &state.browser_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{key_down, key_up, pointer_down, pointer_up, MouseButton};

    fn unbound() -> WebDriver {
        WebDriver::new(ClientConfig::new("http://localhost:4444")).unwrap()
    }

    #[tokio::test]
    async fn commands_refuse_to_run_unbound() {
        let driver = unbound();
        match driver.title().await {
            Err(WebDriverError::NoSession) => {}
            other => panic!("expected NoSession, got {other:?}"),
        }
    }

    #[test]
    fn switch_session_rebinds() {
        let driver = unbound();
        assert_eq!(driver.session_id(), "");
        driver.switch_session("abc123");
        assert_eq!(driver.session_id(), "abc123");
    }

    #[test]
    fn stored_actions_compose_in_registration_order() {
        let driver = unbound();
        driver.store_key_actions("kb", [key_down("A"), key_up("A")]);
        driver.store_pointer_actions(
            "pt",
            PointerKind::Mouse,
            [
                pointer_down(MouseButton::Left),
                pointer_up(MouseButton::Left),
            ],
        );

        let stored = driver.stored_actions_snapshot();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0]["type"], "key");
        assert_eq!(stored[0]["id"], "kb");
        assert_eq!(stored[0]["actions"][0], json!({"type": "keyDown", "value": "A"}));
        assert_eq!(stored[0]["actions"][1], json!({"type": "keyUp", "value": "A"}));
        assert_eq!(stored[1]["type"], "pointer");
        assert_eq!(stored[1]["parameters"], json!({"pointerType": "mouse"}));
        assert_eq!(stored[1]["actions"][0], json!({"type": "pointerDown", "button": 0}));
        assert_eq!(stored[1]["actions"][1], json!({"type": "pointerUp", "button": 0}));
    }
}
