//! The endpoint table: a static mapping from every logical command to the
//! HTTP method and path template that carries it.
//!
//! Path templates contain `$name` placeholders which the dispatcher fills
//! from the command's parameter map.

use std::borrow::Cow;
use std::collections::HashMap;

/// A logical WebDriver command, resolved to `(method, path)` through the
/// [`EndpointTable`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Command {
    // Session
    Status,
    NewSession,
    DeleteSession,

    // Navigation
    GetCurrentUrl,
    Get,
    GoBack,
    GoForward,
    Refresh,
    GetTitle,
    GetPageSource,

    // Element location
    FindElement,
    FindElements,
    FindChildElement,
    FindChildElements,
    GetActiveElement,

    // Element interaction
    ClickElement,
    ClearElement,
    SendKeysToElement,
    SubmitElement,
    GetElementText,
    GetElementTagName,
    IsElementSelected,
    IsElementEnabled,
    IsElementDisplayed,
    GetElementRect,
    GetElementAttribute,
    GetElementProperty,
    GetElementCssValue,
    GetElementAriaRole,
    GetElementAriaLabel,
    TakeScreenshot,
    TakeElementScreenshot,

    // Script execution
    ExecuteScript,
    ExecuteAsyncScript,

    // Cookies
    GetAllCookies,
    GetCookie,
    AddCookie,
    DeleteCookie,
    DeleteAllCookies,

    // Windows and frames
    SwitchToFrame,
    SwitchToParentFrame,
    SwitchToWindow,
    GetWindowHandle,
    GetWindowHandles,
    NewWindow,
    CloseWindow,
    PrintPage,

    // Timeouts
    GetTimeouts,
    SetTimeouts,

    // Alerts
    AcceptAlert,
    DismissAlert,
    GetAlertText,
    SendAlertText,

    // Window state
    GetWindowRect,
    SetWindowRect,
    MaximizeWindow,
    MinimizeWindow,
    FullscreenWindow,

    // Actions
    PerformActions,
    ReleaseActions,

    // Shadow DOM
    GetShadowRoot,
    FindElementFromShadowRoot,
    FindElementsFromShadowRoot,

    // Virtual authenticators
    AddVirtualAuthenticator,
    RemoveVirtualAuthenticator,
    AddCredential,
    GetCredentials,
    RemoveCredential,
    RemoveAllCredentials,
    SetUserVerified,

    // Remote file management
    UploadFile,
    GetDownloadableFiles,
    DownloadFile,
    DeleteDownloadedFile,
    DeleteDownloadableFiles,

    // Federated credential management
    GetFedCmTitle,
    GetFedCmDialogType,
    GetFedCmAccountList,
    SelectFedCmAccount,
    CancelFedCmDialog,
    SetFedCmDelay,
    ClickFedCmDialogButton,
    ResetFedCmCooldown,

    // Mobile network and context
    GetNetworkConnection,
    SetNetworkConnection,
    GetCurrentContext,
    GetContexts,
    SwitchToContext,

    // Logs
    GetLog,

    /// A command registered at runtime through
    /// [`EndpointTable::add_command`].
    Custom(Cow<'static, str>),
}

impl Command {
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Command {
        Command::Custom(name.into())
    }
}

/// The HTTP method an endpoint is dispatched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An HTTP method plus a path template such as
/// `/session/$sessionId/element/$id/click`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: HttpMethod,
    pub path: Cow<'static, str>,
}

const DEFAULT_ENDPOINTS: &[(Command, HttpMethod, &str)] = {
    use Command::*;
    use HttpMethod::{Delete, Get, Post};
    &[
        (Status, Get, "/status"),
        (NewSession, Post, "/session"),
        (DeleteSession, Delete, "/session/$sessionId"),
        (GetCurrentUrl, Get, "/session/$sessionId/url"),
        (Command::Get, Post, "/session/$sessionId/url"),
        (GoBack, Post, "/session/$sessionId/back"),
        (GoForward, Post, "/session/$sessionId/forward"),
        (Refresh, Post, "/session/$sessionId/refresh"),
        (GetTitle, Get, "/session/$sessionId/title"),
        (GetPageSource, Get, "/session/$sessionId/source"),
        (FindElement, Post, "/session/$sessionId/element"),
        (FindElements, Post, "/session/$sessionId/elements"),
        (FindChildElement, Post, "/session/$sessionId/element/$id/element"),
        (FindChildElements, Post, "/session/$sessionId/element/$id/elements"),
        (GetActiveElement, Get, "/session/$sessionId/element/active"),
        (ClickElement, Post, "/session/$sessionId/element/$id/click"),
        (ClearElement, Post, "/session/$sessionId/element/$id/clear"),
        (SendKeysToElement, Post, "/session/$sessionId/element/$id/value"),
        (SubmitElement, Post, "/session/$sessionId/element/$id/submit"),
        (GetElementText, Get, "/session/$sessionId/element/$id/text"),
        (GetElementTagName, Get, "/session/$sessionId/element/$id/name"),
        (IsElementSelected, Get, "/session/$sessionId/element/$id/selected"),
        (IsElementEnabled, Get, "/session/$sessionId/element/$id/enabled"),
        (IsElementDisplayed, Get, "/session/$sessionId/element/$id/displayed"),
        (GetElementRect, Get, "/session/$sessionId/element/$id/rect"),
        (
            GetElementAttribute,
            Get,
            "/session/$sessionId/element/$id/attribute/$name",
        ),
        (
            GetElementProperty,
            Get,
            "/session/$sessionId/element/$id/property/$name",
        ),
        (
            GetElementCssValue,
            Get,
            "/session/$sessionId/element/$id/css/$propertyName",
        ),
        (
            GetElementAriaRole,
            Get,
            "/session/$sessionId/element/$id/computedrole",
        ),
        (
            GetElementAriaLabel,
            Get,
            "/session/$sessionId/element/$id/computedlabel",
        ),
        (TakeScreenshot, Get, "/session/$sessionId/screenshot"),
        (
            TakeElementScreenshot,
            Get,
            "/session/$sessionId/element/$id/screenshot",
        ),
        (ExecuteScript, Post, "/session/$sessionId/execute/sync"),
        (ExecuteAsyncScript, Post, "/session/$sessionId/execute/async"),
        (GetAllCookies, Get, "/session/$sessionId/cookie"),
        (GetCookie, Get, "/session/$sessionId/cookie/$name"),
        (AddCookie, Post, "/session/$sessionId/cookie"),
        (DeleteCookie, Delete, "/session/$sessionId/cookie/$name"),
        (DeleteAllCookies, Delete, "/session/$sessionId/cookie"),
        (SwitchToFrame, Post, "/session/$sessionId/frame"),
        (SwitchToParentFrame, Post, "/session/$sessionId/frame/parent"),
        (SwitchToWindow, Post, "/session/$sessionId/window"),
        (GetWindowHandle, Get, "/session/$sessionId/window"),
        (GetWindowHandles, Get, "/session/$sessionId/window/handles"),
        (NewWindow, Post, "/session/$sessionId/window/new"),
        (CloseWindow, Delete, "/session/$sessionId/window"),
        (PrintPage, Post, "/session/$sessionId/print"),
        (GetTimeouts, Get, "/session/$sessionId/timeouts"),
        (SetTimeouts, Post, "/session/$sessionId/timeouts"),
        (AcceptAlert, Post, "/session/$sessionId/alert/accept"),
        (DismissAlert, Post, "/session/$sessionId/alert/dismiss"),
        (GetAlertText, Get, "/session/$sessionId/alert/text"),
        (SendAlertText, Post, "/session/$sessionId/alert/text"),
        (GetWindowRect, Get, "/session/$sessionId/window/rect"),
        (SetWindowRect, Post, "/session/$sessionId/window/rect"),
        (MaximizeWindow, Post, "/session/$sessionId/window/maximize"),
        (MinimizeWindow, Post, "/session/$sessionId/window/minimize"),
        (FullscreenWindow, Post, "/session/$sessionId/window/fullscreen"),
        (PerformActions, Post, "/session/$sessionId/actions"),
        (ReleaseActions, Delete, "/session/$sessionId/actions"),
        (GetShadowRoot, Get, "/session/$sessionId/element/$id/shadow"),
        (
            FindElementFromShadowRoot,
            Post,
            "/session/$sessionId/shadow/$shadowId/element",
        ),
        (
            FindElementsFromShadowRoot,
            Post,
            "/session/$sessionId/shadow/$shadowId/elements",
        ),
        (AddVirtualAuthenticator, Post, "/session/$sessionId/authenticators"),
        (
            RemoveVirtualAuthenticator,
            Delete,
            "/session/$sessionId/authenticators/$authenticatorId",
        ),
        (
            AddCredential,
            Post,
            "/session/$sessionId/authenticators/$authenticatorId/credentials",
        ),
        (
            GetCredentials,
            Get,
            "/session/$sessionId/authenticators/$authenticatorId/credentials",
        ),
        (
            RemoveCredential,
            Delete,
            "/session/$sessionId/authenticators/$authenticatorId/credentials/$credentialId",
        ),
        (
            RemoveAllCredentials,
            Delete,
            "/session/$sessionId/authenticators/$authenticatorId/credentials",
        ),
        (
            SetUserVerified,
            Post,
            "/session/$sessionId/authenticators/$authenticatorId/uv",
        ),
        (UploadFile, Post, "/session/$sessionId/se/file"),
        (GetDownloadableFiles, Get, "/session/$sessionId/se/files"),
        (DownloadFile, Post, "/session/$sessionId/se/files"),
        (DeleteDownloadedFile, Delete, "/session/$sessionId/se/files"),
        (DeleteDownloadableFiles, Delete, "/session/$sessionId/se/files"),
        (GetFedCmTitle, Get, "/session/$sessionId/fedcm/gettitle"),
        (GetFedCmDialogType, Get, "/session/$sessionId/fedcm/getdialogtype"),
        (GetFedCmAccountList, Get, "/session/$sessionId/fedcm/accountlist"),
        (SelectFedCmAccount, Post, "/session/$sessionId/fedcm/selectaccount"),
        (CancelFedCmDialog, Delete, "/session/$sessionId/fedcm/canceldialog"),
        (SetFedCmDelay, Post, "/session/$sessionId/fedcm/setdelayenabled"),
        (
            ClickFedCmDialogButton,
            Post,
            "/session/$sessionId/fedcm/clickdialogbutton",
        ),
        (ResetFedCmCooldown, Post, "/session/$sessionId/fedcm/resetcooldown"),
        (GetNetworkConnection, Get, "/session/$sessionId/network_connection"),
        (SetNetworkConnection, Post, "/session/$sessionId/network_connection"),
        (GetCurrentContext, Get, "/session/$sessionId/context"),
        (GetContexts, Get, "/session/$sessionId/contexts"),
        (SwitchToContext, Post, "/session/$sessionId/context"),
        (GetLog, Post, "/session/$sessionId/log"),
    ]
};

/// The command-to-endpoint mapping a connection dispatches through.
///
/// Every connection owns its own copy so that [`add_command`] extensions
/// stay local to it. Writes are expected to happen during setup, not
/// concurrently with dispatch.
///
/// [`add_command`]: EndpointTable::add_command
#[derive(Debug, Clone)]
pub struct EndpointTable {
    endpoints: HashMap<Command, Endpoint>,
}

impl EndpointTable {
    pub fn new() -> Self {
        let endpoints = DEFAULT_ENDPOINTS
            .iter()
            .map(|(cmd, method, path)| {
                (
                    cmd.clone(),
                    Endpoint {
                        method: *method,
                        path: Cow::Borrowed(*path),
                    },
                )
            })
            .collect();
        EndpointTable { endpoints }
    }

    /// Registers (or overrides) an endpoint for a command.
    pub fn add_command(
        &mut self,
        cmd: Command,
        method: HttpMethod,
        path: impl Into<Cow<'static, str>>,
    ) {
        self.endpoints.insert(
            cmd,
            Endpoint {
                method,
                path: path.into(),
            },
        );
    }

    pub fn endpoint(&self, cmd: &Command) -> Option<&Endpoint> {
        self.endpoints.get(cmd)
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        EndpointTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_every_builtin() {
        let table = EndpointTable::new();
        assert_eq!(table.endpoints.len(), DEFAULT_ENDPOINTS.len());
        let ep = table.endpoint(&Command::ClickElement).unwrap();
        assert_eq!(ep.method, HttpMethod::Post);
        assert_eq!(ep.path, "/session/$sessionId/element/$id/click");
    }

    #[test]
    fn custom_commands_can_be_registered() {
        let mut table = EndpointTable::new();
        let cmd = Command::custom("launchApp");
        assert!(table.endpoint(&cmd).is_none());
        table.add_command(cmd.clone(), HttpMethod::Post, "/session/$sessionId/apps/launch");
        let ep = table.endpoint(&cmd).unwrap();
        assert_eq!(ep.method, HttpMethod::Post);
    }
}
