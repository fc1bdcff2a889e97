//! The HTTP side of the protocol: connection configuration, header policy,
//! and the command dispatcher that turns a logical [`Command`] plus a
//! parameter map into a W3C request/reply round trip.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, CONNECTION, CONTENT_TYPE, PROXY_AUTHORIZATION,
    USER_AGENT,
};
use serde_json::Value;

use oxidriver_types::{ServerReply, WireError};

use crate::command::{Command, EndpointTable, HttpMethod};
use crate::error::{ErrorKind, ProtocolError, Result, WebDriverError};
use crate::utils;

/// The default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const JSON_CONTENT_TYPE: &str = "application/json";

/// A command's parameter map. Keys double as path variables: every `$key`
/// occurrence in the endpoint's path template is replaced with the
/// stringified value.
pub type Params = serde_json::Map<String, Value>;

/// Unwraps a `json!({...})` literal into a parameter map.
pub(crate) fn params(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// Configuration of a remote connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the remote end, e.g. `http://localhost:4444`.
    pub remote_server_addr: String,
    pub keep_alive: bool,
    /// Disables TLS certificate verification.
    pub ignore_certificates: bool,
    pub timeout: Duration,
    /// Path to an extra PEM trust bundle. Seeded from `REQUESTS_CA_BUNDLE`.
    pub ca_certs: Option<String>,
    pub extra_headers: HashMap<String, String>,
    pub user_agent: String,
    /// Proxy URL; userinfo, when present, becomes a `Proxy-Authorization`
    /// basic auth header.
    pub proxy_url: Option<String>,
}

impl ClientConfig {
    pub fn new(remote_server_addr: impl Into<String>) -> Self {
        let mut addr = remote_server_addr.into();
        while addr.ends_with('/') {
            addr.pop();
        }
        ClientConfig {
            remote_server_addr: addr,
            keep_alive: true,
            ignore_certificates: false,
            timeout: DEFAULT_TIMEOUT,
            ca_certs: std::env::var("REQUESTS_CA_BUNDLE").ok().filter(|p| !p.is_empty()),
            extra_headers: HashMap::new(),
            user_agent: utils::user_agent(),
            proxy_url: None,
        }
    }

    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn ignore_certificates(mut self) -> Self {
        self.ignore_certificates = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ca_certs(mut self, path: impl Into<String>) -> Self {
        self.ca_certs = Some(path.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }
}

/// A pooled, thread-safe connection to one remote end, together with the
/// endpoint table commands resolve through.
#[derive(Debug)]
pub struct RemoteConnection {
    client: reqwest::Client,
    config: ClientConfig,
    headers: HeaderMap,
    endpoints: RwLock<EndpointTable>,
}

impl RemoteConnection {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json;charset=UTF-8"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| WebDriverError::invalid_argument(format!("user agent: {e}")))?,
        );
        if config.keep_alive {
            headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        }

        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if config.ignore_certificates {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if !config.keep_alive {
            builder = builder.pool_max_idle_per_host(0);
        }
        if let Some(path) = &config.ca_certs {
            let pem = std::fs::read(path)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }
        if let Some(proxy_url) = &config.proxy_url {
            let parsed = url::Url::parse(proxy_url)?;
            if !parsed.username().is_empty() {
                let credentials = format!(
                    "{}:{}",
                    parsed.username(),
                    parsed.password().unwrap_or_default()
                );
                let auth = format!("Basic {}", BASE64.encode(credentials));
                headers.insert(
                    PROXY_AUTHORIZATION,
                    HeaderValue::from_str(&auth).map_err(|e| {
                        WebDriverError::invalid_argument(format!("proxy credentials: {e}"))
                    })?,
                );
            }
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.clone())?);
        }

        for (name, value) in &config.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| WebDriverError::invalid_argument(format!("header {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| WebDriverError::invalid_argument(format!("header value: {e}")))?;
            headers.insert(name, value);
        }

        Ok(RemoteConnection {
            client: builder.build()?,
            config,
            headers,
            endpoints: RwLock::new(EndpointTable::new()),
        })
    }

    /// The base URL this connection talks to.
    pub fn remote_addr(&self) -> &str {
        &self.config.remote_server_addr
    }

    /// Registers an extra endpoint. Intended for setup time, before
    /// commands are in flight.
    pub fn add_command(
        &self,
        cmd: Command,
        method: HttpMethod,
        path: impl Into<std::borrow::Cow<'static, str>>,
    ) {
        self.endpoints
            .write()
            .expect("endpoint table poisoned")
            .add_command(cmd, method, path);
    }

    fn resolve(&self, cmd: &Command) -> Result<(HttpMethod, String)> {
        let table = self.endpoints.read().expect("endpoint table poisoned");
        let endpoint = table.endpoint(cmd).ok_or_else(|| {
            ProtocolError::local(
                ErrorKind::UnknownMethod,
                format!("no endpoint registered for command {cmd:?}"),
            )
        })?;
        Ok((endpoint.method, endpoint.path.to_string()))
    }

    /// Dispatches a command: resolves its endpoint, substitutes `$var` path
    /// tokens from the parameter map, serialises the map as the POST body,
    /// and interprets the W3C reply envelope.
    ///
    /// Substituted parameters are intentionally left in the body as well;
    /// remote ends ignore the extras.
    pub async fn execute(&self, cmd: &Command, params: &Params) -> Result<ServerReply> {
        let (method, template) = self.resolve(cmd)?;

        let mut path = template;
        for (key, value) in params {
            let token = format!("${key}");
            if path.contains(&token) {
                path = path.replace(&token, &stringify(value));
            }
        }

        let uri = format!("{}{}", self.config.remote_server_addr, path);
        tracing::debug!(command = ?cmd, method = method.as_str(), %uri, "dispatching");

        let mut request = self
            .client
            .request(method.into(), &uri)
            .headers(self.headers.clone());
        if method == HttpMethod::Post {
            request = request.body(serde_json::to_vec(params)?);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?;
        tracing::trace!(status, body = %String::from_utf8_lossy(&body), "reply");

        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if media_type != JSON_CONTENT_TYPE {
            return Err(WebDriverError::NotJson(content_type));
        }

        let reply: ServerReply = match serde_json::from_slice(&body) {
            Ok(reply) => reply,
            Err(err) => {
                if !(200..300).contains(&status) {
                    return Err(WebDriverError::BadStatus(status));
                }
                return Err(err.into());
            }
        };

        if !(200..300).contains(&status) {
            let wire = reply
                .top_level_error()
                .or_else(|| reply.value_error())
                .unwrap_or_else(|| WireError {
                    error: "unknown error".to_string(),
                    message: format!("request failed with status {status}"),
                    stacktrace: None,
                    data: None,
                });
            return Err(ProtocolError::new(wire, status).into());
        }
        if let Some(wire) = reply.top_level_error() {
            return Err(ProtocolError::new(wire, status).into());
        }
        if let Some(wire) = reply.value_error() {
            return Err(ProtocolError::new(wire, status).into());
        }

        Ok(reply)
    }
}

/// Path variables substitute as bare strings, everything else through its
/// JSON rendering.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_defaults() {
        let config = ClientConfig::new("http://localhost:4444/");
        assert_eq!(config.remote_server_addr, "http://localhost:4444");
        assert!(config.keep_alive);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.user_agent.starts_with("oxidriver/"));
    }

    #[test]
    fn path_variable_stringification() {
        assert_eq!(stringify(&json!("abc")), "abc");
        assert_eq!(stringify(&json!(42)), "42");
        assert_eq!(stringify(&json!(true)), "true");
    }

    #[test]
    fn unknown_command_is_a_local_unknown_method() {
        let conn = RemoteConnection::new(ClientConfig::new("http://localhost:4444")).unwrap();
        let err = conn.resolve(&Command::custom("nope")).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::UnknownMethod));
    }

    #[test]
    fn added_commands_resolve() {
        let conn = RemoteConnection::new(ClientConfig::new("http://localhost:4444")).unwrap();
        conn.add_command(
            Command::custom("launchApp"),
            HttpMethod::Post,
            "/session/$sessionId/apps/launch",
        );
        let (method, path) = conn.resolve(&Command::custom("launchApp")).unwrap();
        assert_eq!(method, HttpMethod::Post);
        assert_eq!(path, "/session/$sessionId/apps/launch");
    }
}
