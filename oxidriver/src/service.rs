//! The driver service supervisor: spawns a local driver binary (geckodriver,
//! chromedriver, a grid jar wrapper), waits for it to become reachable, and
//! tears it down.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::time::sleep;

use crate::error::{Result, WebDriverError};

const READINESS_ATTEMPTS: u32 = 70;
const READINESS_MAX_DELAY: Duration = Duration::from_millis(500);

lazy_static::lazy_static! {
    /// Short-timeout client for readiness and shutdown probes.
    static ref PROBE_CLIENT: reqwest::Client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("probe client");
}

/// The driver binaries this supervisor knows how to start. The flavor picks
/// the port argv convention and whether the driver honours the legacy
/// `/shutdown` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverFlavor {
    /// `chromedriver --port=N --verbose`; supports `/shutdown`.
    Chromedriver,
    /// `geckodriver --port N`.
    Geckodriver,
    /// `msedgedriver --port=N`; supports `/shutdown`.
    Edgedriver,
    /// `safaridriver --port N`.
    Safaridriver,
    /// Anything speaking W3C on `--port=N`.
    Generic,
}

impl DriverFlavor {
    fn port_args(self, port: u16) -> Vec<String> {
        match self {
            DriverFlavor::Chromedriver => {
                vec![format!("--port={port}"), "--verbose".to_string()]
            }
            DriverFlavor::Edgedriver | DriverFlavor::Generic => vec![format!("--port={port}")],
            DriverFlavor::Geckodriver | DriverFlavor::Safaridriver => {
                vec!["--port".to_string(), port.to_string()]
            }
        }
    }

    fn supports_shutdown_url(self) -> bool {
        matches!(self, DriverFlavor::Chromedriver | DriverFlavor::Edgedriver)
    }
}

/// Builder for a [`DriverService`].
#[derive(Debug, Clone)]
pub struct DriverServiceBuilder {
    executable: PathBuf,
    flavor: DriverFlavor,
    port: u16,
    args: Vec<String>,
    envs: HashMap<String, String>,
    display: Option<String>,
    xauthority: Option<String>,
}

impl DriverServiceBuilder {
    pub fn new(executable: impl AsRef<Path>, flavor: DriverFlavor) -> Self {
        DriverServiceBuilder {
            executable: executable.as_ref().to_path_buf(),
            flavor,
            port: 0,
            args: Vec::new(),
            envs: HashMap::new(),
            display: None,
            xauthority: None,
        }
    }

    /// A fixed port; 0 (the default) picks a free ephemeral port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    /// X display for the driver's browser, e.g. `":99"`.
    pub fn display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn xauthority(mut self, path: impl Into<String>) -> Self {
        self.xauthority = Some(path.into());
        self
    }

    /// Spawns the driver and waits until it accepts connections.
    pub async fn start(self) -> Result<DriverService> {
        let port = match self.port {
            0 => free_port().await?,
            p => p,
        };

        let mut cmd = Command::new(&self.executable);
        cmd.args(self.flavor.port_args(port))
            .args(&self.args)
            .envs(&self.envs)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);
        if let Some(display) = &self.display {
            cmd.env("DISPLAY", display);
        }
        if let Some(xauthority) = &self.xauthority {
            cmd.env("XAUTHORITY", xauthority);
        }

        tracing::debug!(executable = %self.executable.display(), port, "starting driver");
        let child = cmd.spawn()?;

        let mut service = DriverService {
            child: Some(child),
            port,
            flavor: self.flavor,
        };

        if let Err(err) = service.wait_until_connectable().await {
            let _ = service.stop().await;
            return Err(err);
        }
        Ok(service)
    }
}

/// A supervised local driver process.
#[derive(Debug)]
pub struct DriverService {
    child: Option<Child>,
    port: u16,
    flavor: DriverFlavor,
}

impl DriverService {
    pub fn builder(
        executable: impl AsRef<Path>,
        flavor: DriverFlavor,
    ) -> DriverServiceBuilder {
        DriverServiceBuilder::new(executable, flavor)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The base URL a client should connect to.
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Polls until the driver is reachable: first a TCP connect, then the
    /// `/status` endpoint. Legacy remote ends answer `/status` with 400 or
    /// 403 while perfectly ready, so those count as reachable.
    async fn wait_until_connectable(&mut self) -> Result<()> {
        let addr = format!("localhost:{}", self.port);
        for attempt in 0..READINESS_ATTEMPTS {
            if let Some(child) = self.child.as_mut() {
                if let Ok(Some(status)) = child.try_wait() {
                    return Err(WebDriverError::DriverExited(status.code()));
                }
            }

            if TcpStream::connect(&addr).await.is_ok() {
                match PROBE_CLIENT
                    .get(format!("{}/status", self.url()))
                    .send()
                    .await
                {
                    Ok(resp) if matches!(resp.status().as_u16(), 200 | 400 | 403) => {
                        tracing::debug!(port = self.port, attempt, "driver ready");
                        return Ok(());
                    }
                    // Connectable but not answering status yet; the TCP
                    // connect alone is an acceptable readiness signal.
                    Ok(_) | Err(_) => return Ok(()),
                }
            }

            let delay = Duration::from_millis(10 + 50 * u64::from(attempt));
            sleep(delay.min(READINESS_MAX_DELAY)).await;
        }
        Err(WebDriverError::DriverUnreachable(self.port))
    }

    /// Shuts the driver down. Uses the legacy `/shutdown` endpoint when the
    /// flavor supports it, otherwise kills the process. Idempotent; a
    /// kill-induced exit status counts as success.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if self.flavor.supports_shutdown_url() {
            let _ = PROBE_CLIENT
                .get(format!("{}/shutdown", self.url()))
                .send()
                .await;
            // Give it a moment to exit on its own before forcing.
            for _ in 0..10 {
                if let Ok(Some(_)) = child.try_wait() {
                    return Ok(());
                }
                sleep(Duration::from_millis(50)).await;
            }
        }

        child.kill().await?;
        let _ = child.wait().await;
        Ok(())
    }
}

impl Drop for DriverService {
    fn drop(&mut self) {
        if self.child.is_some() {
            // kill_on_drop reaps the process in the background.
            tracing::warn!(
                port = self.port,
                "driver service dropped without stop(); killing in the background"
            );
        }
    }
}

async fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

/// Locates a driver binary for a browser.
///
/// Resolution order: an explicit path wins; otherwise, when
/// `SE_MANAGER_PATH` points at a driver-manager binary it is asked for the
/// path; finally the conventional binary name is searched on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct DriverFinder {
    explicit: Option<PathBuf>,
}

impl DriverFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.explicit = Some(path.as_ref().to_path_buf());
        self
    }

    pub async fn driver_path(&self, browser_name: &str) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            if path.is_file() {
                return Ok(path.clone());
            }
            return Err(WebDriverError::invalid_argument(format!(
                "driver executable not found at {}",
                path.display()
            )));
        }

        if let Ok(manager) = std::env::var("SE_MANAGER_PATH") {
            if !manager.is_empty() && Path::new(&manager).is_file() {
                return manager_driver_path(&manager, browser_name).await;
            }
        }

        let binary = conventional_driver_name(browser_name)?;
        search_path(binary).ok_or_else(|| {
            WebDriverError::invalid_argument(format!("{binary} not found on PATH"))
        })
    }
}

async fn manager_driver_path(manager: &str, browser_name: &str) -> Result<PathBuf> {
    let output = Command::new(manager)
        .args(["--browser", browser_name, "--output", "json"])
        .output()
        .await?;
    if !output.status.success() {
        return Err(WebDriverError::invalid_argument(format!(
            "driver manager exited with {:?}",
            output.status.code()
        )));
    }
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    parsed
        .get("result")
        .and_then(|r| r.get("driver_path"))
        .and_then(serde_json::Value::as_str)
        .map(PathBuf::from)
        .ok_or_else(|| {
            WebDriverError::unexpected("driver manager output had no driver_path".to_string())
        })
}

fn conventional_driver_name(browser_name: &str) -> Result<&'static str> {
    match browser_name {
        "chrome" => Ok("chromedriver"),
        "firefox" => Ok("geckodriver"),
        "MicrosoftEdge" => Ok("msedgedriver"),
        "safari" => Ok("safaridriver"),
        other => Err(WebDriverError::invalid_argument(format!(
            "no conventional driver binary known for browser {other:?}"
        ))),
    }
}

fn search_path(binary: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flavor_argv_conventions() {
        assert_eq!(
            DriverFlavor::Chromedriver.port_args(9515),
            ["--port=9515", "--verbose"]
        );
        assert_eq!(DriverFlavor::Geckodriver.port_args(4444), ["--port", "4444"]);
        assert_eq!(DriverFlavor::Generic.port_args(7777), ["--port=7777"]);
    }

    #[test]
    fn shutdown_url_support() {
        assert!(DriverFlavor::Chromedriver.supports_shutdown_url());
        assert!(!DriverFlavor::Geckodriver.supports_shutdown_url());
    }

    #[tokio::test]
    async fn free_port_yields_a_bindable_port() {
        let port = free_port().await.unwrap();
        assert_ne!(port, 0);
        // The port was released, so binding it again succeeds.
        TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    }

    #[test]
    fn conventional_names() {
        assert_eq!(conventional_driver_name("chrome").unwrap(), "chromedriver");
        assert_eq!(conventional_driver_name("firefox").unwrap(), "geckodriver");
        assert!(conventional_driver_name("netscape").is_err());
    }
}
