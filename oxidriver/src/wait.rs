//! The polling wait primitive: run a condition against the session until it
//! succeeds, errors, or the timeout elapses.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::{Result, WebDriverError};
use crate::session::WebDriver;

/// Default ceiling for a wait.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default delay between condition polls.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(100);

impl WebDriver {
    /// Polls `condition` until it returns `Ok(true)`.
    ///
    /// The condition is evaluated immediately, then every `interval` until
    /// `timeout` has elapsed. A condition error aborts the wait at once and
    /// is returned as-is; running out of time yields
    /// [`WebDriverError::WaitTimeout`]. Dropping the returned future
    /// cancels the wait, but a condition error observed in the same poll
    /// wins over cancellation.
    pub async fn wait_with<F, Fut>(
        &self,
        mut condition: F,
        timeout: Duration,
        interval: Duration,
    ) -> Result<()>
    where
        F: FnMut(WebDriver) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let start = Instant::now();
        loop {
            if condition(self.clone()).await? {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(WebDriverError::WaitTimeout(start.elapsed()));
            }
            sleep(interval).await;
        }
    }

    /// [`wait_with`](WebDriver::wait_with) with the default 100 ms
    /// interval.
    pub async fn wait_timeout<F, Fut>(&self, condition: F, timeout: Duration) -> Result<()>
    where
        F: FnMut(WebDriver) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        self.wait_with(condition, timeout, DEFAULT_WAIT_INTERVAL)
            .await
    }

    /// [`wait_with`](WebDriver::wait_with) with the default 60 s timeout
    /// and 100 ms interval.
    pub async fn wait<F, Fut>(&self, condition: F) -> Result<()>
    where
        F: FnMut(WebDriver) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        self.wait_with(condition, DEFAULT_WAIT_TIMEOUT, DEFAULT_WAIT_INTERVAL)
            .await
    }
}
