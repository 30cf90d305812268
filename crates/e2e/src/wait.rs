//! Bounded polling waits
//!
//! Each wait checks the browser, sleeps for the configured interval and tries
//! again until the condition holds or the timeout elapses. The condition is
//! always checked at least once, and a final check is made at the deadline.

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

use crate::config::WaitConfig;
use crate::driver::Driver;
use crate::error::{E2eError, E2eResult};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
pub struct Waiter {
    timeout: Duration,
    interval: Duration,
}

impl Default for Waiter {
    fn default() -> Self {
        Self::from(WaitConfig::default())
    }
}

impl From<WaitConfig> for Waiter {
    fn from(config: WaitConfig) -> Self {
        Self::new(config.timeout(), config.interval())
    }
}

impl Waiter {
    /// The interval is floored at 1 ms
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Same polling interval, different timeout
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Poll until `condition` holds or the timeout elapses
    pub async fn until<D>(&self, driver: &mut D, condition: Condition<'_>) -> E2eResult<()>
    where
        D: Driver + ?Sized,
    {
        let start = Instant::now();
        let mut attempts = 0usize;

        loop {
            attempts += 1;
            if condition.holds(driver).await? {
                debug!("{} after {} attempt(s)", condition, attempts);
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                return Err(E2eError::Timeout {
                    condition: condition.describe(),
                    selector: condition.selector().to_string(),
                    waited_ms: elapsed.as_millis() as u64,
                });
            }

            sleep(self.interval.min(self.timeout - elapsed)).await;
        }
    }

    /// Wait until an element matching `selector` is in the DOM
    pub async fn until_seen<D>(&self, driver: &mut D, selector: &str) -> E2eResult<()>
    where
        D: Driver + ?Sized,
    {
        self.until(driver, Condition::Present(selector)).await
    }

    /// Wait until no element matches `selector`
    pub async fn until_gone<D>(&self, driver: &mut D, selector: &str) -> E2eResult<()>
    where
        D: Driver + ?Sized,
    {
        self.until(driver, Condition::Absent(selector)).await
    }

    /// Wait until the text of `selector` contains `text`
    pub async fn until_text_seen_in<D>(
        &self,
        driver: &mut D,
        text: &str,
        selector: &str,
    ) -> E2eResult<()>
    where
        D: Driver + ?Sized,
    {
        self.until(driver, Condition::TextContains { selector, text })
            .await
    }
}

/// Something about the page a [`Waiter`] can poll for
#[derive(Debug, Clone, Copy)]
pub enum Condition<'a> {
    Present(&'a str),
    Absent(&'a str),
    TextContains { selector: &'a str, text: &'a str },
}

impl Condition<'_> {
    pub fn selector(&self) -> &str {
        match self {
            Condition::Present(selector) | Condition::Absent(selector) => selector,
            Condition::TextContains { selector, .. } => selector,
        }
    }

    fn describe(&self) -> String {
        match self {
            Condition::Present(_) => "element to be present".to_string(),
            Condition::Absent(_) => "element to disappear".to_string(),
            Condition::TextContains { text, .. } => format!("text \"{}\"", text),
        }
    }

    async fn holds<D>(&self, driver: &mut D) -> E2eResult<bool>
    where
        D: Driver + ?Sized,
    {
        match *self {
            Condition::Present(selector) => driver.is_present(selector).await,
            Condition::Absent(selector) => Ok(!driver.is_present(selector).await?),
            Condition::TextContains { selector, text } => Ok(driver
                .text_of(selector)
                .await?
                .map(|actual| actual.contains(text))
                .unwrap_or(false)),
        }
    }
}

impl std::fmt::Display for Condition<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in `{}`", self.describe(), self.selector())
    }
}
