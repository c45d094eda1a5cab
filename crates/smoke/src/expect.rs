//! Auto-waiting assertions built on raw page primitives

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::page::{Locator, Page};
use crate::scenario::TitlePattern;

/// Wait budgets applied to every step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waits {
    /// Budget for `expect_*` assertions
    pub expect_timeout: Duration,
    /// Budget for locating an element before acting on it
    pub action_timeout: Duration,
    /// Delay between probes
    pub poll_interval: Duration,
}

impl Default for Waits {
    fn default() -> Self {
        Self {
            expect_timeout: Duration::from_secs(5),
            action_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Probe-then-sleep loop. Always probes at least once.
struct Deadline {
    at: Instant,
    interval: Duration,
}

impl Deadline {
    fn after(timeout: Duration, interval: Duration) -> Self {
        Self { at: Instant::now() + timeout, interval }
    }

    /// Sleeps until the next probe; false once the budget is spent
    async fn tick(&self) -> bool {
        let now = Instant::now();
        if now >= self.at {
            return false;
        }
        sleep(self.interval.min(self.at - now)).await;
        true
    }
}

/// Wait until the page title matches `pattern`, returning the matched title
pub async fn expect_title(
    page: &mut dyn Page,
    pattern: &TitlePattern,
    waits: &Waits,
) -> E2eResult<String> {
    let deadline = Deadline::after(waits.expect_timeout, waits.poll_interval);
    loop {
        let title = page.title().await?;
        if pattern.is_match(&title) {
            return Ok(title);
        }
        debug!("title {:?} does not match /{}/ yet", title, pattern);
        if !deadline.tick().await {
            return Err(E2eError::AssertionFailed {
                expected: format!("title matching /{}/", pattern),
                actual: format!("{:?}", title),
            });
        }
    }
}

/// Wait until at least one element matches, returning a locator for the first
pub async fn locate(page: &mut dyn Page, locator: &Locator, waits: &Waits) -> E2eResult<Locator> {
    let deadline = Deadline::after(waits.action_timeout, waits.poll_interval);
    loop {
        let count = page.count(locator).await?;
        if count > 0 {
            if count > 1 {
                debug!("{} matches {} elements, using the first", locator.describe(), count);
            }
            return Ok(locator.clone().nth(0));
        }
        if !deadline.tick().await {
            return Err(E2eError::ElementNotFound {
                role: locator.role.to_string(),
                name: locator.name.clone(),
            });
        }
    }
}

/// Wait until the first matching element is visible
pub async fn expect_visible(page: &mut dyn Page, locator: &Locator, waits: &Waits) -> E2eResult<()> {
    let first = locator.clone().nth(0);
    let deadline = Deadline::after(waits.expect_timeout, waits.poll_interval);
    loop {
        if page.is_visible(&first).await? {
            return Ok(());
        }
        if !deadline.tick().await {
            return Err(E2eError::Timeout {
                what: format!("{} to be visible", locator.describe()),
                timeout_ms: waits.expect_timeout.as_millis() as u64,
            });
        }
    }
}
