//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{E2eError, E2eResult};
use crate::expect::Waits;
use crate::playwright::{Browser, PlaywrightConfig};
use crate::smoke::DEFAULT_BASE_URL;

/// Top-level configuration, loadable from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmokeConfig {
    /// Site under test
    pub base_url: String,

    /// Directory of YAML scenarios (None = built-in smoke checks)
    pub scenarios_dir: Option<PathBuf>,

    /// Output directory for results and failure screenshots
    pub output_dir: PathBuf,

    /// Maximum number of scenarios running at once
    pub workers: usize,

    /// Budget for a whole scenario, including browser launch
    pub scenario_timeout_ms: u64,

    /// Browser settings
    pub browser: BrowserConfig,

    /// Wait budgets
    pub waits: WaitConfig,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            scenarios_dir: None,
            output_dir: PathBuf::from("test-results"),
            workers: 2,
            scenario_timeout_ms: 30_000,
            browser: BrowserConfig::default(),
            waits: WaitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Directory whose node_modules provides `playwright`
    pub project_dir: PathBuf,

    /// Node executable
    pub node_binary: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            project_dir: PathBuf::from("."),
            node_binary: PathBuf::from("node"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    pub expect_timeout_ms: u64,
    pub action_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            expect_timeout_ms: 5_000,
            action_timeout_ms: 5_000,
            navigation_timeout_ms: 15_000,
            poll_interval_ms: 100,
        }
    }
}

impl SmokeConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(E2eError::Config(format!(
                "base_url must be http(s): {}",
                self.base_url
            )));
        }
        if self.workers == 0 {
            return Err(E2eError::Config("workers must be at least 1".into()));
        }
        if self.waits.poll_interval_ms == 0 {
            return Err(E2eError::Config("poll_interval_ms must be positive".into()));
        }
        // A step budget that reaches the scenario budget can never report its own failure
        for (name, value) in [
            ("navigation_timeout_ms", self.waits.navigation_timeout_ms),
            ("action_timeout_ms", self.waits.action_timeout_ms),
            ("expect_timeout_ms", self.waits.expect_timeout_ms),
        ] {
            if value >= self.scenario_timeout_ms {
                return Err(E2eError::Config(format!(
                    "{} ({}) must be below scenario_timeout_ms ({})",
                    name, value, self.scenario_timeout_ms
                )));
            }
        }
        Ok(())
    }

    pub fn waits(&self) -> Waits {
        Waits {
            expect_timeout: Duration::from_millis(self.waits.expect_timeout_ms),
            action_timeout: Duration::from_millis(self.waits.action_timeout_ms),
            poll_interval: Duration::from_millis(self.waits.poll_interval_ms),
        }
    }

    pub fn scenario_timeout(&self) -> Duration {
        Duration::from_millis(self.scenario_timeout_ms)
    }

    pub fn screenshot_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }

    pub fn playwright(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            browser: self.browser.browser,
            headless: self.browser.headless,
            viewport_width: self.browser.viewport_width,
            viewport_height: self.browser.viewport_height,
            project_dir: self.browser.project_dir.clone(),
            node_binary: self.browser.node_binary.clone(),
            navigation_timeout: Duration::from_millis(self.waits.navigation_timeout_ms),
            action_timeout: Duration::from_millis(self.waits.action_timeout_ms),
            // Outlives every browser-side timeout so those report first
            request_timeout: Duration::from_millis(
                self.waits
                    .navigation_timeout_ms
                    .max(self.waits.action_timeout_ms)
                    .max(self.waits.expect_timeout_ms)
                    + 5_000,
            ),
        }
    }
}
