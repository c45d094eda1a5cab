//! Playwright browser automation
//!
//! Each page is backed by its own `node` process running a small bridge
//! script. Rust sends one JSON request per line on stdin and reads one JSON
//! reply per line on stdout:
//!
//! ```text
//! >> {"id":3,"op":"count","role":"link","name":"Get started","exact":false,"nth":0}
//! << {"id":3,"ok":true,"value":1}
//! ```

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::{BrowserLauncher, Locator, Page};
use crate::scenario::Role;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Directory whose node_modules provides `playwright`
    pub project_dir: PathBuf,
    pub node_binary: PathBuf,
    pub navigation_timeout: Duration,
    /// Actionability wait for clicks
    pub action_timeout: Duration,
    /// Upper bound on any single bridge round trip; keep above the others
    pub request_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            project_dir: PathBuf::from("."),
            node_binary: PathBuf::from("node"),
            navigation_timeout: Duration::from_secs(15),
            action_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(20),
        }
    }
}

impl PlaywrightConfig {
    fn node_path(&self) -> PathBuf {
        self.project_dir.join("node_modules")
    }
}

/// Launches one bridge process per page
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config)?;
        Ok(Self { config })
    }

    /// Check that node can resolve the `playwright` package
    fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let status = Command::new(&config.node_binary)
            .args(["-e", "require.resolve('playwright')"])
            .current_dir(&config.project_dir)
            .env("NODE_PATH", config.node_path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }
}

#[async_trait]
impl BrowserLauncher for PlaywrightLauncher {
    async fn launch(&self) -> E2eResult<Box<dyn Page>> {
        let page = PlaywrightPage::spawn(&self.config).await?;
        Ok(Box::new(page))
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Request<'a> {
    Goto { url: &'a str, timeout_ms: u64 },
    Title,
    Url,
    Count { role: Role, name: &'a str, exact: bool, nth: usize },
    Visible { role: Role, name: &'a str, exact: bool, nth: usize },
    Click { role: Role, name: &'a str, exact: bool, nth: usize, timeout_ms: u64 },
    Screenshot { path: &'a Path },
    Close,
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: u64,
    #[serde(flatten)]
    request: Request<'a>,
}

/// Any line the bridge writes: the startup banner or a reply
#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    ready: Option<bool>,
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Next JSON message from the bridge; other output is logged and skipped
async fn read_message<R>(lines: &mut Lines<R>) -> E2eResult<Message>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Message>(line) {
            Ok(message) => return Ok(message),
            Err(_) => debug!("bridge: {}", line),
        }
    }
    Err(E2eError::Playwright("bridge process exited".into()))
}

/// Startup banner; JSON log lines printed before it are skipped
async fn read_banner<R>(lines: &mut Lines<R>) -> E2eResult<Message>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let message = read_message(lines).await?;
        if message.ready.is_some() {
            return Ok(message);
        }
        debug!("bridge output before ready: {:?}", message);
    }
}

/// Reply to request `id`. Requests are strictly sequential, so an error
/// without an id can only belong to the request in flight.
async fn read_reply_from<R>(lines: &mut Lines<R>, id: u64) -> E2eResult<Message>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let message = read_message(lines).await?;
        match message.id {
            Some(reply_id) if reply_id == id => return Ok(message),
            None if !message.ok && message.error.is_some() => {
                return Err(E2eError::Playwright(format!(
                    "bridge rejected request {}: {}",
                    id,
                    message.error.unwrap_or_default()
                )))
            }
            other => debug!("ignoring bridge message for {:?}", other),
        }
    }
}

/// A committed navigation with an HTTP error status still failed to load
fn classify_status(url: &str, status: Option<u64>) -> E2eResult<()> {
    match status {
        Some(code) if code >= 400 => Err(E2eError::Navigation {
            url: url.to_string(),
            reason: format!("HTTP {}", code),
        }),
        _ => Ok(()),
    }
}

/// A page driven through a Playwright bridge process
pub struct PlaywrightPage {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    navigation_timeout: Duration,
    action_timeout: Duration,
    request_timeout: Duration,
    closed: bool,
    // Holds bridge.js for the lifetime of the process
    _script_dir: tempfile::TempDir,
}

impl PlaywrightPage {
    /// Spawn a bridge process with its own browser and context
    pub async fn spawn(config: &PlaywrightConfig) -> E2eResult<Self> {
        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, build_bridge_script(config))?;

        debug!("Starting Playwright bridge: {}", script_path.display());

        let mut child = TokioCommand::new(&config.node_binary)
            .arg(&script_path)
            .current_dir(&config.project_dir)
            .env("NODE_PATH", config.node_path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                E2eError::Playwright(format!(
                    "failed to spawn {}: {}",
                    config.node_binary.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".into()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("bridge stderr: {}", line);
                }
            });
        }

        let mut stdout = BufReader::new(stdout).lines();
        let banner = timeout(config.request_timeout, read_banner(&mut stdout))
            .await
            .map_err(|_| E2eError::Timeout {
                what: "browser launch".into(),
                timeout_ms: config.request_timeout.as_millis() as u64,
            })??;

        match banner.ready {
            Some(true) => {}
            _ => {
                return Err(E2eError::Playwright(format!(
                    "browser failed to launch: {}",
                    banner.error.as_deref().unwrap_or("no ready signal")
                )))
            }
        }

        info!("Launched {} (pid: {:?})", config.browser.as_str(), child.id());

        Ok(Self {
            child,
            stdin,
            stdout,
            next_id: 0,
            navigation_timeout: config.navigation_timeout,
            action_timeout: config.action_timeout,
            request_timeout: config.request_timeout,
            closed: false,
            _script_dir: script_dir,
        })
    }

    /// One round trip. The outer error is transport, the inner one the browser's.
    async fn call(&mut self, request: Request<'_>) -> E2eResult<Result<serde_json::Value, String>> {
        if self.closed {
            return Err(E2eError::Playwright("page is closed".into()));
        }

        self.next_id += 1;
        let id = self.next_id;
        let mut line = serde_json::to_string(&Envelope { id, request })?;
        debug!(">> {}", line);
        line.push('\n');

        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| E2eError::Playwright(format!("bridge stdin closed: {}", e)))?;
        self.stdin.flush().await?;

        let limit = self.request_timeout;
        let reply = timeout(limit, self.read_reply(id))
            .await
            .map_err(|_| E2eError::Timeout {
                what: format!("bridge reply to request {}", id),
                timeout_ms: limit.as_millis() as u64,
            })??;

        if reply.ok {
            Ok(Ok(reply.value))
        } else {
            Ok(Err(reply.error.unwrap_or_else(|| "unknown bridge error".into())))
        }
    }

    async fn read_reply(&mut self, id: u64) -> E2eResult<Message> {
        read_reply_from(&mut self.stdout, id).await
    }

    /// Round trip where any browser-side failure is a Playwright error
    async fn query<T>(&mut self, request: Request<'_>) -> E2eResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        match self.call(request).await? {
            Ok(value) => Ok(serde_json::from_value(value)?),
            Err(message) => Err(E2eError::Playwright(message)),
        }
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        let timeout_ms = self.navigation_timeout.as_millis() as u64;
        match self.call(Request::Goto { url, timeout_ms }).await? {
            Ok(value) => classify_status(url, value.as_u64()),
            Err(reason) => Err(E2eError::Navigation { url: url.to_string(), reason }),
        }
    }

    async fn title(&mut self) -> E2eResult<String> {
        self.query(Request::Title).await
    }

    async fn url(&mut self) -> E2eResult<String> {
        self.query(Request::Url).await
    }

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize> {
        self.query(Request::Count {
            role: locator.role,
            name: &locator.name,
            exact: locator.exact,
            nth: locator.nth,
        })
        .await
    }

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool> {
        self.query(Request::Visible {
            role: locator.role,
            name: &locator.name,
            exact: locator.exact,
            nth: locator.nth,
        })
        .await
    }

    async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        let timeout_ms = self.action_timeout.as_millis() as u64;
        self.query::<serde_json::Value>(Request::Click {
            role: locator.role,
            name: &locator.name,
            exact: locator.exact,
            nth: locator.nth,
            timeout_ms,
        })
        .await
        .map(|_| ())
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        self.query::<serde_json::Value>(Request::Screenshot { path }).await.map(|_| ())
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.call(Request::Close).await;
        self.closed = true;

        match timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                warn!("Bridge did not exit after close, killing it");
                let _ = self.child.kill().await;
            }
        }

        result.map(|_| ())
    }
}

/// Bridge script template; placeholders are filled by [`build_bridge_script`]
const BRIDGE_TEMPLATE: &str = r#"
const playwright = require('playwright');
const readline = require('readline');

const send = (message) => process.stdout.write(JSON.stringify(message) + '\n');

// Probes racing a navigation see a destroyed context; report "nothing yet"
const settled = async (probe, fallback) => {
  try {
    return await probe();
  } catch (error) {
    if (/context was destroyed|navigat/i.test(error.message)) return fallback;
    throw error;
  }
};

(async () => {
  let browser;
  try {
    browser = await playwright['__BROWSER__'].launch({ headless: __HEADLESS__ });
  } catch (error) {
    send({ ready: false, error: error.message });
    process.exit(1);
  }
  const context = await browser.newContext({
    viewport: { width: __WIDTH__, height: __HEIGHT__ }
  });
  const page = await context.newPage();
  const byRole = (req) => page.getByRole(req.role, { name: req.name, exact: req.exact });

  const ops = {
    goto: async (req) => {
      const response = await page.goto(req.url, { timeout: req.timeout_ms });
      return response ? response.status() : null;
    },
    title: () => settled(() => page.title(), ''),
    url: async () => page.url(),
    count: (req) => settled(() => byRole(req).count(), 0),
    visible: (req) => settled(() => byRole(req).nth(req.nth).isVisible(), false),
    click: async (req) => {
      await byRole(req).nth(req.nth).click({ timeout: req.timeout_ms });
      return null;
    },
    screenshot: async (req) => {
      await page.screenshot({ path: req.path, fullPage: true });
      return null;
    },
    close: async () => null,
  };

  send({ ready: true });

  const lines = readline.createInterface({ input: process.stdin, crlfDelay: Infinity });
  for await (const line of lines) {
    if (!line.trim()) continue;
    let req;
    try {
      req = JSON.parse(line);
    } catch (error) {
      send({ ok: false, error: 'bad request: ' + error.message });
      continue;
    }
    const op = ops[req.op];
    if (!op) {
      send({ id: req.id, ok: false, error: 'unknown op: ' + req.op });
      continue;
    }
    try {
      const value = await op(req);
      send({ id: req.id, ok: true, value: value === undefined ? null : value });
    } catch (error) {
      send({ id: req.id, ok: false, error: error.message });
    }
    if (req.op === 'close') break;
  }

  await browser.close();
})();
"#;

/// Build the bridge script for a configuration
pub fn build_bridge_script(config: &PlaywrightConfig) -> String {
    BRIDGE_TEMPLATE
        .replace("__BROWSER__", config.browser.as_str())
        .replace("__HEADLESS__", if config.headless { "true" } else { "false" })
        .replace("__WIDTH__", &config.viewport_width.to_string())
        .replace("__HEIGHT__", &config.viewport_height.to_string())
}
