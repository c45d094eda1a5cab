//! In-memory site used in place of a real browser

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use tokio::time::Instant;

use smoke_check::{BrowserLauncher, E2eError, E2eResult, Locator, Page, Role};

pub const HOME: &str = "https://playwright.dev/";
pub const INTRO: &str = "https://playwright.dev/docs/intro";

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub role: Role,
    pub name: String,
    pub visible: bool,
    /// Following this element loads another page
    pub href: Option<String>,
    /// Rendered this long after the page loads
    pub appears_after: Duration,
}

impl FakeElement {
    pub fn new(role: Role, name: &str) -> Self {
        Self {
            role,
            name: name.to_string(),
            visible: true,
            href: None,
            appears_after: Duration::ZERO,
        }
    }

    pub fn href(mut self, href: &str) -> Self {
        self.href = Some(href.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeDocument {
    pub title: String,
    pub elements: Vec<FakeElement>,
}

#[derive(Default)]
pub struct FakeSite {
    pub documents: HashMap<String, FakeDocument>,
    pub reachable: bool,
    /// Every goto blocks this long
    pub load_delay: Duration,
    pub fail_launch: bool,
    /// Every launch blocks this long
    pub launch_delay: Duration,
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    /// Pages currently open, and the most ever open at once
    pub open: AtomicUsize,
    pub peak_open: AtomicUsize,
    /// Page calls in order, e.g. "goto https://playwright.dev/"
    pub calls: Mutex<Vec<String>>,
}

impl FakeSite {
    pub fn empty() -> Self {
        Self { reachable: true, ..Default::default() }
    }

    /// A model of the Playwright docs landing page and its intro page
    pub fn playwright_dev() -> Self {
        Self::empty()
            .document(
                HOME,
                "Fast and reliable end-to-end testing for modern web apps | Playwright",
                vec![
                    FakeElement::new(Role::Link, "Playwright logo Playwright").href(HOME),
                    FakeElement::new(Role::Link, "Docs").href(INTRO),
                    FakeElement::new(Role::Link, "Get started").href(INTRO),
                    FakeElement::new(Role::Heading, "Playwright enables reliable end-to-end testing for modern web apps."),
                ],
            )
            .document(
                INTRO,
                "Installation | Playwright",
                vec![
                    FakeElement::new(Role::Heading, "Installation").appears_after(Duration::from_millis(300)),
                    FakeElement::new(Role::Heading, "Introduction"),
                ],
            )
    }

    pub fn document(mut self, url: &str, title: &str, elements: Vec<FakeElement>) -> Self {
        self.documents.insert(
            url.to_string(),
            FakeDocument { title: title.to_string(), elements },
        );
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Launches fake pages sharing one site
pub struct FakeBrowser {
    pub site: Arc<FakeSite>,
}

impl FakeBrowser {
    pub fn new(site: FakeSite) -> Self {
        Self { site: Arc::new(site) }
    }
}

#[async_trait]
impl BrowserLauncher for FakeBrowser {
    async fn launch(&self) -> E2eResult<Box<dyn Page>> {
        if self.site.fail_launch {
            return Err(E2eError::Playwright("browser failed to launch: missing executable".into()));
        }
        if !self.site.launch_delay.is_zero() {
            tokio::time::sleep(self.site.launch_delay).await;
        }
        self.site.launches.fetch_add(1, Ordering::SeqCst);
        let open = self.site.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.site.peak_open.fetch_max(open, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            site: Arc::clone(&self.site),
            current: None,
            loaded_at: Instant::now(),
        }))
    }
}

pub struct FakePage {
    site: Arc<FakeSite>,
    current: Option<String>,
    loaded_at: Instant,
}

impl FakePage {
    fn document(&self) -> Option<&FakeDocument> {
        self.current.as_ref().and_then(|url| self.site.documents.get(url))
    }

    fn matches(&self, locator: &Locator) -> Vec<FakeElement> {
        let elapsed = self.loaded_at.elapsed();
        self.document()
            .map(|doc| {
                doc.elements
                    .iter()
                    .filter(|e| e.role == locator.role && locator.name_matches(&e.name))
                    .filter(|e| e.appears_after <= elapsed)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn load(&mut self, url: &str) {
        self.current = Some(url.to_string());
        self.loaded_at = Instant::now();
    }
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.site.record(format!("goto {}", url));
        if !self.site.load_delay.is_zero() {
            tokio::time::sleep(self.site.load_delay).await;
        }
        if !self.site.reachable {
            return Err(E2eError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".into(),
            });
        }
        if !self.site.documents.contains_key(url) {
            return Err(E2eError::Navigation { url: url.to_string(), reason: "HTTP 404".into() });
        }
        self.load(url);
        Ok(())
    }

    async fn title(&mut self) -> E2eResult<String> {
        self.site.record("title".into());
        Ok(self.document().map(|d| d.title.clone()).unwrap_or_default())
    }

    async fn url(&mut self) -> E2eResult<String> {
        Ok(self.current.clone().unwrap_or_else(|| "about:blank".into()))
    }

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize> {
        self.site.record(format!("count {}", locator.describe()));
        Ok(self.matches(locator).len())
    }

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool> {
        self.site.record(format!("visible {}", locator.describe()));
        Ok(self.matches(locator).get(locator.nth).map(|e| e.visible).unwrap_or(false))
    }

    async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        self.site.record(format!("click {}", locator.describe()));
        let target = self
            .matches(locator)
            .get(locator.nth)
            .cloned()
            .ok_or_else(|| E2eError::Playwright(format!("{} detached", locator.describe())))?;
        if let Some(href) = target.href {
            self.load(&href);
        }
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        std::fs::write(path, b"\x89PNG fake")?;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.site.closes.fetch_add(1, Ordering::SeqCst);
        self.site.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
