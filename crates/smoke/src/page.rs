//! Browser collaborator seam
//!
//! The harness never talks to a browser directly. It drives a [`Page`],
//! opened fresh per scenario by a [`BrowserLauncher`], through a handful of
//! raw primitives. Waiting and assertion logic lives in [`crate::expect`].

use std::path::Path;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;
use crate::scenario::Role;

/// Lazily resolved reference to elements by accessible role and name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub role: Role,
    pub name: String,
    /// Require the accessible name to match exactly (case-sensitive, whole string)
    #[serde(default)]
    pub exact: bool,
    /// Which match to address, in document order
    #[serde(default)]
    pub nth: usize,
}

impl Locator {
    pub fn by_role(role: Role, name: impl Into<String>) -> Self {
        Self { role, name: name.into(), exact: false, nth: 0 }
    }

    pub fn exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    pub fn nth(mut self, nth: usize) -> Self {
        self.nth = nth;
        self
    }

    /// Accessible-name match as performed by the browser side
    pub fn name_matches(&self, accessible_name: &str) -> bool {
        if self.exact {
            accessible_name == self.name
        } else {
            accessible_name.to_lowercase().contains(&self.name.to_lowercase())
        }
    }

    pub fn describe(&self) -> String {
        format!("{}[name={:?}]", self.role, self.name)
    }
}

/// One isolated browsing context
#[async_trait]
pub trait Page: Send {
    /// Load a URL and wait for it to commit; failures are `Navigation` errors
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    /// Current document title
    async fn title(&mut self) -> E2eResult<String>;

    /// Current URL
    async fn url(&mut self) -> E2eResult<String>;

    /// Number of elements currently matching the locator (ignoring `nth`)
    async fn count(&mut self, locator: &Locator) -> E2eResult<usize>;

    /// Whether the addressed element exists and is visible right now
    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool>;

    /// Activate the addressed element
    async fn click(&mut self, locator: &Locator) -> E2eResult<()>;

    /// Write a full-page screenshot
    async fn screenshot(&mut self, path: &Path) -> E2eResult<()>;

    /// Tear down the context
    async fn close(&mut self) -> E2eResult<()>;
}

/// Opens fresh, isolated pages
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> E2eResult<Box<dyn Page>>;
}
