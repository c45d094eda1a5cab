//! Smoke-check harness for public websites
//!
//! This crate runs short, declarative end-to-end scenarios against a site:
//! - Scenarios are ordered actions (navigate, click by role, assert title,
//!   assert visible by role), built in or loaded from YAML
//! - Each scenario gets its own isolated browser page
//! - Assertions auto-wait by polling within bounded budgets
//! - Results are written as JSON with diagnostics for failures
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  SuiteRunner                                                │
//! │    ├── BrowserLauncher::launch() -> Box<dyn Page>           │
//! │    ├── ScenarioExecutor::run(page, scenario)                │
//! │    │     ├── navigate      -> Page::goto                    │
//! │    │     ├── click_by_role -> expect::locate + Page::click  │
//! │    │     ├── assert_title  -> expect::expect_title          │
//! │    │     └── assert_visible-> expect::expect_visible        │
//! │    └── SuiteReport -> test-results.json                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlaywrightPage: node bridge, JSON lines over stdin/stdout  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod expect;
pub mod page;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod smoke;

pub use config::SmokeConfig;
pub use error::{E2eError, E2eResult};
pub use executor::ScenarioExecutor;
pub use page::{BrowserLauncher, Locator, Page};
pub use runner::SuiteRunner;
pub use scenario::{Action, Role, Scenario, TitlePattern};
pub use smoke::SmokeCheck;
