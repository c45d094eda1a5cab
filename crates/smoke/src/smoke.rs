//! Built-in smoke checks for the Playwright documentation site

use crate::error::E2eResult;
use crate::scenario::{Action, Role, Scenario, TitlePattern};

pub const DEFAULT_BASE_URL: &str = "https://playwright.dev/";

pub const HAS_TITLE: &str = "has title";
pub const GET_STARTED_LINK: &str = "get started link";

/// The two independent scenarios run against one site
#[derive(Debug, Clone)]
pub struct SmokeCheck {
    base_url: String,
}

impl SmokeCheck {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    /// Fresh scenario definitions; nothing is shared between calls
    pub fn scenarios(&self) -> E2eResult<Vec<Scenario>> {
        Ok(vec![self.has_title()?, self.get_started_link()])
    }

    /// Page title contains "Playwright"
    pub fn has_title(&self) -> E2eResult<Scenario> {
        Ok(Scenario {
            name: HAS_TITLE.to_string(),
            description: "Landing page title mentions Playwright".to_string(),
            tags: vec!["smoke".to_string()],
            steps: vec![
                Action::Navigate { url: self.base_url.clone() },
                Action::AssertTitleMatches { pattern: TitlePattern::new("Playwright")? },
            ],
        })
    }

    /// "Get started" leads to the installation docs
    pub fn get_started_link(&self) -> Scenario {
        Scenario {
            name: GET_STARTED_LINK.to_string(),
            description: "Get started link opens the Installation page".to_string(),
            tags: vec!["smoke".to_string()],
            steps: vec![
                Action::Navigate { url: self.base_url.clone() },
                Action::ClickByRole {
                    role: Role::Link,
                    name: "Get started".to_string(),
                    exact: false,
                },
                Action::AssertVisibleByRole {
                    role: Role::Heading,
                    name: "Installation".to_string(),
                    exact: false,
                },
            ],
        }
    }
}

impl Default for SmokeCheck {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
