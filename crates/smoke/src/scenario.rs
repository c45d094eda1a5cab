//! Declarative scenarios: ordered actions against one site

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::{E2eError, E2eResult};

/// One independent end-to-end flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<Action>,
}

/// A single step in a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Load a URL (absolute, or relative to the base URL)
    Navigate { url: String },

    /// Activate the first element with the given role and accessible name
    ClickByRole {
        role: Role,
        name: String,
        #[serde(default)]
        exact: bool,
    },

    /// Page title must match the pattern
    AssertTitleMatches { pattern: TitlePattern },

    /// An element with the given role and accessible name must become visible
    AssertVisibleByRole {
        role: Role,
        name: String,
        #[serde(default)]
        exact: bool,
    },
}

impl Action {
    /// Short label used in logs and reports
    pub fn label(&self) -> String {
        match self {
            Action::Navigate { url } => format!("navigate:{}", url),
            Action::ClickByRole { role, name, .. } => format!("click:{}[{}]", role, name),
            Action::AssertTitleMatches { pattern } => format!("assert_title:/{}/", pattern),
            Action::AssertVisibleByRole { role, name, .. } => {
                format!("assert_visible:{}[{}]", role, name)
            }
        }
    }
}

/// ARIA role used to locate elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Link,
    Heading,
    Button,
    Checkbox,
    Textbox,
    Img,
    Navigation,
    Main,
    Banner,
    Dialog,
    Tab,
    Menuitem,
    Listitem,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Link => "link",
            Role::Heading => "heading",
            Role::Button => "button",
            Role::Checkbox => "checkbox",
            Role::Textbox => "textbox",
            Role::Img => "img",
            Role::Navigation => "navigation",
            Role::Main => "main",
            Role::Banner => "banner",
            Role::Dialog => "dialog",
            Role::Tab => "tab",
            Role::Menuitem => "menuitem",
            Role::Listitem => "listitem",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-sensitive regular expression matched anywhere in a page title
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TitlePattern(Regex);

impl TitlePattern {
    pub fn new(pattern: &str) -> E2eResult<Self> {
        Ok(Self(Regex::new(pattern)?))
    }

    pub fn is_match(&self, title: &str) -> bool {
        self.0.is_match(title)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for TitlePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl fmt::Display for TitlePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TitlePattern {
    type Error = regex::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Regex::new(&value).map(Self)
    }
}

impl From<TitlePattern> for String {
    fn from(pattern: TitlePattern) -> Self {
        pattern.0.as_str().to_string()
    }
}

impl Scenario {
    /// Parse a scenario from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            E2eError::SpecParse(msg) => E2eError::SpecParse(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Load all scenarios from a directory, sorted by path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        let mut scenarios = Vec::with_capacity(paths.len());
        for path in &paths {
            scenarios.push(Self::from_file(path)?);
        }

        ensure_unique_names(&scenarios)?;
        Ok(scenarios)
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.name.trim().is_empty() {
            return Err(E2eError::SpecParse("scenario name is empty".into()));
        }
        if self.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("scenario '{}' has no steps", self.name)));
        }
        Ok(())
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Scenario names key the report, so they must not repeat within a suite
pub fn ensure_unique_names(scenarios: &[Scenario]) -> E2eResult<()> {
    let mut seen = HashSet::new();
    for scenario in scenarios {
        if !seen.insert(scenario.name.as_str()) {
            return Err(E2eError::SpecParse(format!(
                "duplicate scenario name: {}",
                scenario.name
            )));
        }
    }
    Ok(())
}

/// Join a relative URL onto the base URL; absolute URLs pass through
pub fn resolve_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("about:") {
        return url.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if url.is_empty() {
        format!("{}/", base)
    } else if url.starts_with('/') {
        format!("{}{}", base, url)
    } else {
        format!("{}/{}", base, url)
    }
}
