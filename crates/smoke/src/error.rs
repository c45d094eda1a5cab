//! Error types for smoke checks

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("No element with role '{role}' and name '{name}'")]
    ElementNotFound { role: String, name: String },

    #[error("Timeout after {timeout_ms} ms waiting for: {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("Assertion failed: expected {expected}, got {actual}")]
    AssertionFailed { expected: String, actual: String },

    #[error("Playwright not found. Install with: npm i -D playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Scenario parse error: {0}")]
    SpecParse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl E2eError {
    /// Stable identifier used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            E2eError::Navigation { .. } => "navigation",
            E2eError::ElementNotFound { .. } => "element_not_found",
            E2eError::Timeout { .. } => "timeout",
            E2eError::AssertionFailed { .. } => "assertion",
            E2eError::PlaywrightNotFound => "playwright_not_found",
            E2eError::Playwright(_) => "playwright",
            E2eError::SpecParse(_) => "spec_parse",
            E2eError::Config(_) => "config",
            E2eError::Io(_) => "io",
            E2eError::Json(_) => "json",
            E2eError::Yaml(_) => "yaml",
            E2eError::Toml(_) => "toml",
            E2eError::Regex(_) => "regex",
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
