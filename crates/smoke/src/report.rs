//! Scenario and suite results

use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of executing a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub step_name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<FailureInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: String,
    pub message: String,
}

impl From<&E2eError> for FailureInfo {
    fn from(err: &E2eError) -> Self {
        Self { kind: err.kind().to_string(), message: err.to_string() }
    }
}

/// Last known page state when a scenario fails
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub url: Option<String>,
    pub title: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

/// Result of running one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepReport>,
    /// Index of the step that failed, if any
    pub failed_step: Option<usize>,
    pub error: Option<FailureInfo>,
    pub diagnostics: Option<Diagnostics>,
}

impl ScenarioReport {
    /// A scenario that failed before any step ran (launch failure, budget exceeded)
    pub fn aborted(name: &str, err: &E2eError, duration_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            success: false,
            duration_ms,
            steps: vec![],
            failed_step: None,
            error: Some(err.into()),
            diagnostics: None,
        }
    }

    pub fn error_kind(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.kind.as_str())
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn new(started_at: DateTime<Utc>, duration_ms: u64, scenarios: Vec<ScenarioReport>) -> Self {
        let passed = scenarios.iter().filter(|s| s.success).count();
        Self {
            started_at,
            total: scenarios.len(),
            passed,
            failed: scenarios.len() - passed,
            duration_ms,
            scenarios,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn get(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    pub fn log_summary(&self) {
        for scenario in &self.scenarios {
            if scenario.success {
                info!("✓ {} ({} ms)", scenario.name, scenario.duration_ms);
            } else {
                let step = scenario
                    .failed_step
                    .and_then(|i| scenario.steps.get(i))
                    .map(|s| s.step_name.as_str())
                    .unwrap_or("setup");
                let message = scenario.error.as_ref().map(|e| e.message.as_str()).unwrap_or("unknown error");
                error!("✗ {} at {} - {}", scenario.name, step, message);
            }
        }
        info!(
            "Results: {} passed, {} failed ({} ms)",
            self.passed, self.failed, self.duration_ms
        );
    }

    /// Write results to `<output_dir>/test-results.json`
    pub fn write_json(&self, output_dir: &Path) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
