//! Executes one scenario's steps in order on one page

use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::expect::{self, Waits};
use crate::page::{Locator, Page};
use crate::report::{Diagnostics, ScenarioReport, StepReport, StepStatus};
use crate::scenario::{resolve_url, Action, Scenario};

/// Steps recorded as they finish, so an interrupted run still reports them
#[derive(Debug, Default)]
pub struct Progress {
    steps: Vec<StepReport>,
    /// Step currently executing
    in_flight: Option<(usize, String)>,
}

impl Progress {
    /// Report for a run cut short by `err`, e.g. when the scenario budget fires
    pub fn interrupted(self, scenario: &Scenario, err: &E2eError, duration_ms: u64) -> ScenarioReport {
        let mut steps = self.steps;
        let failed_step = match self.in_flight {
            Some((index, step_name)) => {
                steps.push(StepReport {
                    index,
                    step_name,
                    status: StepStatus::Failed,
                    duration_ms: 0,
                    error: Some(err.into()),
                });
                Some(index)
            }
            // Cut short while capturing diagnostics
            None => steps.iter().find(|s| s.status == StepStatus::Failed).map(|s| s.index),
        };

        // Nothing ran: launch never finished
        if steps.is_empty() {
            return ScenarioReport::aborted(&scenario.name, err, duration_ms);
        }

        for (index, action) in scenario.steps.iter().enumerate().skip(steps.len()) {
            steps.push(skipped(index, action.label()));
        }

        ScenarioReport {
            name: scenario.name.clone(),
            success: false,
            duration_ms,
            steps,
            failed_step,
            error: Some(err.into()),
            diagnostics: None,
        }
    }
}

fn skipped(index: usize, step_name: String) -> StepReport {
    StepReport { index, step_name, status: StepStatus::Skipped, duration_ms: 0, error: None }
}

pub struct ScenarioExecutor {
    base_url: String,
    waits: Waits,
    /// Failure screenshots land here when set
    screenshot_dir: Option<PathBuf>,
}

impl ScenarioExecutor {
    pub fn new(base_url: impl Into<String>, waits: Waits) -> Self {
        Self { base_url: base_url.into(), waits, screenshot_dir: None }
    }

    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = Some(dir.into());
        self
    }

    /// Run every step; the first failure stops the scenario
    pub async fn run(&self, page: &mut dyn Page, scenario: &Scenario) -> ScenarioReport {
        let mut progress = Progress::default();
        self.run_recorded(page, scenario, 0, &mut progress).await
    }

    /// Like [`run`](Self::run), recording into `progress`. `position` is the
    /// scenario's place in the suite and keeps artifact names distinct.
    pub async fn run_recorded(
        &self,
        page: &mut dyn Page,
        scenario: &Scenario,
        position: usize,
        progress: &mut Progress,
    ) -> ScenarioReport {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let mut failure = None;

        for (index, action) in scenario.steps.iter().enumerate() {
            let step_name = action.label();

            if failure.is_some() {
                progress.steps.push(skipped(index, step_name));
                continue;
            }

            debug!("Executing step {}: {}", index + 1, step_name);
            progress.in_flight = Some((index, step_name.clone()));
            let step_start = Instant::now();
            let result = self.execute(page, action).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;
            progress.in_flight = None;

            match result {
                Ok(()) => progress.steps.push(StepReport {
                    index,
                    step_name,
                    status: StepStatus::Passed,
                    duration_ms,
                    error: None,
                }),
                Err(e) => {
                    debug!("Step {} failed: {}", step_name, e);
                    progress.steps.push(StepReport {
                        index,
                        step_name,
                        status: StepStatus::Failed,
                        duration_ms,
                        error: Some((&e).into()),
                    });
                    failure = Some((index, e));
                }
            }
        }

        let (failed_step, error, diagnostics) = match failure {
            Some((index, e)) => {
                let diagnostics = self.capture_diagnostics(page, &scenario.name, position).await;
                (Some(index), Some((&e).into()), Some(diagnostics))
            }
            None => (None, None, None),
        };

        ScenarioReport {
            name: scenario.name.clone(),
            success: error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps: std::mem::take(&mut progress.steps),
            failed_step,
            error,
            diagnostics,
        }
    }

    async fn execute(&self, page: &mut dyn Page, action: &Action) -> E2eResult<()> {
        match action {
            Action::Navigate { url } => page.goto(&resolve_url(&self.base_url, url)).await,
            Action::ClickByRole { role, name, exact } => {
                let locator = Locator::by_role(*role, name.clone()).exact(*exact);
                let target = expect::locate(page, &locator, &self.waits).await?;
                page.click(&target).await
            }
            Action::AssertTitleMatches { pattern } => {
                expect::expect_title(page, pattern, &self.waits).await.map(|_| ())
            }
            Action::AssertVisibleByRole { role, name, exact } => {
                let locator = Locator::by_role(*role, name.clone()).exact(*exact);
                expect::expect_visible(page, &locator, &self.waits).await
            }
        }
    }

    /// Best effort: capture failures are logged, never reported
    async fn capture_diagnostics(&self, page: &mut dyn Page, scenario: &str, position: usize) -> Diagnostics {
        let mut diagnostics = Diagnostics::default();

        match page.url().await {
            Ok(url) => diagnostics.url = Some(url),
            Err(e) => warn!("Could not read URL for '{}': {}", scenario, e),
        }
        match page.title().await {
            Ok(title) => diagnostics.title = Some(title),
            Err(e) => warn!("Could not read title for '{}': {}", scenario, e),
        }

        if let Some(dir) = &self.screenshot_dir {
            let path = dir.join(screenshot_name(position, scenario));
            let written = match std::fs::create_dir_all(dir) {
                Ok(()) => page.screenshot(&path).await,
                Err(e) => Err(e.into()),
            };
            match written {
                Ok(()) => diagnostics.screenshot_path = Some(path),
                Err(e) => warn!("Could not capture screenshot for '{}': {}", scenario, e),
            }
        }

        diagnostics
    }
}

/// Sanitizing can merge names, the position prefix cannot
fn screenshot_name(position: usize, scenario: &str) -> String {
    format!("{:02}-{}.png", position, sanitize(scenario))
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}
