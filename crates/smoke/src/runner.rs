//! Suite runner: isolated pages, bounded concurrency, per-scenario budget

use std::sync::Arc;
use std::time::{Duration, Instant};
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::SmokeConfig;
use crate::error::{E2eError, E2eResult};
use crate::executor::{Progress, ScenarioExecutor};
use crate::page::BrowserLauncher;
use crate::report::{ScenarioReport, SuiteReport};
use crate::scenario::Scenario;

/// Main smoke-check runner
pub struct SuiteRunner {
    launcher: Arc<dyn BrowserLauncher>,
    executor: Arc<ScenarioExecutor>,
    workers: usize,
    scenario_timeout: Duration,
}

impl SuiteRunner {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, executor: ScenarioExecutor) -> Self {
        Self {
            launcher,
            executor: Arc::new(executor),
            workers: 1,
            scenario_timeout: Duration::from_secs(30),
        }
    }

    /// Create a runner from configuration
    pub fn from_config(config: &SmokeConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let executor = ScenarioExecutor::new(config.base_url.clone(), config.waits())
            .with_screenshot_dir(config.screenshot_dir());
        Self::new(launcher, executor)
            .with_workers(config.workers)
            .with_scenario_timeout(config.scenario_timeout())
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_scenario_timeout(mut self, scenario_timeout: Duration) -> Self {
        self.scenario_timeout = scenario_timeout;
        self
    }

    /// Run scenarios concurrently; reports keep definition order
    pub async fn run(&self, scenarios: &[Scenario]) -> SuiteReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let permits = Arc::new(Semaphore::new(self.workers));

        info!("Running {} scenario(s) with {} worker(s)...", scenarios.len(), self.workers);

        let handles: Vec<_> = scenarios
            .iter()
            .cloned()
            .enumerate()
            .map(|(position, scenario)| {
                let launcher = Arc::clone(&self.launcher);
                let executor = Arc::clone(&self.executor);
                let permits = Arc::clone(&permits);
                let budget = self.scenario_timeout;
                tokio::spawn(async move {
                    // The semaphore is never closed
                    let _permit = permits.acquire_owned().await.ok();
                    run_isolated(launcher.as_ref(), &executor, &scenario, position, budget).await
                })
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (scenario, handle) in scenarios.iter().zip(handles) {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    error!("Scenario task '{}' failed: {}", scenario.name, e);
                    let err = E2eError::Playwright(format!("scenario task failed: {}", e));
                    ScenarioReport::aborted(&scenario.name, &err, 0)
                }
            };
            reports.push(report);
        }

        let report = SuiteReport::new(started_at, start.elapsed().as_millis() as u64, reports);
        report.log_summary();
        report
    }

    /// Run a single scenario in its own page
    pub async fn run_one(&self, scenario: &Scenario) -> ScenarioReport {
        run_isolated(self.launcher.as_ref(), &self.executor, scenario, 0, self.scenario_timeout).await
    }
}

/// Fresh page per scenario; exceeding the budget drops the page but keeps
/// the steps that already finished
async fn run_isolated(
    launcher: &dyn BrowserLauncher,
    executor: &ScenarioExecutor,
    scenario: &Scenario,
    position: usize,
    budget: Duration,
) -> ScenarioReport {
    let start = Instant::now();
    let mut progress = Progress::default();

    let outcome = timeout(budget, async {
        let mut page = launcher.launch().await?;
        let report = executor.run_recorded(page.as_mut(), scenario, position, &mut progress).await;
        if let Err(e) = page.close().await {
            warn!("Closing page for '{}' failed: {}", scenario.name, e);
        }
        Ok::<_, E2eError>(report)
    })
    .await;

    let elapsed = start.elapsed().as_millis() as u64;
    match outcome {
        Ok(Ok(report)) => {
            debug!("Scenario '{}' finished in {} ms", scenario.name, report.duration_ms);
            report
        }
        Ok(Err(e)) => ScenarioReport::aborted(&scenario.name, &e, elapsed),
        Err(_) => {
            let err = E2eError::Timeout {
                what: format!("scenario '{}'", scenario.name),
                timeout_ms: budget.as_millis() as u64,
            };
            progress.interrupted(scenario, &err, elapsed)
        }
    }
}

/// Narrow scenarios by tag and/or exact name
pub fn select(scenarios: Vec<Scenario>, tag: Option<&str>, name: Option<&str>) -> E2eResult<Vec<Scenario>> {
    let mut selected: Vec<Scenario> = match tag {
        Some(tag) => scenarios.into_iter().filter(|s| s.has_tag(tag)).collect(),
        None => scenarios,
    };

    if let Some(name) = name {
        selected.retain(|s| s.name == name);
        if selected.is_empty() {
            return Err(E2eError::SpecParse(format!("Scenario not found: {}", name)));
        }
    }

    Ok(selected)
}
