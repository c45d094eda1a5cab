mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

use common::{FakeBrowser, FakeElement, FakeSite, HOME, INTRO};
use smoke_check::expect::Waits;
use smoke_check::report::StepStatus;
use smoke_check::smoke::{GET_STARTED_LINK, HAS_TITLE};
use smoke_check::{BrowserLauncher, Role, ScenarioExecutor, SmokeCheck, SmokeConfig, SuiteRunner};

fn runner(browser: FakeBrowser) -> (SuiteRunner, Arc<FakeSite>) {
    let site = Arc::clone(&browser.site);
    let executor = ScenarioExecutor::new(HOME, Waits::default());
    let runner = SuiteRunner::new(Arc::new(browser), executor).with_workers(2);
    (runner, site)
}

/// Smoke Check Against The Docs Site
///
/// Both built-in scenarios pass against a faithful model of the site.
#[tokio::test(start_paused = true)]
async fn builtin_scenarios_pass() {
    let (runner, site) = runner(FakeBrowser::new(FakeSite::playwright_dev()));
    let scenarios = SmokeCheck::default().scenarios().unwrap();

    let report = runner.run(&scenarios).await;

    assert!(report.success(), "report: {:#?}", report);
    assert_eq!(report.total, 2);
    assert_eq!(report.passed, 2);
    for scenario in &report.scenarios {
        assert!(scenario.steps.iter().all(|s| s.status == StepStatus::Passed));
        assert!(scenario.diagnostics.is_none());
    }

    // One isolated page per scenario, each torn down
    assert_eq!(site.launches.load(Ordering::SeqCst), 2);
    assert_eq!(site.closes.load(Ordering::SeqCst), 2);
}

#[test_case("Example Domain" ; "unrelated title")]
#[test_case("playwright docs" ; "wrong case")]
#[test_case("" ; "empty title")]
#[tokio::test(start_paused = true)]
async fn title_mismatch_is_an_assertion_failure(title: &str) {
    let site = FakeSite::empty().document(HOME, title, vec![]);
    let (runner, _) = runner(FakeBrowser::new(site));

    let scenario = SmokeCheck::default().has_title().unwrap();
    let report = runner.run_one(&scenario).await;

    assert!(!report.success);
    assert_eq!(report.error_kind(), Some("assertion"));
    assert_eq!(report.failed_step, Some(1));
    let diagnostics = report.diagnostics.expect("failure carries diagnostics");
    assert_eq!(diagnostics.url.as_deref(), Some(HOME));
    assert_eq!(diagnostics.title.as_deref(), Some(title));
}

#[tokio::test(start_paused = true)]
async fn get_started_waits_for_late_heading() {
    let (runner, site) = runner(FakeBrowser::new(FakeSite::playwright_dev()));

    let report = runner.run_one(&SmokeCheck::default().get_started_link()).await;

    assert!(report.success, "report: {:#?}", report);
    let calls = site.calls();
    assert_eq!(calls[0], format!("goto {}", HOME));
    assert!(calls.contains(&"click link[name=\"Get started\"]".to_string()));
    // The heading renders 300ms after load, so visibility was probed repeatedly
    let probes = calls.iter().filter(|c| c.starts_with("visible heading")).count();
    assert!(probes > 1, "expected polling, got {} probe(s)", probes);
}

#[tokio::test(start_paused = true)]
async fn missing_heading_times_out() {
    let site = FakeSite::playwright_dev().document(
        INTRO,
        "Installation | Playwright",
        vec![FakeElement::new(Role::Heading, "Installation").hidden()],
    );
    let (runner, _) = runner(FakeBrowser::new(site));

    let report = runner.run_one(&SmokeCheck::default().get_started_link()).await;

    assert!(!report.success);
    assert_eq!(report.error_kind(), Some("timeout"));
    assert_eq!(report.failed_step, Some(2));
}

#[tokio::test(start_paused = true)]
async fn missing_link_is_element_not_found() {
    let site = FakeSite::empty().document(
        HOME,
        "Playwright",
        vec![FakeElement::new(Role::Link, "Docs").href(INTRO)],
    );
    let (runner, site) = runner(FakeBrowser::new(site));

    let report = runner.run_one(&SmokeCheck::default().get_started_link()).await;

    assert_eq!(report.error_kind(), Some("element_not_found"));
    assert_eq!(report.failed_step, Some(1));
    assert_eq!(report.steps[2].status, StepStatus::Skipped);
    assert!(!site.calls().iter().any(|c| c.starts_with("visible")));
}

/// Unreachable Site Boundary
///
/// Both scenarios fail at their first step and never reach the page again.
#[tokio::test(start_paused = true)]
async fn unreachable_site_fails_at_navigation() {
    let (runner, site) = runner(FakeBrowser::new(FakeSite::playwright_dev().unreachable()));
    let scenarios = SmokeCheck::default().scenarios().unwrap();

    let report = runner.run(&scenarios).await;

    assert_eq!(report.failed, 2);
    for scenario in &report.scenarios {
        assert_eq!(scenario.error_kind(), Some("navigation"));
        assert_eq!(scenario.failed_step, Some(0));
        assert!(scenario.steps[1..].iter().all(|s| s.status == StepStatus::Skipped));
    }
    // Only navigation plus the title read for diagnostics
    assert!(site.calls().iter().all(|c| c.starts_with("goto") || c == "title"));
}

/// Idempotence
///
/// Running the suite twice against an unchanged site yields the same outcome.
#[tokio::test(start_paused = true)]
async fn repeated_runs_agree() {
    for site in [FakeSite::playwright_dev(), FakeSite::playwright_dev().unreachable()] {
        let (runner, _) = runner(FakeBrowser::new(site));
        let scenarios = SmokeCheck::default().scenarios().unwrap();

        let first = runner.run(&scenarios).await;
        let second = runner.run(&scenarios).await;

        for name in [HAS_TITLE, GET_STARTED_LINK] {
            let a = first.get(name).unwrap();
            let b = second.get(name).unwrap();
            assert_eq!(a.success, b.success, "{}", name);
            assert_eq!(a.error_kind(), b.error_kind(), "{}", name);
            assert_eq!(a.failed_step, b.failed_step, "{}", name);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn scenario_budget_cancels_slow_navigation() {
    let mut site = FakeSite::playwright_dev();
    site.load_delay = Duration::from_secs(120);
    let (runner, _) = runner(FakeBrowser::new(site));
    let runner = runner.with_scenario_timeout(Duration::from_secs(30));

    let report = runner.run_one(&SmokeCheck::default().has_title().unwrap()).await;

    assert!(!report.success);
    assert_eq!(report.error_kind(), Some("timeout"));
    assert_eq!(report.failed_step, Some(0));
    assert_eq!(report.steps[0].status, StepStatus::Failed);
    assert_eq!(report.steps[1].status, StepStatus::Skipped);
}

#[tokio::test(start_paused = true)]
async fn scenario_budget_keeps_finished_steps() {
    let site = FakeSite::playwright_dev().document(
        INTRO,
        "Installation | Playwright",
        vec![FakeElement::new(Role::Heading, "Installation").hidden()],
    );
    let waits = Waits { expect_timeout: Duration::from_secs(60), ..Waits::default() };
    let executor = ScenarioExecutor::new(HOME, waits);
    let runner = SuiteRunner::new(Arc::new(FakeBrowser::new(site)), executor)
        .with_scenario_timeout(Duration::from_secs(10));

    let report = runner.run_one(&SmokeCheck::default().get_started_link()).await;

    assert_eq!(report.error_kind(), Some("timeout"));
    assert_eq!(report.failed_step, Some(2));
    let statuses: Vec<_> = report.steps.iter().map(|s| s.status).collect();
    assert_eq!(statuses, vec![StepStatus::Passed, StepStatus::Passed, StepStatus::Failed]);
}

/// Default budgets let a hanging navigation report itself before the
/// scenario budget fires, even after a slow browser launch
#[tokio::test(start_paused = true)]
async fn default_config_reports_unreachable_host_as_navigation() {
    let dir = tempfile::tempdir().unwrap();
    let config = SmokeConfig { output_dir: dir.path().to_path_buf(), ..Default::default() };
    let mut site = FakeSite::playwright_dev().unreachable();
    site.load_delay = Duration::from_millis(config.waits.navigation_timeout_ms);
    site.launch_delay = Duration::from_millis(500);
    let runner = SuiteRunner::from_config(&config, Arc::new(FakeBrowser::new(site)));

    let report = runner.run(&SmokeCheck::default().scenarios().unwrap()).await;

    for scenario in &report.scenarios {
        assert_eq!(scenario.error_kind(), Some("navigation"), "{:#?}", scenario);
        assert_eq!(scenario.failed_step, Some(0));
        assert_eq!(scenario.steps[0].status, StepStatus::Failed);
    }
}

#[tokio::test(start_paused = true)]
async fn workers_bound_open_pages() {
    let mut site = FakeSite::playwright_dev();
    site.load_delay = Duration::from_secs(1);
    let (runner, site) = runner(FakeBrowser::new(site));
    let scenarios: Vec<_> = (0..4)
        .map(|i| {
            let mut scenario = SmokeCheck::default().has_title().unwrap();
            scenario.name = format!("has title {}", i);
            scenario
        })
        .collect();

    let report = runner.run(&scenarios).await;

    assert!(report.success(), "report: {:#?}", report);
    assert_eq!(site.launches.load(Ordering::SeqCst), 4);
    assert_eq!(site.peak_open.load(Ordering::SeqCst), 2);
    assert_eq!(site.open.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn launch_failure_fails_only_that_scenario() {
    let mut site = FakeSite::playwright_dev();
    site.fail_launch = true;
    let browser = FakeBrowser::new(site);
    assert!(browser.launch().await.is_err());

    let (runner, _) = runner(browser);
    let report = runner.run(&SmokeCheck::default().scenarios().unwrap()).await;

    assert_eq!(report.failed, 2);
    assert!(report.scenarios.iter().all(|s| s.error_kind() == Some("playwright")));
}

#[tokio::test(start_paused = true)]
async fn failure_screenshot_is_captured() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::empty().document(HOME, "Example Domain", vec![]);
    let browser = FakeBrowser::new(site);
    let executor = ScenarioExecutor::new(HOME, Waits::default()).with_screenshot_dir(dir.path().join("shots"));
    let runner = SuiteRunner::new(Arc::new(browser), executor);

    let report = runner.run_one(&SmokeCheck::default().has_title().unwrap()).await;

    let path = report.diagnostics.unwrap().screenshot_path.expect("screenshot taken");
    assert_eq!(path, dir.path().join("shots").join("00-has-title.png"));
    assert!(path.exists());
}

#[tokio::test(start_paused = true)]
async fn screenshots_of_similar_names_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let site = FakeSite::empty().document(HOME, "Example Domain", vec![]);
    let executor = ScenarioExecutor::new(HOME, Waits::default()).with_screenshot_dir(dir.path());
    let runner = SuiteRunner::new(Arc::new(FakeBrowser::new(site)), executor).with_workers(2);
    let scenarios: Vec<_> = ["a b", "a-b"]
        .into_iter()
        .map(|name| {
            let mut scenario = SmokeCheck::default().has_title().unwrap();
            scenario.name = name.to_string();
            scenario
        })
        .collect();

    let report = runner.run(&scenarios).await;

    let paths: Vec<_> = report
        .scenarios
        .iter()
        .map(|s| s.diagnostics.as_ref().unwrap().screenshot_path.clone().expect("screenshot taken"))
        .collect();
    assert_ne!(paths[0], paths[1]);
    assert!(paths.iter().all(|p| p.exists()));
}

#[tokio::test(start_paused = true)]
async fn report_is_written_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _) = runner(FakeBrowser::new(FakeSite::playwright_dev()));

    let report = runner.run(&SmokeCheck::default().scenarios().unwrap()).await;
    let path = report.write_json(dir.path()).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json["passed"], 2);
    assert_eq!(json["scenarios"][0]["name"], HAS_TITLE);
    assert_eq!(json["scenarios"][1]["steps"][1]["step_name"], "click:link[Get started]");
}
