//! Smoke-check entry point
//!
//! Runs the built-in Playwright site checks, or YAML scenarios from a
//! directory, and writes `test-results.json` to the output directory.

use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use smoke_check::playwright::{Browser, PlaywrightLauncher};
use smoke_check::runner::{self, SuiteRunner};
use smoke_check::{E2eResult, Scenario, SmokeCheck, SmokeConfig};

#[derive(Parser, Debug)]
#[command(name = "smoke-check")]
#[command(author, version, about = "End-to-end smoke checks for a website")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "smoke.toml")]
    config: PathBuf,

    /// Site under test
    #[arg(long)]
    base_url: Option<String>,

    /// Directory of YAML scenarios (default: built-in checks)
    #[arg(short, long)]
    scenarios: Option<PathBuf>,

    /// Run only scenarios with this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the scenario with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Maximum concurrent scenarios
    #[arg(short, long)]
    workers: Option<usize>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// List selected scenarios and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

fn load_config(args: &Args) -> E2eResult<SmokeConfig> {
    let mut config = SmokeConfig::load(&args.config)?;

    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(dir) = &args.scenarios {
        config.scenarios_dir = Some(dir.clone());
    }
    if let Some(browser) = args.browser {
        config.browser.browser = browser;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }

    config.validate()?;
    Ok(config)
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let config = load_config(&args)?;

    let scenarios = match &config.scenarios_dir {
        Some(dir) => Scenario::load_all(dir)?,
        None => SmokeCheck::new(config.base_url.clone()).scenarios()?,
    };
    let scenarios = runner::select(scenarios, args.tag.as_deref(), args.name.as_deref())?;

    if args.list {
        for scenario in &scenarios {
            println!("{} ({} steps) {}", scenario.name, scenario.steps.len(), scenario.tags.join(","));
        }
        return Ok(true);
    }

    let launcher = PlaywrightLauncher::new(config.playwright())?;
    let runner = SuiteRunner::from_config(&config, Arc::new(launcher));

    let report = runner.run(&scenarios).await;
    report.write_json(&config.output_dir)?;

    Ok(report.success())
}
