// Proxy Scenario Runner
//
// Purpose: run YAML proxy scenarios against the in-memory host
//
// Usage:
//   cargo run --bin proxy-scenario -- scenarios/*.yaml
//   cargo run --bin proxy-scenario -- --json --fail-fast scenarios/upgrade_flow.yaml

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use serde::Serialize;

use proxy_testing_framework::scenarios::{parse_scenario, ExecutionReport, ScenarioExecutor};

#[derive(Parser, Debug)]
#[command(name = "proxy-scenario")]
#[command(about = "Run upgradeable proxy scenarios")]
struct Args {
    /// Scenario files (YAML)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print one JSON report per scenario instead of a summary
    #[arg(long)]
    json: bool,

    /// Stop at the first failing scenario
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Serialize)]
struct FileReport {
    file: String,
    #[serde(flatten)]
    report: Option<ExecutionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn run_file(path: &Path) -> Result<ExecutionReport> {
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let scenario = parse_scenario(&yaml)?;
    ScenarioExecutor::new().execute(&scenario)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut failed = 0usize;
    for path in &args.files {
        let outcome = run_file(path);

        if args.json {
            let report = match &outcome {
                Ok(report) => FileReport {
                    file: path.display().to_string(),
                    report: Some(report.clone()),
                    error: None,
                },
                Err(e) => FileReport {
                    file: path.display().to_string(),
                    report: None,
                    error: Some(format!("{:#}", e)),
                },
            };
            println!("{}", serde_json::to_string(&report)?);
        }

        match outcome {
            Ok(report) => info!(
                "✓ {} ({}): {} steps",
                report.scenario_name,
                path.display(),
                report.steps_executed
            ),
            Err(e) => {
                failed += 1;
                error!("✗ {}: {:#}", path.display(), e);
                if args.fail_fast {
                    break;
                }
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} scenarios failed", failed, args.files.len());
    }

    info!("All {} scenarios passed", args.files.len());
    Ok(())
}
