//! notegrade - Main Entry Point
//!
//! Grades one notes-app submission against a rubric tier and prints the
//! review summary.

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use notegrade_common::{Report, Tier, VERSION};
use notegrade_harness::{ErrorClass, GradingRun, HarnessConfig, HarnessError};

/// notegrade - Automated review for notes-app submissions
#[derive(Parser)]
#[command(name = "notegrade")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Rubric tier: sub1 (basic) or sub2 (api)
    #[arg(value_parser = parse_tier)]
    tier: Tier,

    /// Submission directory or .zip archive
    target: PathBuf,

    /// Harness configuration file (TOML)
    #[arg(short, long, env = "NOTEGRADE_CONFIG")]
    config: Option<PathBuf>,

    /// Write report.json into this directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Wall-clock limit for the whole run, in seconds
    #[arg(long)]
    deadline: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_tier(value: &str) -> Result<Tier, String> {
    value.parse::<Tier>().map_err(|e| e.to_string())
}

fn load_config(cli: &Cli) -> anyhow::Result<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    if cli.headed {
        config.browser.headless = false;
    }
    if let Some(secs) = cli.deadline {
        anyhow::ensure!(secs > 0, "--deadline must be greater than zero");
        config.run.deadline_secs = secs;
    }
    Ok(config)
}

fn print_report(report: &Report) {
    let rendered = report.to_string();
    for line in rendered.lines() {
        let colored_line = if let Some(rest) = line.strip_prefix(" PASS") {
            format!(" {}{}", "PASS".green().bold(), rest)
        } else if let Some(rest) = line.strip_prefix(" FAIL") {
            format!(" {}{}", "FAIL".red().bold(), rest)
        } else if let Some(rest) = line.strip_prefix(" INFO") {
            format!(" {}{}", "INFO".cyan().bold(), rest)
        } else {
            line.to_string()
        };
        println!("{}", colored_line);
    }

    let (passed, total) = report.score();
    let gating = report.gating_failures();
    if gating.is_empty() {
        println!("{} {}/{} criteria met", "✓".green(), passed, total);
    } else {
        for line in gating {
            println!("{} Gating criterion failed: {}", "✗".red(), line.label);
        }
    }
}

fn write_output(run: &GradingRun, dir: Option<&Path>, report: &Report, err: Option<&HarnessError>) {
    if let Some(dir) = dir {
        if let Err(e) = run.write_results(dir, report, err) {
            error!("Failed to write results: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(2);
        }
    };

    let mut report = Report::for_tier(cli.tier);
    let mut run = GradingRun::new(cli.tier, &cli.target, config);
    info!("notegrade v{}: grading {} submission {}", VERSION, run.tier(), cli.target.display());
    let result = run.run(&mut report).await;

    match result {
        Ok(()) => {
            print_report(&report);
            write_output(&run, cli.output.as_deref(), &report, None);
            if report.gates_passed() {
                info!("Review complete");
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            error!("{}", e);
            if e.class() != ErrorClass::Setup {
                print_report(&report);
                write_output(&run, cli.output.as_deref(), &report, Some(&e));
            }
            ExitCode::from(2)
        }
    }
}
