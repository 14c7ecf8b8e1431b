use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fsr_core::TestOutcome;
use fsr_runner::{Config, Harness};
use fsr_script::load_scripts;

#[derive(Parser)]
#[command(name = "fsr", version)]
struct Cli {
    /// Runner configuration file
    #[arg(long, default_value = "fsr.toml")]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default fsr.toml in the current directory
    Init,

    /// Run every configured test script against the target server
    Run,

    /// Parse and validate the configured scripts without contacting a server
    Validate,

    /// List the profile ids loaded from the configured profile folder
    Profiles,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Init => {
            if cli.config.exists() {
                anyhow::bail!("{} already exists", cli.config.display());
            }
            Config::default().save_to(&cli.config)?;
            println!("Wrote {}", cli.config.display());
        }
        Command::Run => {
            let harness = Harness::new(load_config(&cli.config)?);
            let batch = harness.run_all()?;
            if batch.is_empty() {
                println!("Nothing to run");
                return Ok(());
            }

            for failure in &batch.failures {
                println!("LOAD FAIL {failure}");
            }
            for report in &batch.reports {
                println!("{}", report.summary.script);
                for result in &report.summary.results {
                    let mark = match result.outcome {
                        TestOutcome::Passed => "PASS",
                        TestOutcome::Failed => "FAIL",
                        TestOutcome::Stopped => "STOP",
                    };
                    println!("  {mark} {} ({} actions)", result.name, result.actions.len());
                }
                if let Some(path) = &report.audit_path {
                    println!("  log: {}", path.display());
                }
            }
            if !batch.all_passed() {
                std::process::exit(1);
            }
        }
        Command::Validate => {
            let config = load_config(&cli.config)?;
            let paths = config.script_paths()?;
            if paths.is_empty() {
                println!("No scripts under {}", config.paths.scripts_dir.display());
                return Ok(());
            }
            let report = load_scripts(&paths);
            for loaded in &report.scripts {
                let name = loaded.script.name.as_deref().unwrap_or("(unnamed)");
                let actions: usize = loaded.script.test.iter().map(|t| t.action.len()).sum();
                println!(
                    "OK   {} ({name}: {} tests, {actions} actions)",
                    loaded.path.display(),
                    loaded.script.test.len()
                );
            }
            for failure in &report.failures {
                println!("FAIL {failure}");
            }
            println!("{} valid, {} invalid", report.scripts.len(), report.failures.len());
            if !report.failures.is_empty() {
                std::process::exit(1);
            }
        }
        Command::Profiles => {
            let harness = Harness::new(load_config(&cli.config)?);
            let catalog = harness.load_catalog()?;
            for id in catalog.ids() {
                println!("{id}");
            }
            println!("{} profile(s)", catalog.len());
        }
    }

    Ok(())
}

/// A missing config file is not an error for read-only commands; defaults
/// let `validate` and `profiles` work out of the box.
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load_from(path)
    } else {
        tracing::info!("no {} found, using defaults", path.display());
        Ok(Config::default())
    }
}
