use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use fsr_client::HttpTransport;
use fsr_core::RunSummary;
use fsr_script::{load_examples, load_scripts, LoadError, ProfileCatalog};

use crate::config::Config;
use crate::context::RunContext;
use crate::runner::ScriptRunner;

/// One script's run, with the audit file it produced.
#[derive(Debug)]
pub struct ScriptRunReport {
    pub summary: RunSummary,
    pub audit_path: Option<PathBuf>,
}

/// Outcome of one batch: the scripts that ran plus the script documents
/// that could not even be loaded. A failed load never aborts the batch,
/// but it must stay visible to the caller.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<ScriptRunReport>,
    pub failures: Vec<LoadError>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty() && self.failures.is_empty()
    }

    pub fn all_passed(&self) -> bool {
        self.failures.is_empty() && self.reports.iter().all(|r| r.summary.all_passed())
    }
}

/// Batch entry point: loads the profile catalog and every configured script,
/// then runs them one after another against the configured server. Each run
/// gets a fresh context and its own audit log file.
pub struct Harness {
    config: Config,
}

impl Harness {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the StructureDefinition catalog named by the config, or an
    /// empty one when no profiles directory is configured.
    pub fn load_catalog(&self) -> Result<ProfileCatalog> {
        match &self.config.paths.profiles_dir {
            Some(dir) if dir.is_dir() => ProfileCatalog::load_from_dir(dir),
            Some(dir) => {
                tracing::warn!("profiles dir {} not found, validating against an empty catalog", dir.display());
                Ok(ProfileCatalog::empty())
            }
            None => Ok(ProfileCatalog::empty()),
        }
    }

    /// Run every configured script. A missing `[server]` section skips the
    /// batch cleanly; one script's failures never abort the rest.
    pub fn run_all(&self) -> Result<BatchReport> {
        let Some(server) = &self.config.server else {
            tracing::warn!("no [server] configured, skipping all script runs");
            return Ok(BatchReport::default());
        };
        let transport = HttpTransport::new(Duration::from_secs(server.timeout_secs))?;
        let catalog = self.load_catalog()?;

        let paths = self.config.script_paths()?;
        if paths.is_empty() {
            tracing::warn!("no scripts found under {}", self.config.paths.scripts_dir.display());
            return Ok(BatchReport::default());
        }
        let report = load_scripts(&paths);

        let runner = ScriptRunner::new(server.base_url.clone(), &transport, &catalog);
        let mut reports = Vec::with_capacity(report.scripts.len());
        for loaded in &report.scripts {
            let name = loaded
                .script
                .name
                .clone()
                .or_else(|| loaded.path.file_stem().map(|s| s.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "unnamed".to_string());
            tracing::info!("running script {name} from {}", loaded.path.display());

            let docs = load_examples(&self.config.paths.examples_dir, &loaded.script);
            let mut ctx = RunContext::logging_to(&self.config.paths.results_dir)?;
            let summary = runner.run(&name, &loaded.script, &docs, &mut ctx);
            let audit_path = ctx.audit.path().map(PathBuf::from);
            reports.push(ScriptRunReport { summary, audit_path });
        }
        Ok(BatchReport { reports, failures: report.failures })
    }
}
