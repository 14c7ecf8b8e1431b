use std::path::Path;

use anyhow::Result;

use fsr_core::{AuditLog, FixtureRegistry, ObservedResponse, ServerId};

/// All mutable state of one script run, owned for exactly that run.
/// Nothing here is shared: concurrent runs each build their own context,
/// and `finish` clears the registry so identifiers never leak across runs.
#[derive(Debug)]
pub struct RunContext {
    pub registry: FixtureRegistry,
    pub audit: AuditLog,
    pub last_response: Option<ObservedResponse>,
    pub last_created_id: Option<ServerId>,
}

impl RunContext {
    pub fn buffered() -> Self {
        Self::with_audit(AuditLog::buffered())
    }

    pub fn logging_to(results_dir: &Path) -> Result<Self> {
        Ok(Self::with_audit(AuditLog::create_in(results_dir)?))
    }

    fn with_audit(audit: AuditLog) -> Self {
        Self {
            registry: FixtureRegistry::new(),
            audit,
            last_response: None,
            last_created_id: None,
        }
    }

    /// End-of-run cleanup; the audit log stays readable afterwards.
    pub fn finish(&mut self) {
        self.registry.clear();
        self.last_response = None;
        self.last_created_id = None;
    }
}
