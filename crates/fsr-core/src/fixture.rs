use crate::error::{EngineError, EngineResult};
use crate::ids::{FixtureId, ServerId, SourceId};

/// One declared fixture and its identity on the server.
///
/// `server_id` stays empty until a provisioning transaction confirms the
/// creation, and is write-once for the rest of the script run.
#[derive(Clone, Debug)]
pub struct FixtureEntry {
    pub fixture_id: FixtureId,
    pub source_id: SourceId,
    pub server_id: Option<ServerId>,
    pub resource_kind: String,
}

/// Maps a script's local fixture identifiers to example-document source ids
/// and server-assigned ids. Owned by exactly one run context; cleared when
/// the script run ends so nothing leaks into the next run.
///
/// Lookups are a linear scan over the entry list. Scripts declare a handful
/// of fixtures, so this is a deliberate simplification, not an oversight.
#[derive(Debug, Default)]
pub struct FixtureRegistry {
    entries: Vec<FixtureEntry>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a fixture. Re-declaring the same fixture with the same source
    /// id is a no-op; a different source id is a script bug.
    pub fn register(
        &mut self,
        fixture_id: FixtureId,
        source_id: SourceId,
        resource_kind: impl Into<String>,
    ) -> EngineResult<()> {
        if let Some(existing) = self.entries.iter().find(|e| e.fixture_id == fixture_id) {
            if existing.source_id == source_id {
                return Ok(());
            }
            return Err(EngineError::DuplicateFixture {
                fixture_id: fixture_id.0,
                existing: existing.source_id.0.clone(),
                requested: source_id.0,
            });
        }
        self.entries.push(FixtureEntry {
            fixture_id,
            source_id,
            server_id: None,
            resource_kind: resource_kind.into(),
        });
        Ok(())
    }

    /// Record the server-assigned id once provisioning confirms creation.
    /// Write-once: rebinding to a different id is a conflict.
    pub fn bind_server_id(&mut self, fixture_id: &FixtureId, server_id: ServerId) -> EngineResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| &e.fixture_id == fixture_id)
            .ok_or_else(|| EngineError::UnknownFixture(fixture_id.0.clone()))?;
        if let Some(existing) = &entry.server_id {
            if existing == &server_id {
                return Ok(());
            }
            return Err(EngineError::DuplicateFixture {
                fixture_id: fixture_id.0.clone(),
                existing: existing.0.clone(),
                requested: server_id.0,
            });
        }
        entry.server_id = Some(server_id);
        Ok(())
    }

    /// Absence is a normal answer here: operations may reference fixtures
    /// that were intentionally not auto-provisioned.
    pub fn resolve_by_source_id(&self, source_id: &SourceId) -> Option<&FixtureEntry> {
        self.entries.iter().find(|e| &e.source_id == source_id)
    }

    pub fn get(&self, fixture_id: &FixtureId) -> Option<&FixtureEntry> {
        self.entries.iter().find(|e| &e.fixture_id == fixture_id)
    }

    pub fn entries(&self) -> &[FixtureEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
