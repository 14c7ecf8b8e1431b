use std::path::Path;

use anyhow::{anyhow, Result};
use serde_json::Value;

/// Profile catalog: `(filename, profile id)` pairs from a directory of
/// StructureDefinition documents. Loaded once, never mutated afterwards;
/// the engine only ever asks whether an id exists.
#[derive(Clone, Debug, Default)]
pub struct ProfileCatalog {
    profiles: Vec<(String, String)>,
}

impl ProfileCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a catalog from known `(filename, id)` pairs, bypassing the
    /// filesystem scan.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { profiles: pairs }
    }

    /// Scan `dir` for `*.json` StructureDefinitions. Files that fail to
    /// parse or are some other resource kind are skipped with a warning;
    /// a bad file must not take the catalog down.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(anyhow!("profile folder not found: {}", dir.display()));
        }
        let mut profiles = Vec::new();
        let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.path());

        for entry in entries {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let filename = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            let doc: Value = match std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
            {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!("skipping profile {}: {e}", path.display());
                    continue;
                }
            };
            if doc.get("resourceType").and_then(Value::as_str) != Some("StructureDefinition") {
                continue;
            }
            if let Some(id) = doc.get("id").and_then(Value::as_str) {
                tracing::debug!("loaded profile {id} from {filename}");
                profiles.push((filename, id.to_string()));
            }
        }
        Ok(Self { profiles })
    }

    pub fn contains(&self, profile_id: &str) -> bool {
        self.profiles.iter().any(|(_, id)| id == profile_id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.profiles.iter().map(|(_, id)| id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn loads_structure_definitions_only() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("StructureDefinition-at-core-patient.json"),
            json!({"resourceType": "StructureDefinition", "id": "at-core-patient"}).to_string(),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("Patient-Example.json"),
            json!({"resourceType": "Patient", "id": "pat-1"}).to_string(),
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{oops").unwrap();

        let catalog = ProfileCatalog::load_from_dir(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("at-core-patient"));
        assert!(!catalog.contains("pat-1"));
    }

    #[test]
    fn missing_folder_is_an_error() {
        assert!(ProfileCatalog::load_from_dir(Path::new("/nonexistent/profiles")).is_err());
    }
}
