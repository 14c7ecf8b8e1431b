use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use fsr_core::EngineError;

use crate::model::{validate_script, TestScript};

/// Per-document load failure. A batch keeps going past any of these;
/// the caller decides what a single bad file means for the run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("{}:{line}:{column}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{}: {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

impl From<LoadError> for EngineError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::NotFound { path } => EngineError::NotFound(path.display().to_string()),
            LoadError::Io { path, message } => {
                EngineError::NotFound(format!("{}: {message}", path.display()))
            }
            LoadError::Parse { path, line, column, message } => EngineError::DocumentParse {
                path: path.display().to_string(),
                line,
                column,
                message,
            },
            LoadError::Invalid { path, message } => EngineError::DocumentParse {
                path: path.display().to_string(),
                line: 0,
                column: 0,
                message,
            },
        }
    }
}

fn read_json(path: &Path) -> Result<Value, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound { path: path.to_path_buf() }
        } else {
            LoadError::Io { path: path.to_path_buf(), message: e.to_string() }
        }
    })?;
    serde_json::from_str(&text).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })
}

/// Parse and validate one test script document.
pub fn load_script(path: &Path) -> Result<TestScript, LoadError> {
    let value = read_json(path)?;
    let script: TestScript = serde_json::from_value(value).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        line: 0,
        column: 0,
        message: e.to_string(),
    })?;
    validate_script(&script).map_err(|e| LoadError::Invalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(script)
}

/// Parse one example-resource document, kept as an opaque JSON tree.
pub fn load_resource(path: &Path) -> Result<Value, LoadError> {
    read_json(path)
}

#[derive(Debug)]
pub struct LoadedScript {
    pub path: PathBuf,
    pub script: TestScript,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub scripts: Vec<LoadedScript>,
    pub failures: Vec<LoadError>,
}

/// Load a batch of scripts. One malformed file is recorded and skipped,
/// never aborting the rest of the batch.
pub fn load_scripts<P: AsRef<Path>>(paths: &[P]) -> LoadReport {
    let mut report = LoadReport::default();
    for p in paths {
        let path = p.as_ref();
        match load_script(path) {
            Ok(script) => report.scripts.push(LoadedScript { path: path.to_path_buf(), script }),
            Err(e) => {
                tracing::warn!("skipping script: {e}");
                report.failures.push(e);
            }
        }
    }
    report
}

/// Normalise a fixture `resource.reference` into the example document's
/// file name. IG publishers link the `.html` rendering; the data lives in
/// the `.json` of the same stem.
pub fn fixture_document_name(reference: &str) -> Option<String> {
    let base = reference.rsplit('/').next()?;
    let stem = base
        .strip_suffix(".json.html")
        .or_else(|| base.strip_suffix(".html"))
        .or_else(|| base.strip_suffix(".json"))
        .unwrap_or(base);
    if stem.is_empty() {
        return None;
    }
    Some(format!("{stem}.json"))
}

/// Example documents for one script: the documents keyed by their declared
/// identifier, plus the fixture-id → source-id association the registry is
/// pre-populated from.
#[derive(Debug, Default)]
pub struct ScriptDocuments {
    pub documents: BTreeMap<String, Value>,
    /// `(fixture id, source id)` in declaration order.
    pub fixture_sources: Vec<(String, String)>,
    pub failures: Vec<LoadError>,
}

impl ScriptDocuments {
    pub fn source_id_for_fixture(&self, fixture_id: &str) -> Option<&str> {
        self.fixture_sources
            .iter()
            .find(|(f, _)| f == fixture_id)
            .map(|(_, s)| s.as_str())
    }
}

/// Load every fixture-referenced example document from `examples_dir`,
/// keyed by its declared identifier (the document's `id`, falling back to
/// the file stem). Missing or malformed documents are recorded, not fatal.
pub fn load_examples(examples_dir: &Path, script: &TestScript) -> ScriptDocuments {
    let mut out = ScriptDocuments::default();

    for fixture in &script.fixture {
        let Some(reference) = fixture.resource.as_ref().and_then(|r| r.reference.as_deref()) else {
            continue;
        };
        let Some(file_name) = fixture_document_name(reference) else {
            continue;
        };
        let path = examples_dir.join(&file_name);
        match load_resource(&path) {
            Ok(doc) => {
                let key = doc
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| file_name.trim_end_matches(".json").to_string());
                tracing::debug!("loaded example instance {key} from {}", path.display());
                out.fixture_sources.push((fixture.id.clone(), key.clone()));
                out.documents.insert(key, doc);
            }
            Err(e) => {
                tracing::warn!("skipping example instance: {e}");
                out.failures.push(e);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn missing_file_is_not_found_not_parse() {
        let err = load_script(Path::new("/nonexistent/script.json")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
    }

    #[test]
    fn malformed_json_reports_line_and_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\n  \"name\": oops\n}").unwrap();
        match load_script(&path).unwrap_err() {
            LoadError::Parse { line, column, .. } => {
                assert_eq!(line, 2);
                assert!(column > 0);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn batch_continues_past_bad_scripts() {
        let dir = tempdir().unwrap();
        let good = write(
            dir.path(),
            "good.json",
            &json!({"name": "ok", "test": [{"name": "t", "action": [{"assert": {"responseCode": "200"}}]}]}),
        );
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();

        let report = load_scripts(&[good, bad]);
        assert_eq!(report.scripts.len(), 1);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn reference_normalisation() {
        assert_eq!(
            fixture_document_name("https://example.org/ig/Patient-Example.html").as_deref(),
            Some("Patient-Example.json")
        );
        assert_eq!(
            fixture_document_name("Patient-Example.json.html").as_deref(),
            Some("Patient-Example.json")
        );
        assert_eq!(
            fixture_document_name("Patient-Example.json").as_deref(),
            Some("Patient-Example.json")
        );
        assert_eq!(fixture_document_name(""), None);
    }

    #[test]
    fn examples_keyed_by_document_id() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "Patient-Example.json",
            &json!({"resourceType": "Patient", "id": "pat-1"}),
        );
        let script: TestScript = serde_json::from_value(json!({
            "fixture": [{"id": "f1", "resource": {"reference": "Patient-Example.html"}}]
        }))
        .unwrap();

        let loaded = load_examples(dir.path(), &script);
        assert!(loaded.failures.is_empty());
        assert!(loaded.documents.contains_key("pat-1"));
        assert_eq!(loaded.source_id_for_fixture("f1"), Some("pat-1"));
    }

    #[test]
    fn missing_example_is_recorded_not_fatal() {
        let dir = tempdir().unwrap();
        let script: TestScript = serde_json::from_value(json!({
            "fixture": [{"id": "f1", "resource": {"reference": "Patient-Gone.html"}}]
        }))
        .unwrap();

        let loaded = load_examples(dir.path(), &script);
        assert!(loaded.documents.is_empty());
        assert_eq!(loaded.failures.len(), 1);
        assert!(matches!(loaded.failures[0], LoadError::NotFound { .. }));
    }
}
