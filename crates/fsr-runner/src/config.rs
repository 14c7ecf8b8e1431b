use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runner configuration, `fsr.toml`. A missing `[server]` section is not an
/// error: runs against an unconfigured target are skipped cleanly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Explicit script documents. When empty, `scripts_dir` is scanned.
    #[serde(default)]
    pub scripts: Vec<PathBuf>,
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,
    #[serde(default = "default_examples_dir")]
    pub examples_dir: PathBuf,
    #[serde(default)]
    pub profiles_dir: Option<PathBuf>,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("Test_Scripts")
}

fn default_examples_dir() -> PathBuf {
    PathBuf::from("Example_Instances")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("Results")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scripts: Vec::new(),
            scripts_dir: default_scripts_dir(),
            examples_dir: default_examples_dir(),
            profiles_dir: None,
            results_dir: default_results_dir(),
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let s = toml::to_string_pretty(self).with_context(|| "serialize config")?;
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    /// Explicit script list, or a scan of the scripts directory for
    /// `*.json`, in name order.
    pub fn script_paths(&self) -> Result<Vec<PathBuf>> {
        if !self.paths.scripts.is_empty() {
            return Ok(self.paths.scripts.clone());
        }
        let dir = &self.paths.scripts_dir;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("scan {}", dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_minimal_config_without_server() {
        let cfg: Config = toml::from_str("").unwrap();
        assert!(cfg.server.is_none());
        assert_eq!(cfg.paths.results_dir, PathBuf::from("Results"));
    }

    #[test]
    fn parses_full_config() {
        let cfg: Config = toml::from_str(
            r#"
            [server]
            base_url = "https://hapi.fhir.org/baseR5"

            [paths]
            scripts = ["Test_Scripts/create.json"]
            examples_dir = "Instances"
            profiles_dir = "Profiles"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.as_ref().unwrap().base_url, "https://hapi.fhir.org/baseR5");
        assert_eq!(cfg.server.as_ref().unwrap().timeout_secs, 30);
        assert_eq!(cfg.paths.scripts.len(), 1);
        assert_eq!(cfg.paths.profiles_dir.as_deref(), Some(Path::new("Profiles")));
    }

    #[test]
    fn scan_falls_back_to_scripts_dir() {
        let dir = tempdir().unwrap();
        let scripts = dir.path().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        std::fs::write(scripts.join("b.json"), "{}").unwrap();
        std::fs::write(scripts.join("a.json"), "{}").unwrap();
        std::fs::write(scripts.join("notes.txt"), "x").unwrap();

        let mut cfg = Config::default();
        cfg.paths.scripts_dir = scripts.clone();
        let paths = cfg.script_paths().unwrap();
        assert_eq!(paths, vec![scripts.join("a.json"), scripts.join("b.json")]);
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fsr.toml");
        let mut cfg = Config::default();
        cfg.server = Some(ServerConfig { base_url: "http://localhost:8080/fhir".into(), timeout_secs: 5 });
        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.server.unwrap().timeout_secs, 5);
    }
}
