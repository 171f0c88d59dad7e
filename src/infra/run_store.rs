// ============================================================
// Layer 6 — Run Store
// ============================================================
// Saves and loads the training configuration as JSON.
//
// File layout:
//   <output_dir>/
//     train_config.json   ← every parameter of the run
//     metrics.csv         ← written by MetricsLogger
//     anomaly_scores.csv  ← written by MetricsLogger

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::application::train_use_case::TrainConfig;

pub const CONFIG_FILE: &str = "train_config.json";

pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    /// Create the store, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create output directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// Save the training configuration to `<dir>/train_config.json`.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.config_path();
        let json = serde_json::to_string_pretty(cfg)?;

        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Load a training configuration from any JSON file.
    /// Missing fields take their default values.
    pub fn load_config(path: impl AsRef<Path>) -> Result<TrainConfig> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;

        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::preprocessor::DegeneratePolicy;

    #[test]
    fn test_save_then_load() {
        let dir   = tempfile::tempdir().unwrap();
        let store = RunStore::new(dir.path().join("run")).unwrap();
        let cfg   = TrainConfig { epochs: 7, on_degenerate: DegeneratePolicy::Zero, ..TrainConfig::default() };

        store.save_config(&cfg).unwrap();
        assert_eq!(RunStore::load_config(store.config_path()).unwrap(), cfg);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "data_dir": "/scans", "on_degenerate": "fail" }"#).unwrap();

        let cfg = RunStore::load_config(&path).unwrap();
        assert_eq!(cfg.data_dir, "/scans");
        assert_eq!(cfg.on_degenerate, DegeneratePolicy::Fail);
        assert_eq!(cfg.epochs, TrainConfig::default().epochs);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RunStore::load_config(dir.path().join("nope.json")).is_err());
    }
}
