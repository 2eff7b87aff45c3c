//! CLI configuration: `~/.config/turbo-upload/config.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use turbo_transfer::{
    ChunkingConfig, ChunkingMode, DEFAULT_CHUNK_BYTE_COUNT, DEFAULT_MAX_CONCURRENCY,
};

/// Persisted upload defaults. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub upload_url: String,
    pub token: String,
    pub chunk_byte_count: u64,
    pub max_concurrency: usize,
    pub chunking_mode: ChunkingMode,
    pub paid_by: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_url: turbo_http::DEFAULT_UPLOAD_URL.into(),
            token: "arweave".into(),
            chunk_byte_count: DEFAULT_CHUNK_BYTE_COUNT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            chunking_mode: ChunkingMode::Auto,
            paid_by: Vec::new(),
        }
    }
}

impl Config {
    /// Loads from the default location.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads from `path`; a missing or unparsable file gives the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_byte_count: self.chunk_byte_count,
            max_concurrency: self.max_concurrency,
            mode: self.chunking_mode,
        }
    }
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("turbo-upload").join("config.json"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbo_transfer::MIB;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.upload_url, "https://upload.ardrive.io/v1");
        assert_eq!(config.chunking(), ChunkingConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"token":"ario","chunking_mode":"force","paid_by":["addr-1"]}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.token, "ario");
        assert_eq!(config.chunking_mode, ChunkingMode::Force);
        assert_eq!(config.paid_by, vec!["addr-1"]);
        assert_eq!(config.chunk_byte_count, 5 * MIB);
        assert_eq!(config.max_concurrency, 5);
    }

    #[test]
    fn malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            chunk_byte_count: 10 * MIB,
            max_concurrency: 8,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
