// src/config/file.rs

use crate::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;

/// The on-disk JSON config file, before validation.
///
/// Every field is optional here; [`super::ConfigBuilder::build`] decides what
/// is required.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub workspace: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub mode: Option<String>,
    pub project_keys: Vec<String>,
    pub output_dir: Option<String>,
    pub output_format: Option<String>,
    pub jobs: Option<usize>,
    pub api_base_url: Option<String>,
}

impl ConfigFile {
    /// Reads and parses a config file.
    ///
    /// # Errors
    /// `ConfigError::NotFound` if the file does not exist, `Read` for other I/O
    /// failures and `InvalidJson` if it does not parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound {
                path: display.clone(),
            },
            _ => ConfigError::Read {
                path: display.clone(),
                source: e,
            },
        })?;
        log::debug!("Loaded config file '{}'", display);
        Self::parse(&text, &display)
    }

    /// Parses config file contents. `origin` is used in error messages.
    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|source| ConfigError::InvalidJson {
            path: origin.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_file() -> anyhow::Result<()> {
        let file = ConfigFile::parse(
            r#"{
                "workspace": "acme",
                "username": "alice",
                "api_token": "tok",
                "mode": "projects",
                "project_keys": ["PRAC", "OPS"],
                "output_dir": "backups",
                "output_format": "zip",
                "jobs": 8
            }"#,
            "inline",
        )?;
        assert_eq!(file.workspace.as_deref(), Some("acme"));
        assert_eq!(file.project_keys, vec!["PRAC", "OPS"]);
        assert_eq!(file.output_format.as_deref(), Some("zip"));
        assert_eq!(file.jobs, Some(8));
        assert!(file.api_base_url.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_keys_default() -> anyhow::Result<()> {
        let file = ConfigFile::parse("{}", "inline")?;
        assert!(file.workspace.is_none());
        assert!(file.project_keys.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_json_is_reported_with_origin() {
        let err = ConfigFile::parse("{ not json", "broken.json").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson { ref path, .. } if path == "broken.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = ConfigFile::load(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert!(err.to_string().contains("config.example.json"));
    }

    #[test]
    fn test_load_from_disk() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"workspace": "acme"}"#)?;
        let file = ConfigFile::load(&path)?;
        assert_eq!(file.workspace.as_deref(), Some("acme"));
        Ok(())
    }
}
