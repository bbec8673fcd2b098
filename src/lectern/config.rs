use crate::error::{LecternError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BODY_FILE_NAME: &str = "CONTENT.md";
const FALLBACK_ROOT: &str = "lectern-data";

/// Where and how a [`crate::storage::Storage`] keeps its files.
///
/// Usually built in code with [`StorageConfig::new`]; can also be read from a
/// JSON file with [`StorageConfig::load`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Root directory holding `metadata/` and `entries/`.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// File name of each entry's body inside its directory.
    #[serde(default = "default_body_file_name")]
    pub body_file_name: String,
}

fn default_root() -> PathBuf {
    ProjectDirs::from("", "", "lectern")
        .map(|dirs| dirs.data_dir().join("storage"))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_ROOT))
}

fn default_body_file_name() -> String {
    DEFAULT_BODY_FILE_NAME.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            body_file_name: default_body_file_name(),
        }
    }
}

impl StorageConfig {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            body_file_name: default_body_file_name(),
        }
    }

    pub fn with_body_file_name(mut self, name: &str) -> Self {
        self.body_file_name = name.to_string();
        self
    }

    /// Load config from a JSON file, or return defaults if it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(LecternError::Io)?;
        let config: StorageConfig =
            serde_json::from_str(&content).map_err(LecternError::Serialization)?;
        Ok(config)
    }

    /// Save config to a JSON file, creating its parent directory.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(LecternError::Io)?;
            }
        }

        let content = serde_json::to_string_pretty(self).map_err(LecternError::Serialization)?;
        fs::write(path, content).map_err(LecternError::Io)?;
        Ok(())
    }

    /// The body file must be a plain name that stays inside the entry directory.
    pub fn validate(&self) -> Result<()> {
        let name = self.body_file_name.as_str();
        if name.is_empty() || name == "." || name == ".." {
            return Err(LecternError::Config(format!(
                "invalid body file name `{name}`"
            )));
        }
        if name.contains('/') || name.contains('\\') {
            return Err(LecternError::Config(format!(
                "body file name `{name}` must not contain path separators"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_uses_default_body_file_name() {
        let config = StorageConfig::new("/tmp/lectern");
        assert_eq!(config.body_file_name, "CONTENT.md");
        assert_eq!(config.root, PathBuf::from("/tmp/lectern"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_body_names_with_separators() {
        let config = StorageConfig::new("root").with_body_file_name("../escape.md");
        assert!(matches!(config.validate(), Err(LecternError::Config(_))));

        let config = StorageConfig::new("root").with_body_file_name("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_missing_config_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::load(temp.path().join("missing.json")).unwrap();
        assert_eq!(config, StorageConfig::default());
    }

    #[test]
    fn save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("lectern.json");

        let config = StorageConfig::new(temp.path().join("data")).with_body_file_name("BODY.txt");
        config.save(&path).unwrap();

        let loaded = StorageConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("lectern.json");
        fs::write(&path, r#"{ "root": "/srv/notes" }"#).unwrap();

        let loaded = StorageConfig::load(&path).unwrap();
        assert_eq!(loaded.root, PathBuf::from("/srv/notes"));
        assert_eq!(loaded.body_file_name, DEFAULT_BODY_FILE_NAME);
    }
}
