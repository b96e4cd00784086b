use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Which backend a [`NoteStore`](crate::NoteStore) runs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    #[default]
    Local,
    Remote,
}

impl StoreMode {
    /// Name of the on-disk database for this mode.
    pub fn database_name(self) -> &'static str {
        match self {
            Self::Local => "noted-local",
            Self::Remote => "noted-remote",
        }
    }
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Remote => "remote",
        })
    }
}

/// Store configuration, usually read from TOML:
///
/// ```toml
/// mode = "remote"
/// data_dir = "/var/lib/noted"
///
/// [remote]
/// base_url = "https://notes.example.com"
/// timeout_ms = 10000
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub mode: StoreMode,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mode: StoreMode::Local,
            data_dir: default_data_dir(),
            remote: None,
        }
    }
}

impl StoreConfig {
    pub fn from_toml(text: &str) -> StoreResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> StoreResult<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Remote mode requires a `[remote]` section.
    pub fn validate(&self) -> StoreResult<()> {
        if self.mode == StoreMode::Remote && self.remote.is_none() {
            return Err(StoreError::Config(
                "mode = \"remote\" requires a [remote] section".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local() {
        let config = StoreConfig::from_toml("").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.mode.database_name(), "noted-local");
    }

    #[test]
    fn parses_remote_section() {
        let config = StoreConfig::from_toml(
            r#"
            mode = "remote"
            data_dir = "/tmp/notes"

            [remote]
            base_url = "http://127.0.0.1:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, StoreMode::Remote);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/notes"));
        let remote = config.remote.unwrap();
        assert_eq!(remote.base_url, "http://127.0.0.1:9000");
        assert_eq!(remote.timeout_ms, 30_000);
    }

    #[test]
    fn remote_without_section_is_rejected() {
        let err = StoreConfig::from_toml("mode = \"remote\"").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(StoreConfig::from_toml("mode = \"cloud\"").is_err());
    }
}
