//! Locating and loading the engine configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gov_engine::GovernanceConfig;
use tracing::debug;

/// `$CONFIG_DIR/govctl/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("govctl").join("config.toml"))
}

/// An explicit path must exist. Without one, the per-user file is used if
/// present, else the built-in devnet configuration.
pub fn load(path: Option<&Path>) -> Result<GovernanceConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path().filter(|p| p.exists()) {
            Some(p) => p,
            None => {
                debug!("No config file found, using devnet defaults");
                return Ok(GovernanceConfig::devnet());
            }
        },
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = GovernanceConfig::from_toml(&contents)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "quorum_threshold = 1\n[genesis]\ngovernors = [\"7-1\"]\n",
        )
        .unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.quorum_threshold, 1);
        assert_eq!(config.genesis.governors.len(), 1);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "quorum_threshold = 3\n[genesis]\ngovernors = [\"7-1\"]\n").unwrap();
        assert!(load(Some(&path)).is_err());
    }
}
