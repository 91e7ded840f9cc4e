//! Process-wide upstream API key state.
//!
//! The key lives in memory and in a local secret file under the data
//! directory. When the file is present and non-empty it overrides the
//! config-supplied key at startup; the admin set-key endpoint is the only
//! mutator afterwards. The file write and the in-memory swap are not
//! transactional: a crash between the two leaves them out of sync until
//! the next start.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use tracing::info;

/// Name of the secret file under the data directory.
const KEY_FILE: &str = "upstream_key";

/// Upstream API key holder.
#[derive(Debug)]
pub struct ApiKeys {
    path: PathBuf,
    current: RwLock<Option<String>>,
}

impl ApiKeys {
    /// Load key state. The secret file wins over the configured seed.
    pub fn load(data_dir: &Path, seed: Option<String>) -> Self {
        let path = data_dir.join(KEY_FILE);

        let from_file = std::fs::read_to_string(&path)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|key| !key.is_empty());
        if from_file.is_some() {
            info!("upstream key loaded from {}", path.display());
        }

        Self {
            path,
            current: RwLock::new(from_file.or(seed)),
        }
    }

    /// The key the resolver should use right now.
    pub fn current(&self) -> Option<String> {
        self.current.read().expect("key lock poisoned").clone()
    }

    pub fn is_configured(&self) -> bool {
        self.current.read().expect("key lock poisoned").is_some()
    }

    /// Persist a new key, then swap it into memory.
    pub fn set(&self, key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating secret directory: {}", parent.display()))?;
        }
        std::fs::write(&self.path, key)
            .with_context(|| format!("writing secret file: {}", self.path.display()))?;

        *self.current.write().expect("key lock poisoned") = Some(key.to_string());
        Ok(())
    }

    /// Masked rendering for admin display. Never the full key.
    pub fn masked(&self) -> Option<String> {
        self.current().map(|key| {
            let prefix: String = key.chars().take(4).collect();
            format!("{prefix}...")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_seed_used_when_no_file() {
        let temp = TempDir::new().unwrap();
        let keys = ApiKeys::load(temp.path(), Some("hf_seed".to_string()));
        assert_eq!(keys.current().as_deref(), Some("hf_seed"));
    }

    #[test]
    fn test_file_overrides_seed() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(KEY_FILE), "hf_file\n").unwrap();

        let keys = ApiKeys::load(temp.path(), Some("hf_seed".to_string()));
        assert_eq!(keys.current().as_deref(), Some("hf_file"));
    }

    #[test]
    fn test_set_persists_and_survives_reload() {
        let temp = TempDir::new().unwrap();
        let keys = ApiKeys::load(temp.path(), None);
        assert!(!keys.is_configured());

        keys.set("hf_rotated").unwrap();
        assert_eq!(keys.current().as_deref(), Some("hf_rotated"));

        let reloaded = ApiKeys::load(temp.path(), None);
        assert_eq!(reloaded.current().as_deref(), Some("hf_rotated"));
    }

    #[test]
    fn test_masked_shows_prefix_only() {
        let temp = TempDir::new().unwrap();
        let keys = ApiKeys::load(temp.path(), Some("hf_abcdef".to_string()));
        assert_eq!(keys.masked().as_deref(), Some("hf_a..."));

        let empty = ApiKeys::load(temp.path().join("other").as_path(), None);
        assert!(empty.masked().is_none());
    }
}
