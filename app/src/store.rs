//! JSON file backend for the statistics snapshot.

use std::path::{Path, PathBuf};

use oche::statistics::Snapshot;
use oche::{StatsStore, StoreError};

/// Keeps the whole snapshot in one pretty-printed JSON file. Writes go to a
/// sibling `.tmp` file first and are renamed into place.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "statistics.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StatsStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = serde_json::from_str(&contents)?;
        tracing::debug!("loaded statistics from {}", self.path.display());
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
