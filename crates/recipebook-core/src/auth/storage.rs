use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::session::{SessionRecord, SESSION_STORAGE_KEY};

/// File-backed session storage: one JSON record in the data directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    data_dir: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load the persisted record, `None` if nothing is stored
    pub fn load(&self) -> Result<Option<SessionRecord>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let record: SessionRecord =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(Some(record))
    }

    /// Save the record, replacing any previous one
    pub fn save(&self, record: &SessionRecord) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, contents).context("Failed to write session file")?;
        debug!(?path, "Session saved");
        Ok(())
    }

    /// Remove the record. Missing record is not an error.
    pub fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
            debug!(?path, "Session removed");
        }
        Ok(())
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", SESSION_STORAGE_KEY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn record() -> SessionRecord {
        SessionRecord {
            email: "a@b.com".to_string(),
            id: "u1".to_string(),
            token: "tok1".to_string(),
            token_expiration_date: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_creates_directory_and_replaces() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("nested"));

        store.save(&record()).unwrap();
        assert!(store.session_path().ends_with("userData.json"));

        let mut second = record();
        second.token = "tok2".to_string();
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), Some(second));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());

        store.save(&record()).unwrap();
        store.clear().unwrap();
        assert!(!store.session_path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_record_is_error() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        std::fs::write(store.session_path(), "{not json").unwrap();

        assert!(store.load().is_err());
    }
}
