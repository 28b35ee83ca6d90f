/// File-backed key-value store: one JSON file per key under a data directory.
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
use pickrank_core::{KeyValueStore, StoreError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(FileStore { dir: dir.to_path_buf() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}", path.display());
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|source| StoreError::Write { key: key.to_string(), source })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Remove { key: key.to_string(), source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickrank_core::{MemoryStore, RankingSession, RankingState};

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get("ranking-items"), None);
        store.set("ranking-items", "[\"a\"]".to_string()).unwrap();
        assert_eq!(store.get("ranking-items").as_deref(), Some("[\"a\"]"));
        assert!(dir.path().join("ranking-items.json").exists());

        store.remove("ranking-items").unwrap();
        assert_eq!(store.get("ranking-items"), None);
        store.remove("ranking-items").unwrap();
    }

    #[test]
    fn test_unsafe_key_characters_are_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        store.set("../escape/items", "1".to_string()).unwrap();
        assert!(dir.path().join("___escape_items.json").exists());
        assert_eq!(store.get("../escape/items").as_deref(), Some("1"));
    }

    #[test]
    fn test_session_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            let mut session: RankingSession<String, _> = RankingSession::open(store, "films").unwrap();
            session.add_items(["c", "a", "b"].map(String::from)).unwrap();
            session.start_ranking(None).unwrap();
            let pair = session.current_pending_comparison().cloned().unwrap();
            session.choose(&pair.first).unwrap();
        }

        let store = FileStore::open(dir.path()).unwrap();
        let session: RankingSession<String, _> = RankingSession::open(store, "films").unwrap();
        assert_eq!(session.state(), RankingState::Comparing);
        assert_eq!(session.comparisons_taken(), 1);
        assert!(session.current_pending_comparison().is_some());

        // Same engine, different backend: nothing leaks across.
        let other: RankingSession<String, _> = RankingSession::open(MemoryStore::new(), "films").unwrap();
        assert_eq!(other.state(), RankingState::Idle);
    }
}
