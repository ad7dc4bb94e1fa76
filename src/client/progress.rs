use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::api::{Answers, ClientError};

/// Locally cached state of an open test, restored when the student reopens it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedProgress {
    pub saved_answers: Answers,
    pub saved_current_question_index: usize,
}

pub trait ProgressStore: Send + Sync {
    fn load(&self, test_id: &str) -> Result<Option<SavedProgress>, ClientError>;
    fn save(&self, test_id: &str, progress: &SavedProgress) -> Result<(), ClientError>;
    fn clear(&self, test_id: &str) -> Result<(), ClientError>;
}

/// One JSON file per test under `dir`.
#[derive(Debug, Clone)]
pub struct FileProgressStore {
    dir: PathBuf,
}

impl FileProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, test_id: &str) -> PathBuf {
        let name: String = test_id
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn store_error(err: impl std::fmt::Display) -> ClientError {
    ClientError::Store(err.to_string())
}

impl ProgressStore for FileProgressStore {
    fn load(&self, test_id: &str) -> Result<Option<SavedProgress>, ClientError> {
        let raw = match fs::read(self.path_for(test_id)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(store_error(err)),
        };
        serde_json::from_slice(&raw).map(Some).map_err(store_error)
    }

    fn save(&self, test_id: &str, progress: &SavedProgress) -> Result<(), ClientError> {
        fs::create_dir_all(&self.dir).map_err(store_error)?;
        let path = self.path_for(test_id);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec(progress).map_err(store_error)?;

        fs::write(&tmp, body).map_err(store_error)?;
        fs::rename(&tmp, &path).map_err(store_error)
    }

    fn clear(&self, test_id: &str) -> Result<(), ClientError> {
        match fs::remove_file(self.path_for(test_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(store_error(err)),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    entries: Mutex<HashMap<String, SavedProgress>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self, test_id: &str) -> Result<Option<SavedProgress>, ClientError> {
        let entries = self.entries.lock().map_err(|_| store_error("progress lock poisoned"))?;
        Ok(entries.get(test_id).cloned())
    }

    fn save(&self, test_id: &str, progress: &SavedProgress) -> Result<(), ClientError> {
        let mut entries = self.entries.lock().map_err(|_| store_error("progress lock poisoned"))?;
        entries.insert(test_id.to_string(), progress.clone());
        Ok(())
    }

    fn clear(&self, test_id: &str) -> Result<(), ClientError> {
        let mut entries = self.entries.lock().map_err(|_| store_error("progress lock poisoned"))?;
        entries.remove(test_id);
        Ok(())
    }
}

impl<T: ProgressStore + ?Sized> ProgressStore for std::sync::Arc<T> {
    fn load(&self, test_id: &str) -> Result<Option<SavedProgress>, ClientError> {
        (**self).load(test_id)
    }

    fn save(&self, test_id: &str, progress: &SavedProgress) -> Result<(), ClientError> {
        (**self).save(test_id, progress)
    }

    fn clear(&self, test_id: &str) -> Result<(), ClientError> {
        (**self).clear(test_id)
    }
}
