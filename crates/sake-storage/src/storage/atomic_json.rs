//! Atomic JSON file operations.
//!
//! The persisted workspace state is a single JSON document; a truncated
//! write would lose every session at once. Saves therefore go through a
//! temp file in the same directory, an fsync, and an atomic rename, with
//! an advisory lock serializing writers.

use sake_core::error::{Result, SakeError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A handle to a JSON file with atomic replace semantics.
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Creates a handle. The file itself may not exist yet.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// A missing or empty file is `Ok(None)`, not an error: first launch
    /// has nothing to restore.
    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let data: T = serde_json::from_str(&content)?;
        Ok(Some(data))
    }

    /// Serializes and writes `data` atomically.
    ///
    /// The write must fully complete before a subsequent save is issued;
    /// the advisory lock plus temp-then-rename guarantees readers never
    /// observe a truncated document.
    pub fn save(&self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let _lock = FileLock::acquire(&self.path)?;

        let json = serde_json::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Loads, applies `patch`, and saves atomically under one lock.
    pub fn update<F>(&self, default_value: T, patch: F) -> Result<()>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut data = self.load()?.unwrap_or(default_value);
        patch(&mut data)?;

        let json = serde_json::to_string_pretty(&data)?;
        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| SakeError::io("storage path has no parent directory"))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| SakeError::io("storage path has no file name"))?;
        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Advisory lock guard; released (and its lock file removed) on drop.
struct FileLock {
    #[allow(dead_code)]
    file: File,
    lock_path: PathBuf,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive()
                .map_err(|err| SakeError::io(format!("failed to acquire storage lock: {err}")))?;
        }

        Ok(FileLock { file, lock_path })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Doc>::new(dir.path().join("state.json"));

        let doc = Doc {
            name: "one".to_string(),
            count: 3,
        };
        file.save(&doc).unwrap();
        assert_eq!(file.load().unwrap().unwrap(), doc);
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Doc>::new(dir.path().join("missing.json"));
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let file = AtomicJsonFile::<Doc>::new(path);
        let err = file.load().unwrap_err();
        assert!(matches!(err, SakeError::Serialization { .. }));
    }

    #[test]
    fn test_update_creates_with_default() {
        let dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Doc>::new(dir.path().join("state.json"));

        file.update(
            Doc {
                name: "fresh".to_string(),
                count: 0,
            },
            |doc| {
                doc.count += 7;
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(file.load().unwrap().unwrap().count, 7);
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let file = AtomicJsonFile::<Doc>::new(dir.path().join("state.json"));
        file.save(&Doc {
            name: "x".to_string(),
            count: 1,
        })
        .unwrap();

        assert!(!dir.path().join(".state.json.tmp").exists());
        assert!(dir.path().join("state.json").exists());
    }
}
