use fs_err as fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

use crate::errors::PlantError;

/// A synchronous string key/value slot.
pub trait Slot: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, PlantError>;
    fn write(&self, key: &str, value: &str) -> Result<(), PlantError>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    #[cfg(test)]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }
}

impl Slot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>, PlantError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), PlantError> {
        fs::create_dir_all(&self.dir)?;
        // Readers in other processes must never see a half-written file.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.flush()?;
        tmp.persist(self.path_for(key))
            .map_err(|e| PlantError::Storage(format!("replace {key}: {}", e.error)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("nested"));
        assert_eq!(slot.read("savedPlants").unwrap(), None);
    }

    #[test]
    fn write_creates_dir_and_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("nested"));
        slot.write("savedPlants", "[1]").unwrap();
        slot.write("savedPlants", "[2]").unwrap();
        assert_eq!(slot.read("savedPlants").unwrap().as_deref(), Some("[2]"));
        assert!(slot.path_for("savedPlants").ends_with("nested/savedPlants.json"));

        // no temp files left behind
        let entries: Vec<_> = std::fs::read_dir(slot.dir()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
