//! JSON file persistence.
//!
//! Groups and users live in `groups.json` and `users.json` under one data
//! directory. Every save writes a temporary file next to the target and
//! renames it over the old one, so readers never see a half-written file.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use gatehouse_auth::{AccessPersistence, Group, PersistenceError, User};

pub const GROUPS_FILE: &str = "groups.json";
pub const USERS_FILE: &str = "users.json";

#[derive(Debug)]
pub struct JsonFilePersistence {
    dir: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl JsonFilePersistence {
    /// Open (and create if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "json file store opened");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// A missing file is an empty collection.
    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, PersistenceError> {
        let path = self.path(file);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write<T: Serialize>(&self, file: &str, items: &[T]) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, items)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path(file)).map_err(|err| err.error)?;

        tracing::debug!(file, entries = items.len(), "json file written");
        Ok(())
    }
}

impl AccessPersistence for JsonFilePersistence {
    fn load_groups(&self) -> Result<Vec<Group>, PersistenceError> {
        self.read(GROUPS_FILE)
    }

    fn save_groups(&self, groups: &[Group]) -> Result<(), PersistenceError> {
        self.write(GROUPS_FILE, groups)
    }

    fn load_users(&self) -> Result<Vec<User>, PersistenceError> {
        self.read(USERS_FILE)
    }

    fn save_users(&self, users: &[User]) -> Result<(), PersistenceError> {
        self.write(USERS_FILE, users)
    }
}
