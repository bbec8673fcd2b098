use super::backend::StorageBackend;
use crate::config::StorageConfig;
use crate::error::{LecternError, Result};
use crate::index::{EntryMap, SubjectMap};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const METADATA_DIR: &str = "metadata";
pub const ENTRIES_DIR: &str = "entries";
pub const SUBJECTS_FILE: &str = "subjects.json";
pub const ENTRIES_FILE: &str = "entries.json";

/// Filesystem backend.
///
/// ```text
/// <root>/
///   metadata/subjects.json
///   metadata/entries.json
///   entries/<subject>/<entry>/CONTENT.md
/// ```
pub struct FsBackend {
    root: PathBuf,
    body_file_name: String,
}

impl FsBackend {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self::from_config(&StorageConfig::new(root))
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            root: config.root.clone(),
            body_file_name: config.body_file_name.clone(),
        }
    }

    fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    fn entries_dir(&self) -> PathBuf {
        self.root.join(ENTRIES_DIR)
    }

    fn subject_dir(&self, subject: &Uuid) -> PathBuf {
        self.entries_dir().join(subject.to_string())
    }

    fn entry_dir(&self, subject: &Uuid, entry: &Uuid) -> PathBuf {
        self.subject_dir(subject).join(entry.to_string())
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(LecternError::Io)?;
        }
        Ok(())
    }

    fn load_json<T: DeserializeOwned + Default>(&self, file_name: &str) -> Result<T> {
        let path = self.metadata_dir().join(file_name);
        match fs::read_to_string(&path) {
            Ok(content) => {
                let value = serde_json::from_str(&content).map_err(LecternError::Serialization)?;
                Ok(value)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(
                    "event=metadata_create module=fs_backend file={}",
                    path.display()
                );
                fs::write(&path, "{}").map_err(LecternError::Io)?;
                Ok(T::default())
            }
            Err(err) => Err(LecternError::Io(err)),
        }
    }

    fn save_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<()> {
        let dir = self.metadata_dir();
        self.ensure_dir(&dir)?;

        let content = serde_json::to_string_pretty(value).map_err(LecternError::Serialization)?;
        atomic_write(&dir, &dir.join(file_name), &content)
    }
}

/// Write to a temp file in `dir`, then rename over `target`.
fn atomic_write(dir: &Path, target: &Path, content: &str) -> Result<()> {
    let tmp_path = dir.join(format!(".lectern-{}.tmp", Uuid::new_v4()));
    if let Err(err) = fs::write(&tmp_path, content) {
        let _ = fs::remove_file(&tmp_path);
        return Err(LecternError::Io(err));
    }
    fs::rename(&tmp_path, target).map_err(|err| {
        let _ = fs::remove_file(&tmp_path);
        LecternError::Io(err)
    })
}

fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(LecternError::Io(err)),
    }
}

fn list_uuid_dirs(path: &Path) -> Result<Vec<Uuid>> {
    let read_dir = match fs::read_dir(path) {
        Ok(read_dir) => read_dir,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(LecternError::Io(err)),
    };

    let mut ids = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = dir_entry.map_err(LecternError::Io)?;
        let path = dir_entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            if let Ok(id) = Uuid::parse_str(name) {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}

impl StorageBackend for FsBackend {
    fn root(&self) -> &Path {
        &self.root
    }

    fn prepare(&self) -> Result<()> {
        match fs::metadata(&self.root) {
            Ok(meta) if !meta.is_dir() => {
                return Err(LecternError::NotADirectory(self.root.clone()));
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.root).map_err(LecternError::Io)?;
            }
            Err(err) => return Err(LecternError::Io(err)),
        }

        for dir in [self.entries_dir(), self.metadata_dir()] {
            if dir.exists() && !dir.is_dir() {
                return Err(LecternError::NotADirectory(dir));
            }
            self.ensure_dir(&dir)?;
        }
        Ok(())
    }

    fn load_subjects(&self) -> Result<SubjectMap> {
        self.load_json(SUBJECTS_FILE)
    }

    fn save_subjects(&self, subjects: &SubjectMap) -> Result<()> {
        self.save_json(SUBJECTS_FILE, subjects)
    }

    fn load_entries(&self) -> Result<EntryMap> {
        self.load_json(ENTRIES_FILE)
    }

    fn save_entries(&self, entries: &EntryMap) -> Result<()> {
        self.save_json(ENTRIES_FILE, entries)
    }

    fn create_body(&self, subject: &Uuid, entry: &Uuid) -> Result<()> {
        let dir = self.entry_dir(subject, entry);
        self.ensure_dir(&dir)?;

        // create(true) without truncate keeps any existing content
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(dir.join(&self.body_file_name))
            .map_err(LecternError::Io)?;
        Ok(())
    }

    fn read_body(&self, subject: &Uuid, entry: &Uuid) -> Result<Option<String>> {
        match fs::read_to_string(self.body_path(subject, entry)) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(LecternError::Io(err)),
        }
    }

    fn write_body(&self, subject: &Uuid, entry: &Uuid, content: &str) -> Result<()> {
        let dir = self.entry_dir(subject, entry);
        self.ensure_dir(&dir)?;
        atomic_write(&dir, &dir.join(&self.body_file_name), content)
    }

    fn body_exists(&self, subject: &Uuid, entry: &Uuid) -> Result<bool> {
        match fs::metadata(self.body_path(subject, entry)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(LecternError::Io(err)),
        }
    }

    fn remove_entry_tree(&self, subject: &Uuid, entry: &Uuid) -> Result<()> {
        remove_tree(&self.entry_dir(subject, entry))
    }

    fn remove_subject_tree(&self, subject: &Uuid) -> Result<()> {
        remove_tree(&self.subject_dir(subject))
    }

    fn list_subject_dirs(&self) -> Result<Vec<Uuid>> {
        list_uuid_dirs(&self.entries_dir())
    }

    fn list_entry_dirs(&self, subject: &Uuid) -> Result<Vec<Uuid>> {
        list_uuid_dirs(&self.subject_dir(subject))
    }

    fn body_path(&self, subject: &Uuid, entry: &Uuid) -> PathBuf {
        self.entry_dir(subject, entry).join(&self.body_file_name)
    }
}
