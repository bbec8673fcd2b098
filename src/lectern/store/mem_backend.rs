use super::backend::StorageBackend;
use crate::error::{LecternError, Result};
use crate::index::{EntryMap, SubjectMap};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Subject dir -> entry dir -> body. `None` is an entry dir without a body file.
type BodyTree = HashMap<Uuid, HashMap<Uuid, Option<String>>>;

/// In-memory storage backend for testing.
///
/// Uses `Mutex` so the backend is `Sync` and a `Storage<MemBackend>` can be
/// shared across threads exactly like the filesystem one.
#[derive(Default)]
pub struct MemBackend {
    subjects: Mutex<Option<SubjectMap>>,
    entries: Mutex<Option<EntryMap>>,
    bodies: Mutex<BodyTree>,
    fail_metadata_writes: AtomicBool,
    fail_body_writes: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `save_subjects`/`save_entries` fail.
    pub fn set_fail_metadata_writes(&self, fail: bool) {
        self.fail_metadata_writes.store(fail, Ordering::SeqCst);
    }

    /// Make body creation, writes and removals fail.
    pub fn set_fail_body_writes(&self, fail: bool) {
        self.fail_body_writes.store(fail, Ordering::SeqCst);
    }

    /// Test helper: drop a body file while keeping its directory.
    pub fn drop_body(&self, subject: &Uuid, entry: &Uuid) -> bool {
        let mut bodies = lock(&self.bodies);
        match bodies.get_mut(subject).and_then(|entries| entries.get_mut(entry)) {
            Some(body) => body.take().is_some(),
            None => false,
        }
    }

    /// Test helper: plant a body that no metadata refers to.
    pub fn plant_body(&self, subject: &Uuid, entry: &Uuid, content: &str) {
        lock(&self.bodies)
            .entry(*subject)
            .or_default()
            .insert(*entry, Some(content.to_string()));
    }

    /// Snapshot of what has been persisted, if anything.
    pub fn persisted(&self) -> (Option<SubjectMap>, Option<EntryMap>) {
        (lock(&self.subjects).clone(), lock(&self.entries).clone())
    }

    fn check_metadata_write(&self) -> Result<()> {
        if self.fail_metadata_writes.load(Ordering::SeqCst) {
            return Err(LecternError::Store("Simulated metadata write error".to_string()));
        }
        Ok(())
    }

    fn check_body_write(&self) -> Result<()> {
        if self.fail_body_writes.load(Ordering::SeqCst) {
            return Err(LecternError::Store("Simulated body write error".to_string()));
        }
        Ok(())
    }
}

impl StorageBackend for MemBackend {
    fn root(&self) -> &Path {
        Path::new("memory://")
    }

    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    fn load_subjects(&self) -> Result<SubjectMap> {
        Ok(lock(&self.subjects)
            .get_or_insert_with(SubjectMap::new)
            .clone())
    }

    fn save_subjects(&self, subjects: &SubjectMap) -> Result<()> {
        self.check_metadata_write()?;
        *lock(&self.subjects) = Some(subjects.clone());
        Ok(())
    }

    fn load_entries(&self) -> Result<EntryMap> {
        Ok(lock(&self.entries).get_or_insert_with(EntryMap::new).clone())
    }

    fn save_entries(&self, entries: &EntryMap) -> Result<()> {
        self.check_metadata_write()?;
        *lock(&self.entries) = Some(entries.clone());
        Ok(())
    }

    fn create_body(&self, subject: &Uuid, entry: &Uuid) -> Result<()> {
        self.check_body_write()?;
        let mut bodies = lock(&self.bodies);
        let body = bodies.entry(*subject).or_default().entry(*entry).or_default();
        if body.is_none() {
            *body = Some(String::new());
        }
        Ok(())
    }

    fn read_body(&self, subject: &Uuid, entry: &Uuid) -> Result<Option<String>> {
        let bodies = lock(&self.bodies);
        Ok(bodies
            .get(subject)
            .and_then(|entries| entries.get(entry))
            .cloned()
            .flatten())
    }

    fn write_body(&self, subject: &Uuid, entry: &Uuid, content: &str) -> Result<()> {
        self.check_body_write()?;
        lock(&self.bodies)
            .entry(*subject)
            .or_default()
            .insert(*entry, Some(content.to_string()));
        Ok(())
    }

    fn body_exists(&self, subject: &Uuid, entry: &Uuid) -> Result<bool> {
        Ok(self.read_body(subject, entry)?.is_some())
    }

    fn remove_entry_tree(&self, subject: &Uuid, entry: &Uuid) -> Result<()> {
        self.check_body_write()?;
        if let Some(entries) = lock(&self.bodies).get_mut(subject) {
            entries.remove(entry);
        }
        Ok(())
    }

    fn remove_subject_tree(&self, subject: &Uuid) -> Result<()> {
        self.check_body_write()?;
        lock(&self.bodies).remove(subject);
        Ok(())
    }

    fn list_subject_dirs(&self) -> Result<Vec<Uuid>> {
        Ok(lock(&self.bodies).keys().copied().collect())
    }

    fn list_entry_dirs(&self, subject: &Uuid) -> Result<Vec<Uuid>> {
        Ok(lock(&self.bodies)
            .get(subject)
            .map(|entries| entries.keys().copied().collect())
            .unwrap_or_default())
    }

    fn body_path(&self, subject: &Uuid, entry: &Uuid) -> PathBuf {
        PathBuf::from(format!("memory://{}/{}", subject, entry))
    }
}
