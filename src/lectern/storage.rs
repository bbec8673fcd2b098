//! # Storage Facade
//!
//! [`Storage`] is the only entry point for subjects and entries. It owns the
//! [`MetadataIndex`] behind a single `RwLock` and a [`StorageBackend`] for I/O.
//!
//! ## Write Ordering
//!
//! Every mutation follows the same shape:
//!
//! 1. Take the write lock.
//! 2. Check the referenced IDs, so "not found" is a domain error.
//! 3. Apply the change to a copy of the index and persist both JSON files.
//! 4. Swap the copy in, release the lock.
//! 5. Perform the body-file side effect, if any.
//!
//! Metadata is authoritative. A crash or failure between steps 4 and 5 leaves
//! metadata pointing at a missing or stale body (read as empty) or an orphan
//! directory on disk, never a body whose metadata was lost. Such failures are
//! returned as [`LecternError::BodyFailed`]; [`crate::doctor`] reconciles.
//!
//! If persisting fails in step 3, the live index is untouched, so memory and
//! disk never disagree after a call returns.

use crate::config::StorageConfig;
use crate::error::{LecternError, Result};
use crate::index::MetadataIndex;
use crate::model::{Entry, EntryUpdate, Subject};
use crate::store::{FsBackend, StorageBackend};
use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

pub struct Storage<B: StorageBackend> {
    index: RwLock<MetadataIndex>,
    backend: B,
}

impl Storage<FsBackend> {
    /// Open (or create) the storage rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::with_config(StorageConfig::new(root))
    }

    pub fn with_config(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        let backend = FsBackend::from_config(&config);
        Self::with_backend(backend)
    }
}

impl<B: StorageBackend> Storage<B> {
    /// Prepare the backend, load both metadata files and write them back.
    ///
    /// The write-back normalizes formatting and proves the metadata directory
    /// is writable before any caller relies on it.
    pub fn with_backend(backend: B) -> Result<Self> {
        backend.prepare()?;

        let storage = Self {
            index: RwLock::new(MetadataIndex::new()),
            backend,
        };

        {
            let mut index = storage.write_index();
            let subjects = storage.backend.load_subjects()?;
            let entries = storage.backend.load_entries()?;
            let loaded = MetadataIndex::from_parts(subjects, entries);
            storage.persist(&loaded)?;
            *index = loaded;

            info!(
                "event=storage_open module=storage status=ok root={} subjects={}",
                storage.root().display(),
                index.subjects().len()
            );
        }

        Ok(storage)
    }

    /// The backend's root directory.
    pub fn root(&self) -> &Path {
        self.backend.root()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    // --- Subjects ---

    pub fn new_subject(&self, name: &str, description: &str) -> Result<Uuid> {
        let subject = Subject::new(name, description);
        let id = subject.id;

        self.commit(|index| {
            index.insert_subject(subject);
            Ok(())
        })?;

        info!("event=subject_create module=storage subject={}", id);
        Ok(id)
    }

    /// Snapshot of all subjects, in no particular order.
    pub fn list_subjects(&self) -> Vec<Subject> {
        self.read_index().list_subjects()
    }

    pub fn subject_exists(&self, id: &Uuid) -> bool {
        self.read_index().contains_subject(id)
    }

    pub fn subject(&self, id: &Uuid) -> Option<Subject> {
        self.read_index().subject(id).cloned()
    }

    /// Remove a subject, its entries and its whole body tree.
    pub fn remove_subject(&self, id: &Uuid) -> Result<()> {
        self.commit(|index| index.remove_subject(id).map(|_| ()))?;
        info!("event=subject_remove module=storage subject={}", id);

        self.backend.remove_subject_tree(id).map_err(|err| {
            error!(
                "event=body_failed module=storage op=remove_subject subject={} error={}",
                id, err
            );
            LecternError::body_failed(*id, None, err)
        })
    }

    /// Replace name and description. `data.id` is ignored.
    pub fn update_subject(&self, id: &Uuid, data: Subject) -> Result<()> {
        self.commit(|index| index.update_subject(id, data).map(|_| ()))?;
        debug!("event=subject_update module=storage subject={}", id);
        Ok(())
    }

    // --- Entries ---

    /// Create an entry with an empty body.
    ///
    /// If the metadata commits but the body cannot be created, the error is
    /// `BodyFailed` with `entry: Some(id)`, so callers still learn the new ID.
    pub fn new_entry(&self, subject_id: &Uuid, title: &str) -> Result<Uuid> {
        let entry = Entry::new(title);
        let id = entry.id;

        self.commit(|index| index.insert_entry(subject_id, entry))?;
        info!(
            "event=entry_create module=storage subject={} entry={}",
            subject_id, id
        );

        self.backend
            .create_body(subject_id, &id)
            .map_err(|err| self.body_failure("new_entry", subject_id, &id, err))?;
        Ok(id)
    }

    /// Entries of a subject; empty when the subject does not exist.
    pub fn list_entries(&self, subject_id: &Uuid) -> Vec<Entry> {
        self.read_index().list_entries(subject_id)
    }

    pub fn entry_exists(&self, subject_id: &Uuid, id: &Uuid) -> bool {
        self.read_index().contains_entry(subject_id, id)
    }

    pub fn entry(&self, subject_id: &Uuid, id: &Uuid) -> Option<Entry> {
        self.read_index().entry(subject_id, id).cloned()
    }

    /// Read an entry's body. A missing body file reads as empty.
    pub fn entry_body(&self, subject_id: &Uuid, id: &Uuid) -> Result<String> {
        self.ensure_entry(subject_id, id)?;
        Ok(self.backend.read_body(subject_id, id)?.unwrap_or_default())
    }

    pub fn entry_body_path(&self, subject_id: &Uuid, id: &Uuid) -> Result<PathBuf> {
        self.ensure_entry(subject_id, id)?;
        Ok(self.backend.body_path(subject_id, id))
    }

    /// Refresh `updated_at`, persist, then overwrite the body.
    pub fn update_entry_body(&self, subject_id: &Uuid, id: &Uuid, text: &str) -> Result<()> {
        self.commit(|index| index.touch_entry(subject_id, id).map(|_| ()))?;
        debug!(
            "event=entry_body_update module=storage subject={} entry={} bytes={}",
            subject_id,
            id,
            text.len()
        );

        self.backend
            .write_body(subject_id, id, text)
            .map_err(|err| self.body_failure("update_entry_body", subject_id, id, err))
    }

    /// Replace the title and refresh `updated_at`. `id` and `created_at` never change.
    pub fn update_entry_metadata(
        &self,
        subject_id: &Uuid,
        id: &Uuid,
        update: EntryUpdate,
    ) -> Result<()> {
        self.commit(|index| index.update_entry(subject_id, id, update).map(|_| ()))?;
        debug!(
            "event=entry_metadata_update module=storage subject={} entry={}",
            subject_id, id
        );
        Ok(())
    }

    /// Remove the entry from the index, persist, then remove its directory.
    pub fn delete_entry(&self, subject_id: &Uuid, id: &Uuid) -> Result<()> {
        self.commit(|index| index.remove_entry(subject_id, id).map(|_| ()))?;
        info!(
            "event=entry_delete module=storage subject={} entry={}",
            subject_id, id
        );

        self.backend
            .remove_entry_tree(subject_id, id)
            .map_err(|err| self.body_failure("delete_entry", subject_id, id, err))
    }

    // --- Internals ---

    /// Apply `change` to a copy of the index under the write lock and persist
    /// it. The copy replaces the live index only once both files are written.
    fn commit<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut MetadataIndex) -> Result<()>,
    {
        let mut index = self.write_index();
        let mut next = index.clone();
        change(&mut next)?;
        self.persist(&next)?;
        *index = next;
        Ok(())
    }

    /// Callers must hold the write lock so the pair of files stays consistent.
    fn persist(&self, index: &MetadataIndex) -> Result<()> {
        self.backend.save_subjects(index.subjects())?;
        self.backend.save_entries(index.entries())?;
        debug!(
            "event=metadata_flush module=storage subjects={}",
            index.subjects().len()
        );
        Ok(())
    }

    pub(crate) fn read_index(&self) -> RwLockReadGuard<'_, MetadataIndex> {
        // The live index is only ever replaced wholesale after a successful
        // persist, so a poisoned lock still guards consistent data.
        self.index
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, MetadataIndex> {
        self.index
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_entry(&self, subject_id: &Uuid, id: &Uuid) -> Result<()> {
        let index = self.read_index();
        if !index.contains_subject(subject_id) {
            return Err(LecternError::NoSuchSubject(*subject_id));
        }
        if !index.contains_entry(subject_id, id) {
            return Err(LecternError::NoSuchEntry {
                subject: *subject_id,
                entry: *id,
            });
        }
        Ok(())
    }

    fn body_failure(
        &self,
        op: &str,
        subject_id: &Uuid,
        id: &Uuid,
        err: LecternError,
    ) -> LecternError {
        error!(
            "event=body_failed module=storage op={} subject={} entry={} error={}",
            op, subject_id, id, err
        );
        LecternError::body_failed(*subject_id, Some(*id), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doctor::{self, RepairMode};
    use crate::store::MemBackend;

    fn storage() -> Storage<MemBackend> {
        Storage::with_backend(MemBackend::new()).unwrap()
    }

    #[test]
    fn open_persists_empty_index() {
        let storage = storage();
        let (subjects, entries) = storage.backend().persisted();
        assert_eq!(subjects.unwrap().len(), 0);
        assert_eq!(entries.unwrap().len(), 0);
    }

    #[test]
    fn new_subject_is_listed_and_persisted() {
        let storage = storage();
        let id = storage.new_subject("Math", "desc").unwrap();

        let subjects = storage.list_subjects();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].id, id);
        assert_eq!(subjects[0].name, "Math");
        assert_eq!(subjects[0].description, "desc");

        let (persisted, entries) = storage.backend().persisted();
        assert!(persisted.unwrap().contains_key(&id));
        assert!(entries.unwrap().get(&id).unwrap().is_empty());
    }

    #[test]
    fn failed_persist_leaves_index_unchanged() {
        let storage = storage();
        let kept = storage.new_subject("Kept", "").unwrap();

        storage.backend().set_fail_metadata_writes(true);
        assert!(storage.new_subject("Lost", "").is_err());
        assert!(storage.remove_subject(&kept).is_err());

        assert_eq!(storage.list_subjects().len(), 1);
        assert!(storage.subject_exists(&kept));
    }

    #[test]
    fn remove_unknown_subject() {
        let storage = storage();
        storage.new_subject("Math", "").unwrap();
        let err = storage.remove_subject(&Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, LecternError::NoSuchSubject(_)));
        assert_eq!(storage.list_subjects().len(), 1);
    }

    #[test]
    fn update_subject_ignores_payload_id() {
        let storage = storage();
        let id = storage.new_subject("Math", "").unwrap();

        let payload = Subject {
            id: Uuid::new_v4(),
            name: "Updated Subject".into(),
            description: "Period 1, Semester 2".into(),
        };
        storage.update_subject(&id, payload).unwrap();

        let subject = storage.subject(&id).unwrap();
        assert_eq!(subject.id, id);
        assert_eq!(subject.name, "Updated Subject");
        assert_eq!(storage.list_subjects().len(), 1);
    }

    #[test]
    fn update_unknown_subject() {
        let storage = storage();
        let err = storage
            .update_subject(&Uuid::nil(), Subject::new("Nope", ""))
            .unwrap_err();
        assert!(matches!(err, LecternError::NoSuchSubject(_)));
    }

    #[test]
    fn new_entry_creates_empty_body() {
        let storage = storage();
        let subject = storage.new_subject("Math", "").unwrap();
        let entry = storage.new_entry(&subject, "Notes").unwrap();

        assert!(storage.entry_exists(&subject, &entry));
        assert_eq!(storage.list_entries(&subject).len(), 1);
        assert_eq!(storage.entry_body(&subject, &entry).unwrap(), "");
    }

    #[test]
    fn new_entry_under_unknown_subject_creates_nothing() {
        let storage = storage();
        let err = storage.new_entry(&Uuid::new_v4(), "Lost").unwrap_err();
        assert!(matches!(err, LecternError::NoSuchSubject(_)));
        assert!(storage.backend().list_subject_dirs().unwrap().is_empty());
    }

    #[test]
    fn new_entry_body_failure_reports_the_new_id() {
        let storage = storage();
        let subject = storage.new_subject("Math", "").unwrap();

        storage.backend().set_fail_body_writes(true);
        let err = storage.new_entry(&subject, "Partial").unwrap_err();

        let id = match err {
            LecternError::BodyFailed {
                entry: Some(id), ..
            } => id,
            other => panic!("expected BodyFailed, got {other:?}"),
        };
        // Metadata was committed first.
        assert!(storage.entry_exists(&subject, &id));
        // A missing body reads as empty.
        assert_eq!(storage.entry_body(&subject, &id).unwrap(), "");
    }

    #[test]
    fn update_entry_body_refreshes_updated_at_only() {
        let storage = storage();
        let subject = storage.new_subject("Math", "").unwrap();
        let id = storage.new_entry(&subject, "Notes").unwrap();
        let before = storage.entry(&subject, &id).unwrap();

        storage.update_entry_body(&subject, &id, "# Hello!").unwrap();

        let after = storage.entry(&subject, &id).unwrap();
        assert_eq!(storage.entry_body(&subject, &id).unwrap(), "# Hello!");
        assert_eq!(after.title, before.title);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= before.updated_at);
    }

    #[test]
    fn update_entry_body_body_failure_keeps_metadata() {
        let storage = storage();
        let subject = storage.new_subject("Math", "").unwrap();
        let id = storage.new_entry(&subject, "Notes").unwrap();

        storage.backend().set_fail_body_writes(true);
        let err = storage.update_entry_body(&subject, &id, "lost").unwrap_err();
        assert!(matches!(err, LecternError::BodyFailed { .. }));
        assert!(storage.entry_exists(&subject, &id));
    }

    #[test]
    fn entry_operations_report_missing_ids() {
        let storage = storage();
        let subject = storage.new_subject("Math", "").unwrap();
        let missing = Uuid::nil();

        assert!(matches!(
            storage.update_entry_body(&subject, &missing, "# Nope!"),
            Err(LecternError::NoSuchEntry { .. })
        ));
        assert!(matches!(
            storage.update_entry_body(&missing, &missing, "nope"),
            Err(LecternError::NoSuchSubject(_))
        ));
        assert!(matches!(
            storage.update_entry_metadata(&subject, &missing, EntryUpdate::title("no way")),
            Err(LecternError::NoSuchEntry { .. })
        ));
        assert!(matches!(
            storage.delete_entry(&missing, &missing),
            Err(LecternError::NoSuchSubject(_))
        ));
        assert!(matches!(
            storage.entry_body(&subject, &missing),
            Err(LecternError::NoSuchEntry { .. })
        ));
    }

    #[test]
    fn update_entry_metadata_keeps_identity() {
        let storage = storage();
        let subject = storage.new_subject("Math", "").unwrap();
        let id = storage.new_entry(&subject, "Draft").unwrap();
        storage.update_entry_body(&subject, &id, "body").unwrap();
        let before = storage.entry(&subject, &id).unwrap();

        storage
            .update_entry_metadata(&subject, &id, EntryUpdate::title("updated title!!!"))
            .unwrap();

        let after = storage.entry(&subject, &id).unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(after.title, "updated title!!!");
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(storage.entry_body(&subject, &id).unwrap(), "body");
    }

    #[test]
    fn delete_entry_removes_everything() {
        let storage = storage();
        let subject = storage.new_subject("Math", "").unwrap();
        let id = storage.new_entry(&subject, "Notes").unwrap();

        storage.delete_entry(&subject, &id).unwrap();

        assert!(!storage.entry_exists(&subject, &id));
        assert!(storage.list_entries(&subject).is_empty());
        assert!(storage.backend().list_entry_dirs(&subject).unwrap().is_empty());
        assert!(matches!(
            storage.delete_entry(&subject, &id),
            Err(LecternError::NoSuchEntry { .. })
        ));
    }

    #[test]
    fn remove_subject_cascades() {
        let storage = storage();
        let subject = storage.new_subject("Math", "").unwrap();
        let entry = storage.new_entry(&subject, "Notes").unwrap();

        storage.remove_subject(&subject).unwrap();

        assert!(!storage.subject_exists(&subject));
        assert!(!storage.entry_exists(&subject, &entry));
        assert!(storage.list_entries(&subject).is_empty());
        assert!(storage.backend().list_subject_dirs().unwrap().is_empty());
    }

    #[test]
    fn removal_failures_keep_metadata_deleted_until_doctor_cleans_up() {
        let storage = storage();
        let kept = storage.new_subject("Math", "").unwrap();
        let entry = storage.new_entry(&kept, "Notes").unwrap();
        let removed = storage.new_subject("Physics", "").unwrap();
        storage.new_entry(&removed, "Kinematics").unwrap();

        storage.backend().set_fail_body_writes(true);

        match storage.delete_entry(&kept, &entry).unwrap_err() {
            LecternError::BodyFailed {
                subject,
                entry: Some(failed),
                ..
            } => {
                assert_eq!(subject, kept);
                assert_eq!(failed, entry);
            }
            other => panic!("expected BodyFailed, got {other:?}"),
        }
        assert!(!storage.entry_exists(&kept, &entry));

        match storage.remove_subject(&removed).unwrap_err() {
            LecternError::BodyFailed {
                subject,
                entry: None,
                ..
            } => assert_eq!(subject, removed),
            other => panic!("expected BodyFailed, got {other:?}"),
        }
        assert!(!storage.subject_exists(&removed));

        // The metadata deletes were persisted.
        let (subjects, entries) = storage.backend().persisted();
        assert!(!subjects.unwrap().contains_key(&removed));
        assert!(entries.unwrap()[&kept].is_empty());

        // The directories are left behind.
        let dirs = storage.backend().list_subject_dirs().unwrap();
        assert!(dirs.contains(&removed));
        assert_eq!(storage.backend().list_entry_dirs(&kept).unwrap(), vec![entry]);

        storage.backend().set_fail_body_writes(false);
        let report = doctor::run(&storage, RepairMode::Fix).unwrap();
        assert_eq!(report.orphan_entries, vec![(kept, entry)]);
        assert_eq!(report.orphan_subjects, vec![removed]);
        assert_eq!(report.repaired, 2);

        assert!(!storage.backend().list_subject_dirs().unwrap().contains(&removed));
        assert!(storage.backend().list_entry_dirs(&kept).unwrap().is_empty());
        assert!(doctor::run(&storage, RepairMode::Report).unwrap().is_clean());
    }

    #[test]
    fn root_comes_from_the_backend() {
        let storage = storage();
        assert_eq!(storage.root(), storage.backend().root());
        assert_eq!(storage.root(), Path::new("memory://"));
    }

    #[test]
    fn list_entries_of_unknown_subject_is_empty() {
        let storage = storage();
        assert!(storage.list_entries(&Uuid::new_v4()).is_empty());
        assert!(!storage.entry_exists(&Uuid::new_v4(), &Uuid::new_v4()));
    }
}
