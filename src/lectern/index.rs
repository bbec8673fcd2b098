//! # Metadata Index
//!
//! The in-memory mirror of `metadata/subjects.json` and `metadata/entries.json`.
//!
//! ```text
//! subjects: { subject_id -> Subject }
//! entries:  { subject_id -> { entry_id -> Entry } }
//! ```
//!
//! Entry IDs are only unique inside their subject's map, so every entry lookup
//! goes through the subject first. The index owns no I/O; [`crate::storage`]
//! decides when a modified copy gets persisted and swapped in.
//!
//! Invariant: the key sets of `subjects` and `entries` are identical. Every
//! subject has a (possibly empty) entry map and no entry map exists without a
//! subject. [`MetadataIndex::from_parts`] enforces this for data read from disk.

use crate::error::{LecternError, Result};
use crate::model::{Entry, EntryUpdate, Subject};
use log::warn;
use std::collections::HashMap;
use uuid::Uuid;

pub type SubjectMap = HashMap<Uuid, Subject>;
pub type EntryMap = HashMap<Uuid, HashMap<Uuid, Entry>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataIndex {
    subjects: SubjectMap,
    entries: EntryMap,
}

impl MetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from the two files' contents, healing anything that
    /// breaks the subject/entry-map pairing.
    pub fn from_parts(mut subjects: SubjectMap, mut entries: EntryMap) -> Self {
        entries.retain(|subject_id, orphaned| {
            let known = subjects.contains_key(subject_id);
            if !known {
                warn!(
                    "event=index_heal module=index action=drop_entries subject={} count={}",
                    subject_id,
                    orphaned.len()
                );
            }
            known
        });

        for (id, subject) in subjects.iter_mut() {
            // The map key is authoritative for identity.
            if subject.id != *id {
                warn!(
                    "event=index_heal module=index action=fix_subject_id key={} stored={}",
                    id, subject.id
                );
                subject.id = *id;
            }
            entries.entry(*id).or_default();
        }

        for subject_entries in entries.values_mut() {
            for (id, entry) in subject_entries.iter_mut() {
                if entry.id != *id {
                    warn!(
                        "event=index_heal module=index action=fix_entry_id key={} stored={}",
                        id, entry.id
                    );
                    entry.id = *id;
                }
            }
        }

        Self { subjects, entries }
    }

    pub fn subjects(&self) -> &SubjectMap {
        &self.subjects
    }

    pub fn entries(&self) -> &EntryMap {
        &self.entries
    }

    // --- Subjects ---

    pub fn contains_subject(&self, id: &Uuid) -> bool {
        self.subjects.contains_key(id)
    }

    pub fn subject(&self, id: &Uuid) -> Option<&Subject> {
        self.subjects.get(id)
    }

    pub fn list_subjects(&self) -> Vec<Subject> {
        self.subjects.values().cloned().collect()
    }

    pub fn insert_subject(&mut self, subject: Subject) {
        self.entries.entry(subject.id).or_default();
        self.subjects.insert(subject.id, subject);
    }

    /// Removes the subject and cascades to its entry map.
    pub fn remove_subject(&mut self, id: &Uuid) -> Result<Subject> {
        let subject = self
            .subjects
            .remove(id)
            .ok_or(LecternError::NoSuchSubject(*id))?;
        self.entries.remove(id);
        Ok(subject)
    }

    /// Replaces name and description. The stored ID is kept no matter what
    /// `data.id` says.
    pub fn update_subject(&mut self, id: &Uuid, data: Subject) -> Result<&Subject> {
        let subject = self
            .subjects
            .get_mut(id)
            .ok_or(LecternError::NoSuchSubject(*id))?;
        subject.name = data.name;
        subject.description = data.description;
        Ok(subject)
    }

    // --- Entries ---

    pub fn contains_entry(&self, subject_id: &Uuid, id: &Uuid) -> bool {
        self.entries
            .get(subject_id)
            .is_some_and(|entries| entries.contains_key(id))
    }

    pub fn entry(&self, subject_id: &Uuid, id: &Uuid) -> Option<&Entry> {
        self.entries.get(subject_id).and_then(|entries| entries.get(id))
    }

    /// Entries of a subject; empty when the subject does not exist.
    pub fn list_entries(&self, subject_id: &Uuid) -> Vec<Entry> {
        self.entries
            .get(subject_id)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn insert_entry(&mut self, subject_id: &Uuid, entry: Entry) -> Result<()> {
        if !self.subjects.contains_key(subject_id) {
            return Err(LecternError::NoSuchSubject(*subject_id));
        }
        self.entries
            .entry(*subject_id)
            .or_default()
            .insert(entry.id, entry);
        Ok(())
    }

    pub fn remove_entry(&mut self, subject_id: &Uuid, id: &Uuid) -> Result<Entry> {
        self.entries_of_mut(subject_id)?
            .remove(id)
            .ok_or(LecternError::NoSuchEntry {
                subject: *subject_id,
                entry: *id,
            })
    }

    /// Refreshes `updated_at` only. Used when the body changes.
    pub fn touch_entry(&mut self, subject_id: &Uuid, id: &Uuid) -> Result<&Entry> {
        let entry = self.entry_mut(subject_id, id)?;
        entry.touch();
        Ok(entry)
    }

    /// Replaces the title and refreshes `updated_at`; `id` and `created_at` stay.
    pub fn update_entry(
        &mut self,
        subject_id: &Uuid,
        id: &Uuid,
        update: EntryUpdate,
    ) -> Result<&Entry> {
        let entry = self.entry_mut(subject_id, id)?;
        entry.title = update.title;
        entry.touch();
        Ok(entry)
    }

    fn entries_of_mut(&mut self, subject_id: &Uuid) -> Result<&mut HashMap<Uuid, Entry>> {
        if !self.subjects.contains_key(subject_id) {
            return Err(LecternError::NoSuchSubject(*subject_id));
        }
        Ok(self.entries.entry(*subject_id).or_default())
    }

    fn entry_mut(&mut self, subject_id: &Uuid, id: &Uuid) -> Result<&mut Entry> {
        self.entries_of_mut(subject_id)?
            .get_mut(id)
            .ok_or(LecternError::NoSuchEntry {
                subject: *subject_id,
                entry: *id,
            })
    }
}
