use crate::error::Result;
use crate::index::{EntryMap, SubjectMap};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Abstract interface for raw storage I/O.
///
/// This trait handles the "how" of storage (filesystem vs memory), while
/// [`crate::storage::Storage`] handles the "what": index consistency, lock
/// spans and the metadata-before-body ordering.
///
/// All methods take `&self`; implementations are shared between threads.
pub trait StorageBackend: Send + Sync {
    /// Where this backend keeps its data. Virtual for `MemBackend`.
    fn root(&self) -> &Path;

    /// Make sure the storage root and its layout exist.
    /// Fails with `NotADirectory` when the root is some other kind of file.
    fn prepare(&self) -> Result<()>;

    // --- Metadata ---

    /// Load `subjects.json`. A missing file is created as `{}`.
    fn load_subjects(&self) -> Result<SubjectMap>;

    fn save_subjects(&self, subjects: &SubjectMap) -> Result<()>;

    /// Load `entries.json`. A missing file is created as `{}`.
    fn load_entries(&self) -> Result<EntryMap>;

    fn save_entries(&self, entries: &EntryMap) -> Result<()>;

    // --- Bodies ---

    /// Create the entry directory and an empty body.
    /// An existing body is left untouched.
    fn create_body(&self, subject: &Uuid, entry: &Uuid) -> Result<()>;

    /// Returns Ok(None) if the body does not exist.
    fn read_body(&self, subject: &Uuid, entry: &Uuid) -> Result<Option<String>>;

    /// Overwrite the body. MUST be atomic (write to tmp then rename).
    fn write_body(&self, subject: &Uuid, entry: &Uuid, content: &str) -> Result<()>;

    fn body_exists(&self, subject: &Uuid, entry: &Uuid) -> Result<bool>;

    /// Remove the entry directory and everything in it. Absent is not an error.
    fn remove_entry_tree(&self, subject: &Uuid, entry: &Uuid) -> Result<()>;

    /// Remove a subject's whole body tree. Absent is not an error.
    fn remove_subject_tree(&self, subject: &Uuid) -> Result<()>;

    // --- Discovery ---

    /// Subject directories present under `entries/`. Non-UUID names are skipped.
    fn list_subject_dirs(&self) -> Result<Vec<Uuid>>;

    /// Entry directories present under a subject directory.
    fn list_entry_dirs(&self, subject: &Uuid) -> Result<Vec<Uuid>>;

    /// Location of the body. For `FsBackend` a real path, for `MemBackend` a virtual one.
    fn body_path(&self, subject: &Uuid, entry: &Uuid) -> PathBuf;
}
