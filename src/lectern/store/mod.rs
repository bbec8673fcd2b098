//! # Storage Layer
//!
//! Raw I/O behind the [`StorageBackend`] trait. The backend knows where bytes
//! go; it knows nothing about locking or about the order in which metadata and
//! bodies must be written. That belongs to [`crate::storage::Storage`].
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: Production filesystem layout
//!   - Metadata in `metadata/subjects.json` and `metadata/entries.json`
//!   - One body per entry: `entries/<subject>/<entry>/CONTENT.md`
//!   - Every write is atomic (temp file + rename)
//!
//! - [`mem_backend::MemBackend`]: In-memory backend for testing
//!   - No persistence
//!   - Can simulate metadata or body write failures
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//! ├── metadata/
//! │   ├── subjects.json   # { subject_id: Subject }
//! │   └── entries.json    # { subject_id: { entry_id: Entry } }
//! └── entries/
//!     └── <subject_id>/
//!         └── <entry_id>/
//!             └── CONTENT.md
//! ```
//!
//! Metadata and bodies are stored separately so listing never has to read
//! body files.

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;

pub use backend::StorageBackend;
pub use fs_backend::FsBackend;
pub use mem_backend::MemBackend;
