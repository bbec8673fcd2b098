//! # Lectern Architecture
//!
//! Lectern is the storage core of a notes/lecture organizer. It keeps
//! **subjects** (collections) and **entries** (notes) on disk: structured
//! metadata in two JSON files, note bodies as individual text files.
//!
//! It is a library boundary only. The application around it (HTTP handlers,
//! a CLI, authentication, ownership checks) calls in with IDs it has already
//! validated.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Facade (storage.rs)                                │
//! │  - The only entry point; ten operations plus read helpers   │
//! │  - One RwLock over the index; metadata persisted first      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Metadata Index (index.rs)                                  │
//! │  - subjects: id -> Subject                                  │
//! │  - entries:  subject id -> entry id -> Entry                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Backend (store/)                                   │
//! │  - StorageBackend trait                                     │
//! │  - FsBackend (production), MemBackend (testing)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use lectern::model::EntryUpdate;
//! use lectern::storage::Storage;
//! use std::sync::Arc;
//!
//! # fn main() -> lectern::error::Result<()> {
//! let storage = Arc::new(Storage::open("/srv/lectern")?);
//! let math = storage.new_subject("Math", "Period 1")?;
//! let notes = storage.new_entry(&math, "Week 1")?;
//! storage.update_entry_body(&math, &notes, "# Limits")?;
//! storage.update_entry_metadata(&math, &notes, EntryUpdate::title("Week 1: Limits"))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Consistency
//!
//! After every successful mutation the in-memory index and both JSON files
//! are identical. Body-file side effects happen after the metadata commit;
//! when they fail the call returns [`error::LecternError::BodyFailed`] and the
//! [`doctor`] pass can reconcile the tree later.
//!
//! ## Module Overview
//!
//! - [`storage`]: The facade
//! - [`index`]: In-memory metadata index
//! - [`store`]: Backend trait and implementations
//! - [`model`]: `Subject`, `Entry`, `EntryUpdate`
//! - [`doctor`]: Reconciliation between metadata and body files
//! - [`config`]: Storage configuration
//! - [`logging`]: Optional logger bootstrap for host applications
//! - [`error`]: Error types

pub mod config;
pub mod doctor;
pub mod error;
pub mod index;
pub mod logging;
pub mod model;
pub mod storage;
pub mod store;

pub use error::{LecternError, Result};
pub use model::{Entry, EntryUpdate, Subject};
pub use storage::Storage;
