use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum LecternError {
    #[error("Storage path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Subject does not exist: {0}")]
    NoSuchSubject(Uuid),

    #[error("Entry does not exist: {entry} (subject {subject})")]
    NoSuchEntry { subject: Uuid, entry: Uuid },

    /// Metadata was committed but the dependent body-file step failed.
    /// The index and the body tree may now disagree until `doctor` runs.
    #[error("Body operation failed for subject {subject}: {source}")]
    BodyFailed {
        subject: Uuid,
        entry: Option<Uuid>,
        #[source]
        source: Box<LecternError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

impl LecternError {
    pub(crate) fn body_failed(subject: Uuid, entry: Option<Uuid>, source: LecternError) -> Self {
        LecternError::BodyFailed {
            subject,
            entry,
            source: Box::new(source),
        }
    }

    /// True for `NoSuchSubject` and `NoSuchEntry`.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LecternError::NoSuchSubject(_) | LecternError::NoSuchEntry { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LecternError>;
