//! # Doctor
//!
//! Reconciles the body tree with the metadata index after partial failures.
//!
//! The facade writes metadata before touching bodies, so a failed or
//! interrupted body step can leave:
//!
//! - **Missing bodies**: metadata lists an entry whose `CONTENT.md` is gone.
//!   Reads already treat it as empty; a fix recreates the empty file.
//! - **Orphan entries**: an entry directory with no metadata (a delete whose
//!   directory removal failed). A fix removes the directory.
//! - **Orphan subjects**: a subject directory whose subject was removed.
//!   A fix removes the whole tree.
//!
//! Metadata is authoritative and is never modified here. The pass holds the
//! index read lock so no mutation can interleave with the scan.

use crate::error::Result;
use crate::storage::Storage;
use crate::store::StorageBackend;
use log::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairMode {
    /// Inspect only.
    Report,
    /// Inspect and repair the body tree.
    Fix,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    /// `(subject, entry)` pairs listed in metadata without a body file.
    pub missing_bodies: Vec<(Uuid, Uuid)>,
    /// `(subject, entry)` directories on disk without metadata.
    pub orphan_entries: Vec<(Uuid, Uuid)>,
    /// Subject directories on disk without a subject in the index.
    pub orphan_subjects: Vec<Uuid>,
    /// Number of issues repaired. Always 0 in `Report` mode.
    pub repaired: usize,
}

impl DoctorReport {
    pub fn is_clean(&self) -> bool {
        self.missing_bodies.is_empty()
            && self.orphan_entries.is_empty()
            && self.orphan_subjects.is_empty()
    }

    pub fn issues(&self) -> usize {
        self.missing_bodies.len() + self.orphan_entries.len() + self.orphan_subjects.len()
    }
}

pub fn run<B: StorageBackend>(storage: &Storage<B>, mode: RepairMode) -> Result<DoctorReport> {
    let index = storage.read_index();
    let backend = storage.backend();
    let mut report = DoctorReport::default();

    // 1. Metadata without bodies
    for (subject_id, entries) in index.entries() {
        for entry_id in entries.keys() {
            if !backend.body_exists(subject_id, entry_id)? {
                report.missing_bodies.push((*subject_id, *entry_id));
            }
        }
    }

    // 2. Directories without metadata
    for subject_id in backend.list_subject_dirs()? {
        if !index.contains_subject(&subject_id) {
            report.orphan_subjects.push(subject_id);
            continue;
        }
        for entry_id in backend.list_entry_dirs(&subject_id)? {
            if !index.contains_entry(&subject_id, &entry_id) {
                report.orphan_entries.push((subject_id, entry_id));
            }
        }
    }

    for (subject_id, entry_id) in &report.missing_bodies {
        warn!(
            "event=doctor_finding module=doctor kind=missing_body subject={} entry={}",
            subject_id, entry_id
        );
    }
    for (subject_id, entry_id) in &report.orphan_entries {
        warn!(
            "event=doctor_finding module=doctor kind=orphan_entry subject={} entry={}",
            subject_id, entry_id
        );
    }
    for subject_id in &report.orphan_subjects {
        warn!(
            "event=doctor_finding module=doctor kind=orphan_subject subject={}",
            subject_id
        );
    }

    if mode == RepairMode::Fix {
        report.repaired = repair(backend, &report);
    }

    info!(
        "event=doctor_done module=doctor issues={} repaired={}",
        report.issues(),
        report.repaired
    );
    Ok(report)
}

/// Best-effort: a failing repair is logged and skipped, the rest still run.
fn repair<B: StorageBackend>(backend: &B, report: &DoctorReport) -> usize {
    let mut repaired = 0;

    for (subject_id, entry_id) in &report.missing_bodies {
        match backend.create_body(subject_id, entry_id) {
            Ok(()) => repaired += 1,
            Err(err) => warn!(
                "event=doctor_repair_failed module=doctor kind=missing_body subject={} entry={} error={}",
                subject_id, entry_id, err
            ),
        }
    }
    for (subject_id, entry_id) in &report.orphan_entries {
        match backend.remove_entry_tree(subject_id, entry_id) {
            Ok(()) => repaired += 1,
            Err(err) => warn!(
                "event=doctor_repair_failed module=doctor kind=orphan_entry subject={} entry={} error={}",
                subject_id, entry_id, err
            ),
        }
    }
    for subject_id in &report.orphan_subjects {
        match backend.remove_subject_tree(subject_id) {
            Ok(()) => repaired += 1,
            Err(err) => warn!(
                "event=doctor_repair_failed module=doctor kind=orphan_subject subject={} error={}",
                subject_id, err
            ),
        }
    }

    repaired
}
