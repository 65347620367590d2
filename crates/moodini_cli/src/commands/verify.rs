//! Verify command implementation.

use super::StoreFiles;
use crate::Store;
use moodini_core::journal::JournalIterator;
use moodini_core::SnapshotStore;
use moodini_storage::FileBackend;
use std::path::Path;

/// Verification result of one store.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Intact journal records.
    pub valid_records: usize,
    /// Whether the journal ends in an incomplete record.
    pub truncated_tail: bool,
    /// Sequence covered by the snapshot, if there is one.
    pub snapshot_sequence: Option<u64>,
    /// Problems found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(path: &Path, stores: &[Store]) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying data at {:?}", path);

    let mut failed = 0;
    for store in stores {
        let files = StoreFiles::locate(path, store.dir_name())?;
        let result = verify_store(&files)?;
        print_result(store.dir_name(), &result);
        if !result.is_ok() {
            failed += 1;
        }
    }

    println!();
    if failed == 0 {
        println!("✓ All checks passed");
        Ok(())
    } else {
        Err(format!("{failed} store(s) failed verification").into())
    }
}

/// Checks the journal and snapshot of one store without replaying them.
pub fn verify_store(files: &StoreFiles) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();

    if files.journal.exists() {
        let backend = FileBackend::open(&files.journal)?;
        let mut records = JournalIterator::new(&backend, 0)?;
        while let Some(item) = records.next() {
            match item {
                Ok(_) => result.valid_records += 1,
                Err(e) => result
                    .errors
                    .push(format!("journal at offset {}: {e}", records.valid_end())),
            }
        }
        result.truncated_tail = records.hit_truncated_tail();
    }

    if files.snapshot.exists() {
        let snapshot = SnapshotStore::new(Box::new(FileBackend::open(&files.snapshot)?));
        match snapshot.info() {
            Ok(info) => result.snapshot_sequence = info.map(|i| i.sequence.as_u64()),
            Err(e) => result.errors.push(format!("snapshot: {e}")),
        }
    }

    Ok(result)
}

fn print_result(name: &str, result: &VerifyResult) {
    println!();
    println!("{name}:");
    println!("  Journal records: {}", result.valid_records);
    if result.truncated_tail {
        println!("  Journal tail:    incomplete (discarded on next open)");
    }
    match result.snapshot_sequence {
        Some(seq) => println!("  Snapshot:        seq {seq}"),
        None => println!("  Snapshot:        (none)"),
    }
    for error in &result.errors {
        println!("  ✗ {error}");
    }
}
