//! Inspect command implementation.

use super::{load_copy, StoreFiles};
use crate::Store;
use moodini_core::{QuestionRepository, SnapshotStore, UserRepository};
use moodini_storage::FileBackend;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Statistics of one store.
#[derive(Debug, Serialize)]
pub struct StoreReport {
    /// Store name.
    pub store: String,
    /// Store directory.
    pub path: String,
    /// Journal size in bytes.
    pub journal_size: u64,
    /// Snapshot size in bytes.
    pub snapshot_size: u64,
    /// Sequence covered by the snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_sequence: Option<u64>,
    /// Sequence of the last journaled command.
    pub last_sequence: u64,
    /// Commands not yet folded into the snapshot.
    pub pending_commands: u64,
    /// Stored entities.
    pub entities: usize,
    /// Last id issued, including deleted entities.
    pub last_id: i64,
    /// Questions with at least one vote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted_questions: Option<usize>,
}

/// Runs the inspect command.
pub fn run(path: &Path, stores: &[Store], format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let reports = stores
        .iter()
        .map(|store| inspect_store(path, *store))
        .collect::<Result<Vec<_>, _>>()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        _ => {
            print_text_output(path, &reports);
        }
    }

    Ok(())
}

/// Builds the report for one store.
pub fn inspect_store(root: &Path, store: Store) -> Result<StoreReport, Box<dyn std::error::Error>> {
    let files = StoreFiles::locate(root, store.dir_name())?;
    info!("Inspecting {:?}", files.dir);

    let snapshot_sequence = if files.snapshot.exists() {
        SnapshotStore::new(Box::new(FileBackend::open(&files.snapshot)?))
            .info()?
            .map(|info| info.sequence.as_u64())
    } else {
        None
    };

    let mut report = StoreReport {
        store: store.dir_name().to_string(),
        path: files.dir.display().to_string(),
        journal_size: StoreFiles::size(&files.journal),
        snapshot_size: StoreFiles::size(&files.snapshot),
        snapshot_sequence,
        last_sequence: 0,
        pending_commands: 0,
        entities: 0,
        last_id: 0,
        voted_questions: None,
    };

    match store {
        Store::Questions => {
            let controller = load_copy::<QuestionRepository>(&files)?;
            let stats = controller.stats()?;
            report.last_sequence = stats.last_sequence.as_u64();
            report.pending_commands = stats.commands_since_checkpoint;
            let (entities, last_id, voted) =
                controller.query(|repo| (repo.len(), repo.last_id(), repo.voted_count()))?;
            report.entities = entities;
            report.last_id = last_id;
            report.voted_questions = Some(voted);
        }
        Store::Users => {
            let controller = load_copy::<UserRepository>(&files)?;
            let stats = controller.stats()?;
            report.last_sequence = stats.last_sequence.as_u64();
            report.pending_commands = stats.commands_since_checkpoint;
            let (entities, last_id) = controller.query(|repo| (repo.len(), repo.last_id()))?;
            report.entities = entities;
            report.last_id = last_id;
        }
    }

    Ok(report)
}

fn print_text_output(root: &Path, reports: &[StoreReport]) {
    println!("Moodini Data Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", root.display());

    for report in reports {
        println!();
        println!("Store: {}", report.store);
        println!("  Journal size:     {} bytes", format_size(report.journal_size));
        println!("  Snapshot size:    {} bytes", format_size(report.snapshot_size));
        match report.snapshot_sequence {
            Some(seq) => println!("  Snapshot at:      seq {seq}"),
            None => println!("  Snapshot at:      (none)"),
        }
        println!("  Last sequence:    {}", report.last_sequence);
        println!("  Pending commands: {}", report.pending_commands);
        println!("  Entities:         {}", report.entities);
        println!("  Last id:          {}", report.last_id);
        if let Some(voted) = report.voted_questions {
            println!("  Voted questions:  {voted}");
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes}")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
