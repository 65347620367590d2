//! Dump journal command implementation.

use super::StoreFiles;
use crate::Store;
use moodini_core::journal::{JournalIterator, JournalRecord};
use moodini_core::{from_cbor, QuestionCommand, UserCommand};
use moodini_storage::FileBackend;
use serde::Serialize;
use std::path::Path;

/// Journal record representation for output.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Offset in the journal file.
    pub offset: u64,
    /// Record type.
    pub record_type: &'static str,
    /// Commit sequence.
    pub sequence: u64,
    /// Payload size in bytes (commands only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_size: Option<usize>,
    /// Decoded command (commands only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<serde_json::Value>,
}

/// Runs the dump-journal command.
pub fn run(
    path: &Path,
    store: Store,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let files = StoreFiles::locate(path, store.dir_name())?;
    if !files.journal.exists() {
        return Err("Journal file not found".into());
    }

    let backend = FileBackend::open(&files.journal)?;
    let records = read_records(&backend, store, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records);
        }
    }

    Ok(())
}

/// Reads up to `limit` records, decoding commands for `store`.
pub fn read_records(
    backend: &FileBackend,
    store: Store,
    limit: Option<usize>,
) -> Result<Vec<RecordInfo>, Box<dyn std::error::Error>> {
    let max_records = limit.unwrap_or(usize::MAX);
    let mut records = Vec::new();

    for item in JournalIterator::new(backend, 0)?.take(max_records) {
        let (offset, record) = item?;
        let info = match record {
            JournalRecord::Checkpoint { sequence } => RecordInfo {
                offset,
                record_type: "CHECKPOINT",
                sequence: sequence.as_u64(),
                payload_size: None,
                command: None,
            },
            JournalRecord::Command { sequence, payload } => RecordInfo {
                offset,
                record_type: "COMMAND",
                sequence: sequence.as_u64(),
                payload_size: Some(payload.len()),
                command: Some(decode_command(store, &payload)?),
            },
        };
        records.push(info);
    }

    Ok(records)
}

fn decode_command(store: Store, payload: &[u8]) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let value = match store {
        Store::Questions => serde_json::to_value(from_cbor::<QuestionCommand>(payload)?)?,
        Store::Users => serde_json::to_value(from_cbor::<UserCommand>(payload)?)?,
    };
    Ok(value)
}

fn print_text_output(records: &[RecordInfo]) {
    println!("Journal Records ({} total)", records.len());
    println!("====================");
    println!();

    for record in records {
        print!("[{:08}] {:10} seq={}", record.offset, record.record_type, record.sequence);
        if let Some(command) = &record.command {
            print!(" {command}");
        }
        println!();
    }
}
