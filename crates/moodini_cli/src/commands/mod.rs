//! CLI command implementations.

pub mod checkpoint;
pub mod dump_journal;
pub mod inspect;
pub mod verify;

use moodini_core::{Config, Controller, Prevalent};
use moodini_storage::InMemoryBackend;
use std::fs;
use std::path::{Path, PathBuf};

/// Journal and snapshot file paths of a store.
pub struct StoreFiles {
    /// Store directory.
    pub dir: PathBuf,
    /// Journal file.
    pub journal: PathBuf,
    /// Snapshot file.
    pub snapshot: PathBuf,
}

impl StoreFiles {
    /// Locates the files of store `name` below `root`.
    pub fn locate(root: &Path, name: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let dir = root.join(name);
        if !dir.is_dir() {
            return Err(format!("No {name} store found at {}", dir.display()).into());
        }
        Ok(Self {
            journal: dir.join("journal.log"),
            snapshot: dir.join("snapshot.bin"),
            dir,
        })
    }

    /// Size of a file, 0 if it does not exist.
    pub fn size(path: &Path) -> u64 {
        fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }

    fn read(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        if path.exists() {
            Ok(fs::read(path)?)
        } else {
            Ok(Vec::new())
        }
    }
}

/// Recovers a store from in-memory copies of its files.
///
/// The files on disk are never written, so this works next to a running
/// server and leaves no trace.
pub fn load_copy<S: Prevalent>(files: &StoreFiles) -> Result<Controller<S>, Box<dyn std::error::Error>> {
    let journal = InMemoryBackend::with_data(StoreFiles::read(&files.journal)?);
    let snapshot = InMemoryBackend::with_data(StoreFiles::read(&files.snapshot)?);
    Ok(Controller::open_with_backends(
        Config::default().sync_on_commit(false),
        Box::new(journal),
        Box::new(snapshot),
    )?)
}
