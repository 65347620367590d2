//! # Moodini Storage
//!
//! Byte-store backends underneath the Moodini journal and snapshot files.
//!
//! A backend never interprets what it holds. The journal frames its own
//! records and the snapshot writer frames its own image; the backend only
//! appends, reads back, flushes and replaces bytes.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral stores and tests
//! - [`FileBackend`] - a single file on the local file system
//!
//! ## Example
//!
//! ```rust
//! use moodini_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut journal = InMemoryBackend::new();
//! journal.append(b"first").unwrap();
//! journal.append(b"second").unwrap();
//! assert_eq!(journal.read_all().unwrap(), b"firstsecond");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
