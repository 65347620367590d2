//! Append-only command journal.
//!
//! Every command a controller applies is appended here, and flushed, before
//! the caller sees its result. On open the journal is replayed on top of
//! the latest snapshot.
//!
//! ## Record Format
//!
//! ```text
//! | magic "MJRN" (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! All integers are little-endian. The CRC covers header and payload.
//!
//! ## Recovery Policy
//!
//! A record cut short at the end of the log (fewer header bytes, or a
//! length running past the end) is what a crash mid-append leaves behind.
//! It is treated as a clean end of log and cut off before new appends.
//!
//! A checksum mismatch, bad magic, an unknown record type or a newer format
//! version means the bytes were damaged after they were written. Recovery
//! stops with an error instead of guessing.

mod iterator;
mod record;
mod writer;

pub use iterator::JournalIterator;
pub use record::{compute_crc32, JournalRecord, RecordType};
pub use writer::Journal;
