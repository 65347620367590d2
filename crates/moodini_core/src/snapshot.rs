//! Checkpoint images of a controller's state.
//!
//! ```text
//! | magic "MSNP" (4) | version (2) | seq (8) | length (4) | CBOR state (N) | crc32 (4) |
//! ```
//!
//! A snapshot is written with [`StorageBackend::replace`], so a crash while
//! checkpointing leaves the previous image in place.

use crate::codec::{from_cbor, to_cbor};
use crate::error::{CoreError, CoreResult};
use crate::journal::compute_crc32;
use crate::types::CommitSeq;
use moodini_storage::StorageBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Magic bytes opening a snapshot.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"MSNP";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

const HEADER_SIZE: usize = 18;
const CRC_SIZE: usize = 4;

/// Header fields of a stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// Last commit sequence contained in the image.
    pub sequence: CommitSeq,
    /// Size of the CBOR state in bytes.
    pub state_len: u32,
}

/// Reads and writes the snapshot of one controller.
pub struct SnapshotStore {
    backend: Box<dyn StorageBackend>,
}

impl SnapshotStore {
    /// Creates a store over `backend`.
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Replaces the snapshot with `state` as of `sequence`.
    pub fn write<S: Serialize>(&mut self, sequence: CommitSeq, state: &S) -> CoreResult<SnapshotInfo> {
        let body = to_cbor(state)?;
        let state_len = u32::try_from(body.len())
            .map_err(|_| CoreError::codec("snapshot state too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + body.len() + CRC_SIZE);
        data.extend_from_slice(&SNAPSHOT_MAGIC);
        data.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        data.extend_from_slice(&sequence.as_u64().to_le_bytes());
        data.extend_from_slice(&state_len.to_le_bytes());
        data.extend_from_slice(&body);
        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());

        self.backend.replace(&data)?;
        Ok(SnapshotInfo {
            sequence,
            state_len,
        })
    }

    /// Loads the snapshot, or `None` if none was ever written.
    pub fn read<S: DeserializeOwned>(&self) -> CoreResult<Option<(SnapshotInfo, S)>> {
        let Some((info, body)) = self.read_raw()? else {
            return Ok(None);
        };
        let state = from_cbor(&body).map_err(|e| {
            CoreError::snapshot_corruption(format!("state does not decode: {e}"))
        })?;
        Ok(Some((info, state)))
    }

    /// Reads only the header, verifying the checksum.
    pub fn info(&self) -> CoreResult<Option<SnapshotInfo>> {
        Ok(self.read_raw()?.map(|(info, _)| info))
    }

    fn read_raw(&self) -> CoreResult<Option<(SnapshotInfo, Vec<u8>)>> {
        let data = self.backend.read_all()?;
        if data.is_empty() {
            return Ok(None);
        }
        if data.len() < HEADER_SIZE + CRC_SIZE {
            return Err(CoreError::snapshot_corruption(format!(
                "snapshot of {} bytes is shorter than its header",
                data.len()
            )));
        }
        if data[0..4] != SNAPSHOT_MAGIC {
            return Err(CoreError::snapshot_corruption("invalid magic"));
        }
        let version = u16::from_le_bytes([data[4], data[5]]);
        if version > SNAPSHOT_VERSION {
            return Err(CoreError::snapshot_corruption(format!(
                "unsupported version {version}"
            )));
        }

        let mut seq = [0u8; 8];
        seq.copy_from_slice(&data[6..14]);
        let sequence = CommitSeq::new(u64::from_le_bytes(seq));
        let state_len = u32::from_le_bytes([data[14], data[15], data[16], data[17]]);

        let body_end = HEADER_SIZE + state_len as usize;
        if data.len() != body_end + CRC_SIZE {
            return Err(CoreError::snapshot_corruption(format!(
                "length field {state_len} does not match snapshot size {}",
                data.len()
            )));
        }

        let stored_crc = u32::from_le_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        let computed_crc = compute_crc32(&data[..body_end]);
        if stored_crc != computed_crc {
            return Err(CoreError::ChecksumMismatch {
                expected: stored_crc,
                actual: computed_crc,
            });
        }

        Ok(Some((
            SnapshotInfo {
                sequence,
                state_len,
            },
            data[HEADER_SIZE..body_end].to_vec(),
        )))
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").finish_non_exhaustive()
    }
}
