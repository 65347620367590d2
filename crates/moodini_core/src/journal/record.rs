//! Journal record types and their payload encoding.

use crate::error::{CoreError, CoreResult};
use crate::types::CommitSeq;

/// Magic bytes opening every journal record.
pub const JOURNAL_MAGIC: [u8; 4] = *b"MJRN";

/// Current journal format version.
pub const JOURNAL_VERSION: u16 = 1;

/// Header size: magic (4) + version (2) + type (1) + length (4).
pub(crate) const HEADER_SIZE: usize = 11;

/// Trailing checksum size.
pub(crate) const CRC_SIZE: usize = 4;

/// Type tag of a journal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// An applied command.
    Command = 1,
    /// The state up to a sequence was written to a snapshot.
    Checkpoint = 2,
}

impl RecordType {
    /// Converts a byte to a record type.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Command),
            2 => Some(Self::Checkpoint),
            _ => None,
        }
    }

    /// Converts the record type to a byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A single journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalRecord {
    /// A command that was applied successfully.
    Command {
        /// Commit sequence assigned to the command.
        sequence: CommitSeq,
        /// CBOR encoding of the command.
        payload: Vec<u8>,
    },

    /// Marker written right after a snapshot.
    Checkpoint {
        /// Last sequence covered by the snapshot.
        sequence: CommitSeq,
    },
}

impl JournalRecord {
    /// Returns the record type.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Command { .. } => RecordType::Command,
            Self::Checkpoint { .. } => RecordType::Checkpoint,
        }
    }

    /// Returns the commit sequence the record carries.
    #[must_use]
    pub fn sequence(&self) -> CommitSeq {
        match self {
            Self::Command { sequence, .. } | Self::Checkpoint { sequence } => *sequence,
        }
    }

    /// Serializes the record payload (without envelope).
    #[must_use]
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Self::Command { sequence, payload } => {
                let mut buf = Vec::with_capacity(8 + payload.len());
                buf.extend_from_slice(&sequence.as_u64().to_le_bytes());
                buf.extend_from_slice(payload);
                buf
            }
            Self::Checkpoint { sequence } => sequence.as_u64().to_le_bytes().to_vec(),
        }
    }

    /// Deserializes a record from its type and payload.
    pub fn decode_payload(record_type: RecordType, payload: &[u8]) -> CoreResult<Self> {
        if payload.len() < 8 {
            return Err(CoreError::journal_corruption(format!(
                "{record_type:?} payload too short: {} bytes",
                payload.len()
            )));
        }
        let (seq_bytes, rest) = payload.split_at(8);
        let mut raw = [0u8; 8];
        raw.copy_from_slice(seq_bytes);
        let sequence = CommitSeq::new(u64::from_le_bytes(raw));

        match record_type {
            RecordType::Command => Ok(Self::Command {
                sequence,
                payload: rest.to_vec(),
            }),
            RecordType::Checkpoint => {
                if !rest.is_empty() {
                    return Err(CoreError::journal_corruption(
                        "trailing bytes in checkpoint record",
                    ));
                }
                Ok(Self::Checkpoint { sequence })
            }
        }
    }

    /// Encodes the record with its envelope and checksum.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let payload = self.encode_payload();
        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::codec("journal record payload too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&JOURNAL_MAGIC);
        data.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
        data.push(self.record_type().as_byte());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }
}

/// Computes the IEEE CRC32 of `data`.
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
