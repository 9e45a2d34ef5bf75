//! # Record - common on-disk record codec
//!
//! One binary record shape is shared by the WAL segments and the SSTable
//! data files, so a memtable flush can move records between the two without
//! re-framing them.
//!
//! ## Binary layout
//!
//! ```text
//! [crc32: u32 LE][timestamp: u64 LE][tombstone: u8][key_size: u64 LE]
//! [value_size: u64 LE]   (live records only)
//! [key bytes][value bytes]   (value omitted for tombstones)
//! ```
//!
//! The fixed header (crc + timestamp + tombstone) is 13 bytes; a tombstone
//! record carries a 21-byte prefix before the key, a live record 29 bytes.
//! The CRC is CRC-32/IEEE computed over the key bytes only; values are not
//! integrity-checked, a documented property of the format.
//!
//! ## Example
//!
//! ```rust,no_run
//! use record::Record;
//! use std::io::Cursor;
//!
//! let rec = Record::put(b"hello".to_vec(), b"world".to_vec());
//! let bytes = rec.encode();
//! let back = Record::decode(&mut Cursor::new(bytes)).unwrap().unwrap();
//! assert_eq!(rec, back);
//! ```

use crc32fast::Hasher as Crc32;
use std::io::{self, Read};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Bytes before the key size field: crc(4) + timestamp(8) + tombstone(1).
pub const FIXED_HEADER: usize = 13;
/// Prefix length of a tombstone record: fixed header + key_size(8).
pub const DELETE_PREFIX: usize = 21;
/// Prefix length of a live record: delete prefix + value_size(8).
pub const PUT_PREFIX: usize = 29;

/// Maximum key size accepted while decoding (64 KiB). Prevents OOM on corrupt input.
const MAX_KEY_BYTES: u64 = 64 * 1024;
/// Maximum value size accepted while decoding (10 MiB). Prevents OOM on corrupt input.
const MAX_VALUE_BYTES: u64 = 10 * 1024 * 1024;

/// Errors surfaced by the codec.
#[derive(Debug, Error)]
pub enum RecordError {
    /// CRC mismatch, tombstone byte outside {0, 1}, or an absurd size field.
    #[error("corrupt record")]
    Corrupted,

    /// An underlying I/O error. A record cut off at end of input surfaces as
    /// `Io` with [`io::ErrorKind::UnexpectedEof`], letting callers tell a
    /// torn tail apart from corruption.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// CRC-32/IEEE over `data`.
pub fn crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(data);
    hasher.finalize()
}

/// Microseconds since the Unix epoch; the record timestamp domain.
pub fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// A single key-value mutation. `value == None` is a tombstone.
///
/// The CRC is not stored here; it is derived from the key at encode time
/// and verified at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Microseconds since epoch, stamped at construction.
    pub timestamp: u64,
    /// The lookup key.
    pub key: Vec<u8>,
    /// The payload, or `None` for a deletion marker.
    pub value: Option<Vec<u8>>,
}

impl Record {
    /// A live record stamped with the current time.
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            timestamp: now_micros(),
            key,
            value: Some(value),
        }
    }

    /// A deletion marker stamped with the current time.
    pub fn tombstone(key: Vec<u8>) -> Self {
        Self {
            timestamp: now_micros(),
            key,
            value: None,
        }
    }

    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    /// Exact size of the encoded form in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match &self.value {
            Some(v) => PUT_PREFIX + self.key.len() + v.len(),
            None => DELETE_PREFIX + self.key.len(),
        }
    }

    /// Serializes the record into `buf` (appended; `buf` is not cleared).
    ///
    /// Taking a caller-owned buffer lets append-heavy paths reuse one
    /// allocation across records.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.reserve(self.encoded_len());
        buf.extend_from_slice(&crc32(&self.key).to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        match &self.value {
            Some(v) => {
                buf.push(0);
                buf.extend_from_slice(&(self.key.len() as u64).to_le_bytes());
                buf.extend_from_slice(&(v.len() as u64).to_le_bytes());
                buf.extend_from_slice(&self.key);
                buf.extend_from_slice(v);
            }
            None => {
                buf.push(1);
                buf.extend_from_slice(&(self.key.len() as u64).to_le_bytes());
                buf.extend_from_slice(&self.key);
            }
        }
    }

    /// Serializes the record into a fresh buffer.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    /// Reads one record from `r`.
    ///
    /// # Termination
    ///
    /// - Clean EOF before the first prefix byte -> `Ok(None)`.
    /// - EOF inside a record -> `Err(Io(UnexpectedEof))` (torn tail).
    /// - Tombstone byte outside {0, 1} -> `Err(Corrupted)`.
    /// - `crc32(key)` mismatch -> `Err(Corrupted)`.
    pub fn decode<R: Read>(r: &mut R) -> Result<Option<Record>, RecordError> {
        let mut prefix = [0u8; DELETE_PREFIX];
        if !read_full_or_eof(r, &mut prefix)? {
            return Ok(None);
        }

        let crc = u32::from_le_bytes(prefix[0..4].try_into().unwrap());
        let timestamp = u64::from_le_bytes(prefix[4..12].try_into().unwrap());
        let tombstone = prefix[12];
        let key_size = u64::from_le_bytes(prefix[13..21].try_into().unwrap());

        if key_size > MAX_KEY_BYTES {
            return Err(RecordError::Corrupted);
        }

        let record = match tombstone {
            0 => {
                let mut size = [0u8; 8];
                read_full(r, &mut size)?;
                let value_size = u64::from_le_bytes(size);
                if value_size > MAX_VALUE_BYTES {
                    return Err(RecordError::Corrupted);
                }

                let mut key = vec![0u8; key_size as usize];
                read_full(r, &mut key)?;
                let mut value = vec![0u8; value_size as usize];
                read_full(r, &mut value)?;

                Record {
                    timestamp,
                    key,
                    value: Some(value),
                }
            }
            1 => {
                let mut key = vec![0u8; key_size as usize];
                read_full(r, &mut key)?;

                Record {
                    timestamp,
                    key,
                    value: None,
                }
            }
            _ => return Err(RecordError::Corrupted),
        };

        if crc32(&record.key) != crc {
            return Err(RecordError::Corrupted);
        }

        Ok(Some(record))
    }
}

/// Fills `buf` completely, or reports a truncated record.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), RecordError> {
    if read_full_or_eof(r, buf)? {
        Ok(())
    } else {
        Err(RecordError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "record truncated",
        )))
    }
}

/// Fills `buf` completely. Returns `Ok(false)` on EOF before the first byte,
/// `Err(Io(UnexpectedEof))` on EOF partway through.
fn read_full_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<bool, RecordError> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(RecordError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "record truncated",
                )));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(RecordError::Io(e)),
        }
    }
    Ok(true)
}
