//! Point lookups over the on-disk levels: filter → summary → index → data.
//!
//! Each probe opens the files it needs and closes them again; no table
//! handles are cached. Levels are searched upwards from 1, and within a
//! level ordinals downwards from the newest, so the first record found for a
//! key is its newest on-disk version. A tombstone in that position
//! terminates the search, since older shadowed versions must stay invisible.

use anyhow::{bail, Context, Result};
use bloom::BloomFilter;
use byteorder::{LittleEndian, ReadBytesExt};
use record::Record;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::{last_ordinal, TableName};

/// Byte position of the tombstone flag inside a record: after crc and timestamp.
const TOMBSTONE_OFFSET: u64 = 12;

/// Keys larger than this in a summary file mean corruption, not data.
const MAX_SUMMARY_KEY: u64 = 64 * 1024;

/// Looks `key` up across levels `1..=max_level`, newest table first.
///
/// Returns the value of the newest on-disk record, or `None` when the key is
/// absent everywhere or its newest record is a tombstone.
pub fn find(data_dir: &Path, key: &[u8], max_level: usize) -> Result<Option<Vec<u8>>> {
    match locate(data_dir, key, max_level)? {
        Some((rec, _, _)) => Ok(rec.value),
        None => Ok(None),
    }
}

/// Tombstones the newest on-disk record for `key` in place (one byte write
/// into the data file). Returns `true` only when that record was live;
/// an already-tombstoned newest record means there is nothing to delete.
pub fn delete(data_dir: &Path, key: &[u8], max_level: usize) -> Result<bool> {
    let Some((rec, name, data_offset)) = locate(data_dir, key, max_level)? else {
        return Ok(false);
    };
    if rec.is_tombstone() {
        return Ok(false);
    }

    let path = name.data_path(data_dir);
    let mut file = OpenOptions::new()
        .write(true)
        .open(&path)
        .with_context(|| format!("failed to reopen {} for tombstone write", name))?;
    file.seek(SeekFrom::Start(data_offset + TOMBSTONE_OFFSET))?;
    file.write_all(&[1])?;
    Ok(true)
}

/// The shared walk behind [`find`] and [`delete`]: the newest record for
/// `key` together with the table it lives in and its data-file offset.
fn locate(
    data_dir: &Path,
    key: &[u8],
    max_level: usize,
) -> Result<Option<(Record, TableName, u64)>> {
    for level in 1..=max_level {
        for ordinal in (1..=last_ordinal(data_dir, level)).rev() {
            let name = TableName::new(level, ordinal);

            let filter = BloomFilter::load(name.filter_path(data_dir))
                .with_context(|| format!("failed to load filter of {}", name))?;
            if !filter.may_contain(key) {
                continue;
            }

            let Some(index_offset) = summary_find(&name.summary_path(data_dir), key)? else {
                continue; // bloom false positive
            };
            let data_offset = index_read_u64(&name.index_path(data_dir), index_offset)?;
            let rec = read_record_at(&name.data_path(data_dir), data_offset)?;
            if rec.key != key {
                bail!("summary of {} pointed at a mismatching record", name);
            }
            return Ok(Some((rec, name, data_offset)));
        }
    }
    Ok(None)
}

/// Scans the `(key_size, key, index_offset)` triples for `key`; the offset
/// of the first match, or `None` at EOF.
fn summary_find(path: &Path, key: &[u8]) -> Result<Option<u64>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut rdr = BufReader::new(file);

    loop {
        let key_size = match rdr.read_u64::<LittleEndian>() {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if key_size > MAX_SUMMARY_KEY {
            bail!("corrupt summary {}: key size {}", path.display(), key_size);
        }

        let mut entry_key = vec![0u8; key_size as usize];
        rdr.read_exact(&mut entry_key)?;
        let index_offset = rdr.read_u64::<LittleEndian>()?;

        if entry_key == key {
            return Ok(Some(index_offset));
        }
    }
}

/// Reads the u64 data-file offset stored at `offset` in the index file.
fn index_read_u64(path: &Path, offset: u64) -> Result<u64> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    file.seek(SeekFrom::Start(offset))?;
    Ok(file.read_u64::<LittleEndian>()?)
}

/// Decodes the record starting at `offset` in the data file, verifying its CRC.
fn read_record_at(path: &Path, offset: u64) -> Result<Record> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    file.seek(SeekFrom::Start(offset))?;
    match Record::decode(&mut BufReader::new(file))? {
        Some(rec) => Ok(rec),
        None => bail!(
            "record offset {} points past the end of {}",
            offset,
            path.display()
        ),
    }
}
