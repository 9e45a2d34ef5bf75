//! Table writer: turns a sorted batch of records into the four table files.

use anyhow::{ensure, Context, Result};
use bloom::BloomFilter;
use byteorder::{LittleEndian, WriteBytesExt};
use record::Record;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::TableName;

/// Writes `batch` as the table `name` under `data_dir`.
///
/// The batch must be strictly ascending by key (the shape produced by a
/// memtable flush or a merge). Produces, in order: the bloom filter over all
/// keys, the index of per-record data offsets, the dense summary, and the
/// data file carrying each record's WAL encoding byte for byte.
///
/// Every file is opened with truncation, so re-running a failed write is
/// idempotent.
pub fn write_table(data_dir: &Path, name: &TableName, batch: &[Record], fpr: f64) -> Result<()> {
    ensure!(
        batch.windows(2).all(|w| w[0].key < w[1].key),
        "table batch must be strictly ascending by key"
    );

    fs::create_dir_all(name.dir(data_dir))
        .with_context(|| format!("failed to create table directory for {}", name))?;

    // bloom filter over every key, live or tombstoned
    let mut filter = BloomFilter::new(batch.len(), fpr);
    for rec in batch {
        filter.insert(&rec.key);
    }
    filter
        .save(name.filter_path(data_dir))
        .with_context(|| format!("failed to write filter of {}", name))?;

    // index: cumulative byte offset of each record in the data file
    let mut index = BufWriter::new(truncated(&name.index_path(data_dir))?);
    let mut offset = 0u64;
    for rec in batch {
        index.write_u64::<LittleEndian>(offset)?;
        offset += rec.encoded_len() as u64;
    }
    index.flush()?;

    // summary: (key_size, key, offset of entry i in the index file)
    let mut summary = BufWriter::new(truncated(&name.summary_path(data_dir))?);
    for (i, rec) in batch.iter().enumerate() {
        summary.write_u64::<LittleEndian>(rec.key.len() as u64)?;
        summary.write_all(&rec.key)?;
        summary.write_u64::<LittleEndian>((i * 8) as u64)?;
    }
    summary.flush()?;

    // data: records packed back to back, same encoding as the WAL
    let mut data = BufWriter::new(truncated(&name.data_path(data_dir))?);
    let mut buf = Vec::new();
    for rec in batch {
        buf.clear();
        rec.encode_into(&mut buf);
        data.write_all(&buf)?;
    }
    data.flush()?;

    Ok(())
}

fn truncated(path: &Path) -> Result<fs::File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))
}
