//! # WAL - Write-Ahead Log
//!
//! Provides crash-safe durability for the storage engine.
//!
//! Every mutation (`PUT` or `DELETE`) is serialized into a binary [`Record`]
//! and appended to the log **before** the corresponding in-memory update. On
//! restart the log is replayed to reconstruct the memtable, so no append
//! that reached a segment file is lost.
//!
//! ## Segments
//!
//! The log is a directory of files `wal_0`, `wal_1`, ... each holding at
//! most `segment_size` records packed back to back. When the active segment
//! is full the next append rolls to a fresh segment; if at that moment the
//! segment index has passed the configured low watermark, every segment is
//! deleted and the log restarts from `wal_0` (the memtable flush that
//! checkpoints the data accompanies this truncation).
//!
//! ## Appends
//!
//! Two flavors. *Direct* appends write one record immediately. *Buffered*
//! appends collect records into a batch and write them all once the batch
//! fills; [`Wal::close`] drains what is left. Either way the write itself
//! goes through a memory-mapped append: grow the file, map it read-write,
//! copy the record at the old end, flush the mapping.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wal::Wal;
//!
//! let mut log = Wal::create("wal", 3, 6, 3).unwrap();
//! log.write_put_direct(b"hello", b"world").unwrap();
//! for rec in log.read_all().unwrap() {
//!     println!("{:?}", rec);
//! }
//! ```

use memmap2::MmapMut;
use record::{Record, RecordError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// A record failed CRC validation or carried an invalid tombstone byte.
    #[error("log corrupted")]
    Corrupted,

    /// `read_at` addressed a record past the end of the log.
    #[error("record index out of bounds")]
    OutOfBounds,

    /// The log directory is missing or holds no segments.
    #[error("write-ahead log not found")]
    NotFound,

    /// An underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<RecordError> for WalError {
    fn from(e: RecordError) -> Self {
        match e {
            RecordError::Corrupted => WalError::Corrupted,
            RecordError::Io(e) => WalError::Io(e),
        }
    }
}

/// A segmented write-ahead log rooted at one directory.
pub struct Wal {
    dir: PathBuf,
    /// Pending encoded records awaiting a batch flush.
    batch: Vec<Vec<u8>>,
    batch_size: usize,
    segment_size: usize,
    low_watermark: usize,
    /// Lowest segment index still on disk.
    start_index: usize,
    /// Highest segment index.
    end_index: usize,
    /// Index of the segment the open handle points at (== `end_index`).
    current_index: usize,
    entries_in_segment: usize,
    file: File,
}

impl Wal {
    /// Creates a fresh log: the directory is created if needed and segment
    /// `wal_0` is opened empty.
    pub fn create<P: AsRef<Path>>(
        dir: P,
        batch_size: usize,
        segment_size: usize,
        low_watermark: usize,
    ) -> Result<Self, WalError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let file = open_segment(&segment_path(&dir, 0), true)?;
        Ok(Self {
            dir,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            segment_size,
            low_watermark,
            start_index: 0,
            end_index: 0,
            current_index: 0,
            entries_in_segment: 0,
            file,
        })
    }

    /// Resumes an existing log: finds the segment range on disk, opens the
    /// newest segment and counts its records so appends continue where the
    /// previous process stopped.
    ///
    /// Returns [`WalError::NotFound`] when the directory is missing or holds
    /// no segment files.
    pub fn open<P: AsRef<Path>>(
        dir: P,
        batch_size: usize,
        segment_size: usize,
        low_watermark: usize,
    ) -> Result<Self, WalError> {
        let dir = dir.as_ref().to_path_buf();
        let indices = segment_indices(&dir)?;
        let (&start_index, &end_index) = match (indices.iter().min(), indices.iter().max()) {
            (Some(min), Some(max)) => (min, max),
            _ => return Err(WalError::NotFound),
        };

        let path = segment_path(&dir, end_index);
        let (entries_in_segment, valid_len) = count_records(&path)?;
        let file = open_segment(&path, false)?;
        // chop off any record torn by a crash mid-append, so new appends
        // never land behind unreadable bytes
        if file.metadata()?.len() > valid_len {
            file.set_len(valid_len)?;
        }

        Ok(Self {
            dir,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            segment_size,
            low_watermark,
            start_index,
            end_index,
            current_index: end_index,
            entries_in_segment,
            file,
        })
    }

    /// Appends one live record immediately, rolling the segment if the
    /// active one is full. Returns the stamped record so the caller can
    /// apply the same mutation to the memtable.
    pub fn write_put_direct(&mut self, key: &[u8], value: &[u8]) -> Result<Record, WalError> {
        let rec = Record::put(key.to_vec(), value.to_vec());
        let bytes = rec.encode();
        self.append_record(&bytes)?;
        Ok(rec)
    }

    /// Appends one tombstone immediately. See [`Wal::write_put_direct`].
    pub fn write_delete_direct(&mut self, key: &[u8]) -> Result<Record, WalError> {
        let rec = Record::tombstone(key.to_vec());
        let bytes = rec.encode();
        self.append_record(&bytes)?;
        Ok(rec)
    }

    /// Enqueues a live record into the batch buffer; the batch is written
    /// out once it holds `batch_size` records. Until then the record is
    /// durable only in memory.
    pub fn write_put_buffer(&mut self, key: &[u8], value: &[u8]) -> Result<Record, WalError> {
        let rec = Record::put(key.to_vec(), value.to_vec());
        self.buffer(rec.encode())?;
        Ok(rec)
    }

    /// Enqueues a tombstone. See [`Wal::write_put_buffer`].
    pub fn write_delete_buffer(&mut self, key: &[u8]) -> Result<Record, WalError> {
        let rec = Record::tombstone(key.to_vec());
        self.buffer(rec.encode())?;
        Ok(rec)
    }

    /// Writes every pending batched record, honoring segment rolls.
    pub fn flush_batch(&mut self) -> Result<(), WalError> {
        let pending = std::mem::take(&mut self.batch);
        for bytes in &pending {
            self.append_record(bytes)?;
        }
        Ok(())
    }

    /// Decodes every record across segments `start..=end`, in append order.
    ///
    /// CRCs are verified; a record cut off at the end of the log (torn by a
    /// crash mid-append) ends the scan cleanly with everything before it.
    pub fn read_all(&self) -> Result<Vec<Record>, WalError> {
        let mut records = Vec::new();
        'segments: for i in self.start_index..=self.end_index {
            let file = File::open(segment_path(&self.dir, i))?;
            let mut rdr = BufReader::new(file);
            loop {
                match Record::decode(&mut rdr) {
                    Ok(Some(rec)) => records.push(rec),
                    Ok(None) => break,
                    Err(RecordError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        break 'segments
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(records)
    }

    /// The `index`-th record across all segments, or
    /// [`WalError::OutOfBounds`] past the last one.
    pub fn read_at(&self, index: usize) -> Result<Record, WalError> {
        let mut seen = 0usize;
        'segments: for i in self.start_index..=self.end_index {
            let file = File::open(segment_path(&self.dir, i))?;
            let mut rdr = BufReader::new(file);
            loop {
                match Record::decode(&mut rdr) {
                    Ok(Some(rec)) => {
                        if seen == index {
                            return Ok(rec);
                        }
                        seen += 1;
                    }
                    Ok(None) => break,
                    Err(RecordError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                        break 'segments
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Err(WalError::OutOfBounds)
    }

    /// Deletes every segment and restarts the log from `wal_0`.
    ///
    /// Pending batched records are kept: they checkpoint with the *next*
    /// flush, not the one that triggered the recreation.
    pub fn recreate(&mut self) -> Result<(), WalError> {
        fs::remove_dir_all(&self.dir)?;
        fs::create_dir_all(&self.dir)?;
        debug!(dir = %self.dir.display(), "write-ahead log recreated");
        self.start_index = 0;
        self.end_index = 0;
        self.current_index = 0;
        self.entries_in_segment = 0;
        self.file = open_segment(&segment_path(&self.dir, 0), true)?;
        Ok(())
    }

    /// Flushes the residual batch and closes the log.
    pub fn close(mut self) -> Result<(), WalError> {
        self.flush_batch()
    }

    /// Highest segment index on disk.
    #[must_use]
    pub fn end_index(&self) -> usize {
        self.end_index
    }

    /// Records written to the active segment so far.
    #[must_use]
    pub fn entries_in_segment(&self) -> usize {
        self.entries_in_segment
    }

    /// Records waiting in the batch buffer.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    // ---- Internal helpers ----

    fn buffer(&mut self, bytes: Vec<u8>) -> Result<(), WalError> {
        self.batch.push(bytes);
        if self.batch.len() == self.batch_size {
            self.flush_batch()?;
        }
        Ok(())
    }

    /// Appends one encoded record, rolling to a new segment first when the
    /// active one already holds `segment_size` records.
    fn append_record(&mut self, bytes: &[u8]) -> Result<(), WalError> {
        if self.entries_in_segment >= self.segment_size {
            self.roll_segment()?;
        }
        mmap_append(&self.file, bytes)?;
        self.entries_in_segment += 1;
        Ok(())
    }

    fn roll_segment(&mut self) -> Result<(), WalError> {
        self.end_index += 1;
        self.enforce_watermark()?;
        self.current_index = self.end_index;
        self.entries_in_segment = 0;
        self.file = open_segment(&segment_path(&self.dir, self.current_index), true)?;
        Ok(())
    }

    /// Past the low watermark every segment is discarded and the index
    /// restarts at zero. The caller-side memtable flush is what makes the
    /// discarded records redundant.
    fn enforce_watermark(&mut self) -> Result<(), WalError> {
        if self.end_index > self.low_watermark {
            for i in segment_indices(&self.dir)? {
                fs::remove_file(segment_path(&self.dir, i))?;
            }
            debug!(
                dir = %self.dir.display(),
                watermark = self.low_watermark,
                "low watermark passed, segments truncated"
            );
            self.start_index = 0;
            self.end_index = 0;
        }
        Ok(())
    }
}

/// Residual batched records are written out on drop, best effort.
impl Drop for Wal {
    fn drop(&mut self) {
        let _ = self.flush_batch();
    }
}

fn segment_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("wal_{}", index))
}

/// Indices of the `wal_<i>` files present in `dir`.
/// [`WalError::NotFound`] when the directory itself is missing.
fn segment_indices(dir: &Path) -> Result<Vec<usize>, WalError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(WalError::NotFound),
        Err(e) => return Err(e.into()),
    };

    let mut indices = Vec::new();
    for entry in entries {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if let Some(num) = name.strip_prefix("wal_") {
                if let Ok(i) = num.parse::<usize>() {
                    indices.push(i);
                }
            }
        }
    }
    Ok(indices)
}

fn open_segment(path: &Path, fresh: bool) -> Result<File, WalError> {
    Ok(OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(fresh)
        .open(path)?)
}

/// Counts complete records in one segment file and the byte length they
/// span; a torn tail counts toward neither.
fn count_records(path: &Path) -> Result<(usize, u64), WalError> {
    let file = File::open(path)?;
    let mut rdr = BufReader::new(file);
    let mut count = 0;
    let mut valid_len = 0u64;
    loop {
        match Record::decode(&mut rdr) {
            Ok(Some(rec)) => {
                count += 1;
                valid_len += rec.encoded_len() as u64;
            }
            Ok(None) => break,
            Err(RecordError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok((count, valid_len))
}

/// The append primitive: grow the file by `data.len()`, map it read-write,
/// copy the payload at the old end, flush the mapping.
fn mmap_append(file: &File, data: &[u8]) -> io::Result<()> {
    if data.is_empty() {
        return Ok(());
    }
    let old_len = file.metadata()?.len() as usize;
    file.set_len((old_len + data.len()) as u64)?;
    // Safety: the mapping is private to this call and the file handle
    // outlives it.
    let mut map = unsafe { MmapMut::map_mut(file)? };
    map[old_len..old_len + data.len()].copy_from_slice(data);
    map.flush()?;
    Ok(())
}
