//! # Engine - the StrataKV storage engine
//!
//! The central orchestrator tying the [`wal`], [`memtable`], and [`sstable`]
//! crates into a complete LSM-tree key-value store.
//!
//! ## Architecture
//!
//! ```text
//! Client
//!   |
//!   v
//! ┌───────────────────────────────────────────────┐
//! │                   ENGINE                      │
//! │                                               │
//! │ write.rs → WAL append → Memtable insert       │
//! │              |                                │
//! │              |  (fill >= threshold?)          │
//! │              |            yes                 │
//! │              v                                │
//! │           flush() → level-1 SSTable           │
//! │              |        + WAL recreated         │
//! │              v                                │
//! │           compact() → level L+1 SSTable       │
//! │                                               │
//! │ read.rs → Memtable → LRU cache → levels 1..H  │
//! │            (first match wins, tombstones      │
//! │             terminate the search)             │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Module responsibilities
//!
//! | Module          | Purpose                                            |
//! |-----------------|----------------------------------------------------|
//! | `lib.rs`        | `Engine` struct, open/recovery, accessors, `Debug` |
//! | [`config`]      | `key=value` configuration with range validation    |
//! | [`cache`]       | O(1) LRU cache of recently read values             |
//! | `write.rs`      | `put()`, `delete()`, `flush()`                     |
//! | `read.rs`       | `get()`                                            |
//! | `compaction.rs` | leveled N-way merge, delete + renumber             |
//!
//! ## Durability
//!
//! Every mutation is appended to the WAL **before** the memtable update. On
//! open, an existing WAL is replayed into the fresh memtable; the log is
//! recreated only after a successful flush has made its records redundant.
//! Records still sitting in the WAL batch buffer are written out when the
//! engine (and with it the log) is dropped.

mod cache;
mod compaction;
mod config;
mod read;
mod write;

pub use cache::LruCache;
pub use config::Config;

use anyhow::{Context, Result};
use memtable::Memtable;
use std::path::{Path, PathBuf};
use tracing::debug;
use wal::{Wal, WalError};

/// Admission control consulted when an operation names a user. The token
/// bucket lives outside the engine; this is its seam.
pub trait AdmissionControl {
    /// Whether `user` may perform one more operation right now.
    fn allow(&mut self, user: &str) -> bool;
}

/// The storage engine. One instance owns its root directory exclusively.
pub struct Engine {
    pub(crate) config: Config,
    pub(crate) mem: Memtable,
    pub(crate) cache: LruCache,
    pub(crate) wal: Wal,
    pub(crate) data_dir: PathBuf,
    pub(crate) limiter: Option<Box<dyn AdmissionControl>>,
}

impl Engine {
    /// Opens the engine rooted at `root`, laying out `<root>/data` for the
    /// SSTable levels and `<root>/wal` for the log.
    ///
    /// An existing WAL is **replayed** into the fresh memtable before the
    /// log is reopened for append, so acknowledged writes from a previous
    /// process survive a crash. A missing or empty WAL is a fresh start.
    pub fn open<P: AsRef<Path>>(root: P, config: Config) -> Result<Self> {
        let root = root.as_ref();
        let data_dir = root.join("data");
        let wal_dir = root.join("wal");
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let mut mem = Memtable::new(config.mem_max_size, config.mem_threshold);
        let wal = match Wal::open(
            &wal_dir,
            config.batch_size,
            config.segment_size,
            config.low_watermark,
        ) {
            Ok(wal) => {
                let records = wal.read_all().context("failed to replay write-ahead log")?;
                debug!(records = records.len(), "replaying write-ahead log");
                for rec in records {
                    mem.put(rec);
                }
                wal
            }
            Err(WalError::NotFound) => Wal::create(
                &wal_dir,
                config.batch_size,
                config.segment_size,
                config.low_watermark,
            )
            .context("failed to create write-ahead log")?,
            Err(e) => {
                return Err(anyhow::Error::new(e).context("failed to open write-ahead log"))
            }
        };

        let cache = LruCache::new(config.cache_limit);
        Ok(Self {
            config,
            mem,
            cache,
            wal,
            data_dir,
            limiter: None,
        })
    }

    /// Installs an admission controller; operations that name a user are
    /// checked against it from then on.
    pub fn set_admission(&mut self, limiter: Box<dyn AdmissionControl>) {
        self.limiter = Some(limiter);
    }

    /// Flushes the residual WAL batch and shuts the engine down.
    pub fn close(self) -> Result<()> {
        self.wal.close()?;
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Entries currently in the memtable, tombstones included.
    #[must_use]
    pub fn memtable_len(&self) -> usize {
        self.mem.len()
    }

    /// Values currently in the read cache.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of SSTables at `level`.
    #[must_use]
    pub fn table_count(&self, level: usize) -> usize {
        sstable::last_ordinal(&self.data_dir, level)
    }

    /// Admission check: only enforced when a user is named and a limiter is
    /// installed.
    pub(crate) fn admit(&mut self, user: Option<&str>) -> bool {
        match (user, self.limiter.as_mut()) {
            (Some(u), Some(l)) if !u.is_empty() => l.allow(u),
            _ => true,
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("data_dir", &self.data_dir)
            .field("memtable_entries", &self.mem.len())
            .field("memtable_fill_percent", &self.mem.fill_percent())
            .field("cache_entries", &self.cache.len())
            .field("wal_segment", &self.wal.end_index())
            .finish()
    }
}

#[cfg(test)]
mod tests;
