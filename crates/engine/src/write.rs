//! Write path: `put()`, `delete()`, and the flush that spills the memtable
//! to a level-1 SSTable.
//!
//! Every mutation goes to the WAL first, then to the memtable. The fill
//! check happens between the two: the put that finds the memtable at or
//! past its threshold flushes the accumulated records and then lands in the
//! fresh table. Flushing writes the next level-1 ordinal and recreates the
//! WAL, only once the flushed table is on disk.

use anyhow::Result;
use sstable::TableName;
use tracing::{debug, warn};

use crate::Engine;

impl Engine {
    /// Inserts or updates a key. Returns `false` on admission denial or any
    /// internal failure (which is logged), `true` otherwise.
    pub fn put(&mut self, user: Option<&str>, key: &[u8], value: &[u8]) -> bool {
        if !self.admit(user) {
            return false;
        }
        match self.try_put(key, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "put failed");
                false
            }
        }
    }

    /// Deletes a key. Returns `true` when any layer (memtable or an on-disk
    /// table) held a live version to delete.
    pub fn delete(&mut self, user: Option<&str>, key: &[u8]) -> bool {
        if !self.admit(user) {
            return false;
        }
        match self.try_delete(key) {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(error = %e, "delete failed");
                false
            }
        }
    }

    /// Forces a flush of the memtable to a level-1 SSTable. No-op when the
    /// memtable is empty.
    pub fn flush(&mut self) -> Result<()> {
        if self.mem.is_empty() {
            return Ok(());
        }
        self.flush_memtable()
    }

    fn try_put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let rec = self.wal.write_put_buffer(key, value)?;

        if self.mem.fill_percent() >= self.mem.threshold() {
            self.flush_memtable()?;
        }

        self.mem.put(rec);
        Ok(())
    }

    fn try_delete(&mut self, key: &[u8]) -> Result<bool> {
        let rec = self.wal.write_delete_buffer(key)?;
        self.cache.remove(key);

        if self.mem.delete(key, rec.timestamp) {
            return Ok(true);
        }
        // no live in-memory version: tombstone the newest on-disk record
        sstable::delete(&self.data_dir, key, self.config.max_height_lsm)
    }

    /// Drains the memtable into the next level-1 ordinal, then recreates the
    /// WAL, whose records are redundant once the table is durable.
    pub(crate) fn flush_memtable(&mut self) -> Result<()> {
        let batch = self.mem.flush();
        if batch.is_empty() {
            return Ok(());
        }

        let ordinal = sstable::last_ordinal(&self.data_dir, 1) + 1;
        let name = TableName::new(1, ordinal);
        sstable::write_table(&self.data_dir, &name, &batch, self.config.bloom_precision)?;
        debug!(records = batch.len(), table = %name, "memtable flushed");

        self.wal.recreate()?;
        Ok(())
    }
}
