//! Compaction: merge the oldest N tables of level L into level L+1.
//!
//! For each level below the top, as long as at least `compaction_size`
//! tables exist, the oldest ones (ordinals 1..=N) are streamed through
//! [`TableMerger`] into the next free ordinal one level down the tree, the
//! inputs are deleted, and the surviving tables are renumbered so ordinals
//! stay dense. Tombstones ride along in the merge: they keep shadowing
//! older versions in deeper levels until those are merged away too.

use anyhow::{Context, Result};
use sstable::{last_ordinal, rename_table, write_table, TableMerger, TableName};
use std::fs::{self, File};
use tracing::debug;

use crate::Engine;

impl Engine {
    /// Runs compaction across levels `1..max_height`. Each pass at a level
    /// merges its oldest `compaction_size` tables; a level with fewer tables
    /// than that is left alone, the normal stop condition rather than an error.
    pub fn compact(&mut self) -> Result<()> {
        let n = self.config.compaction_size;
        let max_level = self.config.max_height_lsm;

        for level in 1..max_level {
            while last_ordinal(&self.data_dir, level) >= n {
                self.merge_oldest(level, n)?;
            }
        }
        Ok(())
    }

    fn merge_oldest(&mut self, level: usize, n: usize) -> Result<()> {
        let mut files = Vec::with_capacity(n);
        for ordinal in 1..=n {
            let name = TableName::new(level, ordinal);
            let file = File::open(name.data_path(&self.data_dir))
                .with_context(|| format!("failed to open {} for merge", name))?;
            files.push(file);
        }

        let merged = TableMerger::new(files)?.merge()?;
        let target = TableName::new(level + 1, last_ordinal(&self.data_dir, level + 1) + 1);
        write_table(&self.data_dir, &target, &merged, self.config.bloom_precision)?;
        debug!(
            level,
            inputs = n,
            records = merged.len(),
            target = %target,
            "level compacted"
        );

        // drop the merged inputs, then close the ordinal gap
        for ordinal in 1..=n {
            fs::remove_dir_all(TableName::new(level, ordinal).dir(&self.data_dir))?;
        }
        let mut ordinal = n + 1;
        while TableName::new(level, ordinal).exists(&self.data_dir) {
            rename_table(
                &self.data_dir,
                TableName::new(level, ordinal),
                TableName::new(level, ordinal - n),
            )?;
            ordinal += 1;
        }

        Ok(())
    }
}
