//! Table naming and path construction.
//!
//! All knowledge of the `SSTable<L>_<K>` directory scheme lives here so the
//! writer, reader, and compaction agree on it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Identifies one table: its level and its ordinal within the level.
/// Ordinals are dense `1..=K`; ordinal `K` is the newest table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableName {
    pub level: usize,
    pub ordinal: usize,
}

impl TableName {
    pub fn new(level: usize, ordinal: usize) -> Self {
        Self { level, ordinal }
    }

    fn tag(&self) -> String {
        format!("{}_{}", self.level, self.ordinal)
    }

    /// `<data_dir>/SSTable<L>_<K>`
    pub fn dir(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("SSTable{}", self.tag()))
    }

    pub fn data_path(&self, data_dir: &Path) -> PathBuf {
        self.dir(data_dir).join(format!("SSTable{}.txt", self.tag()))
    }

    pub fn index_path(&self, data_dir: &Path) -> PathBuf {
        self.dir(data_dir).join(format!("index{}.txt", self.tag()))
    }

    pub fn summary_path(&self, data_dir: &Path) -> PathBuf {
        self.dir(data_dir).join(format!("summary{}.txt", self.tag()))
    }

    pub fn filter_path(&self, data_dir: &Path) -> PathBuf {
        self.dir(data_dir).join(format!("filter{}.txt", self.tag()))
    }

    /// Whether this table exists on disk.
    pub fn exists(&self, data_dir: &Path) -> bool {
        self.dir(data_dir).is_dir()
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SSTable{}_{}", self.level, self.ordinal)
    }
}

/// Highest existing ordinal at `level`, 0 when the level is empty.
/// Ordinals are dense, so probing upwards from 1 finds the end.
pub fn last_ordinal(data_dir: &Path, level: usize) -> usize {
    let mut ordinal = 1;
    while TableName::new(level, ordinal).exists(data_dir) {
        ordinal += 1;
    }
    ordinal - 1
}

/// Renames a table directory and its four inner files from `from` to `to`.
/// Used by compaction when it renumbers the survivors of a level.
pub fn rename_table(data_dir: &Path, from: TableName, to: TableName) -> io::Result<()> {
    fs::rename(from.dir(data_dir), to.dir(data_dir))?;

    // the inner files still carry the old tag inside the renamed directory
    let dir = to.dir(data_dir);
    for prefix in ["SSTable", "index", "summary", "filter"] {
        fs::rename(
            dir.join(format!("{}{}.txt", prefix, from.tag())),
            dir.join(format!("{}{}.txt", prefix, to.tag())),
        )?;
    }
    Ok(())
}
