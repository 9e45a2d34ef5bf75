//! Read path: memtable → cache → levels 1..H, newest first.
//!
//! A tombstone found at any layer is authoritative: the key is reported
//! absent and no older layer is consulted.

use tracing::warn;

use crate::Engine;

impl Engine {
    /// Looks a key up. Returns `None` on a miss, a tombstone, admission
    /// denial, or any lookup failure (which is logged).
    pub fn get(&mut self, user: Option<&str>, key: &[u8]) -> Option<Vec<u8>> {
        if !self.admit(user) {
            return None;
        }

        // freshest data first; an in-memory tombstone settles the lookup
        if let Some(entry) = self.mem.entry(key) {
            return entry.value.clone();
        }

        if let Some(value) = self.cache.search(key) {
            return Some(value.to_vec());
        }

        match sstable::find(&self.data_dir, key, self.config.max_height_lsm) {
            Ok(Some(value)) => {
                self.cache.insert(key, value.clone());
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "lookup failed");
                None
            }
        }
    }
}
