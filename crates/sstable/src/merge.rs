//! K-way merge over table data files: the compaction primitive.
//!
//! Each input table contributes one "front": its next undelivered record.
//! The merger repeatedly emits the best front and refills it. Ordering
//! contract: smallest key wins; ties on key go to the highest timestamp;
//! ties on timestamp go to the later input (inputs are passed oldest first,
//! so the later one is the newer table). Every front holding the emitted key
//! advances past it, which is what deduplicates the output.
//!
//! Tombstones are records like any other; they must survive the merge to
//! keep shadowing older versions that may live in deeper levels.

use anyhow::Result;
use record::Record;
use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;

struct Front {
    rdr: BufReader<File>,
    current: Option<Record>,
}

impl Front {
    fn advance(&mut self) -> Result<()> {
        self.current = Record::decode(&mut self.rdr)?;
        Ok(())
    }
}

/// Merges the data files of N tables into one sorted, deduplicated stream.
pub struct TableMerger {
    fronts: Vec<Front>,
}

impl TableMerger {
    /// Opens a merger over `files`, ordered oldest table first. The first
    /// record of each file is loaded as its front.
    pub fn new(files: Vec<File>) -> Result<Self> {
        let mut fronts = Vec::with_capacity(files.len());
        for file in files {
            let mut front = Front {
                rdr: BufReader::new(file),
                current: None,
            };
            front.advance()?;
            fronts.push(front);
        }
        Ok(Self { fronts })
    }

    /// The next record of the merged stream, or `None` when every input is
    /// exhausted.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let Some(best) = self.best_front() else {
            return Ok(None);
        };

        // current is Some by construction of best_front
        let rec = self.fronts[best].current.take().unwrap();
        self.fronts[best].advance()?;

        // skip the shadowed duplicates of this key in every other front;
        // keys are unique within one table, so one step each suffices
        for front in &mut self.fronts {
            if matches!(&front.current, Some(dup) if dup.key == rec.key) {
                front.advance()?;
            }
        }

        Ok(Some(rec))
    }

    /// Drains the merger into a sorted batch, ready for [`crate::write_table`].
    pub fn merge(&mut self) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        while let Some(rec) = self.next_record()? {
            out.push(rec);
        }
        Ok(out)
    }

    /// Index of the front holding the best record, per the ordering contract.
    fn best_front(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, front) in self.fronts.iter().enumerate() {
            let Some(rec) = &front.current else { continue };
            best = match best {
                None => Some(i),
                Some(b) => {
                    // best.current is Some for any candidate index
                    let best_rec = self.fronts[b].current.as_ref().unwrap();
                    match rec.key.cmp(&best_rec.key) {
                        Ordering::Less => Some(i),
                        Ordering::Greater => Some(b),
                        Ordering::Equal => match rec.timestamp.cmp(&best_rec.timestamp) {
                            Ordering::Greater => Some(i),
                            Ordering::Less => Some(b),
                            // i > b here, and the later input is the newer table
                            Ordering::Equal => Some(i),
                        },
                    }
                }
            };
        }
        best
    }
}
