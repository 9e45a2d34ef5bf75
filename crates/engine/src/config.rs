//! # Configuration
//!
//! `key=value` text configuration, one pair per line. Every recognized key
//! has a valid range; ill-typed or out-of-range values fall back to the
//! default with a warning, as do unknown keys and a missing file; the
//! engine always starts with a usable configuration.
//!
//! | key            | type  | range        | default |
//! |----------------|-------|--------------|---------|
//! | batchSize      | int   | 1..15        | 3       |
//! | segmentSize    | int   | 2..10        | 6       |
//! | lowWaterMark   | int   | 1..10        | 3       |
//! | tokens         | int   | 1..10000     | 50      |
//! | minutes        | float | 1..10        | 1       |
//! | memMaxSize     | int   | 1..100000    | 5       |
//! | memThreshold   | float | 0.1..100     | 80      |
//! | bloomPrecision | float | 1e-6..0.9    | 0.1     |
//! | maxHeightLSM   | int   | 1..10        | 3       |
//! | compactionSize | int   | 2..10        | 2       |

use std::path::Path;
use tracing::warn;

/// Engine configuration. `tokens` and `minutes` parameterize the external
/// token-bucket admission controller; everything else is consumed here.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// WAL: records collected before a buffered batch is written.
    pub batch_size: usize,
    /// WAL: records per segment file.
    pub segment_size: usize,
    /// WAL: segment index past which the log is truncated at roll time.
    pub low_watermark: usize,

    /// Token bucket: tokens granted per refill window.
    pub tokens: u32,
    /// Token bucket: refill window in minutes.
    pub minutes: f64,

    /// LRU cache capacity in entries. Not a file key.
    pub cache_limit: usize,

    /// Memtable capacity in entries.
    pub mem_max_size: usize,
    /// Memtable fill percentage that triggers a flush.
    pub mem_threshold: f64,

    /// Bloom filter target false-positive rate.
    pub bloom_precision: f64,

    /// Number of SSTable levels (the memtable not counted).
    pub max_height_lsm: usize,
    /// Tables merged per compaction step.
    pub compaction_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 3,
            segment_size: 6,
            low_watermark: 3,
            tokens: 50,
            minutes: 1.0,
            cache_limit: 3,
            mem_max_size: 5,
            mem_threshold: 80.0,
            bloom_precision: 0.1,
            max_height_lsm: 3,
            compaction_size: 2,
        }
    }
}

impl Config {
    /// Reads the configuration file at `path`. A missing or unreadable file
    /// yields the defaults with a warning.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                warn!(
                    path = %path.as_ref().display(),
                    error = %e,
                    "config file unreadable, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Parses `key=value` lines. Empty lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Self {
        let mut cfg = Self::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                warn!(line, "config line is not key=value, ignored");
                continue;
            };

            let key = key.trim();
            let value = value.trim();
            match key {
                "batchSize" => {
                    if let Some(v) = int_in_range(key, value, 1, 15) {
                        cfg.batch_size = v as usize;
                    }
                }
                "segmentSize" => {
                    if let Some(v) = int_in_range(key, value, 2, 10) {
                        cfg.segment_size = v as usize;
                    }
                }
                "lowWaterMark" => {
                    if let Some(v) = int_in_range(key, value, 1, 10) {
                        cfg.low_watermark = v as usize;
                    }
                }
                "tokens" => {
                    if let Some(v) = int_in_range(key, value, 1, 10_000) {
                        cfg.tokens = v as u32;
                    }
                }
                "minutes" => {
                    if let Some(v) = float_in_range(key, value, 1.0, 10.0) {
                        cfg.minutes = v;
                    }
                }
                "memMaxSize" => {
                    if let Some(v) = int_in_range(key, value, 1, 100_000) {
                        cfg.mem_max_size = v as usize;
                    }
                }
                "memThreshold" => {
                    if let Some(v) = float_in_range(key, value, 0.1, 100.0) {
                        cfg.mem_threshold = v;
                    }
                }
                "bloomPrecision" => {
                    if let Some(v) = float_in_range(key, value, 1e-6, 0.9) {
                        cfg.bloom_precision = v;
                    }
                }
                "maxHeightLSM" => {
                    if let Some(v) = int_in_range(key, value, 1, 10) {
                        cfg.max_height_lsm = v as usize;
                    }
                }
                "compactionSize" => {
                    if let Some(v) = int_in_range(key, value, 2, 10) {
                        cfg.compaction_size = v as usize;
                    }
                }
                other => warn!(key = other, "unknown config key ignored"),
            }
        }

        cfg
    }
}

fn int_in_range(key: &str, raw: &str, min: i64, max: i64) -> Option<i64> {
    match raw.parse::<i64>() {
        Ok(v) if (min..=max).contains(&v) => Some(v),
        _ => {
            warn!(key, value = raw, "config value invalid, using default");
            None
        }
    }
}

fn float_in_range(key: &str, raw: &str, min: f64, max: f64) -> Option<f64> {
    match raw.parse::<f64>() {
        Ok(v) if v >= min && v <= max => Some(v),
        _ => {
            warn!(key, value = raw, "config value invalid, using default");
            None
        }
    }
}
