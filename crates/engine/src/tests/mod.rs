use crate::{Config, Engine};
use tempfile::TempDir;

mod cache_tests;
mod compaction_tests;
mod recovery_tests;

/// A config whose memtable is roomy enough that nothing flushes unless a
/// test asks for it.
pub(crate) fn roomy_config() -> Config {
    Config {
        mem_max_size: 100,
        ..Config::default()
    }
}

pub(crate) fn open_roomy(root: &TempDir) -> Engine {
    Engine::open(root.path(), roomy_config()).unwrap()
}
