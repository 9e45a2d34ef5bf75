use super::{open_roomy, roomy_config};
use crate::{Config, Engine};
use tempfile::tempdir;

#[test]
fn compact_promotes_level_1_to_level_2() {
    let dir = tempdir().unwrap();
    let mut engine = open_roomy(&dir);

    engine.put(None, b"a", b"1");
    engine.flush().unwrap();
    engine.put(None, b"b", b"2");
    engine.flush().unwrap();
    assert_eq!(engine.table_count(1), 2);

    engine.compact().unwrap();

    assert_eq!(engine.table_count(1), 0);
    assert_eq!(engine.table_count(2), 1);
    assert_eq!(engine.get(None, b"a"), Some(b"1".to_vec()));
    assert_eq!(engine.get(None, b"b"), Some(b"2".to_vec()));
}

#[test]
fn compaction_keeps_the_newest_version() {
    let dir = tempdir().unwrap();
    let mut engine = open_roomy(&dir);

    engine.put(None, b"k", b"old");
    engine.flush().unwrap();
    engine.put(None, b"k", b"new");
    engine.flush().unwrap();

    engine.compact().unwrap();

    assert_eq!(engine.table_count(2), 1);
    assert_eq!(engine.get(None, b"k"), Some(b"new".to_vec()));
}

#[test]
fn fewer_tables_than_compaction_size_is_a_noop() {
    let dir = tempdir().unwrap();
    let mut engine = open_roomy(&dir);

    engine.put(None, b"k", b"v");
    engine.flush().unwrap();
    assert_eq!(engine.table_count(1), 1);

    engine.compact().unwrap();
    assert_eq!(engine.table_count(1), 1);
    assert_eq!(engine.table_count(2), 0);
}

#[test]
fn survivors_are_renumbered() {
    let dir = tempdir().unwrap();
    let mut engine = open_roomy(&dir);

    for (key, value) in [(b"a", b"1"), (b"b", b"2"), (b"c", b"3")] {
        engine.put(None, key, value);
        engine.flush().unwrap();
    }
    assert_eq!(engine.table_count(1), 3);

    // N=2: tables 1 and 2 merge into level 2, table 3 becomes table 1
    engine.compact().unwrap();

    assert_eq!(engine.table_count(1), 1);
    assert_eq!(engine.table_count(2), 1);
    assert_eq!(engine.get(None, b"a"), Some(b"1".to_vec()));
    assert_eq!(engine.get(None, b"b"), Some(b"2".to_vec()));
    assert_eq!(engine.get(None, b"c"), Some(b"3".to_vec()));
}

#[test]
fn compaction_cascades_up_to_the_top_level() {
    let dir = tempdir().unwrap();
    let mut engine = open_roomy(&dir);

    for i in 0..4u32 {
        engine.put(None, format!("k{}", i).as_bytes(), b"v");
        engine.flush().unwrap();
    }
    assert_eq!(engine.table_count(1), 4);

    // N=2, H=3: level 1 merges twice into level 2, which merges into level 3
    engine.compact().unwrap();

    assert_eq!(engine.table_count(1), 0);
    assert_eq!(engine.table_count(2), 0);
    assert_eq!(engine.table_count(3), 1);
    for i in 0..4u32 {
        assert_eq!(
            engine.get(None, format!("k{}", i).as_bytes()),
            Some(b"v".to_vec())
        );
    }
}

#[test]
fn top_level_is_never_compacted() {
    let dir = tempdir().unwrap();
    let config = Config {
        max_height_lsm: 2,
        ..roomy_config()
    };
    let mut engine = Engine::open(dir.path(), config).unwrap();

    for i in 0..4u32 {
        engine.put(None, format!("k{}", i).as_bytes(), b"v");
        engine.flush().unwrap();
    }
    engine.compact().unwrap();

    // level 2 is the top: it accumulates tables but never merges further
    assert_eq!(engine.table_count(1), 0);
    assert_eq!(engine.table_count(2), 2);
    for i in 0..4u32 {
        assert_eq!(
            engine.get(None, format!("k{}", i).as_bytes()),
            Some(b"v".to_vec())
        );
    }
}

#[test]
fn tombstone_survives_compaction() {
    let dir = tempdir().unwrap();
    let mut engine = open_roomy(&dir);

    engine.put(None, b"k", b"v");
    engine.put(None, b"keep", b"kept");
    engine.flush().unwrap();

    // k lives only on disk now; this tombstones it in the level-1 table
    assert!(engine.delete(None, b"k"));
    engine.put(None, b"other", b"o");
    engine.flush().unwrap();

    engine.compact().unwrap();

    assert_eq!(engine.table_count(2), 1);
    assert_eq!(engine.get(None, b"k"), None);
    assert_eq!(engine.get(None, b"keep"), Some(b"kept".to_vec()));
    assert_eq!(engine.get(None, b"other"), Some(b"o".to_vec()));
}

#[test]
fn compaction_deduplicates_across_many_tables() {
    let dir = tempdir().unwrap();
    let mut engine = open_roomy(&dir);

    for round in 0..3u32 {
        for i in 0..5u32 {
            engine.put(
                None,
                format!("key{}", i).as_bytes(),
                format!("round{}", round).as_bytes(),
            );
        }
        engine.flush().unwrap();
    }

    engine.compact().unwrap();

    for i in 0..5u32 {
        assert_eq!(
            engine.get(None, format!("key{}", i).as_bytes()),
            Some(b"round2".to_vec()),
            "key{}",
            i
        );
    }
}
