use crate::LruCache;

#[test]
fn insert_and_search() {
    let mut cache = LruCache::new(3);
    cache.insert(b"k", b"v".to_vec());
    assert_eq!(cache.search(b"k"), Some(&b"v"[..]));
    assert_eq!(cache.search(b"missing"), None);
    assert_eq!(cache.len(), 1);
}

#[test]
fn capacity_evicts_least_recently_used() {
    let mut cache = LruCache::new(3);
    cache.insert(b"1", b"a".to_vec());
    cache.insert(b"2", b"b".to_vec());
    cache.insert(b"3", b"c".to_vec());
    cache.insert(b"4", b"d".to_vec());

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.search(b"1"), None, "oldest entry evicted");
    assert_eq!(cache.search(b"2"), Some(&b"b"[..]));
    assert_eq!(cache.search(b"4"), Some(&b"d"[..]));
}

#[test]
fn search_promotes_to_most_recent() {
    let mut cache = LruCache::new(3);
    cache.insert(b"1", b"a".to_vec());
    cache.insert(b"2", b"b".to_vec());
    cache.insert(b"3", b"c".to_vec());

    // touch "1" so "2" becomes the eviction candidate
    cache.search(b"1");
    cache.insert(b"4", b"d".to_vec());

    assert_eq!(cache.search(b"2"), None);
    assert_eq!(cache.search(b"1"), Some(&b"a"[..]));
}

#[test]
fn reinsert_replaces_value_and_promotes() {
    let mut cache = LruCache::new(3);
    cache.insert(b"1", b"a".to_vec());
    cache.insert(b"2", b"b".to_vec());
    cache.insert(b"1", b"a2".to_vec());

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.search(b"1"), Some(&b"a2"[..]));
    assert_eq!(cache.keys_by_recency().last().unwrap(), b"1");
}

#[test]
fn remove_unlinks_the_entry() {
    let mut cache = LruCache::new(3);
    cache.insert(b"1", b"a".to_vec());
    cache.insert(b"2", b"b".to_vec());

    assert!(cache.remove(b"1"));
    assert!(!cache.remove(b"1"));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.search(b"1"), None);
    assert_eq!(cache.search(b"2"), Some(&b"b"[..]));
}

#[test]
fn removed_slot_is_recycled() {
    let mut cache = LruCache::new(2);
    cache.insert(b"1", b"a".to_vec());
    cache.insert(b"2", b"b".to_vec());
    cache.remove(b"1");
    cache.insert(b"3", b"c".to_vec());
    cache.insert(b"4", b"d".to_vec()); // evicts "2"

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.search(b"2"), None);
    assert_eq!(cache.search(b"3"), Some(&b"c"[..]));
    assert_eq!(cache.search(b"4"), Some(&b"d"[..]));
}

#[test]
fn recency_order_is_head_lru_tail_mru() {
    let mut cache = LruCache::new(3);
    cache.insert(b"1", b"a".to_vec());
    cache.insert(b"2", b"b".to_vec());
    cache.insert(b"3", b"c".to_vec());
    cache.search(b"2");

    assert_eq!(
        cache.keys_by_recency(),
        vec![b"1".to_vec(), b"3".to_vec(), b"2".to_vec()]
    );
}

#[test]
fn zero_capacity_caches_nothing() {
    let mut cache = LruCache::new(0);
    cache.insert(b"k", b"v".to_vec());
    assert!(cache.is_empty());
    assert_eq!(cache.search(b"k"), None);
}

#[test]
fn single_slot_cache() {
    let mut cache = LruCache::new(1);
    cache.insert(b"1", b"a".to_vec());
    cache.insert(b"2", b"b".to_vec());

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.search(b"1"), None);
    assert_eq!(cache.search(b"2"), Some(&b"b"[..]));
}
