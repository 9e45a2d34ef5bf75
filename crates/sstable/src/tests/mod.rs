use record::Record;


/// A live record with an explicit timestamp.
pub(crate) fn rec(ts: u64, key: &[u8], value: &[u8]) -> Record {
    Record {
        timestamp: ts,
        key: key.to_vec(),
        value: Some(value.to_vec()),
    }
}

/// A tombstone with an explicit timestamp.
pub(crate) fn dead(ts: u64, key: &[u8]) -> Record {
    Record {
        timestamp: ts,
        key: key.to_vec(),
        value: None,
    }
}
