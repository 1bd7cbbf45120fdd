//! The committed directory: a sorted array of `{hash(key), record_offset}`
//! pairs. Lookup binary-searches on hash, then falls back to a key compare
//! against the actual record (since hashes can collide) via a caller
//! supplied key reader.

pub const ENTRY_LEN: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub hash: u32,
    pub record_offset: u64,
}

impl DirEntry {
    pub fn write_to(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.hash.to_le_bytes());
        buf[4..12].copy_from_slice(&self.record_offset.to_le_bytes());
    }

    pub fn read_from(buf: &[u8]) -> Self {
        Self {
            hash: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            record_offset: u64::from_le_bytes(buf[4..12].try_into().unwrap()),
        }
    }
}

#[must_use]
pub fn hash_key(key: &[u8]) -> u32 {
    crc32fast::hash(key)
}

/// Returns the index range within `entries` whose hash equals `hash`
/// (entries are kept sorted by hash so equal-hash runs are contiguous).
#[must_use]
pub fn equal_hash_range(entries: &[DirEntry], hash: u32) -> std::ops::Range<usize> {
    let start = entries.partition_point(|e| e.hash < hash);
    let end = entries[start..].partition_point(|e| e.hash == hash) + start;
    start..end
}

/// Inserts or replaces the entry for `hash`, keeping `entries` sorted.
/// Does not deduplicate among equal-hash collisions for different keys —
/// callers must resolve the correct slot via [`equal_hash_range`] plus a
/// key compare before calling this for an update.
pub fn insert_sorted(entries: &mut Vec<DirEntry>, entry: DirEntry) {
    let at = entries.partition_point(|e| e.hash <= entry.hash);
    entries.insert(at, entry);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_hash_range_finds_contiguous_run() {
        let entries = vec![
            DirEntry { hash: 1, record_offset: 0 },
            DirEntry { hash: 2, record_offset: 8 },
            DirEntry { hash: 2, record_offset: 16 },
            DirEntry { hash: 3, record_offset: 24 },
        ];
        assert_eq!(equal_hash_range(&entries, 2), 1..3);
        assert_eq!(equal_hash_range(&entries, 4), 4..4);
    }
}
