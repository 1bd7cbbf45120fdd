use super::*;
use tempfile::tempdir;

fn new_store() -> (tempfile::TempDir, PersistStore) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.persist");
    let store = PersistStore::create(&path).unwrap();
    (dir, store)
}

#[test]
fn alloc_map_write_unmap_lookup_roundtrip() {
    let (_dir, mut store) = new_store();
    let handle = store.alloc_entry(b"hostname", 4).unwrap();
    store.map_entry(handle).copy_from_slice(b"abcd");
    store.unmap_entry(handle).unwrap();

    let (looked_up, size, version) = store.lookup_entry(b"hostname").unwrap();
    assert_eq!(looked_up, handle);
    assert_eq!(size, 4);
    assert_eq!(version, 0);
}

#[test]
fn alloc_entry_is_idempotent_for_matching_size() {
    let (_dir, mut store) = new_store();
    let first = store.alloc_entry(b"key", 8).unwrap();
    store.map_entry(first).copy_from_slice(b"original");
    store.unmap_entry(first).unwrap();

    let second = store.alloc_entry(b"key", 8).unwrap();
    assert_eq!(first, second);
    assert_eq!(store.map_entry(second), b"original");
    store.unmap_entry(second).unwrap();
}

#[test]
fn alloc_entry_with_different_size_allocates_fresh_record() {
    let (_dir, mut store) = new_store();
    let first = store.alloc_entry(b"key", 4).unwrap();
    let second = store.alloc_entry(b"key", 8).unwrap();
    assert_ne!(first, second);
}

#[test]
fn map_counts_tolerate_multiple_concurrent_maps_of_one_handle() {
    let (_dir, mut store) = new_store();
    let handle = store.alloc_entry(b"key", 4).unwrap();
    let _ = store.map_entry(handle);
    let _ = store.map_entry(handle);
    store.unmap_entry(handle).unwrap();
    store.unmap_entry(handle).unwrap();
    assert!(matches!(
        store.unmap_entry(handle),
        Err(PersistError::NotMapped)
    ));
}

#[test]
fn uncommitted_entries_are_invisible_after_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.persist");
    {
        let mut store = PersistStore::create(&path).unwrap();
        let handle = store.alloc_entry(b"key", 4).unwrap();
        store.map_entry(handle).copy_from_slice(b"abcd");
        store.unmap_entry(handle).unwrap();
        // No commit() call.
    }
    let reopened = PersistStore::open(&path).unwrap();
    assert!(reopened.lookup_entry(b"key").is_none());
}

#[test]
fn commit_then_reopen_sees_last_committed_value() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.persist");
    {
        let mut store = PersistStore::create(&path).unwrap();
        let handle = store.alloc_entry(b"key", 4).unwrap();
        store.map_entry(handle).copy_from_slice(b"old!");
        store.unmap_entry(handle).unwrap();
        store.commit().unwrap();

        let handle = store.alloc_entry(b"key", 4).unwrap();
        store.map_entry(handle).copy_from_slice(b"new!");
        store.unmap_entry(handle).unwrap();
        store.commit().unwrap();
    }

    let mut reopened = PersistStore::open(&path).unwrap();
    let (handle, size, _) = reopened.lookup_entry(b"key").unwrap();
    assert_eq!(size, 4);
    assert_eq!(reopened.map_entry(handle), b"new!");
}

#[test]
fn move_entry_preserves_data_under_new_key() {
    let (_dir, mut store) = new_store();
    let handle = store.alloc_entry(b"old-name", 5).unwrap();
    store.map_entry(handle).copy_from_slice(b"hello");
    store.unmap_entry(handle).unwrap();
    store.commit().unwrap();

    let moved = store.move_entry(b"old-name", b"new-name").unwrap();
    assert_eq!(moved, handle);
    store.commit().unwrap();

    assert!(store.lookup_entry(b"old-name").is_none());
    let (found, _, _) = store.lookup_entry(b"new-name").unwrap();
    assert_eq!(store.map_entry(found), b"hello");
}

#[test]
fn purge_entry_removes_key_after_commit() {
    let (_dir, mut store) = new_store();
    let handle = store.alloc_entry(b"temporary", 3).unwrap();
    store.map_entry(handle).copy_from_slice(b"abc");
    store.unmap_entry(handle).unwrap();
    store.commit().unwrap();

    store.purge_entry(b"temporary");
    store.commit().unwrap();

    assert!(store.lookup_entry(b"temporary").is_none());
}

#[test]
fn purge_entry_on_never_committed_key_is_a_cheap_no_op() {
    let (_dir, mut store) = new_store();
    store.alloc_entry(b"ephemeral", 2).unwrap();
    store.purge_entry(b"ephemeral");
    store.commit().unwrap();
    assert!(store.lookup_entry(b"ephemeral").is_none());
}

#[test]
fn store_grows_past_initial_capacity_across_many_commits() {
    let (_dir, mut store) = new_store();
    for i in 0..4000u32 {
        let key = format!("key-{i}");
        let handle = store.alloc_entry(key.as_bytes(), 64).unwrap();
        store.map_entry(handle).fill(i as u8);
        store.unmap_entry(handle).unwrap();
    }
    store.commit().unwrap();

    for i in 0..4000u32 {
        let key = format!("key-{i}");
        let (handle, size, _) = store.lookup_entry(key.as_bytes()).unwrap();
        assert_eq!(size, 64);
        assert!(store.map_entry(handle).iter().all(|&b| b == i as u8));
    }
}
