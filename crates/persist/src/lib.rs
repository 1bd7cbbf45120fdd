//! Crash-consistent mmap-backed key/value store.
//!
//! A store is a single file holding two header slots ([`header`]), a
//! growing data region of length-prefixed records ([`record`]), and a
//! directory mapping keys to record offsets ([`directory`]). Callers
//! allocate an entry, map it to get a mutable byte slice, write into it
//! directly, unmap, and `commit()` to publish the change. A reader that
//! opened the store before a commit keeps seeing the directory as it was
//! at open time until it reopens.
//!
//! This crate is intentionally single-writer, single-threaded per
//! `PersistStore` instance — callers that need concurrent access put a
//! mutex around it, the way the rest of this workspace wraps shared
//! mutable state at the edges rather than inside the data structure.

mod directory;
mod header;
mod record;

use header::{Header, HEADER_REGION_LEN};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use directory::DirEntry;
use memmap2::MmapMut;

/// Opaque reference to a record. Stable across renames; invalidated by
/// `purge_entry` once committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    fn offset(self) -> u64 {
        self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("i/o error accessing persist file: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Header(#[from] header::HeaderError),
    #[error("key not found")]
    NotFound,
    #[error("entry was not mapped")]
    NotMapped,
    #[error("key is too long to address ({0} bytes, max 65535)")]
    KeyTooLong(usize),
}

enum PendingOp {
    Insert { offset: u64 },
    Purge,
}

/// Info about a pending insert kept alongside the pending map so commit
/// doesn't need to re-derive it from the record bytes.
struct PendingInsert {
    key: Box<[u8]>,
    op: PendingOp,
}

pub struct PersistStore {
    file: File,
    mmap: MmapMut,
    header: Header,
    active_slot: usize,
    directory: Vec<DirEntry>,
    data_end: u64,
    pending: HashMap<Box<[u8]>, PendingInsert>,
    map_counts: HashMap<u64, u32>,
}

const INITIAL_CAPACITY: u64 = HEADER_REGION_LEN as u64 + 64 * 1024;
const GROWTH_FACTOR: u64 = 2;

impl PersistStore {
    /// Creates a fresh, empty store at `path`, truncating any existing
    /// file. Most callers want [`PersistStore::open_or_create`].
    pub fn create(path: &Path) -> Result<Self, PersistError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(INITIAL_CAPACITY)?;
        let mut mmap = unsafe { MmapMut::map_mut(&file)? };

        let directory_offset = HEADER_REGION_LEN as u64;
        let header = Header {
            format_version: header::FORMAT_VERSION,
            generation: 1,
            file_size: INITIAL_CAPACITY,
            directory_offset,
            directory_len: 0,
        };
        header.write_to(&mut mmap[0..header::HEADER_LEN]);
        mmap.flush()?;

        Ok(Self {
            file,
            mmap,
            header,
            active_slot: 0,
            directory: Vec::new(),
            data_end: directory_offset,
            pending: HashMap::new(),
            map_counts: HashMap::new(),
        })
    }

    /// Opens an existing store, recovering to the most recent valid
    /// header slot if the other was left mid-write by a crash.
    pub fn open(path: &Path) -> Result<Self, PersistError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        let (header, active_slot) = Header::read_active(&mmap[0..HEADER_REGION_LEN])?;

        let dir_start = header.directory_offset as usize;
        let dir_len = header.directory_len as usize;
        let mut directory = Vec::with_capacity(dir_len);
        for i in 0..dir_len {
            let at = dir_start + i * directory::ENTRY_LEN;
            directory.push(DirEntry::read_from(&mmap[at..at + directory::ENTRY_LEN]));
        }
        let data_end = header.directory_offset + (dir_len * directory::ENTRY_LEN) as u64;

        Ok(Self {
            file,
            mmap,
            header,
            active_slot,
            directory,
            data_end,
            pending: HashMap::new(),
            map_counts: HashMap::new(),
        })
    }

    /// Opens `path` if it exists and parses as a valid store, otherwise
    /// creates a fresh one.
    pub fn open_or_create(path: &Path) -> Result<Self, PersistError> {
        if path.exists() {
            match Self::open(path) {
                Ok(store) => return Ok(store),
                Err(err) => {
                    tracing::warn!(error = %err, "existing persist file unreadable, recreating");
                }
            }
        }
        Self::create(path)
    }

    fn ensure_capacity(&mut self, additional: u64) -> Result<(), PersistError> {
        let required = self.data_end + additional;
        if required <= self.mmap.len() as u64 {
            return Ok(());
        }
        let mut new_len = self.mmap.len() as u64 * GROWTH_FACTOR;
        while new_len < required {
            new_len *= GROWTH_FACTOR;
        }
        self.mmap.flush()?;
        self.file.set_len(new_len)?;
        self.mmap = unsafe { MmapMut::map_mut(&self.file)? };
        Ok(())
    }

    fn read_record(&self, offset: u64) -> record::RecordView<'_> {
        record::decode(&self.mmap[offset as usize..])
    }

    /// Resolves `key` to its current record offset, checking uncommitted
    /// writes from this session before the committed directory.
    fn resolve_offset(&self, key: &[u8]) -> Option<u64> {
        if let Some(pending) = self.pending.get(key) {
            return match pending.op {
                PendingOp::Insert { offset } => Some(offset),
                PendingOp::Purge => None,
            };
        }
        let hash = directory::hash_key(key);
        let range = directory::equal_hash_range(&self.directory, hash);
        self.directory[range]
            .iter()
            .find(|entry| self.read_record(entry.record_offset).key == key)
            .map(|entry| entry.record_offset)
    }

    /// Looks up `key`, returning its handle, stored value length, and
    /// version tag.
    pub fn lookup_entry(&self, key: &[u8]) -> Option<(Handle, usize, u8)> {
        let offset = self.resolve_offset(key)?;
        let view = self.read_record(offset);
        Some((Handle(offset), view.value.len(), view.version))
    }

    /// Allocates (or reuses) the entry for `key` sized to hold `value_len`
    /// bytes. Calling this again for the same key and size is a no-op that
    /// returns the existing handle and its existing contents; a different
    /// size allocates a fresh record, and the old one is dropped from the
    /// directory at the next `commit()`.
    pub fn alloc_entry(&mut self, key: &[u8], value_len: usize) -> Result<Handle, PersistError> {
        if key.len() > u16::MAX as usize {
            return Err(PersistError::KeyTooLong(key.len()));
        }
        if let Some(offset) = self.resolve_offset(key) {
            if self.read_record(offset).value.len() == value_len {
                return Ok(Handle(offset));
            }
        }

        let record = record::encode(key, &vec![0u8; value_len], 0);
        self.ensure_capacity(record.len() as u64)?;
        let offset = self.data_end;
        self.mmap[offset as usize..offset as usize + record.len()].copy_from_slice(&record);
        self.data_end += record.len() as u64;

        self.pending.insert(
            key.into(),
            PendingInsert {
                key: key.into(),
                op: PendingOp::Insert { offset },
            },
        );
        Ok(Handle(offset))
    }

    /// Returns a mutable view of the value bytes backing `handle`.
    /// Multiple concurrent maps of the same handle are allowed; each must
    /// be balanced by a call to [`PersistStore::unmap_entry`].
    pub fn map_entry(&mut self, handle: Handle) -> &mut [u8] {
        let view = record::decode(&self.mmap[handle.offset() as usize..]);
        let value_start = handle.offset() as usize + record::FIXED_PREFIX_LEN + view.key.len();
        let value_len = view.value.len();
        *self.map_counts.entry(handle.0).or_insert(0) += 1;
        &mut self.mmap[value_start..value_start + value_len]
    }

    /// Balances a prior [`PersistStore::map_entry`] call.
    pub fn unmap_entry(&mut self, handle: Handle) -> Result<(), PersistError> {
        match self.map_counts.get_mut(&handle.0) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(PersistError::NotMapped),
        }
    }

    /// Renames `old_key` to `new_key`, preserving the underlying record
    /// (and its handle) without copying data. Takes effect at the next
    /// `commit()`.
    pub fn move_entry(&mut self, old_key: &[u8], new_key: &[u8]) -> Result<Handle, PersistError> {
        let offset = self.resolve_offset(old_key).ok_or(PersistError::NotFound)?;
        self.pending.insert(
            old_key.into(),
            PendingInsert {
                key: old_key.into(),
                op: PendingOp::Purge,
            },
        );
        self.pending.insert(
            new_key.into(),
            PendingInsert {
                key: new_key.into(),
                op: PendingOp::Insert { offset },
            },
        );
        Ok(Handle(offset))
    }

    /// Marks `key` for removal at the next `commit()`.
    pub fn purge_entry(&mut self, key: &[u8]) {
        if matches!(
            self.pending.get(key).map(|p| &p.op),
            Some(PendingOp::Insert { .. })
        ) && self.resolve_committed_only(key).is_none()
        {
            // Never made it to the committed directory; dropping the
            // pending insert is enough, nothing to purge on disk.
            self.pending.remove(key);
            return;
        }
        self.pending.insert(
            key.into(),
            PendingInsert {
                key: key.into(),
                op: PendingOp::Purge,
            },
        );
    }

    fn resolve_committed_only(&self, key: &[u8]) -> Option<u64> {
        let hash = directory::hash_key(key);
        let range = directory::equal_hash_range(&self.directory, hash);
        self.directory[range]
            .iter()
            .find(|entry| self.read_record(entry.record_offset).key == key)
            .map(|entry| entry.record_offset)
    }

    /// Publishes all pending allocations, renames, and purges by writing
    /// a new directory and flipping the active header slot. A crash
    /// during this call leaves the previously active slot, and the
    /// directory it points to, untouched.
    pub fn commit(&mut self) -> Result<(), PersistError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut merged: Vec<DirEntry> = Vec::with_capacity(self.directory.len());
        for entry in &self.directory {
            let key = self.read_record(entry.record_offset).key.to_vec();
            match self.pending.get(key.as_slice()) {
                Some(_) => {} // superseded by a pending insert or purge below
                None => merged.push(*entry),
            }
        }
        for pending in self.pending.values() {
            if let PendingOp::Insert { offset } = pending.op {
                directory::insert_sorted(
                    &mut merged,
                    DirEntry {
                        hash: directory::hash_key(&pending.key),
                        record_offset: offset,
                    },
                );
            }
        }

        let dir_bytes_len = merged.len() * directory::ENTRY_LEN;
        self.ensure_capacity(dir_bytes_len as u64)?;
        let dir_offset = self.data_end;
        for (i, entry) in merged.iter().enumerate() {
            let at = dir_offset as usize + i * directory::ENTRY_LEN;
            entry.write_to(&mut self.mmap[at..at + directory::ENTRY_LEN]);
        }
        let new_data_end = dir_offset + dir_bytes_len as u64;
        self.mmap.flush()?;

        let new_header = Header {
            format_version: header::FORMAT_VERSION,
            generation: self.header.generation + 1,
            file_size: self.mmap.len() as u64,
            directory_offset: dir_offset,
            directory_len: merged.len() as u64,
        };
        let inactive_slot = 1 - self.active_slot;
        let slot_start = inactive_slot * header::HEADER_LEN;
        new_header.write_to(&mut self.mmap[slot_start..slot_start + header::HEADER_LEN]);
        self.mmap.flush()?;

        self.header = new_header;
        self.active_slot = inactive_slot;
        self.directory = merged;
        self.data_end = new_data_end;
        self.pending.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests;
