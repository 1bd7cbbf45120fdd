//! Process-wide tag name interning plus the per-message tag bitmap.
//!
//! Tags are booleans keyed by name ("this message matched the `webserver`
//! filter"). Names are interned once into a global, append-only registry so
//! that every [`TagSet`] only has to store small integer ids.

use std::sync::{OnceLock, RwLock};

/// An interned tag id. Stable for the lifetime of the process.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TagId(u32);

impl TagId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Default)]
struct Table {
    names: Vec<Box<str>>,
    by_name: std::collections::HashMap<Box<str>, TagId>,
}

/// Append-only name <-> id interning table, shared process-wide.
///
/// Registration never removes or renumbers an existing entry, so a
/// [`TagId`] obtained once stays valid (and keeps meaning the same name)
/// for the life of the process — mirroring the legacy global tag table this
/// replaces.
pub struct TagRegistry {
    table: RwLock<Table>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TagRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::default()),
        }
    }

    /// Interns `name`, returning its id. Repeated calls with the same name
    /// return the same id.
    pub fn intern(&self, name: &str) -> TagId {
        if let Some(id) = self.table.read().unwrap().by_name.get(name) {
            return *id;
        }
        let mut table = self.table.write().unwrap();
        if let Some(id) = table.by_name.get(name) {
            return *id;
        }
        let id = TagId(table.names.len() as u32);
        table.names.push(name.into());
        table.by_name.insert(name.into(), id);
        id
    }

    /// Looks up an already-interned name without registering it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<TagId> {
        self.table.read().unwrap().by_name.get(name).copied()
    }

    /// Resolves an id back to its name.
    #[must_use]
    pub fn name_of(&self, id: TagId) -> Option<Box<str>> {
        self.table.read().unwrap().names.get(id.index()).cloned()
    }
}

static GLOBAL: OnceLock<TagRegistry> = OnceLock::new();

/// The process-wide tag registry every [`TagSet`] is interned against.
/// Initialized lazily on first use; every caller across every worker
/// shares the same instance, a process-wide registry guarded by its own
/// read-mostly lock.
#[must_use]
pub fn global_registry() -> &'static TagRegistry {
    GLOBAL.get_or_init(TagRegistry::new)
}

const INLINE_BITS: u32 = u64::BITS;

/// A sparse set of [`TagId`]s carried by a single message.
///
/// The first 64 tag ids ever interned (almost always the long-lived,
/// frequently-applied ones — source tags, severity tags) live in a single
/// inline `u64` bitmap with no allocation. Ids beyond that spill into an
/// overflow bitmap, one `u64` word per 64 additional ids.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagSet {
    inline: u64,
    overflow: Vec<u64>,
}

impl TagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: TagId) {
        let index = id.index() as u32;
        if index < INLINE_BITS {
            self.inline |= 1 << index;
            return;
        }
        let word = ((index - INLINE_BITS) / INLINE_BITS) as usize;
        let bit = (index - INLINE_BITS) % INLINE_BITS;
        if self.overflow.len() <= word {
            self.overflow.resize(word + 1, 0);
        }
        self.overflow[word] |= 1 << bit;
    }

    pub fn clear(&mut self, id: TagId) {
        let index = id.index() as u32;
        if index < INLINE_BITS {
            self.inline &= !(1 << index);
            return;
        }
        let word = ((index - INLINE_BITS) / INLINE_BITS) as usize;
        let bit = (index - INLINE_BITS) % INLINE_BITS;
        if let Some(slot) = self.overflow.get_mut(word) {
            *slot &= !(1 << bit);
        }
    }

    #[must_use]
    pub fn is_set(&self, id: TagId) -> bool {
        let index = id.index() as u32;
        if index < INLINE_BITS {
            return self.inline & (1 << index) != 0;
        }
        let word = ((index - INLINE_BITS) / INLINE_BITS) as usize;
        let bit = (index - INLINE_BITS) % INLINE_BITS;
        self.overflow
            .get(word)
            .is_some_and(|slot| slot & (1 << bit) != 0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inline == 0 && self.overflow.iter().all(|w| *w == 0)
    }

    /// Iterates the ids currently set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = TagId> + '_ {
        let inline = (0..INLINE_BITS).filter(move |bit| self.inline & (1 << bit) != 0);
        let overflow = self.overflow.iter().enumerate().flat_map(move |(word, bits)| {
            (0..INLINE_BITS)
                .filter(move |bit| bits & (1 << bit) != 0)
                .map(move |bit| INLINE_BITS + (word as u32) * INLINE_BITS + bit)
        });
        inline.chain(overflow).map(|index| TagId(index))
    }
}

#[cfg(test)]
mod tests;
