//! The `values` name/value payload: a copy-on-write map from field name to
//! `(bytes, type)` pairs, with a small set of well-known handles addressable
//! without a name lookup.

use rustc_hash::FxHashMap;
use std::sync::Arc;

/// The type tag stored alongside every value's raw bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ValueType {
    String,
    Integer,
    Double,
    Boolean,
    List,
    DateTime,
    Json,
    Null,
}

/// One stored field: its raw bytes plus how to interpret them.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    bytes: Arc<[u8]>,
    value_type: ValueType,
}

impl Value {
    #[must_use]
    pub fn new(bytes: impl Into<Arc<[u8]>>, value_type: ValueType) -> Self {
        Self {
            bytes: bytes.into(),
            value_type,
        }
    }

    #[must_use]
    pub fn string(s: impl AsRef<str>) -> Self {
        Self::new(s.as_ref().as_bytes().to_vec(), ValueType::String)
    }

    #[must_use]
    pub fn integer(v: i64) -> Self {
        Self::new(v.to_string().into_bytes(), ValueType::Integer)
    }

    #[must_use]
    pub fn boolean(v: bool) -> Self {
        Self::new(
            if v { b"true".to_vec() } else { b"false".to_vec() },
            ValueType::Boolean,
        )
    }

    #[must_use]
    pub fn null() -> Self {
        Self::new(Vec::new(), ValueType::Null)
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// Integer handles for fields addressed often enough to skip the name
/// lookup. Internally these still resolve to a reserved name, keeping a
/// single storage representation while giving callers O(1) "by handle"
/// access to the fields that matter most.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Handle {
    Host,
    HostFrom,
    Program,
    Pid,
    Message,
    MessageId,
    Source,
    Facility,
    Severity,
    LegacyMessage,
}

impl Handle {
    #[must_use]
    pub const fn reserved_name(self) -> &'static str {
        match self {
            Self::Host => ".host",
            Self::HostFrom => ".host_from",
            Self::Program => ".program",
            Self::Pid => ".pid",
            Self::Message => ".message",
            Self::MessageId => ".msgid",
            Self::Source => ".source",
            Self::Facility => ".facility",
            Self::Severity => ".severity",
            Self::LegacyMessage => ".legacy_msghdr",
        }
    }
}

/// A single layer of the name/value map: either the shared base or a
/// clone's private tail.
#[derive(Clone, Debug, Default)]
struct ValueLayer {
    by_name: FxHashMap<Box<str>, Value>,
}

impl ValueLayer {
    fn get(&self, name: &str) -> Option<&Value> {
        self.by_name.get(name)
    }

    fn set(&mut self, name: &str, value: Value) {
        self.by_name.insert(name.into(), value);
    }

    fn clear(&mut self, name: &str) -> bool {
        self.by_name.remove(name).is_some()
    }
}

/// Copy-on-write name/value payload.
///
/// `base` is an `Arc` shared by every clone produced before the next write;
/// `tail` holds the fields a particular clone has added or overwritten since
/// it branched off. A lookup checks `tail` first and falls back to `base`,
/// so a clone never needs to duplicate the whole map just to add one field.
#[derive(Clone, Debug, Default)]
pub struct ValuePayload {
    base: Arc<ValueLayer>,
    tail: ValueLayer,
    tombstones: std::collections::HashSet<Box<str>>,
}

impl ValuePayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        if self.tombstones.contains(name) {
            return None;
        }
        self.tail.get(name).or_else(|| self.base.get(name))
    }

    #[must_use]
    pub fn get_handle(&self, handle: Handle) -> Option<&Value> {
        self.get(handle.reserved_name())
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.tombstones.remove(name);
        self.tail.set(name, value);
    }

    pub fn set_handle(&mut self, handle: Handle, value: Value) {
        self.set(handle.reserved_name(), value);
    }

    /// Removes `name` so subsequent lookups miss even if the shared base
    /// still carries it.
    pub fn remove(&mut self, name: &str) {
        if !self.tail.clear(name) && self.base.get(name).is_some() {
            self.tombstones.insert(name.into());
        }
    }

    /// Produces a clone sharing this payload's current state as the new
    /// clone's base, with an empty tail. Call sites use this from
    /// `LogMessage::make_writable` rather than `Clone::clone` directly when
    /// they want the base/tail split reset (a plain `Clone` keeps sharing
    /// the same base/tail pair, which is correct too but does not shrink
    /// the tail back down after many writes accumulate on one branch).
    #[must_use]
    pub fn rebased_clone(&self) -> Self {
        if self.tail.by_name.is_empty() && self.tombstones.is_empty() {
            return Self {
                base: Arc::clone(&self.base),
                tail: ValueLayer::default(),
                tombstones: std::collections::HashSet::new(),
            };
        }
        let mut merged = (*self.base).clone();
        for (k, v) in &self.tail.by_name {
            merged.by_name.insert(k.clone(), v.clone());
        }
        for k in &self.tombstones {
            merged.by_name.remove(k);
        }
        Self {
            base: Arc::new(merged),
            tail: ValueLayer::default(),
            tombstones: std::collections::HashSet::new(),
        }
    }

    /// Iterates all currently-visible `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.base
            .by_name
            .iter()
            .filter(move |(k, _)| {
                !self.tombstones.contains(k.as_ref()) && !self.tail.by_name.contains_key(k.as_ref())
            })
            .chain(self.tail.by_name.iter())
            .map(|(k, v)| (k.as_ref(), v))
    }
}

#[cfg(test)]
mod tests;
