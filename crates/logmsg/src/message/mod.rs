//! The `LogMessage` type: an immutable-until-proven-unique, copy-on-write
//! envelope around a parsed log record.

mod timestamp;

pub use timestamp::Timestamp;

use crate::ack::{AckOutcome, AckRecord, PathOptions};
use crate::tags::TagSet;
use crate::value::{Handle, Value, ValuePayload};
use std::sync::Arc;

bitflags::bitflags! {
    /// Per-message flags. Matches the legacy `LF_*` bit meanings this type
    /// replaces, minus the ones made redundant by this crate's stronger
    /// typing (badly-formed PRI no longer needs a flag; it is simply absent
    /// `pri`).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MessageFlags: u16 {
        /// Originated on this host rather than received over the network.
        const LOCAL_ORIGIN = 1 << 0;
        /// The message body was validated as UTF-8 at parse time.
        const UTF8_VALID = 1 << 1;
        /// Synthesized internally (e.g. an internal diagnostic message),
        /// not read from any source.
        const INTERNAL_GENERATED = 1 << 2;
        /// A `-- MARK --` heartbeat message.
        const MARK = 1 << 3;
        /// The framed reader trimmed this message because it exceeded the
        /// configured maximum length.
        const TRUNCATED = 1 << 4;
        /// Parsed by a structured RFC 5424 / PROXY parser rather than the
        /// RFC 3164 legacy fallback.
        const SYSLOG_PROTOCOL_PARSED = 1 << 5;
        /// The host field came from a transport-layer address rather than
        /// an explicit header, and so is just an address, no FQDN.
        const SIMPLE_HOSTNAME = 1 << 6;
    }
}

/// The owned, shareable contents of a [`LogMessage`].
///
/// `ack` is intentionally excluded from `Clone` semantics here: cloning the
/// record via [`LogMessage::fork`] registers a new path on the *same*
/// ack record rather than duplicating it, since all clones of one message
/// must be acknowledged before the source considers that message done.
#[derive(Clone)]
struct MessageData {
    timestamp_recv: Timestamp,
    timestamp_stamp: Timestamp,
    pri: u8,
    flags: MessageFlags,
    values: ValuePayload,
    tags: TagSet,
    write_protected: bool,
}

impl MessageData {
    fn new() -> Self {
        Self {
            timestamp_recv: Timestamp::default(),
            timestamp_stamp: Timestamp::default(),
            pri: 0,
            flags: MessageFlags::empty(),
            values: ValuePayload::new(),
            tags: TagSet::new(),
            write_protected: false,
        }
    }
}

/// A parsed log record flowing through the pipeline.
///
/// `LogMessage` wraps its contents in an `Arc` and only duplicates them on
/// write, and only if there is more than one reference outstanding — see
/// [`LogMessage::make_writable`]. Every clone shares one [`AckRecord`], so
/// the source that originally read the message learns it is fully handled
/// only after every clone (one per destination it was routed to) has been
/// acknowledged.
pub struct LogMessage {
    data: Arc<MessageData>,
    ack: AckRecord,
    receipt_id: u64,
}

impl LogMessage {
    /// Builds a fresh, internally generated message (e.g. a MARK message or
    /// a synthesized diagnostic), owning its own ack record.
    pub fn new_internal(receipt_id: u64, on_complete: impl FnOnce(AckOutcome) + Send + 'static) -> Self {
        let mut data = MessageData::new();
        data.flags.insert(MessageFlags::INTERNAL_GENERATED);
        Self {
            data: Arc::new(data),
            ack: AckRecord::new(on_complete),
            receipt_id,
        }
    }

    /// Builds a message read from a transport, given its receipt id and the
    /// ack record tracking its eventual disposition.
    #[must_use]
    pub fn new_from_source(receipt_id: u64, ack: AckRecord) -> Self {
        Self {
            data: Arc::new(MessageData::new()),
            ack,
            receipt_id,
        }
    }

    #[must_use]
    pub const fn receipt_id(&self) -> u64 {
        self.receipt_id
    }

    #[must_use]
    pub const fn pri(&self) -> u8 {
        self.data.pri
    }

    #[must_use]
    pub const fn flags(&self) -> MessageFlags {
        self.data.flags
    }

    #[must_use]
    pub const fn timestamp_recv(&self) -> Timestamp {
        self.data.timestamp_recv
    }

    #[must_use]
    pub const fn timestamp_stamp(&self) -> Timestamp {
        self.data.timestamp_stamp
    }

    #[must_use]
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.data.values.get(name)
    }

    #[must_use]
    pub fn get_handle(&self, handle: Handle) -> Option<&Value> {
        self.data.values.get_handle(handle)
    }

    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.data.tags
    }

    /// Marks the message read-only. Once write-protected, any further
    /// mutation forces a clone of the payload regardless of the refcount,
    /// matching the "write-protect after fan-out" discipline a
    /// multiplexer applies before handing a shared message to more than
    /// one destination queue.
    pub fn write_protect(&mut self) {
        if let Some(data) = Arc::get_mut(&mut self.data) {
            data.write_protected = true;
        } else {
            let mut cloned = (*self.data).clone();
            cloned.write_protected = true;
            self.data = Arc::new(cloned);
        }
    }

    /// Returns a mutable view of the message contents, cloning the
    /// underlying payload if and only if it is shared or write-protected.
    ///
    /// This is the copy-on-write core: a message with exactly one owner and
    /// no write-protect flag is mutated in place with no allocation at all;
    /// any other case clones the base/tail value payload cheaply (the base
    /// arena is reference-counted, not duplicated) and resets the
    /// write-protect flag on the new copy so the mutation can proceed.
    pub fn make_writable(&mut self) -> &mut MessageDataHandle<'_> {
        let needs_clone = self.data.write_protected || Arc::strong_count(&self.data) > 1;
        if needs_clone {
            let mut cloned = (*self.data).clone();
            cloned.values = self.data.values.rebased_clone();
            cloned.write_protected = false;
            self.data = Arc::new(cloned);
        }
        // Safety net for a prior shared Arc now uniquely owned again after
        // cloning above, or already unique on entry.
        MessageDataHandle::new(Arc::get_mut(&mut self.data).expect("just made unique"))
    }

    /// Produces a new handle to the same logical message, sharing the
    /// payload (copy-on-write) and registering a new path on the shared
    /// ack record. Used by a multiplexer fanning one message out to
    /// several destinations.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            ack: self.ack.fork(),
            receipt_id: self.receipt_id,
        }
    }

    /// Acknowledges this path's handling of the message with the given
    /// outcome. Consumes the handle since a path acks exactly once.
    pub fn ack(self, outcome: AckOutcome) {
        self.ack.ack(outcome);
    }

    #[must_use]
    pub fn pending_ack_count(&self) -> usize {
        self.ack.pending_count()
    }
}

/// Borrowed mutable view into a uniquely-owned [`MessageData`], returned by
/// [`LogMessage::make_writable`]. A thin wrapper rather than exposing
/// `&mut MessageData` directly so the private fields (`write_protected` in
/// particular) cannot be poked around the COW discipline above.
pub struct MessageDataHandle<'a> {
    data: &'a mut MessageData,
}

impl<'a> MessageDataHandle<'a> {
    fn new(data: &'a mut MessageData) -> Self {
        Self { data }
    }

    pub fn set_pri(&mut self, pri: u8) -> &mut Self {
        self.data.pri = pri;
        self
    }

    pub fn set_flags(&mut self, flags: MessageFlags) -> &mut Self {
        self.data.flags = flags;
        self
    }

    pub fn insert_flags(&mut self, flags: MessageFlags) -> &mut Self {
        self.data.flags.insert(flags);
        self
    }

    pub fn set_timestamp_recv(&mut self, timestamp: Timestamp) -> &mut Self {
        self.data.timestamp_recv = timestamp;
        self
    }

    pub fn set_timestamp_stamp(&mut self, timestamp: Timestamp) -> &mut Self {
        self.data.timestamp_stamp = timestamp;
        self
    }

    pub fn set_value(&mut self, name: &str, value: Value) -> &mut Self {
        self.data.values.set(name, value);
        self
    }

    pub fn set_handle(&mut self, handle: Handle, value: Value) -> &mut Self {
        self.data.values.set_handle(handle, value);
        self
    }

    pub fn remove_value(&mut self, name: &str) -> &mut Self {
        self.data.values.remove(name);
        self
    }

    pub fn tags_mut(&mut self) -> &mut TagSet {
        &mut self.data.tags
    }
}
