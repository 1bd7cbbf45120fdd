#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logmsg` is the data model every pipeline stage passes around:
//! [`message::LogMessage`], its [`value`] payload, its [`tags::TagSet`],
//! and the [`ack::AckRecord`] that tracks when every clone spawned from one
//! source read has finally been handled.
//!
//! # Design
//!
//! - A message's name/value fields and tags are copy-on-write: cloning a
//!   [`message::LogMessage`] (done once per destination a multiplexer fans
//!   a message out to) is an `Arc` bump, not a deep copy. The first write
//!   after a clone pays for a clone of the payload; see
//!   [`message::LogMessage::make_writable`].
//! - Every clone produced from one source read shares a single
//!   [`ack::AckRecord`]. The record only fires its completion callback once
//!   every clone has acknowledged, aggregating the worst outcome seen.
//! - Tag names are interned process-wide through [`tags::TagRegistry`] so a
//!   message's [`tags::TagSet`] only stores small integer ids, with the
//!   first 64 inline and the rest in an overflow bitmap.
//!
//! # Invariants
//!
//! - A [`message::LogMessage`] is never mutated while more than one owner
//!   holds a reference to its payload; [`message::LogMessage::make_writable`]
//!   enforces this by cloning whenever the refcount is not 1 or the message
//!   has been write-protected.
//! - An [`ack::AckRecord`]'s completion callback fires exactly once, no
//!   matter how many times [`ack::AckRecord::fork`] was called on it.

pub mod ack;
pub mod message;
pub mod receipt;
pub mod tags;
pub mod value;

pub use ack::{AckOutcome, AckRecord, PathOptions};
pub use message::{LogMessage, MessageFlags, Timestamp};
pub use receipt::ReceiptIdAllocator;
pub use tags::{global_registry, TagId, TagRegistry, TagSet};
pub use value::{Handle, Value, ValuePayload, ValueType};
