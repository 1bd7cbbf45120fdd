#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `flowctl` centralizes the two pieces of flow control the core message
//! pipeline needs: a source's backpressure window ([`window::WindowCounter`])
//! and a destination's retry pacing ([`backoff::ExponentialBackoff`]). Both
//! are small, dependency-free state machines so they can be embedded in the
//! hot path without pulling in the pipeline's scheduling machinery.
//!
//! # Design
//!
//! - [`window::WindowCounter`] packs a count and a suspended flag into one
//!   atomic word, giving every operation lock-free semantics at the cost of
//!   a single RMW per ack.
//! - [`backoff::ExponentialBackoff`] is a pure state machine over
//!   `f64` seconds; callers are responsible for actually sleeping the
//!   returned [`std::time::Duration`] cooperatively.
//!
//! # Invariants
//!
//! - A window counter's usable range is [`window::counter_max`]; values
//!   outside that range are masked, matching the legacy single-word packing.
//! - A backoff driver's wait never exceeds `maximum_seconds` and never
//!   drops below `initial_seconds` once it has left zero.

pub mod backoff;
pub mod window;
