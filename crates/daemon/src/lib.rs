#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `daemon` supplies the one concrete pair of `Transport`/`IngressTransport`
//! reference implementations the `pipeline` crate's generic worker loops
//! need to actually run: [`tcp`] (feature `tcp`) and [`udp`] (feature
//! `udp`). [`tls`] (feature `tls`) is a documented contract stub, not a
//! working transport. [`notify`] (feature `sd-notify`) wires the process up
//! to systemd's readiness/watchdog protocol.
//!
//! # Design
//!
//! Concrete transports live here rather than in `pipeline` because each
//! one pulls in its own I/O dependency (`tokio::net`, `socket2`, an
//! eventual TLS stack); `pipeline` only needs the `Transport`/
//! `IngressTransport` trait shape, not any particular implementation of
//! it.

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(feature = "udp")]
pub mod udp;

#[cfg(feature = "tls")]
pub mod tls;

#[cfg(feature = "sd-notify")]
pub mod notify;
