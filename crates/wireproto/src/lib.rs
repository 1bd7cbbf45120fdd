#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `wireproto` turns bytes off a transport into parsed syslog messages:
//! [`framed::FramedDecoder`] implements RFC 6587 octet-counted framing as a
//! [`tokio_util::codec::Decoder`], [`syslog`] parses the framed (or
//! newline-delimited) payload as RFC 3164 or RFC 5424, and [`proxy`] parses
//! a connection's PROXY protocol preamble once and hands back the fields a
//! parser pipe should attach to every subsequent message on that
//! connection.
//!
//! # Design
//!
//! Each piece is a pure function or a small synchronous state machine with
//! no transport or pipeline dependency of its own, so the pipeline crate
//! can drive them from whatever I/O primitive (tokio `TcpStream`,
//! `UdpSocket`, …) a given source uses.
//!
//! # Invariants
//!
//! - [`framed::FramedDecoder`] emits messages in the order their frames
//!   appear in the input, regardless of how the input is chunked across
//!   `decode` calls.
//! - [`syslog::parse_rfc5424`] and [`syslog::parse_rfc3164`] never panic on
//!   malformed input; they return a typed error instead.

pub mod framed;
pub mod proxy;
pub mod syslog;

pub use framed::{Frame, FrameError, FramedDecoder};
pub use proxy::{parse_preface, ProxyError, ProxyInfo};
pub use syslog::{parse_rfc3164, parse_rfc5424, ParsedMessage, Rfc3164Error, Rfc5424Error};
