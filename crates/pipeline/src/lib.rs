#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `pipeline` wires the data model (`logmsg`), the wire codec
//! (`wireproto`), and the flow-control primitives (`flowctl`) into a
//! running system: a [`source::Source`] reads and frames a transport's
//! bytes under window-counter backpressure, a [`graph::Pipeline`] owns the
//! pipe DAG a [`multiplex::Multiplexer`] fans messages out across, and a
//! [`destination::Destination`] worker drains a [`queue::Queue`] with
//! exponential-backoff retry.
//!
//! # Design
//!
//! - [`pipe::Pipe`] methods are synchronous so `Box<dyn Pipe>` stays
//!   object-safe; all actual waiting (I/O readiness, timers, queue pops)
//!   happens in the `Source`/`Destination` worker loops, each its own
//!   `tokio` task.
//! - [`graph::Pipeline`] addresses pipes by [`graph::PipeId`] rather than
//!   letting them hold references to each other, so `init`/`deinit`
//!   ordering is a plain topological sort over a flat arena instead of a
//!   walk over cyclic owner/child pointers.

pub mod destination;
pub mod graph;
pub mod multiplex;
pub mod pipe;
pub mod queue;
pub mod source;
pub mod transport;

pub use destination::Destination;
pub use graph::{PipeId, Pipeline};
pub use multiplex::Multiplexer;
pub use pipe::{Pipe, PipeEvent};
pub use queue::{Queue, QueuePipe};
pub use source::{IngressTransport, Source};
pub use transport::{DeliveryOutcome, Transport};
