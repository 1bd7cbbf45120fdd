//! The `Transport` contract a [`crate::destination::Destination`] worker
//! drives. Concrete transports (TCP, TLS, UDP, …) live in the daemon
//! crate that wires up real sockets; this crate only needs the shape.

use flowcore::FlowError;
use std::time::Duration;

/// What happened when a destination tried to hand one formatted message to
/// its transport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DeliveryOutcome {
    Success,
    Retry(Duration),
    Drop,
    Disconnect,
}

/// A destination's egress channel.
///
/// Each destination worker owns exactly one `Transport` instance, so this
/// is a plain generic bound rather than a `dyn` trait object — the
/// concrete type is fixed at the call site that builds the
/// [`crate::destination::Destination`], not chosen dynamically per
/// message.
pub trait Transport: Send {
    /// Attempts to deliver one already-formatted payload.
    async fn send(&mut self, payload: &[u8]) -> DeliveryOutcome;

    /// Tears down and re-establishes the underlying connection after a
    /// `Disconnect` outcome, using the same backoff schedule as a failed
    /// send.
    async fn reconnect(&mut self) -> Result<(), FlowError>;
}
