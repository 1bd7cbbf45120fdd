//! TLS transport contract stub.
//!
//! A full TLS stack (certificate loading, peer-cert verification modes)
//! is outside this crate's scope. [`TlsIngress`] and [`TlsEgress`] exist
//! so the `tls` feature has a concrete type satisfying
//! [`pipeline::source::IngressTransport`]/[`pipeline::transport::Transport`]
//! at the shape level; every method returns
//! [`FlowError::Transport`] rather than being implemented.

use bytes::BytesMut;
use flowcore::FlowError;
use pipeline::source::IngressTransport;
use pipeline::transport::{DeliveryOutcome, Transport};

fn not_implemented() -> FlowError {
    FlowError::Transport {
        detail: "TLS transport is not implemented; this is a contract stub".into(),
        source: None,
    }
}

#[derive(Debug, Default)]
pub struct TlsIngress;

impl IngressTransport for TlsIngress {
    async fn read(&mut self, _buf: &mut BytesMut) -> Result<usize, FlowError> {
        Err(not_implemented())
    }
}

#[derive(Debug, Default)]
pub struct TlsEgress;

impl Transport for TlsEgress {
    async fn send(&mut self, _payload: &[u8]) -> DeliveryOutcome {
        DeliveryOutcome::Disconnect
    }

    async fn reconnect(&mut self) -> Result<(), FlowError> {
        Err(not_implemented())
    }
}
