//! UDP source and destination transports.
//!
//! Syslog over UDP (RFC 5426) carries exactly one message per datagram,
//! with no length prefix — unlike the RFC 6587 octet-counted stream
//! [`pipeline::source::Source`] otherwise expects. Rather than give
//! `Source` a second decoding mode, [`UdpIngress::read`] synthesizes the
//! `"<len> "` prefix itself so every datagram still looks like one
//! complete RFC 6587 frame to the shared [`wireproto::framed::FramedDecoder`].

use bytes::BytesMut;
use flowcore::FlowError;
use pipeline::source::IngressTransport;
use pipeline::transport::{DeliveryOutcome, Transport};
use std::io::Write as _;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

const MAX_DATAGRAM_LEN: usize = 64 * 1024;

/// Reads syslog datagrams off a bound [`UdpSocket`], framing each one as
/// a single RFC 6587 octet-counted message.
pub struct UdpIngress {
    socket: UdpSocket,
}

impl UdpIngress {
    #[must_use]
    pub fn new(socket: UdpSocket) -> Self {
        Self { socket }
    }
}

impl IngressTransport for UdpIngress {
    async fn read(&mut self, buf: &mut BytesMut) -> Result<usize, FlowError> {
        let mut scratch = [0u8; MAX_DATAGRAM_LEN];
        let (read, _peer) = self.socket.recv_from(&mut scratch).await.map_err(|source| FlowError::Transport {
            detail: source.to_string(),
            source: Some(source),
        })?;
        if read == 0 {
            return Ok(0);
        }
        let mut framed = Vec::with_capacity(read + 8);
        write!(&mut framed, "{read} ").expect("writing to a Vec<u8> never fails");
        framed.extend_from_slice(&scratch[..read]);
        buf.extend_from_slice(&framed);
        Ok(framed.len())
    }
}

/// A UDP destination. Connectionless, so `reconnect` only re-binds the
/// local ephemeral socket and `send` reports `Retry` rather than
/// `Disconnect` on failure — there is no persistent connection to tear
/// down.
pub struct UdpEgress {
    address: SocketAddr,
    socket: Option<UdpSocket>,
}

impl UdpEgress {
    #[must_use]
    pub fn new(address: SocketAddr) -> Self {
        Self { address, socket: None }
    }

    async fn connected_socket(&mut self) -> std::io::Result<&UdpSocket> {
        if self.socket.is_none() {
            let bind_addr: SocketAddr = if self.address.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" }.parse().unwrap();
            let socket = UdpSocket::bind(bind_addr).await?;
            socket.connect(self.address).await?;
            self.socket = Some(socket);
        }
        Ok(self.socket.as_ref().unwrap())
    }
}

impl Transport for UdpEgress {
    async fn send(&mut self, payload: &[u8]) -> DeliveryOutcome {
        let socket = match self.connected_socket().await {
            Ok(socket) => socket,
            Err(_) => return DeliveryOutcome::Retry(std::time::Duration::from_millis(100)),
        };
        match socket.send(payload).await {
            Ok(_) => DeliveryOutcome::Success,
            Err(_) => {
                self.socket = None;
                DeliveryOutcome::Retry(std::time::Duration::from_millis(100))
            }
        }
    }

    async fn reconnect(&mut self) -> Result<(), FlowError> {
        self.socket = None;
        self.connected_socket().await.map(|_| ()).map_err(|source| FlowError::Transport {
            detail: source.to_string(),
            source: Some(source),
        })
    }
}

#[cfg(test)]
mod tests;
