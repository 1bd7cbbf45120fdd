//! TCP source and destination transports.
//!
//! [`TcpIngress`] and [`TcpEgress`] are the concrete transports a
//! [`pipeline::source::Source`]/[`pipeline::destination::Destination`]
//! worker drives. [`accept_loop`] is the acceptor that turns inbound
//! connections into one `Source<TcpIngress>` task apiece, peeling off an
//! optional `PROXY` preface first so the real client address (not the
//! load balancer's) ends up as the message's fallback host.

use bytes::BytesMut;
use dashmap::DashMap;
use dnscache::DnsCache;
use flowcore::{FlowError, Supervisor};
use logging::{log_surfaced_error, SurfacedError};
use pipeline::pipe::Pipe;
use pipeline::source::{IngressTransport, Source};
use pipeline::transport::{DeliveryOutcome, Transport};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wireproto::proxy::parse_preface;

/// How many bytes of a fresh connection to buffer up front while probing
/// for a `PROXY` preface before falling back to treating them as ordinary
/// message data.
const PROXY_PROBE_LEN: usize = 256;

/// A connected TCP socket driving one [`pipeline::source::Source`].
///
/// `prefetched` holds bytes already pulled off the socket while probing
/// for a `PROXY` preface (or the whole probe, if no preface was present)
/// — they are handed back on the first [`IngressTransport::read`] call
/// before the socket is read again, so no bytes are lost to the preface
/// scan.
pub struct TcpIngress {
    stream: TcpStream,
    prefetched: BytesMut,
}

impl TcpIngress {
    #[must_use]
    pub fn new(stream: TcpStream) -> Self {
        Self { stream, prefetched: BytesMut::new() }
    }

    #[must_use]
    pub fn with_prefetched(stream: TcpStream, prefetched: BytesMut) -> Self {
        Self { stream, prefetched }
    }
}

impl IngressTransport for TcpIngress {
    async fn read(&mut self, buf: &mut BytesMut) -> Result<usize, FlowError> {
        if !self.prefetched.is_empty() {
            let read = self.prefetched.len();
            buf.extend_from_slice(&self.prefetched);
            self.prefetched.clear();
            return Ok(read);
        }
        let mut scratch = [0u8; 16 * 1024];
        let read = self.stream.read(&mut scratch).await.map_err(|source| FlowError::Transport {
            detail: source.to_string(),
            source: Some(source),
        })?;
        buf.extend_from_slice(&scratch[..read]);
        Ok(read)
    }
}

/// A TCP destination. Connects lazily on the first send; a failed write
/// drops the connection so the next send (or an explicit
/// [`Transport::reconnect`]) re-establishes it.
pub struct TcpEgress {
    address: SocketAddr,
    stream: Option<TcpStream>,
}

impl TcpEgress {
    #[must_use]
    pub fn new(address: SocketAddr) -> Self {
        Self { address, stream: None }
    }
}

impl Transport for TcpEgress {
    async fn send(&mut self, payload: &[u8]) -> DeliveryOutcome {
        if self.stream.is_none() {
            match TcpStream::connect(self.address).await {
                Ok(stream) => self.stream = Some(stream),
                Err(_) => return DeliveryOutcome::Disconnect,
            }
        }
        let Some(stream) = self.stream.as_mut() else {
            return DeliveryOutcome::Disconnect;
        };
        match stream.write_all(payload).await {
            Ok(()) => DeliveryOutcome::Success,
            Err(_) => {
                self.stream = None;
                DeliveryOutcome::Disconnect
            }
        }
    }

    async fn reconnect(&mut self) -> Result<(), FlowError> {
        let stream = TcpStream::connect(self.address).await.map_err(|source| FlowError::Transport {
            detail: source.to_string(),
            source: Some(source),
        })?;
        self.stream = Some(stream);
        Ok(())
    }
}

/// Binds a listening socket with `SO_REUSEADDR` set, so a restarted
/// daemon doesn't have to wait out a `TIME_WAIT` socket left behind by
/// the previous process.
pub fn bind(address: SocketAddr) -> Result<TcpListener, FlowError> {
    use socket2::{Domain, Socket, Type};

    let to_transport_error = |source: std::io::Error| FlowError::Transport {
        detail: source.to_string(),
        source: Some(source),
    };

    let domain = if address.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, None).map_err(to_transport_error)?;
    socket.set_reuse_address(true).map_err(to_transport_error)?;
    socket.set_nonblocking(true).map_err(to_transport_error)?;
    socket.bind(&address.into()).map_err(to_transport_error)?;
    socket.listen(1024).map_err(to_transport_error)?;
    TcpListener::from_std(socket.into()).map_err(to_transport_error)
}

/// Sizing knobs for [`accept_loop`], mirroring
/// [`flowcore::config::SourceConfig`] without the bind address.
#[derive(Clone, Copy, Debug)]
pub struct AcceptOptions {
    pub max_msg_size: usize,
    pub trim_large_messages: bool,
    pub initial_window: usize,
}

/// Accepts connections on `listener` until `shutdown` is observed,
/// spawning one `Source<TcpIngress>` task per connection onto
/// `supervisor`. `make_downstream` builds a fresh per-connection pipe
/// (typically `Pipe::clone_pipe` on a shared template); `dns_cache` is
/// consulted for the peer's hostname (a cache miss falls back to the raw
/// peer address), and never populated here — that's reverse-DNS resolver
/// integration, out of scope for this crate.
pub async fn accept_loop(
    listener: TcpListener,
    name: impl Into<String>,
    options: AcceptOptions,
    make_downstream: Arc<dyn Fn() -> Box<dyn Pipe> + Send + Sync>,
    dns_cache: Arc<Mutex<DnsCache>>,
    supervisor: &mut Supervisor,
    shutdown: Arc<AtomicBool>,
) -> Result<(), FlowError> {
    let name = name.into();
    let sessions: Arc<DashMap<SocketAddr, ()>> = Arc::new(DashMap::new());

    loop {
        if shutdown.load(Ordering::Acquire) {
            return Ok(());
        }

        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(source) => {
                    log_surfaced_error(&SurfacedError {
                        source: &name,
                        error_kind: "TransportError",
                        detail: &source.to_string(),
                        fd: None,
                        bytes_processed: None,
                    });
                    continue;
                }
            },
            () = tokio::time::sleep(std::time::Duration::from_millis(200)) => continue,
        };

        sessions.insert(peer_addr, ());
        let fallback_host = resolve_fallback_host(&dns_cache, peer_addr);
        let ingress = probe_proxy_preface(stream).await;
        let source_name = format!("{name}:{peer_addr}");
        let mut source = Source::new(source_name.clone(), ingress, options.max_msg_size, options.trim_large_messages, options.initial_window)
            .with_fallback_host(fallback_host);
        let mut downstream = make_downstream();
        let worker_shutdown = Arc::clone(&shutdown);
        let sessions_for_task = Arc::clone(&sessions);

        supervisor.spawn(source_name, async move {
            let result = source.run(downstream.as_mut(), worker_shutdown.as_ref()).await;
            sessions_for_task.remove(&peer_addr);
            result
        });
    }
}

/// Reads up to [`PROXY_PROBE_LEN`] bytes and checks for a `PROXY`
/// preface. On a match, the consumed header bytes are dropped and any
/// remainder becomes prefetched data; on no match, the whole probe
/// becomes prefetched data untouched.
async fn probe_proxy_preface(mut stream: TcpStream) -> TcpIngress {
    let mut probe = vec![0u8; PROXY_PROBE_LEN];
    let read = match stream.peek(&mut probe).await {
        Ok(read) => read,
        Err(_) => return TcpIngress::new(stream),
    };
    probe.truncate(read);

    match parse_preface(&probe) {
        Ok(Some((_info, consumed))) => {
            let mut discard = vec![0u8; consumed];
            if stream.read_exact(&mut discard).await.is_err() {
                return TcpIngress::new(stream);
            }
            TcpIngress::new(stream)
        }
        Ok(None) | Err(_) => TcpIngress::new(stream),
    }
}

fn resolve_fallback_host(dns_cache: &Arc<Mutex<DnsCache>>, peer_addr: SocketAddr) -> String {
    let mut cache = dns_cache.lock().unwrap();
    match cache.lookup(peer_addr.ip()) {
        Some(resolution) => resolution.hostname.to_string(),
        None => peer_addr.ip().to_string(),
    }
}

#[cfg(test)]
mod tests;
