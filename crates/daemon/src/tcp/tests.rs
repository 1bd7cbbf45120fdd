use super::*;
use dnscache::DnsCacheOptions;
use tokio::io::AsyncReadExt as _;
use tokio::net::TcpListener as TokioTcpListener;

#[tokio::test]
async fn tcp_egress_connects_lazily_and_delivers_bytes() {
    let listener = TokioTcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let accepted = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = vec![0u8; 5];
        stream.read_exact(&mut received).await.unwrap();
        received
    });

    let mut egress = TcpEgress::new(addr);
    assert_eq!(egress.send(b"hello").await, DeliveryOutcome::Success);

    assert_eq!(accepted.await.unwrap(), b"hello");
}

#[tokio::test]
async fn tcp_egress_reports_disconnect_when_nothing_is_listening() {
    // Port 0 never has a live listener to connect back to once dropped;
    // bind and immediately drop to get a very likely-closed port.
    let listener = TokioTcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut egress = TcpEgress::new(addr);
    assert_eq!(egress.send(b"hello").await, DeliveryOutcome::Disconnect);
}

#[tokio::test]
async fn tcp_ingress_reads_bytes_written_by_the_peer() {
    let listener = TokioTcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let client = tokio::spawn(async move {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"11 hello world").await.unwrap();
    });

    let (stream, _) = listener.accept().await.unwrap();
    let mut ingress = TcpIngress::new(stream);
    let mut buf = BytesMut::new();
    let read = ingress.read(&mut buf).await.unwrap();

    assert_eq!(read, 14);
    assert_eq!(&buf[..], b"11 hello world");
    client.await.unwrap();
}

#[tokio::test]
async fn tcp_ingress_returns_prefetched_bytes_before_touching_the_socket() {
    let listener = TokioTcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _client = tokio::spawn(async move {
        let _ = TcpStream::connect(addr).await.unwrap();
    });
    let (stream, _) = listener.accept().await.unwrap();

    let mut ingress = TcpIngress::with_prefetched(stream, BytesMut::from(&b"3 hi"[..]));
    let mut buf = BytesMut::new();
    let read = ingress.read(&mut buf).await.unwrap();
    assert_eq!(read, 4);
    assert_eq!(&buf[..], b"3 hi");
}

#[test]
fn resolve_fallback_host_prefers_a_cached_hostname() {
    let mut cache = DnsCache::new(DnsCacheOptions::default());
    cache.store("10.0.0.5".parse().unwrap(), "web-1.internal", true);
    let cache = Arc::new(Mutex::new(cache));

    let host = resolve_fallback_host(&cache, "10.0.0.5:5514".parse().unwrap());
    assert_eq!(host, "web-1.internal");
}

#[test]
fn resolve_fallback_host_falls_back_to_the_bare_address_on_a_cache_miss() {
    let cache = Arc::new(Mutex::new(DnsCache::new(DnsCacheOptions::default())));
    let host = resolve_fallback_host(&cache, "10.0.0.9:5514".parse().unwrap());
    assert_eq!(host, "10.0.0.9");
}

mod accept_loop_tests {
    use super::*;
    use logmsg::ack::PathOptions;
    use logmsg::value::Handle;
    use logmsg::LogMessage;
    use pipeline::pipe::{Pipe, PipeEvent, PipeResult};
    use std::sync::Mutex as StdMutex;

    struct CollectingPipe {
        received: Arc<StdMutex<Vec<LogMessage>>>,
    }

    impl Pipe for CollectingPipe {
        fn init(&mut self, _ctx: &flowcore::RuntimeContext) -> PipeResult<()> {
            Ok(())
        }
        fn deinit(&mut self) -> PipeResult<()> {
            Ok(())
        }
        fn queue(&mut self, msg: LogMessage, _path_options: PathOptions) -> PipeResult<()> {
            self.received.lock().unwrap().push(msg);
            Ok(())
        }
        fn notify(&mut self, _event: PipeEvent) {}
        fn clone_pipe(&self) -> Box<dyn Pipe> {
            Box::new(Self { received: Arc::clone(&self.received) })
        }
    }

    #[tokio::test]
    async fn accept_loop_dispatches_a_connection_into_the_downstream_pipe() {
        let listener = bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(StdMutex::new(Vec::new()));
        let make_downstream: Arc<dyn Fn() -> Box<dyn Pipe> + Send + Sync> = {
            let received = Arc::clone(&received);
            Arc::new(move || Box::new(CollectingPipe { received: Arc::clone(&received) }) as Box<dyn Pipe>)
        };
        let dns_cache = Arc::new(Mutex::new(DnsCache::new(DnsCacheOptions::default())));
        let shutdown = Arc::new(AtomicBool::new(false));
        let options = AcceptOptions { max_msg_size: 1024, trim_large_messages: false, initial_window: 10 };

        let loop_shutdown = Arc::clone(&shutdown);
        let acceptor = tokio::spawn(async move {
            let mut supervisor = flowcore::Supervisor::new();
            accept_loop(listener, "tcp-test", options, make_downstream, dns_cache, &mut supervisor, loop_shutdown).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"11 hello world").await.unwrap();

        // Give the spawned worker a moment to parse and queue the message.
        let mut attempts = 0;
        while received.lock().unwrap().is_empty() && attempts < 50 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            attempts += 1;
        }

        let guard = received.lock().unwrap();
        assert_eq!(guard.len(), 1);
        assert_eq!(guard[0].get_handle(Handle::Message).and_then(|v| v.as_str().map(str::to_owned)), Some("hello world".to_owned()));
        drop(guard);

        shutdown.store(true, Ordering::Release);
        let _ = tokio::time::timeout(std::time::Duration::from_millis(500), acceptor).await;
    }
}
