use super::*;

#[tokio::test]
async fn ingress_frames_a_datagram_with_an_octet_count_prefix() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    let mut ingress = UdpIngress::new(socket);

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    sender.connect(addr).await.unwrap();
    sender.send(b"<13>hello").await.unwrap();

    let mut buf = BytesMut::new();
    let read = ingress.read(&mut buf).await.unwrap();
    assert_eq!(read, buf.len());
    assert_eq!(&buf[..], b"9 <13>hello");
}

#[tokio::test]
async fn egress_delivers_a_datagram_to_a_listening_socket() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = receiver.local_addr().unwrap();

    let mut egress = UdpEgress::new(addr);
    assert_eq!(egress.send(b"hello").await, DeliveryOutcome::Success);

    let mut buf = [0u8; 16];
    let (read, _peer) = receiver.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..read], b"hello");
}

#[tokio::test]
async fn reconnect_rebinds_the_local_socket() {
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = receiver.local_addr().unwrap();

    let mut egress = UdpEgress::new(addr);
    egress.send(b"first").await;
    egress.reconnect().await.unwrap();
    assert_eq!(egress.send(b"second").await, DeliveryOutcome::Success);
}
