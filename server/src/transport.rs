//! Datagram transport used by the server loop
//!
//! The server owns exactly one transport and routes every receive and send through
//! it, so a second socket can never end up bound to the chat port.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

pub trait Transport {
    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Waits for the next datagram. Anything beyond `buf.len()` is discarded.
    fn recv_from<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send + 'a;

    fn send_to<'a>(
        &'a self,
        payload: &'a [u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a;
}

impl Transport for UdpSocket {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        UdpSocket::local_addr(self)
    }

    fn recv_from<'a>(
        &'a self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send + 'a {
        UdpSocket::recv_from(self, buf)
    }

    fn send_to<'a>(
        &'a self,
        payload: &'a [u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
        UdpSocket::send_to(self, payload, target)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_udp_socket_transport_roundtrip() {
        let server = assert_ok!(UdpSocket::bind("127.0.0.1:0").await);
        let client = assert_ok!(UdpSocket::bind("127.0.0.1:0").await);
        let server_addr = assert_ok!(Transport::local_addr(&server));
        let client_addr = assert_ok!(Transport::local_addr(&client));

        let sent = assert_ok!(Transport::send_to(&client, b"[JOIN] Dog42", server_addr).await);
        assert_eq!(sent, 12);

        let mut buf = vec![0u8; 100];
        let (len, from) = assert_ok!(Transport::recv_from(&server, &mut buf).await);
        assert_eq!(&buf[..len], b"[JOIN] Dog42");
        assert_eq!(from, client_addr);
    }

    #[tokio::test]
    async fn test_mock_transport_records_and_fails() {
        let good: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let bad: SocketAddr = "127.0.0.1:5001".parse().unwrap();
        let transport = mock::MockTransport::new().with_unreachable(bad);

        assert_ok!(transport.send_to(b"hello", good).await);
        assert!(transport.send_to(b"hello", bad).await.is_err());
        assert_eq!(transport.sent_to(good), vec!["hello".to_string()]);
        assert!(transport.sent_to(bad).is_empty());
    }

    #[tokio::test]
    async fn test_mock_transport_replays_inbound() {
        let from: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        let transport = mock::MockTransport::new()
            .with_recv_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .with_datagram(b"[JOIN] Dog42", from);

        let mut buf = vec![0u8; 6];
        assert!(transport.recv_from(&mut buf).await.is_err());

        let (len, sender) = assert_ok!(transport.recv_from(&mut buf).await);
        assert_eq!(&buf[..len], b"[JOIN]");
        assert_eq!(sender, from);
    }
}
