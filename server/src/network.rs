//! Server receive loop: decodes datagrams and dispatches them to the registry,
//! the content filter and the broadcast engine

use crate::broadcast::{BroadcastEngine, BroadcastReport};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::filter::ContentFilter;
use crate::observer::{ServerEvent, ServerObserver};
use crate::registry::SessionRegistry;
use crate::transport::Transport;
use log::{debug, error, info, warn};
use shared::{ClientMessage, ServerMessage};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Control messages delivered to a running server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCommand {
    Shutdown,
}

/// Cloneable handle for stopping a server from another task
#[derive(Debug, Clone)]
pub struct ServerHandle {
    commands: mpsc::UnboundedSender<ServerCommand>,
}

impl ServerHandle {
    /// Asks the receive loop to stop. Returns false if the server is already gone.
    pub fn shutdown(&self) -> bool {
        self.commands.send(ServerCommand::Shutdown).is_ok()
    }
}

/// Message statistics for the lifetime of the process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total_messages: u64,
    pub blocked_messages: u64,
}

/// What the server did with one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramOutcome {
    Joined,
    AlreadyJoined,
    Exited,
    NotJoined,
    Relayed(BroadcastReport),
    Blocked,
    Malformed,
}

/// Chat server owning the socket, the session registry and the counters.
///
/// Datagrams are handled strictly one after another, so no state needs locking.
pub struct Server<T = UdpSocket> {
    engine: BroadcastEngine<T>,
    registry: SessionRegistry,
    filter: ContentFilter,
    counters: Counters,
    buffer_size: usize,
    observer: Box<dyn ServerObserver + Send + Sync>,

    command_tx: mpsc::UnboundedSender<ServerCommand>,
    command_rx: mpsc::UnboundedReceiver<ServerCommand>,
}

impl Server<UdpSocket> {
    /// Binds the listening socket. Failure here is fatal for the server.
    pub async fn bind<O>(
        config: &ServerConfig,
        filter: ContentFilter,
        observer: O,
    ) -> Result<Self, ServerError>
    where
        O: ServerObserver + Send + Sync + 'static,
    {
        let addr = config.bind_addr();
        let socket = UdpSocket::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Server listening on {}", addr);

        Ok(Self::with_transport(
            socket,
            filter,
            config.buffer_size,
            observer,
        ))
    }
}

impl<T: Transport> Server<T> {
    pub fn with_transport<O>(
        transport: T,
        filter: ContentFilter,
        buffer_size: usize,
        observer: O,
    ) -> Self
    where
        O: ServerObserver + Send + Sync + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        Self {
            engine: BroadcastEngine::new(transport),
            registry: SessionRegistry::new(),
            filter,
            counters: Counters::default(),
            buffer_size: buffer_size.max(1),
            observer: Box::new(observer),
            command_tx,
            command_rx,
        }
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            commands: self.command_tx.clone(),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.engine.transport().local_addr()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn transport(&self) -> &T {
        self.engine.transport()
    }

    fn log_line(&mut self, line: String) {
        self.observer.notify(ServerEvent::MessageLogged(line));
    }

    fn notify_user_count(&mut self) {
        self.observer
            .notify(ServerEvent::UserCountChanged(self.registry.count()));
    }

    fn notify_counters(&mut self) {
        self.observer.notify(ServerEvent::CountersChanged {
            total: self.counters.total_messages,
            blocked: self.counters.blocked_messages,
        });
    }

    /// Processes one received datagram.
    ///
    /// Errors never escape: an undecodable datagram is logged and dropped.
    pub async fn handle_datagram(&mut self, bytes: &[u8], from: SocketAddr) -> DatagramOutcome {
        let message = match ClientMessage::decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping datagram from {}: {}", from, e);
                self.log_line(format!("Error decoding datagram from {}: {}", from, e));
                return DatagramOutcome::Malformed;
            }
        };

        match message {
            ClientMessage::Join { name } => self.handle_join(from, name).await,
            ClientMessage::Exit { name } => self.handle_exit(from, name).await,
            ClientMessage::Chat { text } => self.handle_chat(from, text).await,
        }
    }

    async fn handle_join(&mut self, from: SocketAddr, name: String) -> DatagramOutcome {
        if !self.registry.join(from, &name) {
            debug!("Ignoring repeated JOIN from {}", from);
            return DatagramOutcome::AlreadyJoined;
        }

        self.log_line(format!("[JOIN] {} ({})", name, from));
        self.engine.broadcast_user_count(&self.registry).await;
        self.notify_user_count();
        DatagramOutcome::Joined
    }

    /// Removal is keyed by the sending endpoint; the name is only logged
    async fn handle_exit(&mut self, from: SocketAddr, name: String) -> DatagramOutcome {
        if !self.registry.exit(from) {
            debug!("Ignoring EXIT from unknown endpoint {}", from);
            return DatagramOutcome::NotJoined;
        }

        self.log_line(format!("[EXIT] {} ({})", name, from));
        self.engine.broadcast_user_count(&self.registry).await;
        self.notify_user_count();
        DatagramOutcome::Exited
    }

    async fn handle_chat(&mut self, from: SocketAddr, text: String) -> DatagramOutcome {
        self.counters.total_messages += 1;

        if self.filter.is_blocked(&text) {
            self.counters.blocked_messages += 1;
            self.log_line(format!("[BLOCKED] {}", text));

            let notice = ServerMessage::blocked_notice().encode();
            self.engine.send_to(from, &notice).await;
            self.notify_counters();
            return DatagramOutcome::Blocked;
        }

        self.log_line(text.clone());
        let payload = ServerMessage::Chat { text }.encode();
        let report = self.engine.broadcast(&self.registry, &payload).await;
        if report.failed > 0 {
            self.log_line(format!(
                "Error sending to {} of {} clients",
                report.failed,
                report.failed + report.delivered
            ));
        }
        self.notify_counters();
        DatagramOutcome::Relayed(report)
    }

    /// Runs the receive loop until a shutdown command arrives.
    ///
    /// Receive errors on individual datagrams are logged and the loop carries on.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        let local_addr = self.local_addr()?;
        self.log_line(format!("[SERVER START] port {}", local_addr.port()));
        info!("Server started successfully");

        loop {
            // Fresh buffer per datagram so no bytes leak between iterations
            let mut buffer = vec![0u8; self.buffer_size];

            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(ServerCommand::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                result = self.engine.transport().recv_from(&mut buffer) => {
                    match result {
                        Ok((len, from)) => {
                            self.handle_datagram(&buffer[..len], from).await;
                        }
                        Err(e) => {
                            error!("Error receiving datagram: {}", e);
                            self.log_line(format!("Error receiving datagram: {}", e));
                            tokio::time::sleep(Duration::from_millis(10)).await;
                        }
                    }
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NullObserver;
    use crate::transport::mock::MockTransport;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    fn create_test_server(
        transport: MockTransport,
    ) -> (
        Server<MockTransport>,
        mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let filter = ContentFilter::from_words(["spam", "badword"]);
        (Server::with_transport(transport, filter, 100, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_join_registers_and_announces_count() {
        let (mut server, mut events) = create_test_server(MockTransport::new());

        let outcome = server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;

        assert_eq!(outcome, DatagramOutcome::Joined);
        assert_eq!(server.registry().count(), 1);
        assert_eq!(server.registry().display_name(addr(5000)), Some("Dog42"));
        assert_eq!(server.transport().sent_to(addr(5000)), vec!["[USER COUNT]1"]);
        assert_eq!(
            drain(&mut events),
            vec![
                ServerEvent::MessageLogged("[JOIN] Dog42 (127.0.0.1:5000)".to_string()),
                ServerEvent::UserCountChanged(1),
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_join_is_silent() {
        let (mut server, mut events) = create_test_server(MockTransport::new());

        server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;
        drain(&mut events);
        server.transport().clear();

        let outcome = server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;

        assert_eq!(outcome, DatagramOutcome::AlreadyJoined);
        assert_eq!(server.registry().count(), 1);
        assert!(server.transport().sent().is_empty());
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_join_count_reaches_every_client() {
        let (mut server, _events) = create_test_server(MockTransport::new());

        server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;
        server.transport().clear();
        server.handle_datagram(b"[JOIN] Fox1", addr(5001)).await;

        assert_eq!(server.transport().sent_to(addr(5000)), vec!["[USER COUNT]2"]);
        assert_eq!(server.transport().sent_to(addr(5001)), vec!["[USER COUNT]2"]);
    }

    #[tokio::test]
    async fn test_exit_removes_by_endpoint() {
        let (mut server, mut events) = create_test_server(MockTransport::new());
        server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;
        server.handle_datagram(b"[JOIN] Fox1", addr(5001)).await;
        drain(&mut events);
        server.transport().clear();

        let outcome = server.handle_datagram(b"[EXIT]SomeoneElse", addr(5000)).await;

        assert_eq!(outcome, DatagramOutcome::Exited);
        assert_eq!(server.registry().count(), 1);
        assert!(!server.registry().contains(addr(5000)));
        assert_eq!(server.transport().sent_to(addr(5001)), vec!["[USER COUNT]1"]);
        assert!(server.transport().sent_to(addr(5000)).is_empty());
        assert_eq!(
            drain(&mut events),
            vec![
                ServerEvent::MessageLogged("[EXIT] SomeoneElse (127.0.0.1:5000)".to_string()),
                ServerEvent::UserCountChanged(1),
            ]
        );
    }

    #[tokio::test]
    async fn test_exit_from_unknown_endpoint_is_ignored() {
        let (mut server, mut events) = create_test_server(MockTransport::new());
        server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;
        drain(&mut events);
        server.transport().clear();

        let outcome = server.handle_datagram(b"[EXIT]Dog42", addr(5001)).await;

        assert_eq!(outcome, DatagramOutcome::NotJoined);
        assert_eq!(server.registry().count(), 1);
        assert!(server.transport().sent().is_empty());
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn test_chat_is_relayed_to_everyone_including_sender() {
        let (mut server, mut events) = create_test_server(MockTransport::new());
        for port in [5000, 5001, 5002] {
            server
                .handle_datagram(format!("[JOIN] user{}", port).as_bytes(), addr(port))
                .await;
        }
        drain(&mut events);
        server.transport().clear();

        let outcome = server.handle_datagram(b"user5000: hello", addr(5000)).await;

        assert_eq!(
            outcome,
            DatagramOutcome::Relayed(BroadcastReport {
                delivered: 3,
                failed: 0
            })
        );
        for port in [5000, 5001, 5002] {
            assert_eq!(server.transport().sent_to(addr(port)), vec!["user5000: hello"]);
        }
        assert_eq!(
            server.counters(),
            Counters {
                total_messages: 1,
                blocked_messages: 0
            }
        );
        assert_eq!(
            drain(&mut events),
            vec![
                ServerEvent::MessageLogged("user5000: hello".to_string()),
                ServerEvent::CountersChanged {
                    total: 1,
                    blocked: 0
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_client_does_not_block_others() {
        let transport = MockTransport::new().with_unreachable(addr(5001));
        let (mut server, _events) = create_test_server(transport);
        for port in [5000, 5001, 5002] {
            server
                .handle_datagram(format!("[JOIN] user{}", port).as_bytes(), addr(port))
                .await;
        }
        server.transport().clear();

        let outcome = server.handle_datagram(b"user5000: hello", addr(5000)).await;

        assert_eq!(
            outcome,
            DatagramOutcome::Relayed(BroadcastReport {
                delivered: 2,
                failed: 1
            })
        );
        assert_eq!(server.transport().sent_to(addr(5000)), vec!["user5000: hello"]);
        assert_eq!(server.transport().sent_to(addr(5002)), vec!["user5000: hello"]);
        assert!(server.registry().contains(addr(5001)));
    }

    #[tokio::test]
    async fn test_blocked_message_only_warns_sender() {
        let (mut server, mut events) = create_test_server(MockTransport::new());
        server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;
        server.handle_datagram(b"[JOIN] Fox1", addr(5001)).await;
        drain(&mut events);
        server.transport().clear();

        let outcome = server
            .handle_datagram(b"Dog42: this has a BADWORD inside", addr(5000))
            .await;

        assert_eq!(outcome, DatagramOutcome::Blocked);
        assert_eq!(
            server.transport().sent(),
            vec![(
                addr(5000),
                b"[SYSTEM] Your message was blocked for inappropriate content.".to_vec()
            )]
        );
        assert_eq!(
            server.counters(),
            Counters {
                total_messages: 1,
                blocked_messages: 1
            }
        );
        assert_eq!(
            drain(&mut events),
            vec![
                ServerEvent::MessageLogged("[BLOCKED] Dog42: this has a BADWORD inside".to_string()),
                ServerEvent::CountersChanged {
                    total: 1,
                    blocked: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_substring_of_banned_word_is_relayed() {
        let (mut server, _events) = create_test_server(MockTransport::new());
        server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;
        server.transport().clear();

        let outcome = server.handle_datagram(b"Dog42: badwordish", addr(5000)).await;

        assert!(matches!(outcome, DatagramOutcome::Relayed(_)));
        assert_eq!(server.transport().sent_to(addr(5000)), vec!["Dog42: badwordish"]);
    }

    #[tokio::test]
    async fn test_chat_from_unregistered_sender_is_counted_and_relayed() {
        let (mut server, _events) = create_test_server(MockTransport::new());
        server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;
        server.transport().clear();

        let outcome = server.handle_datagram(b"Ghost: boo", addr(6000)).await;

        assert_eq!(
            outcome,
            DatagramOutcome::Relayed(BroadcastReport {
                delivered: 1,
                failed: 0
            })
        );
        assert!(server.transport().sent_to(addr(6000)).is_empty());
        assert_eq!(server.counters().total_messages, 1);
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_dropped() {
        let (mut server, mut events) = create_test_server(MockTransport::new());
        server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;
        drain(&mut events);
        server.transport().clear();

        let outcome = server.handle_datagram(&[0xff, 0xfe, 0xfd], addr(5000)).await;

        assert_eq!(outcome, DatagramOutcome::Malformed);
        assert!(server.transport().sent().is_empty());
        assert_eq!(server.counters(), Counters::default());

        let logged = drain(&mut events);
        assert_eq!(logged.len(), 1);
        assert!(matches!(&logged[0], ServerEvent::MessageLogged(line) if line.starts_with("Error decoding")));
    }

    #[tokio::test]
    async fn test_chat_is_trimmed_before_relay() {
        let (mut server, _events) = create_test_server(MockTransport::new());
        server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;
        server.transport().clear();

        server.handle_datagram(b"  Dog42: hi  \n", addr(5000)).await;

        assert_eq!(server.transport().sent_to(addr(5000)), vec!["Dog42: hi"]);
    }

    #[tokio::test]
    async fn test_character_cut_by_buffer_is_still_relayed() {
        let (mut server, _events) = create_test_server(MockTransport::new());
        server.handle_datagram(b"[JOIN] Dog42", addr(5000)).await;
        server.transport().clear();

        let line = format!("Dog42: {}", "é".repeat(50));
        let outcome = server
            .handle_datagram(&line.as_bytes()[..100], addr(5000))
            .await;

        assert!(matches!(outcome, DatagramOutcome::Relayed(_)));
        assert_eq!(
            server.transport().sent_to(addr(5000)),
            vec![format!("Dog42: {}", "é".repeat(46))]
        );
        assert_eq!(server.counters().total_messages, 1);
    }

    #[tokio::test]
    async fn test_run_survives_receive_error() {
        let transport = MockTransport::new()
            .with_recv_error(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"))
            .with_datagram(b"[JOIN] Dog42", addr(5000));
        let (mut server, mut events) = create_test_server(transport);
        let handle = server.handle();

        let task = tokio::spawn(async move {
            let result = server.run().await;
            (server, result)
        });

        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(2), events.recv())
                .await
                .expect("timed out waiting for server event")
                .expect("server event channel closed");
            let done = event == ServerEvent::UserCountChanged(1);
            seen.push(event);
            if done {
                break;
            }
        }

        assert!(handle.shutdown());
        let (server, result) = task.await.unwrap();
        tokio_test::assert_ok!(result);

        assert_eq!(
            seen,
            vec![
                ServerEvent::MessageLogged("[SERVER START] port 3306".to_string()),
                ServerEvent::MessageLogged("Error receiving datagram: connection reset".to_string()),
                ServerEvent::MessageLogged("[JOIN] Dog42 (127.0.0.1:5000)".to_string()),
                ServerEvent::UserCountChanged(1),
            ]
        );
        assert_eq!(server.transport().sent_to(addr(5000)), vec!["[USER COUNT]1"]);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut server =
            Server::with_transport(MockTransport::new(), ContentFilter::default(), 100, NullObserver);
        let handle = server.handle();

        assert!(handle.shutdown());
        tokio_test::assert_ok!(server.run().await);
    }

    #[test]
    fn test_zero_buffer_size_is_clamped() {
        let server =
            Server::with_transport(MockTransport::new(), ContentFilter::default(), 0, NullObserver);
        assert_eq!(server.buffer_size, 1);
    }
}
