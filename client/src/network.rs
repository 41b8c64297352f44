//! Client network layer: announces the user, sends chat lines and decodes what the
//! server relays back

use log::{debug, info, warn};
use shared::{format_chat, ClientMessage, ServerMessage, DEFAULT_BUFFER_SIZE};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use tokio::net::{lookup_host, UdpSocket};

/// Something the user should see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    UserCount(usize),
    Notice(String),
    Chat(String),
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientEvent::UserCount(count) => write!(f, "Active Users: {}", count),
            ClientEvent::Notice(text) => write!(f, "[SYSTEM] {}", text),
            ClientEvent::Chat(text) => f.write_str(text),
        }
    }
}

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    user_name: String,
    user_count: usize,
    joined: bool,
}

impl Client {
    /// Resolves the server address and binds an ephemeral local socket
    pub async fn new(server_addr: &str, user_name: String) -> Result<Self, Box<dyn std::error::Error>> {
        let server_addr = lookup_host(server_addr).await?.next().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("could not resolve {}", server_addr),
            )
        })?;

        let bind_addr = if server_addr.is_ipv6() {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        debug!("Client socket bound to {}", socket.local_addr()?);

        Ok(Client {
            socket,
            server_addr,
            user_name,
            user_count: 0,
            joined: false,
        })
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn user_count(&self) -> usize {
        self.user_count
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    async fn send_message(&self, message: &ClientMessage) -> io::Result<()> {
        self.socket
            .send_to(&message.encode(), self.server_addr)
            .await?;
        Ok(())
    }

    /// Announces this user to the server
    pub async fn join(&mut self) -> io::Result<()> {
        info!("Joining {} as {}", self.server_addr, self.user_name);

        self.send_message(&ClientMessage::Join {
            name: self.user_name.clone(),
        })
        .await?;
        self.joined = true;
        Ok(())
    }

    /// Tells the server this user is leaving. Does nothing if never joined.
    pub async fn leave(&mut self) -> io::Result<()> {
        if !self.joined {
            return Ok(());
        }

        self.send_message(&ClientMessage::Exit {
            name: self.user_name.clone(),
        })
        .await?;
        self.joined = false;
        Ok(())
    }

    /// Sends a chat line as `"name: text"`.
    ///
    /// Blank input is skipped; returns whether anything was sent.
    pub async fn send_chat(&self, text: &str) -> io::Result<bool> {
        if text.trim().is_empty() {
            return Ok(false);
        }

        self.send_message(&ClientMessage::Chat {
            text: format_chat(&self.user_name, text),
        })
        .await?;
        Ok(true)
    }

    /// Decodes a datagram from the server.
    ///
    /// User counts are remembered; undecodable datagrams are logged and skipped.
    pub fn handle_datagram(&mut self, bytes: &[u8]) -> Option<ClientEvent> {
        match ServerMessage::decode(bytes) {
            Ok(ServerMessage::UserCount { count }) => {
                self.user_count = count;
                Some(ClientEvent::UserCount(count))
            }
            Ok(ServerMessage::System { text }) => Some(ClientEvent::Notice(text)),
            Ok(ServerMessage::Chat { text }) => Some(ClientEvent::Chat(text)),
            Err(e) => {
                warn!("Ignoring datagram from server: {}", e);
                None
            }
        }
    }

    /// Waits for the next datagram and decodes it
    pub async fn recv_event(&mut self) -> io::Result<Option<ClientEvent>> {
        let mut buffer = vec![0u8; DEFAULT_BUFFER_SIZE];
        let (len, _) = self.socket.recv_from(&mut buffer).await?;
        Ok(self.handle_datagram(&buffer[..len]))
    }
}
