//! Runtime settings for the chat server

use shared::{DEFAULT_BUFFER_SIZE, DEFAULT_FILTER_PATH, DEFAULT_HOST, DEFAULT_PORT};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind to
    pub host: String,
    pub port: u16,
    /// Receive buffer per datagram; longer datagrams are truncated
    pub buffer_size: usize,
    /// Newline-delimited list of banned words
    pub filter_path: PathBuf,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            buffer_size: DEFAULT_BUFFER_SIZE,
            filter_path: PathBuf::from(DEFAULT_FILTER_PATH),
        }
    }
}
