//! Registry of the clients currently in the chat room
//!
//! A client is identified purely by the address and port its datagrams come from.
//! Sessions are created by a JOIN from an unseen endpoint and removed only by an
//! explicit EXIT; there is no liveness probing.

use log::debug;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Address and port of a peer, used directly as the registry key
pub type ClientEndpoint = SocketAddr;

/// A joined client
#[derive(Debug, Clone)]
pub struct Session {
    pub endpoint: ClientEndpoint,
    /// Name announced in the JOIN; fixed for the lifetime of the session
    pub display_name: String,
    pub joined_at: Instant,
}

impl Session {
    pub fn new(endpoint: ClientEndpoint, display_name: impl Into<String>) -> Self {
        Self {
            endpoint,
            display_name: display_name.into(),
            joined_at: Instant::now(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.joined_at.elapsed()
    }
}

/// Set of live sessions keyed by endpoint.
///
/// Owned and mutated by the server loop alone, so it carries no locking.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ClientEndpoint, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a client.
    ///
    /// Returns false without touching the existing session if the endpoint has
    /// already joined, so a repeated JOIN cannot rename a client.
    pub fn join(&mut self, endpoint: ClientEndpoint, name: &str) -> bool {
        if self.sessions.contains_key(&endpoint) {
            return false;
        }

        debug!("Session opened for {} as {:?}", endpoint, name);
        self.sessions.insert(endpoint, Session::new(endpoint, name));
        true
    }

    /// Removes a client. Returns true if the endpoint was registered.
    pub fn exit(&mut self, endpoint: ClientEndpoint) -> bool {
        match self.sessions.remove(&endpoint) {
            Some(session) => {
                debug!(
                    "Session closed for {} ({:?}) after {:.1?}",
                    endpoint,
                    session.display_name,
                    session.duration()
                );
                true
            }
            None => false,
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, endpoint: ClientEndpoint) -> bool {
        self.sessions.contains_key(&endpoint)
    }

    pub fn get(&self, endpoint: ClientEndpoint) -> Option<&Session> {
        self.sessions.get(&endpoint)
    }

    pub fn display_name(&self, endpoint: ClientEndpoint) -> Option<&str> {
        self.get(endpoint).map(|session| session.display_name.as_str())
    }

    /// Snapshot of every registered endpoint, in no particular order.
    ///
    /// The returned vector is owned, so callers may keep iterating it while the
    /// registry changes.
    pub fn endpoints(&self) -> Vec<ClientEndpoint> {
        self.sessions.keys().copied().collect()
    }
}
