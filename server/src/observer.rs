//! Notifications emitted by the server loop
//!
//! The loop never reads anything back from an observer. A dashboard renders the
//! latest values; tests collect the events through a channel.

use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    UserCountChanged(usize),
    CountersChanged { total: u64, blocked: u64 },
    /// A line for the server's chat log
    MessageLogged(String),
}

pub trait ServerObserver {
    fn notify(&mut self, event: ServerEvent);
}

impl ServerObserver for mpsc::UnboundedSender<ServerEvent> {
    fn notify(&mut self, event: ServerEvent) {
        // A dropped receiver only means nobody is watching anymore
        let _ = self.send(event);
    }
}

/// Observer that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl ServerObserver for NullObserver {
    fn notify(&mut self, _event: ServerEvent) {}
}
