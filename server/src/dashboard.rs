//! Headless status dashboard
//!
//! Keeps the three figures an operator cares about and writes the chat log and a
//! status line through the `log` facade whenever something changes.

use crate::observer::{ServerEvent, ServerObserver};
use log::info;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub active_users: usize,
    pub total_messages: u64,
    pub blocked_messages: u64,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_line(&self) -> String {
        format!(
            "Active Users: {} | Total Messages: {} | Blocked Messages: {}",
            self.active_users, self.total_messages, self.blocked_messages
        )
    }
}

impl ServerObserver for Dashboard {
    fn notify(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::UserCountChanged(count) => {
                self.active_users = count;
                info!("{}", self.status_line());
            }
            ServerEvent::CountersChanged { total, blocked } => {
                self.total_messages = total;
                self.blocked_messages = blocked;
                info!("{}", self.status_line());
            }
            ServerEvent::MessageLogged(line) => {
                info!("{}", line);
            }
        }
    }
}
