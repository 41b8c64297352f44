//! Terminal chat client for the chat room server.
//!
//! The client joins on startup, sends every typed line as `"name: text"`, prints
//! whatever the server relays, and sends EXIT on the way out.

pub mod network;

pub use network::{Client, ClientEvent};
