//! # Chat Room Server Library
//!
//! Server side of a connectionless chat room. Clients announce themselves with a
//! JOIN datagram, leave with EXIT, and everything else they send is a chat line that
//! the server checks against a banned-word list and relays to every joined client.
//!
//! ## Architecture
//!
//! ### Single-Threaded Receive Loop
//! One task owns the socket, the session registry and the message counters and
//! handles datagrams strictly in arrival order. Nothing is shared between tasks, so
//! no state needs locking.
//!
//! ### Best-Effort Delivery
//! UDP gives no delivery guarantees and the server adds none. A send that fails is
//! logged; the client stays registered until it sends EXIT.
//!
//! ### Observer Notifications
//! The loop reports what it does (user count changes, counter changes, chat log
//! lines) to a [`observer::ServerObserver`]. The [`dashboard::Dashboard`] renders
//! them through the `log` facade; tests collect them from a channel.
//!
//! ## Module Organization
//!
//! - `filter`: banned-word matching on exact tokens
//! - `registry`: joined clients keyed by address and port
//! - `transport`: the datagram socket abstraction
//! - `broadcast`: unicast and fan-out through the single transport
//! - `network`: the receive loop and datagram dispatch
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::dashboard::Dashboard;
//! use server::filter::ContentFilter;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::default();
//!     let filter = ContentFilter::load(&config.filter_path);
//!
//!     let mut server = Server::bind(&config, filter, Dashboard::new()).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod network;
pub mod observer;
pub mod registry;
pub mod transport;

pub use error::ServerError;
