//! # Raja Mantri Game Server Library
//!
//! Authoritative server for the Raja Mantri party game. Two to four
//! connected players gather in a room, receive a hidden role each round
//! (Raja, Mantri, Chor or Sipahi), and the Sipahi tries to name the Chor.
//! Points follow a fixed payoff table and accumulate over a host-chosen
//! number of rounds.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Dispatch
//! All room state lives in one [`dispatcher::Dispatcher`] owned by the main
//! server loop. Inbound actions are applied one at a time, to completion,
//! so a room never observes two interleaved mutations and no locking is
//! needed around room state.
//!
//! ### Explicit Outbound Events
//! Handling an action returns a list of `(recipient, event)` pairs instead
//! of writing to sockets. The network layer routes them; tests inspect them
//! directly.
//!
//! ### UDP-Based Communication
//! Clients talk to the server over UDP with `bincode`-encoded packets.
//! Connections that stay silent past the configured timeout are dropped and
//! treated like an explicit disconnect.
//!
//! ## Module Organization
//!
//! - `roles`: per-round role dealing
//! - `scoring`: round result computation and score accumulation
//! - `room`: membership and the `Waiting -> Playing -> Finished` state machine
//! - `registry`: live rooms keyed by code
//! - `dispatcher`: validation, mutation and notification fan-out per action
//! - `connection_manager`: address to participant mapping and liveness
//! - `network`: socket tasks and the main loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = ServerConfig {
//!         bind_addr: "127.0.0.1:8080".to_string(),
//!         ..ServerConfig::default()
//!     };
//!
//!     let mut server = Server::new(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection_manager;
pub mod dispatcher;
pub mod error;
pub mod network;
pub mod registry;
pub mod roles;
pub mod room;
pub mod scoring;
