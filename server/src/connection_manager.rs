//! Connection tracking for the UDP transport
//!
//! This module handles the server-side bookkeeping of connected clients:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - Mapping between socket addresses and participant ids
//! - Connection health monitoring via last-seen timestamps
//! - Capacity management
//!
//! A connection id doubles as the participant id used by rooms, so ids are
//! never reused while the process runs.

use log::info;
use shared::PlayerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client
#[derive(Debug)]
pub struct Connection {
    /// Unique id assigned by the server
    pub id: PlayerId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
}

impl Connection {
    pub fn new(id: PlayerId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing arrived from this client within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Enforces the server's connection limit and resolves incoming datagrams
/// to the participant that sent them.
pub struct ConnectionManager {
    /// Connected clients indexed by their unique id
    connections: HashMap<PlayerId, Connection>,
    /// Next available id for new connections
    next_id: PlayerId,
    /// Maximum number of concurrent connections allowed
    max_connections: usize,
}

impl ConnectionManager {
    /// Creates an empty connection table. Ids start from 1.
    pub fn new(max_connections: usize) -> Self {
        Self {
            connections: HashMap::new(),
            next_id: 1,
            max_connections,
        }
    }

    /// Attempts to register a new connection
    ///
    /// Returns Some(id) if successful, None if the server is at capacity.
    pub fn add_connection(&mut self, addr: SocketAddr) -> Option<PlayerId> {
        if self.connections.len() >= self.max_connections {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        info!("Client {} connected from {}", id, addr);
        self.connections.insert(id, Connection::new(id, addr));

        Some(id)
    }

    /// Removes a connection. Returns true if it existed.
    pub fn remove_connection(&mut self, id: PlayerId) -> bool {
        if let Some(connection) = self.connections.remove(&id) {
            info!("Client {} disconnected", connection.id);
            true
        } else {
            false
        }
    }

    /// Finds a connection id by network address
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.connections
            .iter()
            .find(|(_, connection)| connection.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn addr_of(&self, id: PlayerId) -> Option<SocketAddr> {
        self.connections.get(&id).map(|connection| connection.addr)
    }

    /// Refreshes the activity timestamp of the connection at `addr`
    pub fn touch(&mut self, addr: SocketAddr) -> Option<PlayerId> {
        let connection = self
            .connections
            .values_mut()
            .find(|connection| connection.addr == addr)?;
        connection.touch();
        Some(connection.id)
    }

    /// Removes connections silent for longer than `timeout` and returns their ids
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<PlayerId> {
        let timed_out: Vec<PlayerId> = self
            .connections
            .iter()
            .filter(|(_, connection)| connection.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for id in &timed_out {
            self.remove_connection(*id);
        }

        timed_out
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
