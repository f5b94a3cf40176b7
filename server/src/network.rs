//! Server network layer handling UDP communications and action dispatch

use crate::config::ServerConfig;
use crate::connection_manager::ConnectionManager;
use crate::dispatcher::{Dispatcher, Outbound};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{Packet, PlayerId, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    ClientTimeout { client_id: PlayerId },
    Shutdown,
}

/// Messages sent from the main loop to the sender task
#[derive(Debug)]
pub enum OutboundMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
}

/// Main server coordinating networking and room sessions
///
/// The dispatcher is owned by the main loop, so actions are applied one
/// at a time in arrival order.
pub struct Server {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionManager>>,
    dispatcher: Dispatcher,
    config: ServerConfig,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
    outbound_rx: Option<mpsc::UnboundedReceiver<OutboundMessage>>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> ServerResult<Self> {
        let dispatcher = Dispatcher::new(config.game.clone())?;
        Self::with_dispatcher(config, dispatcher).await
    }

    pub async fn with_dispatcher(
        config: ServerConfig,
        dispatcher: Dispatcher,
    ) -> ServerResult<Self> {
        config.validate()?;

        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            connections: Arc::new(RwLock::new(ConnectionManager::new(config.max_connections))),
            dispatcher,
            config,
            server_tx,
            server_rx,
            outbound_tx,
            outbound_rx: Some(outbound_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sender that can stop the main loop with `ServerMessage::Shutdown`
    pub fn control_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match deserialize::<Packet>(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to deserialize packet from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that drains the outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let Some(mut outbound_rx) = self.outbound_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                match message {
                    OutboundMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                }
            }
        });
    }

    /// Spawns task that drops connections that went quiet
    fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();
        let timeout = self.config.client_timeout;

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut guard = connections.write().await;
                    guard.check_timeouts(timeout)
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> ServerResult<()> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        if let Err(e) = self
            .outbound_tx
            .send(OutboundMessage::SendPacket { packet, addr })
        {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Routes dispatcher output to each recipient's address
    async fn deliver(&self, outbound: Vec<Outbound>) {
        if outbound.is_empty() {
            return;
        }

        let connections = self.connections.read().await;
        for Outbound { recipient, event } in outbound {
            match connections.addr_of(recipient) {
                Some(addr) => self.send_packet(Packet::Event(event), addr),
                None => debug!("Dropping event for unknown client {}", recipient),
            }
        }
    }

    /// Removes a participant from their room after their connection is gone
    async fn release_participant(&mut self, client_id: PlayerId) {
        let outbound = self.dispatcher.disconnect(client_id);
        self.deliver(outbound).await;
    }

    /// Processes one incoming packet
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if client_version != PROTOCOL_VERSION {
                    self.send_packet(
                        Packet::Disconnected {
                            reason: "Unsupported client version".to_string(),
                        },
                        addr,
                    );
                    return;
                }

                // Replace an existing connection from the same address
                let existing = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };
                if let Some(existing_id) = existing {
                    info!("Replacing existing client {} from {}", existing_id, addr);
                    self.connections.write().await.remove_connection(existing_id);
                    self.release_participant(existing_id).await;
                }

                let client_id = self.connections.write().await.add_connection(addr);

                let response = match client_id {
                    Some(client_id) => Packet::Connected { client_id },
                    None => Packet::Disconnected {
                        reason: "Server full".to_string(),
                    },
                };
                self.send_packet(response, addr);
            }

            Packet::Heartbeat => {
                self.connections.write().await.touch(addr);
            }

            Packet::Disconnect => {
                let client_id = self.connections.read().await.find_by_addr(addr);
                if let Some(client_id) = client_id {
                    self.connections.write().await.remove_connection(client_id);
                    self.release_participant(client_id).await;
                }
            }

            Packet::Action(action) => {
                let client_id = self.connections.write().await.touch(addr);
                match client_id {
                    Some(client_id) => {
                        let outbound = self.dispatcher.handle(client_id, action);
                        self.deliver(outbound).await;
                    }
                    None => {
                        warn!("Action from unknown address {}", addr);
                        self.send_packet(
                            Packet::Disconnected {
                                reason: "Not connected".to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Main server loop
    pub async fn run(&mut self) -> ServerResult<()> {
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut status_interval = interval(self.config.status_interval);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            self.release_participant(client_id).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = status_interval.tick() => {
                    let clients = self.connections.read().await.len();
                    let registry = self.dispatcher.registry();
                    debug!(
                        "{} clients, {} rooms, {} players in rooms",
                        clients,
                        registry.room_count(),
                        registry.participant_count()
                    );
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::{ClientAction, ServerEvent};

    async fn test_server() -> Server {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        };
        let dispatcher =
            Dispatcher::with_rng(GameConfig::default(), StdRng::seed_from_u64(1)).unwrap();
        Server::with_dispatcher(config, dispatcher).await.unwrap()
    }

    fn client_addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn next_sent(server: &mut Server) -> (Packet, SocketAddr) {
        match server.outbound_rx.as_mut().unwrap().try_recv() {
            Ok(OutboundMessage::SendPacket { packet, addr }) => (packet, addr),
            Err(e) => panic!("nothing queued: {:?}", e),
        }
    }

    async fn connect(server: &mut Server, addr: SocketAddr) -> PlayerId {
        server
            .handle_packet(
                Packet::Connect {
                    client_version: PROTOCOL_VERSION,
                },
                addr,
            )
            .await;
        match next_sent(server) {
            (Packet::Connected { client_id }, to) => {
                assert_eq!(to, addr);
                client_id
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_assigns_ids() {
        let mut server = test_server().await;
        assert_eq!(connect(&mut server, client_addr(5000)).await, 1);
        assert_eq!(connect(&mut server, client_addr(5001)).await, 2);
        assert_eq!(server.connections.read().await.len(), 2);
    }

    #[tokio::test]
    async fn test_rejects_wrong_version() {
        let mut server = test_server().await;
        server
            .handle_packet(Packet::Connect { client_version: 99 }, client_addr(5000))
            .await;

        match next_sent(&mut server) {
            (Packet::Disconnected { reason }, _) => {
                assert_eq!(reason, "Unsupported client version")
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(server.connections.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_action_from_unknown_address() {
        let mut server = test_server().await;
        server
            .handle_packet(Packet::Action(ClientAction::Status), client_addr(5000))
            .await;

        match next_sent(&mut server) {
            (Packet::Disconnected { reason }, _) => assert_eq!(reason, "Not connected"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_actions_are_dispatched_to_recipient_addresses() {
        let mut server = test_server().await;
        let alice_addr = client_addr(5000);
        let alice = connect(&mut server, alice_addr).await;

        server
            .handle_packet(
                Packet::Action(ClientAction::CreateRoom {
                    name: "Alice".to_string(),
                    avatar: "🦁".to_string(),
                    rounds: Some(3),
                }),
                alice_addr,
            )
            .await;

        match next_sent(&mut server) {
            (Packet::Event(ServerEvent::RoomCreated { player_id, room }), to) => {
                assert_eq!(to, alice_addr);
                assert_eq!(player_id, alice);
                assert_eq!(room.total_rounds, 3);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(server.dispatcher().registry().room_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_packet_cleans_up_room() {
        let mut server = test_server().await;
        let alice_addr = client_addr(5000);
        let bob_addr = client_addr(5001);
        connect(&mut server, alice_addr).await;
        let bob = connect(&mut server, bob_addr).await;

        server
            .handle_packet(
                Packet::Action(ClientAction::CreateRoom {
                    name: "Alice".to_string(),
                    avatar: String::new(),
                    rounds: None,
                }),
                alice_addr,
            )
            .await;
        let code = match next_sent(&mut server) {
            (Packet::Event(ServerEvent::RoomCreated { room, .. }), _) => room.code,
            other => panic!("unexpected: {:?}", other),
        };

        server
            .handle_packet(
                Packet::Action(ClientAction::JoinRoom {
                    room_code: code.clone(),
                    name: "Bob".to_string(),
                    avatar: String::new(),
                }),
                bob_addr,
            )
            .await;
        next_sent(&mut server);
        next_sent(&mut server);

        server.handle_packet(Packet::Disconnect, alice_addr).await;

        let (packet, to) = next_sent(&mut server);
        assert_eq!(to, bob_addr);
        assert!(matches!(packet, Packet::Event(ServerEvent::PlayerLeft { .. })));
        let (packet, _) = next_sent(&mut server);
        assert!(matches!(
            packet,
            Packet::Event(ServerEvent::NewHost { host_id, .. }) if host_id == bob
        ));

        let registry = server.dispatcher().registry();
        assert_eq!(registry.find_room(&code).unwrap().host_id, bob);
        assert_eq!(server.connections.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_replaces_connection() {
        let mut server = test_server().await;
        let addr = client_addr(5000);
        let first = connect(&mut server, addr).await;
        let second = connect(&mut server, addr).await;

        assert_ne!(first, second);
        let connections = server.connections.read().await;
        assert_eq!(connections.len(), 1);
        assert_eq!(connections.find_by_addr(addr), Some(second));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            ..ServerConfig::default()
        };
        config.game.max_players = 9;
        assert!(Server::new(config).await.is_err());
    }
}
