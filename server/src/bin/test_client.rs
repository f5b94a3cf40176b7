//! Scripted smoke-test client: connects, creates a room, asks for the
//! server status and leaves.

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{info, warn};
use shared::{ClientAction, Packet, ServerEvent, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: SocketAddr,

    /// Display name to use
    #[arg(short = 'n', long, default_value = "Tester")]
    name: String,

    /// Rounds for the created room
    #[arg(short = 'r', long)]
    rounds: Option<u32>,
}

async fn send(socket: &UdpSocket, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
    socket.send(&serialize(packet)?).await?;
    Ok(())
}

async fn receive(socket: &UdpSocket) -> Result<Packet, Box<dyn std::error::Error>> {
    let mut buf = [0u8; MAX_PACKET_SIZE];
    let len = timeout(Duration::from_secs(2), socket.recv(&mut buf)).await??;
    Ok(deserialize(&buf[..len])?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(args.server).await?;
    info!("Client socket bound to {}", socket.local_addr()?);

    send(
        &socket,
        &Packet::Connect {
            client_version: PROTOCOL_VERSION,
        },
    )
    .await?;
    let client_id = match receive(&socket).await? {
        Packet::Connected { client_id } => client_id,
        other => return Err(format!("connection refused: {:?}", other).into()),
    };
    info!("Connected as client {}", client_id);

    send(
        &socket,
        &Packet::Action(ClientAction::CreateRoom {
            name: args.name,
            avatar: "🤖".to_string(),
            rounds: args.rounds,
        }),
    )
    .await?;
    match receive(&socket).await? {
        Packet::Event(ServerEvent::RoomCreated { room, .. }) => {
            info!(
                "Created room {} ({} rounds, up to {} players)",
                room.code, room.total_rounds, room.max_players
            );
        }
        other => warn!("Unexpected reply to create: {:?}", other),
    }

    send(&socket, &Packet::Action(ClientAction::Status)).await?;
    match receive(&socket).await? {
        Packet::Event(ServerEvent::Status {
            rooms,
            participants,
        }) => info!("Server has {} rooms and {} players", rooms, participants),
        other => warn!("Unexpected reply to status: {:?}", other),
    }

    send(&socket, &Packet::Disconnect).await?;
    info!("Disconnected");
    Ok(())
}
