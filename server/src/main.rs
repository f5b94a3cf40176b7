use clap::Parser;
use log::info;
use server::config::{GameConfig, ServerConfig};
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of simultaneous connections
    #[arg(short, long, default_value = "256")]
    max_connections: usize,

    /// Seconds of silence before a client is dropped
    #[arg(short = 't', long, default_value = "30")]
    client_timeout: u64,

    /// Rounds per game when the host does not choose
    #[arg(short = 'r', long, default_value = "5")]
    default_rounds: u32,

    /// Players allowed per room (2-4)
    #[arg(long, default_value = "4")]
    max_players: usize,

    /// Seconds between status log lines
    #[arg(long, default_value = "60")]
    status_interval: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        max_connections: args.max_connections,
        client_timeout: Duration::from_secs(args.client_timeout),
        status_interval: Duration::from_secs(args.status_interval),
        game: GameConfig {
            default_rounds: args.default_rounds,
            max_players: args.max_players,
        },
    };

    let mut server = Server::new(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
