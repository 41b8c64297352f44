use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::dashboard::Dashboard;
use server::filter::ContentFilter;
use server::network::Server;
use shared::{DEFAULT_BUFFER_SIZE, DEFAULT_FILTER_PATH, DEFAULT_HOST, DEFAULT_PORT};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value_t = DEFAULT_HOST.to_string())]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Receive buffer size in bytes; longer datagrams are truncated
    #[arg(short, long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Newline-delimited list of banned words
    #[arg(short, long, default_value = DEFAULT_FILTER_PATH)]
    filter: PathBuf,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            buffer_size: args.buffer_size,
            filter_path: args.filter,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::from(Args::parse());

    info!("Starting chat server...");
    let filter = ContentFilter::load(&config.filter_path);
    let mut server = Server::bind(&config, filter, Dashboard::new()).await?;
    let handle = server.handle();

    let mut server_task = tokio::spawn(async move { server.run().await });

    tokio::select! {
        result = &mut server_task => {
            match result {
                Ok(result) => result?,
                Err(e) => error!("Server task panicked: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            handle.shutdown();
            if let Ok(Err(e)) = server_task.await {
                error!("Server stopped with error: {}", e);
            }
        }
    }

    Ok(())
}
