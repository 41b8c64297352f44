use clap::Parser;
use client::Client;
use log::{error, info};
use shared::resolve_display_name;
use tokio::io::{self, AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3306")]
    server: String,

    /// Name to chat under; a random animal name is picked when empty
    #[arg(short = 'n', long, default_value = "")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let user_name = resolve_display_name(&args.name, &mut rand::thread_rng());

    info!("Connecting to: {}", args.server);
    let mut client = Client::new(&args.server, user_name).await?;
    client.join().await?;

    println!("Chatting as {}", client.user_name());
    println!("{} has entered the room.", client.user_name());
    info!("Type a message and press Enter; /quit or Ctrl+D to leave");

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) if line.trim() == "/quit" => break,
                    Ok(Some(line)) => {
                        if let Err(e) = client.send_chat(&line).await {
                            println!("Error sending message: {}", e);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("Error reading input: {}", e);
                        break;
                    }
                }
            },

            event = client.recv_event() => {
                match event {
                    Ok(Some(event)) => println!("{}", event),
                    Ok(None) => {}
                    Err(e) => println!("Listener Error: {}", e),
                }
            },

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, leaving the room...");
                break;
            }
        }
    }

    if let Err(e) = client.leave().await {
        eprintln!("Error sending exit message: {}", e);
    }

    Ok(())
}
