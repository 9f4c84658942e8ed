//! CLI for hirebeat
//!
//! Subcommands:
//! - `listen`: connect and log every event on the chosen topics until Ctrl-C
//! - `send`: connect, send one message, then disconnect

use std::time::Duration;

use clap::{Parser, Subcommand};
use hirebeat::config::load_config;
use hirebeat::{ConnectionState, RealtimeClient, Topic, listener};
use serde_json::Value;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "hirebeat", about = "Realtime notification channel client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stay connected and log incoming events
    Listen {
        /// Bearer token passed to the realtime endpoint
        #[arg(long, env = "HIREBEAT_TOKEN")]
        token: String,
        /// Topics to log (default: all)
        #[arg(long = "topic")]
        topics: Vec<Topic>,
    },
    /// Send a single message
    Send {
        #[arg(long, env = "HIREBEAT_TOKEN")]
        token: String,
        /// Message type, e.g. `request_system_status`
        #[arg(long)]
        kind: String,
        /// JSON payload
        #[arg(long, default_value = "{}")]
        data: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(2);
        }
    };
    hirebeat::utils::logging::init(&settings.logging.level);

    let client = match RealtimeClient::spawn(&settings) {
        Ok(client) => client,
        Err(e) => {
            error!("Invalid realtime settings: {e}");
            std::process::exit(2);
        }
    };

    let result = match cli.command {
        Command::Listen { token, topics } => listen(&client, &token, topics).await,
        Command::Send { token, kind, data } => send(&client, &token, &kind, &data).await,
    };

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn listen(
    client: &RealtimeClient,
    token: &str,
    topics: Vec<Topic>,
) -> Result<(), Box<dyn std::error::Error>> {
    let topics = if topics.is_empty() {
        Topic::ALL.to_vec()
    } else {
        topics
    };
    for topic in topics {
        client.subscribe(
            topic,
            listener(move |payload: &Value| info!(%topic, %payload, "event")),
        );
    }

    client.connect(token).await?;
    info!("Listening; press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, disconnecting.");
    client.disconnect();
    Ok(())
}

async fn send(
    client: &RealtimeClient,
    token: &str,
    kind: &str,
    data: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let data: Value = serde_json::from_str(data)?;
    client.connect(token).await?;

    let sent = client.send(kind, data).await;
    client.disconnect();
    let mut states = client.state_changes();
    let closed = states.wait_for(|state| *state == ConnectionState::Closed);
    if tokio::time::timeout(Duration::from_secs(3), closed).await.is_err() {
        warn!("Close handshake did not complete.");
    }
    if sent {
        info!("Sent `{kind}`.");
        Ok(())
    } else {
        warn!("`{kind}` was not sent.");
        Err("send failed".into())
    }
}
