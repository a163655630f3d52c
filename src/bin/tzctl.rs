use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use timezone_router::realtime::{ClientEvent, ServerEvent};

#[derive(Parser)]
#[command(name = "tzctl")]
#[command(about = "Client for the timezone router", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current time in a timezone
    Time { timezone: String },
    /// Service health
    Health,
    /// Service description
    Info,
    /// Stream time updates for a timezone over WebSocket
    Watch {
        timezone: String,
        /// Stop after this many updates
        #[arg(short, long, default_value_t = 5)]
        count: usize,
        /// WebSocket endpoint path
        #[arg(long, default_value = "/ws")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Time { timezone } => {
            let res = client.get(format!("{base}/time/{timezone}")).send().await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{base}/healthcheck")).send().await?;
            print_response(res).await?;
        }
        Commands::Info => {
            let res = client.get(format!("{base}/")).send().await?;
            print_response(res).await?;
        }
        Commands::Watch { timezone, count, path } => {
            watch(&ws_url(base, &path)?, timezone, count).await?;
        }
    }

    Ok(())
}

fn ws_url(base: &str, path: &str) -> Result<String, url::ParseError> {
    let mut url = url::Url::parse(base)?.join(path)?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    // Only fails for cannot-be-a-base URLs, which `join` already rejected.
    let _ = url.set_scheme(scheme);
    Ok(url.to_string())
}

async fn watch(url: &str, timezone: String, count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let (mut socket, _) = connect_async(url).await?;
    let subscribe = serde_json::to_string(&ClientEvent::SubscribeTopic { topic: timezone })?;
    socket.send(Message::text(subscribe)).await?;

    let mut received = 0;
    while received < count {
        let Some(frame) = socket.next().await else {
            break;
        };
        let Message::Text(text) = frame? else {
            continue;
        };
        match serde_json::from_str::<ServerEvent>(text.as_str())? {
            ServerEvent::TimeUpdate(update) => println!("{}  {}", update.topic, update.current_time),
            ServerEvent::Error(error) => {
                eprintln!("Error ({}): {}", error.topic, error.error);
                break;
            }
        }
        received += 1;
    }

    socket.close(None).await?;
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {status}");
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
