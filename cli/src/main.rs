//! Sketchroom CLI client - terminal drawing for shared rooms

mod client;
mod latency;
mod messages;
mod reconstruct;
mod sender;
mod surface;
mod tui;

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use client::SketchClient;
use latency::{LatencyProbe, PROBE_INTERVAL};
use messages::{ServerMessage, Style, UserProfile};
use reconstruct::{ChunkKind, StrokeContinuityReconstructor};
use surface::Surface;

#[derive(Parser)]
#[command(name = "sketchroom")]
#[command(about = "CLI client for Sketchroom - shared real-time drawing rooms")]
#[command(version)]
struct Cli {
    /// Server URL (default: ws://localhost:3000/ws)
    #[arg(short, long, default_value = "ws://localhost:3000/ws")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a room and draw with the mouse
    Draw {
        /// Room to join (default: public)
        #[arg(short, long)]
        room: Option<String>,

        /// Your display name
        #[arg(short = 'n', long, default_value = "CLI User")]
        name: String,

        /// Your color, also the initial brush color
        #[arg(short, long, default_value = "#4ECDC4")]
        color: String,
    },

    /// Join a room headless and log what happens in it
    Watch {
        /// Room to join (default: public)
        #[arg(short, long)]
        room: Option<String>,

        /// Display name
        #[arg(short = 'n', long, default_value = "Watcher")]
        name: String,

        /// Canvas width in units
        #[arg(long, default_value_t = 800)]
        width: usize,

        /// Canvas height in units
        #[arg(long, default_value_t = 600)]
        height: usize,

        /// Exit after this many events
        #[arg(long)]
        events: Option<usize>,
    },

    /// Measure round-trip latency to the server
    Ping {
        /// Number of probes
        #[arg(short = 'c', long, default_value_t = 5)]
        count: u32,

        /// Milliseconds between probes
        #[arg(short, long, default_value_t = PROBE_INTERVAL.as_millis() as u64)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchroom_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    validate_server_url(&cli.server)?;

    match cli.command {
        Commands::Draw { room, name, color } => run_draw(&cli.server, room, name, color).await,
        Commands::Watch {
            room,
            name,
            width,
            height,
            events,
        } => run_watch(&cli.server, room, name, width, height, events).await,
        Commands::Ping { count, interval } => {
            run_ping(&cli.server, count, Duration::from_millis(interval)).await
        }
    }
}

fn validate_server_url(server: &str) -> Result<()> {
    let url = url::Url::parse(server).with_context(|| format!("Invalid server URL: {}", server))?;
    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => bail!("Unsupported scheme '{}', expected ws or wss", other),
    }
}

async fn run_draw(server: &str, room: Option<String>, name: String, color: String) -> Result<()> {
    let mut client = SketchClient::connect(server).await?;

    let style = Style {
        color: color.clone(),
        ..Style::default()
    };
    let (room_id, users) = client.join(room, UserProfile { name, color }).await?;
    tracing::info!("Joined room {} with {} users", room_id, users.len());

    // Run TUI
    tui::run(client, room_id, users, style).await
}

async fn run_watch(
    server: &str,
    room: Option<String>,
    name: String,
    width: usize,
    height: usize,
    limit: Option<usize>,
) -> Result<()> {
    let mut client = SketchClient::connect(server).await?;
    let profile = UserProfile {
        name,
        color: "#888888".to_string(),
    };
    let (room_id, users) = client.join(room, profile).await?;

    println!("Watching room {} ({} users)", room_id, users.len());
    for user in &users {
        println!("  {} ({})", user.name, user.id);
    }

    let mut surface = Surface::new(width, height);
    let mut remote = StrokeContinuityReconstructor::new();
    let mut seen = 0usize;

    client
        .listen(|event| {
            match event {
                ServerMessage::UserJoined { id, user, .. } => {
                    let name = user.map(|u| u.name).unwrap_or_default();
                    println!("[join] {} ({})", name, id);
                }
                ServerMessage::UserLeft { id, .. } => println!("[leave] {}", id),
                ServerMessage::StrokeChunk { by, points, style } => {
                    remote.apply_chunk(by, &points, &style, ChunkKind::Stroke, &mut surface);
                    tracing::debug!("stroke chunk from {}: {} points", by, points.len());
                }
                ServerMessage::EraseChunk { by, points, style } => {
                    remote.apply_chunk(by, &points, &style, ChunkKind::Erase, &mut surface);
                    tracing::debug!("erase chunk from {}: {} points", by, points.len());
                }
                ServerMessage::StrokeEnd { by, .. } => {
                    remote.end_stroke(by);
                    println!("[stroke] {} finished, {} cells painted", by, surface.painted());
                }
                ServerMessage::HistoryApply { entries } => {
                    surface.replay(&entries);
                    println!(
                        "[history] {} ops, {} cells painted",
                        entries.len(),
                        surface.painted()
                    );
                }
                ServerMessage::Cursor { id, x, y } => {
                    tracing::trace!("cursor {} at {:?},{:?}", id, x, y);
                }
                ServerMessage::RoomInit { .. } | ServerMessage::PongLatency => {}
            }
            seen += 1;
            limit.map_or(true, |limit| seen < limit)
        })
        .await?;

    Ok(())
}

async fn run_ping(server: &str, count: u32, interval: Duration) -> Result<()> {
    let mut client = SketchClient::connect(server).await?;
    let mut probe = LatencyProbe::new();
    let mut samples = Vec::new();

    println!("Pinging {}...", server);

    for seq in 1..=count {
        probe.start(Instant::now());
        client.ping().await?;

        let reply = tokio::time::timeout(interval.max(Duration::from_secs(1)), async {
            while let Some(msg) = client.recv().await {
                if msg == ServerMessage::PongLatency {
                    return probe.on_pong(Instant::now());
                }
            }
            None
        })
        .await;

        match reply {
            Ok(Some(rtt)) => {
                println!("seq={} rtt={:.1} ms", seq, rtt.as_secs_f64() * 1000.0);
                samples.push(rtt);
            }
            Ok(None) => bail!("Connection closed"),
            Err(_) => println!("seq={} timed out", seq),
        }

        if seq < count {
            tokio::time::sleep(interval).await;
        }
    }

    if let (Some(min), Some(max)) = (samples.iter().min(), samples.iter().max()) {
        let avg = samples.iter().sum::<Duration>() / samples.len() as u32;
        println!(
            "{} probes, {} replies, min/avg/max = {:.1}/{:.1}/{:.1} ms",
            count,
            samples.len(),
            min.as_secs_f64() * 1000.0,
            avg.as_secs_f64() * 1000.0,
            max.as_secs_f64() * 1000.0
        );
    }

    Ok(())
}
