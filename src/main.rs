use anyhow::Result;
use clap::Parser;
use emocam_client::{Config, ConnectionManager, ReconnectPolicy, SessionConfig, SessionController};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "emocam-client",
    about = "Realtime microphone streaming client for the EmotionCam analysis service"
)]
struct Args {
    /// Path to the config file, without extension
    #[arg(long, default_value = "config/emocam-client")]
    config: String,

    /// Override the analysis service WebSocket URL
    #[arg(long)]
    server_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config).unwrap_or_else(|e| {
        warn!("could not load config ({}), using defaults", e);
        Config::default()
    });

    let mut session_config = SessionConfig::from_config(&cfg);
    if let Some(url) = args.server_url {
        session_config.server_url = url;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("analysis service: {}", session_config.server_url);

    let connection = Arc::new(ConnectionManager::new(
        session_config.server_url.clone(),
        ReconnectPolicy {
            max_attempts: cfg.connection.reconnect_attempts,
            delay: Duration::from_millis(cfg.connection.reconnect_delay_ms),
        },
    ));
    connection.connect();

    let mut session = SessionController::new(session_config, Arc::clone(&connection));
    session.start()?;

    let display = session.display();
    let mut ticker = tokio::time::interval(Duration::from_secs(2));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                if let Ok(state) = display.lock() {
                    info!(
                        "transcript: {:?} | emotion: {} | sentiment: {} | tone: {} | connection: {:?}",
                        state.transcript, state.emotion, state.sentiment, state.tone,
                        connection.state()
                    );
                }
            }
        }
    }

    let stats = session.stats();
    session.stop();

    info!(
        "session ended: {} frames sent over {:.1}s",
        stats.frames_sent, stats.duration_secs
    );

    Ok(())
}
