//! Concierge daemon
//!
//! Runs the interaction cycle forever. Perception events arrive on stdin as JSON lines
//! (`{"topic": "audio_source" | "utterance" | "sonar", ...}`); pose goals and utterances are
//! written to stdout as JSON lines for the bridge that owns the robot drivers. Logs go to
//! stderr.

use anyhow::Context;
use concierge_core::{
    ActionPrimitives, ConciergeConfig, ControlLoop, HttpDialogService, JsonLinesBridge,
    PerceptionEvent, PerceptionFeeds, PerceptionState, SpeechWindowPublisher, SystemClock,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[concierge-daemon] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ConciergeConfig::load().context("load ConciergeConfig")?;

    let perception = Arc::new(PerceptionState::new());
    let speech_windows = Arc::new(SpeechWindowPublisher::new());
    let feeds = PerceptionFeeds::new(
        Arc::clone(&perception),
        speech_windows.filter(config.echo_margin_secs),
        config.bearing_confidence_threshold,
    )
    .with_max_range(config.max_range_m);

    let bridge = Arc::new(JsonLinesBridge::new(std::io::stdout()));
    let actions = ActionPrimitives::new(
        bridge.clone(),
        bridge,
        speech_windows,
        Arc::new(SystemClock),
    )
    .with_frame_id(config.frame_id.clone());

    let dialog = HttpDialogService::new(config.dialog_url.clone(), config.dialog_timeout())
        .context("build dialog service client")?;
    let mut control = ControlLoop::from_config(&config, perception, actions, Arc::new(dialog));

    tracing::info!(
        dialog_url = %config.dialog_url,
        standoff_m = config.approach_standoff_m,
        echo_margin_secs = config.echo_margin_secs,
        "concierge daemon started"
    );

    tokio::spawn(ingest(feeds));

    tokio::select! {
        _ = control.run_forever() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("CTRL-C received; shutting down concierge");
        }
    }

    Ok(())
}

/// Feed stdin perception events into the slots until input closes.
async fn ingest(feeds: PerceptionFeeds) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<PerceptionEvent>(line) {
                    Ok(event) => {
                        if let Err(e) = feeds.handle(event) {
                            tracing::warn!(error = %e, "perception event dropped");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, line, "unreadable perception line skipped"),
                }
            }
            Ok(None) => {
                tracing::warn!("perception input closed; no further sensor updates");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "perception input failed");
                break;
            }
        }
    }
}
