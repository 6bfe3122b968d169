//! HotkeyMaster - trackpad tap gesture engine
//!
//! Classifies multi-finger trackpad taps and dispatches the bound actions.

use anyhow::Context;
use hotkeymaster_lib::app::cli::{Cli, Commands};
use hotkeymaster_lib::capture::touch::{ReplaySource, TrackpadChannel};
use hotkeymaster_lib::capture::hardware_frame_source;
use hotkeymaster_lib::config::Config;
use hotkeymaster_lib::dispatch::{
    spawn_dispatcher, BindingHandler, GestureHandler, LogHandler, LogRunner,
};
use hotkeymaster_lib::engine::InputChannel;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        // Stdout stays clean so the JSON can be piped into a file
        Commands::DefaultConfig => println!("{}", Config::default().to_json()?),
        Commands::Listen => {
            let config = prepare(cli.verbose, cli.config.as_deref())?;
            run_listen(config).await?;
        }
        Commands::Replay { trace, speed } => {
            let config = prepare(cli.verbose, cli.config.as_deref())?;
            run_replay(&trace, speed, config).await?;
        }
    }

    Ok(())
}

fn prepare(verbose: bool, config_path: Option<&Path>) -> anyhow::Result<Config> {
    hotkeymaster_lib::init_tracing(verbose);
    Config::load_or_default(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))
}

fn gesture_handler(config: &Config) -> Arc<dyn GestureHandler> {
    if config.bindings.is_empty() {
        return Arc::new(LogHandler);
    }
    info!("Loaded {} gesture binding(s)", config.bindings.len());
    Arc::new(BindingHandler::new(
        config.bindings.clone(),
        Arc::new(LogRunner),
    ))
}

async fn run_listen(config: Config) -> anyhow::Result<()> {
    let source = hardware_frame_source().context("Trackpad capture unavailable")?;
    let handler = gesture_handler(&config);

    let (gesture_tx, gesture_rx) = mpsc::unbounded_channel();
    let dispatcher = spawn_dispatcher(gesture_rx, handler);
    let mut channel = TrackpadChannel::new(config.classifier, config.engine, source, gesture_tx);

    channel
        .start()
        .await
        .context("Failed to start trackpad channel")?;
    info!("Listening for trackpad taps; press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    channel.stop().await?;
    let stats = channel.stats();
    drop(channel);
    let handled = dispatcher.await?;

    info!(
        "Stopped: {} frame(s), {} tap(s), {} event(s) dispatched",
        stats.frames_processed, stats.taps_emitted, handled
    );
    Ok(())
}

async fn run_replay(trace: &Path, speed: f64, config: Config) -> anyhow::Result<()> {
    let (done_tx, done_rx) = oneshot::channel();
    let source = ReplaySource::from_path(trace, Cli::time_scale(speed))
        .with_context(|| format!("Failed to load trace {:?}", trace))?
        .on_finished(move || {
            let _ = done_tx.send(());
        });
    let frame_count = source.frame_count();
    let handler = gesture_handler(&config);

    let (gesture_tx, gesture_rx) = mpsc::unbounded_channel();
    let dispatcher = spawn_dispatcher(gesture_rx, handler);
    let mut channel =
        TrackpadChannel::new(config.classifier, config.engine, Box::new(source), gesture_tx);

    channel.start().await.context("Failed to start replay")?;

    tokio::select! {
        _ = done_rx => {}
        _ = tokio::signal::ctrl_c() => info!("Replay interrupted"),
    }

    channel.stop().await?;
    let stats = channel.stats();
    drop(channel);
    let handled = dispatcher.await?;

    info!(
        "Replayed {} frame(s): {} tap(s) ({} phantom), {} phantom burst(s) rejected, {} event(s) dispatched",
        frame_count, stats.taps_emitted, stats.phantom_taps_emitted, stats.phantom_rejected, handled
    );
    Ok(())
}
