//! ledshows - Main Entry Point
//!
//! Opens the configured LED strip, runs the show controller on its own
//! thread and feeds control messages read from stdin into the in-process
//! broker. Each stdin line is `<topic> <payload>`; topics may be given
//! relative to `<prefix>/<sys_name>/`.

use anyhow::Context;
use clap::Parser;
use ledshows::{
    config::{self, AppConfig},
    control::{ConsoleBridge, ControlChannel, LocalBroker},
    controller::ShowController,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "ledshows", version, about = "Light shows for APA102 LED strips")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured level (RUST_LOG wins over both)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (config, source) =
        AppConfig::resolve(args.config.as_deref(), config::default_config_path())
            .context("Failed to load configuration")?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(&config, args.log_level.as_deref())?;

    tracing::info!("Using configuration {}", source);
    tracing::info!("Starting ledshows as \"{}\"", config.sys_name);

    let broker: Arc<dyn ControlChannel> = Arc::new(LocalBroker::new());
    let (controller, handle) = ShowController::from_config(&config, broker.clone())?;
    let topics = controller.topics().clone();
    let controller_thread = controller.spawn()?;

    let bridge = ConsoleBridge::new(broker, topics);
    bridge.spawn_status_logger()?;

    let forwarded = bridge.run(std::io::stdin().lock())?;
    tracing::info!("Input closed after {} messages, shutting down...", forwarded);

    // The controller may already be gone if its channel closed
    let _ = handle.shutdown();
    match controller_thread.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("Controller thread panicked"),
    }

    Ok(())
}

fn init_logging(
    config: &AppConfig,
    level: Option<&str>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or(&config.log_level)))
        .context("Invalid log filter")?;

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let directory = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
