//! CLI entry point for picolog.
//!
//! `picolog run` connects to the picoammeter, allocates the next session
//! file, and logs until Ctrl-C. `picolog list-ports` enumerates the serial
//! devices visible on this machine, which is the quickest way to find the
//! USB-to-serial adaptor.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "picolog")]
#[command(about = "Stability logger for Keithley 648x picoammeters", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the picoammeter and log until Ctrl-C
    Run {
        /// Path to a TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured serial port
        #[arg(long)]
        port: Option<String>,
    },

    /// List serial ports visible on this machine
    ListPorts,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config, port } => run(config, port).await,
        Commands::ListPorts => list_ports(),
    }
}

#[cfg(feature = "instrument_serial")]
async fn run(config: Option<PathBuf>, port_override: Option<String>) -> Result<()> {
    use anyhow::Context;
    use picolog::acquisition::{self, RunOptions};
    use picolog::adapters::SerialTransport;
    use picolog::config::Settings;
    use picolog::data::session;
    use picolog::display;
    use picolog::instrument::Keithley6485;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let mut settings = Settings::load(config.as_deref())?;
    if let Some(port) = port_override {
        settings.instrument.port = port;
    }
    init_logging(&settings.log_level);

    log::info!(
        "Run started {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    let directory = &settings.storage.output_directory;
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create '{}'", directory.display()))?;
    let path = session::allocate_session_path(directory);
    let writer = session::SessionWriter::create(path)?;

    log::info!("Connecting to picoammeter on '{}'", settings.instrument.port);
    let transport = SerialTransport::open(&settings.instrument)?;
    log::info!("Initializing picoammeter");
    let driver = Keithley6485::initialize(transport, &settings.instrument).await?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Stop requested; finishing the current cycle");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let display_tx = if settings.display.enable_live_display {
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        tokio::spawn(display::run_console_sink(rx));
        Some(tx)
    } else {
        None
    };

    let options = RunOptions {
        rejection_threshold_amps: settings.instrument.rejection_threshold_amps,
        max_iterations: None,
    };
    let summary = acquisition::run(driver, writer, &options, stop, display_tx).await?;
    println!(
        "Saved {} samples to '{}'",
        summary.sample_count,
        summary.path.display()
    );
    Ok(())
}

#[cfg(not(feature = "instrument_serial"))]
async fn run(_config: Option<PathBuf>, _port_override: Option<String>) -> Result<()> {
    anyhow::bail!("Serial support not enabled. Rebuild with --features instrument_serial")
}

#[cfg(feature = "instrument_serial")]
fn list_ports() -> Result<()> {
    use anyhow::Context;

    let ports = serialport::available_ports().context("Failed to enumerate serial ports")?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port.port_name);
    }
    Ok(())
}

#[cfg(not(feature = "instrument_serial"))]
fn list_ports() -> Result<()> {
    anyhow::bail!("Serial support not enabled. Rebuild with --features instrument_serial")
}

#[cfg(feature = "instrument_serial")]
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();
}
