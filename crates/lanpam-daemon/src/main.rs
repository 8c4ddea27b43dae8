//! # LAN-PAM Daemon
//!
//! Device-side listener. Verdicts are entered on the console.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`LANPAM_LOG_LEVEL`, `LANPAM_JSON_LOGS`)
//! 2. Load configuration (file, then env, then CLI flags) and validate
//! 3. Load or create the device key pair
//! 4. Open request history
//! 5. Start the console decision source
//! 6. Serve until Ctrl+C

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};

use lanpam_daemon::adapters::{
    ChannelPresenter, ConsoleDecisions, DeviceKeyProvider, KeyStore, PendingRequestRegistry,
    RequestHistory,
};
use lanpam_daemon::{DaemonConfig, LanPamService};
use lanpam_telemetry::{init_telemetry, TelemetryConfig};

/// LAN-PAM device daemon
#[derive(Parser, Debug)]
#[command(name = "lanpam-daemon", version)]
#[command(about = "Answer LAN-PAM authorization requests from this machine")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "LANPAM_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port (overrides config and LANPAM_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the base64 DER public key for requester configs and exit
    #[arg(long)]
    print_public_key: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_telemetry(&TelemetryConfig::for_service("lanpam-daemon"))
        .context("Failed to initialize logging")?;

    let config = load_config(&args)?;

    let keys = KeyStore::new(&config.storage.key_dir)
        .load_or_generate()
        .context("Failed to load device key")?;
    let provider = DeviceKeyProvider::new(keys);

    if args.print_public_key {
        let public_key = provider
            .public_key()
            .to_base64()
            .context("Failed to encode public key")?;
        println!("{public_key}");
        return Ok(());
    }

    let history = Arc::new(match config.history_path() {
        Some(path) => RequestHistory::open(path, config.storage.max_history),
        None => RequestHistory::in_memory(config.storage.max_history),
    });

    let registry = Arc::new(PendingRequestRegistry::new());
    let (presenter, events) = ChannelPresenter::new();

    let console = ConsoleDecisions::new(registry.clone());
    tokio::spawn(async move {
        let input = BufReader::new(tokio::io::stdin());
        if let Err(e) = console.run(input, tokio::io::stdout(), events).await {
            warn!(error = %e, "Console stopped");
        }
    });

    let service = LanPamService::new(
        &config,
        Arc::new(provider),
        Arc::new(presenter),
        history,
        registry,
    );

    info!(
        device = %config.device.name,
        addr = %service.listen_addr(),
        decision_timeout_secs = config.decision.timeout_secs,
        "Starting LAN-PAM daemon"
    );

    service
        .run(shutdown_signal())
        .await
        .context("Listener failed")?;

    info!("LAN-PAM daemon stopped");
    Ok(())
}

/// Load configuration from file, environment and CLI, in that order.
fn load_config(args: &Args) -> Result<DaemonConfig> {
    let mut config = match &args.config {
        Some(path) => DaemonConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DaemonConfig::default(),
    };

    config.apply_env_overrides();
    if let Some(port) = args.port {
        config.listener.port = port;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
