//! # lanpam-exec
//!
//! PAM helper for `pam_exec.so`. Asks every configured device at once and
//! exits with the first verdict:
//!
//! - `0` accepted
//! - `1` rejected, no device answered, or the overall timeout passed
//!
//! ```text
//! auth sufficient pam_exec.so quiet /usr/local/bin/lanpam-exec /etc/lanpam/requester.json
//! ```
//!
//! Reads `PAM_USER`, `PAM_SERVICE` and `PAM_TYPE` from the environment.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinSet;
use tracing::{info, warn};

use lanpam_crypto::DevicePublicKey;
use lanpam_daemon::client::{DeviceEntry, RequesterConfig};
use lanpam_daemon::{request_decision, ClientError, RequestBody, ResponseBody};
use lanpam_telemetry::{init_telemetry, TelemetryConfig};

/// Delay before reporting an empty or undecryptable verdict, to slow down guessing.
const BAD_RESPONSE_DELAY: Duration = Duration::from_secs(3);

/// Ask LAN-PAM devices to approve a PAM request
#[derive(Parser, Debug)]
#[command(name = "lanpam-exec", version)]
struct Args {
    /// Requester JSON configuration
    config: PathBuf,

    /// Give up after this many seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_telemetry(&TelemetryConfig::for_service("lanpam-exec")) {
        eprintln!("failed to initialize logging: {e}");
    }

    match run(&args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("lanpam-exec: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the request was accepted.
async fn run(args: &Args) -> Result<bool> {
    let config = RequesterConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    let body = RequestBody {
        source: config.source_name.clone(),
        user: pam_var("PAM_USER")?,
        service: pam_var("PAM_SERVICE")?,
        request_type: pam_var("PAM_TYPE")?,
    };

    let mut devices = JoinSet::new();
    for device in config.devices {
        let body = body.clone();
        devices.spawn(async move {
            let result = ask_device(&device, &body).await;
            (device.name, result)
        });
    }

    let first_verdict = async {
        while let Some(joined) = devices.join_next().await {
            let (name, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(error = %e, "Device task failed");
                    continue;
                }
            };
            match result {
                Ok(response) => {
                    let verdict = if response.accepted { "accepted" } else { "rejected" };
                    println!("request {verdict} by {} ({name})", response.device);
                    return Some(response.accepted);
                }
                Err(e) => println!("no verdict from {name}: {e:#}"),
            }
        }
        None
    };

    let limit = Duration::from_secs(args.timeout_secs);
    match tokio::time::timeout(limit, first_verdict).await {
        Ok(Some(accepted)) => Ok(accepted),
        Ok(None) => {
            info!("No device returned a verdict");
            Ok(false)
        }
        Err(_) => {
            info!(timeout_secs = args.timeout_secs, "Timed out waiting for a verdict");
            Ok(false)
        }
    }
}

async fn ask_device(device: &DeviceEntry, body: &RequestBody) -> Result<ResponseBody> {
    let public_key = DevicePublicKey::from_base64(&device.public_key)
        .with_context(|| format!("invalid public key for {}", device.name))?;

    match request_decision(device.ip_address.as_str(), &public_key, body, None).await {
        Ok(response) => Ok(response),
        Err(e) if e.is_bad_response() => {
            tokio::time::sleep(BAD_RESPONSE_DELAY).await;
            Err(e.into())
        }
        Err(ClientError::Connect(e)) => {
            Err(e).with_context(|| format!("failed to connect to {}", device.ip_address))
        }
        Err(e) => Err(e.into()),
    }
}

fn pam_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} not set"))
}
