//! LAN-PAM Daemon - device-side listener for remote authorization requests.
//!
//! A PAM helper on another machine (`lanpam-exec`) sends an encrypted request
//! over TCP. The daemon decrypts it, shows it to whoever decides, holds the
//! connection open until a verdict arrives (or the requester leaves), and
//! answers with an encrypted verdict.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        LAN-PAM DAEMON                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   TCP :4200  ──►  LanPamService (accept loop, task per conn)      │
//! │                          │                                        │
//! │                          ▼                                        │
//! │   ConnectionHandler: Reading → Decrypting → AwaitingDecision      │
//! │                      → Responding → Closed                        │
//! │        │ KeyProvider        │ create/wait         │ present        │
//! │        ▼                    ▼                     ▼                │
//! │   DeviceKeyProvider   PendingRequestRegistry  DecisionPresenter   │
//! │                             ▲                     │                │
//! │                             └──── DecisionSink ◄──┘ (verdicts)     │
//! │                                                                    │
//! │   HistoryRecorder ◄── disposition per settled request              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use lanpam_daemon::{adapters::*, DaemonConfig, LanPamService};
//!
//! let config = DaemonConfig::default();
//! let keys = KeyStore::new(&config.storage.key_dir).load_or_generate()?;
//! let registry = Arc::new(PendingRequestRegistry::new());
//! let (presenter, events) = ChannelPresenter::new();
//!
//! let service = LanPamService::new(
//!     &config,
//!     Arc::new(DeviceKeyProvider::new(keys)),
//!     Arc::new(presenter),
//!     Arc::new(RequestHistory::in_memory(500)),
//!     registry,
//! );
//! service.run(shutdown_signal()).await?;
//! ```
//!
//! # Wire compatibility
//!
//! RSA PKCS#1 v1.5 key transport and AES-256-ECB bodies are what deployed
//! requesters speak. There is no integrity protection on the body and no
//! message framing beyond a single read of at most
//! [`MAX_REQUEST_SIZE`] bytes.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod client;
pub mod codec;
pub mod domain;
pub mod handler;
pub mod ports;
pub mod service;

// Re-exports
pub use client::{request_decision, ClientError};
pub use domain::{
    DaemonConfig, DaemonError, Disposition, HistoryEntry, Outcome, ProtocolError, RequestBody,
    RequestId, ResponseBody, DEFAULT_PORT, MAX_REQUEST_SIZE,
};
pub use handler::{ConnectionHandler, HandledConnection, HandlerSettings};
pub use ports::{DecisionPresenter, DecisionSink, HistoryRecorder, KeyProvider};
pub use service::LanPamService;
