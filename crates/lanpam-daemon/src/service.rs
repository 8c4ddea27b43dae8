//! Listener service.
//!
//! Accepts TCP connections and spawns one [`ConnectionHandler`] task per
//! connection. The accept loop never waits on a connection, and nothing a
//! connection does can stop it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::adapters::PendingRequestRegistry;
use crate::domain::{DaemonConfig, DaemonError};
use crate::handler::{ConnectionHandler, HandlerSettings};
use crate::ports::{DecisionPresenter, HistoryRecorder, KeyProvider};

/// Pause after a failed `accept` (e.g. file descriptor exhaustion).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The device-side listener.
pub struct LanPamService {
    listen_addr: SocketAddr,
    handler: Arc<ConnectionHandler>,
}

impl LanPamService {
    /// Wire the listener to its collaborators.
    pub fn new(
        config: &DaemonConfig,
        keys: Arc<dyn KeyProvider>,
        presenter: Arc<dyn DecisionPresenter>,
        history: Arc<dyn HistoryRecorder>,
        registry: Arc<PendingRequestRegistry>,
    ) -> Self {
        let handler = ConnectionHandler::new(keys, registry, presenter, history)
            .with_settings(HandlerSettings::from_config(config));

        Self {
            listen_addr: config.listen_addr(),
            handler: Arc::new(handler),
        }
    }

    /// Configured listen address
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// Shared connection handler
    pub fn handler(&self) -> &Arc<ConnectionHandler> {
        &self.handler
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, DaemonError> {
        TcpListener::bind(self.listen_addr)
            .await
            .map_err(|source| DaemonError::Bind {
                addr: self.listen_addr,
                source,
            })
    }

    /// Accept connections on `listener` until `shutdown` completes.
    ///
    /// Connections still in flight at shutdown keep running on the runtime.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), DaemonError>
    where
        F: Future<Output = ()>,
    {
        let local = listener.local_addr()?;
        info!(addr = %local, "Listening for authorization requests");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Listener shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(peer = %peer, "Accepted connection");
                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
                        }
                        let handler = Arc::clone(&self.handler);
                        tokio::spawn(async move { handler.serve(stream, peer).await });
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }
    }

    /// Bind and serve until `shutdown` completes.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), DaemonError>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }
}
