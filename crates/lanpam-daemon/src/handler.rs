//! Connection Handler - per-connection state machine.
//!
//! ```text
//! Reading -> Decrypting -> AwaitingDecision -> Responding -> Closed
//! ```
//!
//! Every path ends in `Closed`: the stream is owned by [`ConnectionHandler::handle`]
//! and dropped when it returns, whatever state it returned from. Failures
//! while reading or decrypting drop the connection without a response; the
//! protocol has no error frame.
//!
//! While a request awaits its verdict the handler races three signals:
//!
//! - the registry settling the request (verdict from the presenter)
//! - the disconnect monitor seeing EOF or a socket error on the read half
//! - the optional decision timer
//!
//! Disconnect and timeout settle the entry through the registry like any
//! verdict, so whichever settles first is what the handler answers with.

use lanpam_telemetry::connection_span;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace, warn, Instrument, Span};

use crate::adapters::PendingRequestRegistry;
use crate::codec;
use crate::domain::{
    DaemonConfig, Disposition, Outcome, ProtocolError, RequestId, ResponseBody,
    REQUEST_SIZE_CEILING,
};
use crate::ports::{DecisionPresenter, HistoryRecorder, KeyProvider};

/// Per-connection tunables.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    /// Name reported in every response
    pub device_name: String,
    /// Size of the single request read
    pub max_request_size: usize,
    /// Deadline for the request to arrive
    pub read_timeout: Option<Duration>,
    /// Deadline for the verdict; expiry denies
    pub decision_timeout: Option<Duration>,
}

impl HandlerSettings {
    /// Derive settings from the daemon configuration.
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self {
            device_name: config.device.name.clone(),
            max_request_size: config.listener.max_request_size,
            read_timeout: config.listener.read_timeout(),
            decision_timeout: config.decision.timeout(),
        }
    }
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self::from_config(&DaemonConfig::default())
    }
}

/// How a connection finished, when it finished without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandledConnection {
    /// The peer closed before sending anything
    Abandoned,
    /// The request was registered and settled
    Settled {
        /// Registry identifier of the request
        request_id: RequestId,
        /// Disposition handed to history
        disposition: Disposition,
        /// Whether a response frame was written
        responded: bool,
    },
}

/// Drives accepted connections through the request lifecycle.
pub struct ConnectionHandler {
    keys: Arc<dyn KeyProvider>,
    registry: Arc<PendingRequestRegistry>,
    presenter: Arc<dyn DecisionPresenter>,
    history: Arc<dyn HistoryRecorder>,
    settings: HandlerSettings,
}

impl ConnectionHandler {
    /// Create a handler with default settings.
    pub fn new(
        keys: Arc<dyn KeyProvider>,
        registry: Arc<PendingRequestRegistry>,
        presenter: Arc<dyn DecisionPresenter>,
        history: Arc<dyn HistoryRecorder>,
    ) -> Self {
        Self {
            keys,
            registry,
            presenter,
            history,
            settings: HandlerSettings::default(),
        }
    }

    /// Replace the settings.
    pub fn with_settings(mut self, settings: HandlerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Current settings
    pub fn settings(&self) -> &HandlerSettings {
        &self.settings
    }

    /// Registry this handler parks requests in
    pub fn registry(&self) -> &Arc<PendingRequestRegistry> {
        &self.registry
    }

    /// Handle one accepted connection inside its own span and log how it
    /// ended. Never fails; errors stay with the connection.
    pub async fn serve<S>(&self, stream: S, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        async {
            match self.handle(stream).await {
                Ok(HandledConnection::Abandoned) => {
                    debug!("Peer closed without sending a request");
                }
                Ok(HandledConnection::Settled {
                    disposition,
                    responded,
                    ..
                }) => {
                    info!(%disposition, responded, "Connection closed");
                }
                Err(e) => {
                    warn!(kind = e.kind(), error = %e, "Connection dropped");
                }
            }
        }
        .instrument(connection_span!(peer))
        .await
    }

    /// Run the state machine over `stream`.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Io` / `Timeout` while reading the request or writing
    ///   the response
    /// - `ProtocolError::Parse` / `Crypto` for an undecodable request; no
    ///   request is registered and the presenter is not called
    pub async fn handle<S>(&self, stream: S) -> Result<HandledConnection, ProtocolError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);

        // Reading: one read, no framing.
        let mut buf = vec![0u8; self.settings.max_request_size.clamp(1, REQUEST_SIZE_CEILING)];
        let read = match self.settings.read_timeout {
            Some(limit) => tokio::time::timeout(limit, reader.read(&mut buf))
                .await
                .map_err(|_| ProtocolError::Timeout("request read"))??,
            None => reader.read(&mut buf).await?,
        };
        if read == 0 {
            return Ok(HandledConnection::Abandoned);
        }
        trace!(bytes = read, "Read request frame");
        if read == buf.len() {
            debug!(bytes = read, "Request filled the read buffer and may be truncated");
        }

        // Decrypting
        let envelope = codec::decode(&buf[..read])?;
        let session_key = self.keys.decrypt_key(&envelope.encrypted_key)?;
        let plain = self
            .keys
            .decrypt_body(&session_key, &envelope.encrypted_body)?;
        let body = codec::decode_body(&plain)?;

        // AwaitingDecision
        let request_id = self.registry.create();
        let guard = self.registry.guard(request_id);
        Span::current().record("request_id", tracing::field::display(request_id));
        debug!(
            source = %body.source,
            user = %body.user,
            service = %body.service,
            "Request registered"
        );

        self.presenter.present(request_id, &body).await;
        let outcome = self.await_decision(request_id, &mut reader).await;
        guard.disarm();
        let disposition = Disposition::from(outcome);

        if matches!(outcome, Outcome::Cancelled | Outcome::Expired) {
            self.presenter.withdraw(request_id).await;
        }
        if let Err(e) = self.history.record(request_id, &body, disposition).await {
            warn!(error = %e, "Failed to record request history");
        }

        if outcome == Outcome::Cancelled {
            return Ok(HandledConnection::Settled {
                request_id,
                disposition,
                responded: false,
            });
        }

        // Responding
        let response = ResponseBody {
            device: self.settings.device_name.clone(),
            accepted: outcome.accepted(),
        };
        let ciphertext = self
            .keys
            .encrypt_body(&session_key, &codec::encode_response(&response)?);
        writer.write_all(&ciphertext).await?;
        writer.flush().await?;
        if let Err(e) = writer.shutdown().await {
            debug!(error = %e, "Shutdown after response failed");
        }

        Ok(HandledConnection::Settled {
            request_id,
            disposition,
            responded: true,
        })
    }

    /// Wait for the first settlement of `request_id`.
    async fn await_decision<R>(&self, request_id: RequestId, reader: &mut R) -> Outcome
    where
        R: AsyncRead + Unpin,
    {
        let decision = self.registry.wait(&request_id);
        tokio::pin!(decision);

        let monitor = watch_disconnect(reader);
        tokio::pin!(monitor);

        let timeout = self.settings.decision_timeout;
        let expiry = async move {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(expiry);

        tokio::select! {
            outcome = &mut decision => outcome,
            () = &mut monitor => {
                if self.registry.cancel(&request_id) {
                    info!("Requester disconnected before a decision");
                }
                decision.await
            }
            () = &mut expiry => {
                if self.registry.expire(&request_id) {
                    info!("No decision before timeout, denying");
                }
                decision.await
            }
        }
    }
}

/// Resolve once the peer is gone. Bytes sent while waiting are discarded.
async fn watch_disconnect<R>(reader: &mut R)
where
    R: AsyncRead + Unpin,
{
    let mut scratch = [0u8; 256];
    loop {
        match reader.read(&mut scratch).await {
            Ok(0) => return,
            Ok(n) => trace!(bytes = n, "Discarding bytes received while awaiting decision"),
            Err(e) => {
                debug!(error = %e, "Read failed while awaiting decision");
                return;
            }
        }
    }
}
