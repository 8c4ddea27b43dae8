//! Channel-backed presenter.
//!
//! Forwards every presentation and withdrawal as a [`PresenterEvent`] on an
//! unbounded channel, decoupling the connection handler from whatever UI
//! consumes the events (the console prompt, a test harness).

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::{RequestBody, RequestId};
use crate::ports::DecisionPresenter;

/// Event emitted for each presenter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    /// A request is waiting for a verdict
    Presented {
        /// Request to answer
        request_id: RequestId,
        /// What is being asked
        body: RequestBody,
    },
    /// A request settled without a verdict and should no longer be shown
    Withdrawn {
        /// Request that went away
        request_id: RequestId,
    },
}

/// `DecisionPresenter` that publishes onto an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelPresenter {
    tx: mpsc::UnboundedSender<PresenterEvent>,
}

impl ChannelPresenter {
    /// Create the presenter and the receiving end of its event stream.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PresenterEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn publish(&self, event: PresenterEvent) {
        if self.tx.send(event).is_err() {
            warn!("Presenter event dropped, no consumer attached");
        }
    }
}

#[async_trait]
impl DecisionPresenter for ChannelPresenter {
    async fn present(&self, request_id: RequestId, body: &RequestBody) {
        info!(
            request_id = %request_id,
            source = %body.source,
            user = %body.user,
            service = %body.service,
            request_type = %body.request_type,
            "Authorization request awaiting decision"
        );
        self.publish(PresenterEvent::Presented {
            request_id,
            body: body.clone(),
        });
    }

    async fn withdraw(&self, request_id: RequestId) {
        self.publish(PresenterEvent::Withdrawn { request_id });
    }
}
