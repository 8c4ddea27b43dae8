//! Test fixtures shared by the integration suites.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use lanpam_crypto::DeviceKeyPair;
use lanpam_daemon::adapters::{
    ChannelPresenter, DeviceKeyProvider, PendingRequestRegistry, PresenterEvent, RequestHistory,
};
use lanpam_daemon::{DaemonConfig, LanPamService, RequestBody, RequestId};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Device name every fixture daemon reports.
pub const DEVICE_NAME: &str = "Integration Device";

/// How long a test waits for something that should happen promptly.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// One RSA key pair for the whole suite; generation is slow.
pub fn device_keys() -> &'static DeviceKeyPair {
    static KEYS: OnceLock<DeviceKeyPair> = OnceLock::new();
    KEYS.get_or_init(|| DeviceKeyPair::generate().expect("RSA key generation"))
}

/// Request body for `user` on the `sudo` service.
pub fn request_body(user: &str) -> RequestBody {
    RequestBody {
        source: "ci-runner".to_string(),
        user: user.to_string(),
        service: "sudo".to_string(),
        request_type: "auth".to_string(),
    }
}

/// A listener running on an ephemeral localhost port.
pub struct TestDaemon {
    /// Address clients connect to
    pub addr: SocketAddr,
    /// Registry the listener parks requests in
    pub registry: Arc<PendingRequestRegistry>,
    /// History the listener records into
    pub history: Arc<RequestHistory>,
    /// Presenter events (what a UI would see)
    pub events: UnboundedReceiver<PresenterEvent>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TestDaemon {
    /// Start with default settings and in-memory history.
    pub async fn start() -> Self {
        Self::start_with(DaemonConfig::default(), None).await
    }

    /// Start with a decision timeout.
    pub async fn start_with_decision_timeout(secs: u64) -> Self {
        let mut config = DaemonConfig::default();
        config.decision.timeout_secs = secs;
        Self::start_with(config, None).await
    }

    /// Start with history persisted to `history_file`.
    pub async fn start_with_history_file(history_file: &Path) -> Self {
        Self::start_with(DaemonConfig::default(), Some(history_file)).await
    }

    async fn start_with(mut config: DaemonConfig, history_file: Option<&Path>) -> Self {
        config.device.name = DEVICE_NAME.to_string();

        let registry = Arc::new(PendingRequestRegistry::new());
        let history = Arc::new(match history_file {
            Some(path) => RequestHistory::open(path, config.storage.max_history),
            None => RequestHistory::in_memory(config.storage.max_history),
        });
        let (presenter, events) = ChannelPresenter::new();

        let service = LanPamService::new(
            &config,
            Arc::new(DeviceKeyProvider::new(device_keys().clone())),
            Arc::new(presenter),
            history.clone(),
            registry.clone(),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let (stop, stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            service
                .serve(listener, async {
                    let _ = stopped.await;
                })
                .await
                .expect("listener failed");
        });

        Self {
            addr,
            registry,
            history,
            events,
            stop: Some(stop),
            task: Some(task),
        }
    }

    /// Wait for the next request to be presented.
    pub async fn next_presented(&mut self) -> (RequestId, RequestBody) {
        match tokio::time::timeout(STEP_TIMEOUT, self.events.recv()).await {
            Ok(Some(PresenterEvent::Presented { request_id, body })) => (request_id, body),
            other => panic!("expected a presented request, got {other:?}"),
        }
    }

    /// Wait for the next withdrawal.
    pub async fn next_withdrawn(&mut self) -> RequestId {
        match tokio::time::timeout(STEP_TIMEOUT, self.events.recv()).await {
            Ok(Some(PresenterEvent::Withdrawn { request_id })) => request_id,
            other => panic!("expected a withdrawn request, got {other:?}"),
        }
    }

    /// Assert nothing was presented within a short grace period.
    pub async fn assert_nothing_presented(&mut self) {
        let waited = tokio::time::timeout(Duration::from_millis(100), self.events.recv()).await;
        assert!(waited.is_err(), "unexpected presenter event: {waited:?}");
    }

    /// Wait until history holds at least `count` entries.
    pub async fn wait_for_history(&self, count: usize) {
        eventually(|| self.history.len() >= count).await;
    }

    /// Stop accepting and wait for the accept loop to exit.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.expect("listener task panicked");
        }
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Poll `condition` until it holds or [`STEP_TIMEOUT`] passes.
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within {STEP_TIMEOUT:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
