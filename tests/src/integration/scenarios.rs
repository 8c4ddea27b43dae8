//! # Connection Scenarios
//!
//! One connection each, driven over real TCP:
//!
//! 1. **Accepted verdict**: encrypted `accepted: true` response, `ACCEPTED` in history
//! 2. **Requester leaves**: `CANCELLED` in history, prompt withdrawn, no response
//! 3. **Empty connection**: nothing registered, nothing presented
//! 4. **Undecryptable key**: dropped without response or prompt
//! 5. **Wrong device key**: requester sees the connection close without a verdict

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use lanpam_crypto::{DeviceKeyPair, SessionKey};
    use lanpam_daemon::client::{open_response, prepare_request};
    use lanpam_daemon::codec;
    use lanpam_daemon::domain::Envelope;
    use lanpam_daemon::{request_decision, ClientError, Disposition};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use crate::support::{device_keys, request_body, TestDaemon, DEVICE_NAME, STEP_TIMEOUT};

    async fn read_all(stream: &mut TcpStream) -> Vec<u8> {
        let mut raw = Vec::new();
        tokio::time::timeout(STEP_TIMEOUT, stream.read_to_end(&mut raw))
            .await
            .expect("server did not close the connection")
            .expect("read failed");
        raw
    }

    // =============================================================================
    // VERDICTS
    // =============================================================================

    #[tokio::test]
    async fn test_accepted_request_gets_encrypted_verdict() {
        let mut daemon = TestDaemon::start().await;
        let addr = daemon.addr;

        let client = tokio::spawn(async move {
            request_decision(
                addr,
                &device_keys().public_key(),
                &request_body("alice"),
                Some(STEP_TIMEOUT),
            )
            .await
        });

        let (id, body) = daemon.next_presented().await;
        assert_eq!(body, request_body("alice"));
        assert!(daemon.registry.resolve(&id, true));

        let response = client.await.unwrap().unwrap();
        assert!(response.accepted);
        assert_eq!(response.device, DEVICE_NAME);

        daemon.wait_for_history(1).await;
        let entry = &daemon.history.entries()[0];
        assert_eq!(entry.id, id);
        assert_eq!(entry.status, Disposition::Accepted);
        assert_eq!(entry.user, "alice");

        daemon.shutdown().await;
    }

    #[tokio::test]
    async fn test_rejected_request_gets_denial() {
        let mut daemon = TestDaemon::start().await;
        let addr = daemon.addr;

        let client = tokio::spawn(async move {
            request_decision(addr, &device_keys().public_key(), &request_body("bob"), None).await
        });

        let (id, _) = daemon.next_presented().await;
        daemon.registry.resolve(&id, false);

        assert!(!client.await.unwrap().unwrap().accepted);
        daemon.wait_for_history(1).await;
        assert_eq!(daemon.history.entries()[0].status, Disposition::Rejected);
    }

    // =============================================================================
    // DISCONNECT
    // =============================================================================

    #[tokio::test]
    async fn test_disconnect_before_verdict_is_cancelled() {
        let mut daemon = TestDaemon::start().await;
        let request = prepare_request(&device_keys().public_key(), &request_body("carol")).unwrap();

        let mut stream = TcpStream::connect(daemon.addr).await.unwrap();
        stream.write_all(&request.frame).await.unwrap();
        let (id, _) = daemon.next_presented().await;

        drop(stream);

        assert_eq!(daemon.next_withdrawn().await, id);
        daemon.wait_for_history(1).await;
        assert_eq!(daemon.history.entries()[0].status, Disposition::Cancelled);
        assert_eq!(daemon.registry.pending_count(), 0);
        assert!(!daemon.registry.resolve(&id, true), "late verdict must be a no-op");
        assert_eq!(
            daemon.registry.stats().total_cancelled.load(Ordering::Relaxed),
            1
        );
    }

    #[tokio::test]
    async fn test_half_close_after_request_still_cancels() {
        let mut daemon = TestDaemon::start().await;
        let request = prepare_request(&device_keys().public_key(), &request_body("dave")).unwrap();

        let mut stream = TcpStream::connect(daemon.addr).await.unwrap();
        stream.write_all(&request.frame).await.unwrap();
        daemon.next_presented().await;

        // FIN on the write side is indistinguishable from leaving.
        stream.shutdown().await.unwrap();

        daemon.next_withdrawn().await;
        assert!(read_all(&mut stream).await.is_empty());
        daemon.wait_for_history(1).await;
        assert_eq!(daemon.history.entries()[0].status, Disposition::Cancelled);
    }

    // =============================================================================
    // MALFORMED CONNECTIONS
    // =============================================================================

    #[tokio::test]
    async fn test_empty_connection_registers_nothing() {
        let mut daemon = TestDaemon::start().await;

        let mut stream = TcpStream::connect(daemon.addr).await.unwrap();
        stream.shutdown().await.unwrap();

        assert!(read_all(&mut stream).await.is_empty());
        daemon.assert_nothing_presented().await;
        assert_eq!(
            daemon.registry.stats().total_registered.load(Ordering::Relaxed),
            0
        );
        assert!(daemon.history.is_empty());
    }

    #[tokio::test]
    async fn test_undecryptable_key_is_dropped() {
        let mut daemon = TestDaemon::start().await;
        let session_key = SessionKey::generate();
        let frame = codec::encode(&Envelope {
            encrypted_key: vec![0x42; device_keys().block_size()],
            encrypted_body: lanpam_crypto::encrypt(&session_key, b"{}"),
        })
        .unwrap();

        let mut stream = TcpStream::connect(daemon.addr).await.unwrap();
        stream.write_all(&frame).await.unwrap();

        assert!(read_all(&mut stream).await.is_empty());
        daemon.assert_nothing_presented().await;
        assert_eq!(daemon.registry.pending_count(), 0);
        assert!(daemon.history.is_empty());
    }

    #[tokio::test]
    async fn test_plaintext_garbage_is_dropped_and_listener_survives() {
        let mut daemon = TestDaemon::start().await;

        let mut stream = TcpStream::connect(daemon.addr).await.unwrap();
        stream.write_all(b"{\"hello\": \"world\"}").await.unwrap();
        assert!(read_all(&mut stream).await.is_empty());
        daemon.assert_nothing_presented().await;

        // Next request on the same listener is served normally.
        let addr = daemon.addr;
        let client = tokio::spawn(async move {
            request_decision(addr, &device_keys().public_key(), &request_body("erin"), None).await
        });
        let (id, _) = daemon.next_presented().await;
        daemon.registry.resolve(&id, true);
        assert!(client.await.unwrap().unwrap().accepted);
    }

    #[tokio::test]
    async fn test_request_for_other_device_gets_no_verdict() {
        let mut daemon = TestDaemon::start().await;
        let stranger = DeviceKeyPair::generate().unwrap();

        let err = request_decision(
            daemon.addr,
            &stranger.public_key(),
            &request_body("mallory"),
            Some(STEP_TIMEOUT),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ClientError::NoResponse));
        daemon.assert_nothing_presented().await;
    }

    #[tokio::test]
    async fn test_verdict_readable_only_with_session_key() {
        let mut daemon = TestDaemon::start().await;
        let request = prepare_request(&device_keys().public_key(), &request_body("frank")).unwrap();

        let mut stream = TcpStream::connect(daemon.addr).await.unwrap();
        stream.write_all(&request.frame).await.unwrap();
        let (id, _) = daemon.next_presented().await;
        daemon.registry.resolve(&id, true);

        let raw = read_all(&mut stream).await;
        assert_eq!(raw.len() % lanpam_crypto::BLOCK_SIZE, 0);
        assert!(open_response(&request.session_key, &raw).unwrap().accepted);
        assert!(open_response(&SessionKey::generate(), &raw).is_err());
    }
}
