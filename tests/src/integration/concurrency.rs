//! # Concurrent Requests
//!
//! Several requesters against one listener:
//!
//! - Two simultaneous requests settle independently, in either order
//! - A batch settled in random order maps every verdict to its own connection
//! - A decision timeout denies and withdraws the prompt
//! - History written through a running listener survives a restart

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use lanpam_daemon::adapters::RequestHistory;
    use lanpam_daemon::{request_decision, ClientError, Disposition, RequestId, ResponseBody};
    use rand::seq::SliceRandom;
    use tokio::task::JoinHandle;

    use crate::support::{device_keys, request_body, TestDaemon, STEP_TIMEOUT};

    type ClientTask = JoinHandle<Result<ResponseBody, ClientError>>;

    fn spawn_request(daemon: &TestDaemon, user: &str) -> ClientTask {
        let addr = daemon.addr;
        let body = request_body(user);
        tokio::spawn(async move {
            request_decision(addr, &device_keys().public_key(), &body, Some(STEP_TIMEOUT)).await
        })
    }

    async fn presented_by_user(
        daemon: &mut TestDaemon,
        count: usize,
    ) -> HashMap<String, RequestId> {
        let mut ids = HashMap::new();
        for _ in 0..count {
            let (id, body) = daemon.next_presented().await;
            ids.insert(body.user, id);
        }
        ids
    }

    #[tokio::test]
    async fn test_two_requests_settle_independently() {
        let mut daemon = TestDaemon::start().await;

        let alice = spawn_request(&daemon, "alice");
        let bob = spawn_request(&daemon, "bob");
        let ids = presented_by_user(&mut daemon, 2).await;
        assert_ne!(ids["alice"], ids["bob"]);

        // Settle the later arrival first.
        daemon.registry.resolve(&ids["bob"], false);
        let bob = bob.await.unwrap().unwrap();
        assert!(!bob.accepted);
        assert!(daemon.registry.is_pending(&ids["alice"]));

        daemon.registry.resolve(&ids["alice"], true);
        assert!(alice.await.unwrap().unwrap().accepted);

        daemon.wait_for_history(2).await;
        let statuses: HashMap<_, _> = daemon
            .history
            .entries()
            .into_iter()
            .map(|entry| (entry.user, entry.status))
            .collect();
        assert_eq!(statuses["alice"], Disposition::Accepted);
        assert_eq!(statuses["bob"], Disposition::Rejected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_settled_in_random_order() {
        let mut daemon = TestDaemon::start().await;
        let users: Vec<String> = (0..8).map(|i| format!("user{i}")).collect();

        let clients: Vec<_> = users
            .iter()
            .map(|user| (user.clone(), spawn_request(&daemon, user)))
            .collect();
        let ids = presented_by_user(&mut daemon, users.len()).await;

        let accepts = |user: &str| user.ends_with(|c: char| "0246".contains(c));

        let mut order = users.clone();
        order.shuffle(&mut rand::thread_rng());
        for user in &order {
            assert!(daemon.registry.resolve(&ids[user], accepts(user)));
        }

        for (user, client) in clients {
            let response = client.await.unwrap().unwrap();
            assert_eq!(response.accepted, accepts(&user), "wrong verdict for {user}");
        }
        assert_eq!(daemon.registry.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_decision_timeout_denies() {
        let mut daemon = TestDaemon::start_with_decision_timeout(1).await;

        let client = spawn_request(&daemon, "grace");
        let (id, _) = daemon.next_presented().await;

        let response = client.await.unwrap().unwrap();
        assert!(!response.accepted);
        assert_eq!(daemon.next_withdrawn().await, id);

        daemon.wait_for_history(1).await;
        assert_eq!(daemon.history.entries()[0].status, Disposition::Expired);
        assert!(!daemon.registry.resolve(&id, true));
    }

    #[tokio::test]
    async fn test_history_file_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut daemon = TestDaemon::start_with_history_file(&path).await;
        let client = spawn_request(&daemon, "heidi");
        let (id, _) = daemon.next_presented().await;
        daemon.registry.resolve(&id, true);
        assert!(client.await.unwrap().unwrap().accepted);
        daemon.wait_for_history(1).await;
        daemon.shutdown().await;

        let reloaded = RequestHistory::open(&path, 10);
        let entries = reloaded.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, id);
        assert_eq!(entries[0].status, Disposition::Accepted);
    }
}
