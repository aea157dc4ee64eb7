use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::models::{poll_models::Snapshot, vote_models::Ballot};
use crate::store::PollStore;
use crate::voting::{error::VoteError, hub::BroadcastHub};

/// Admits votes and publishes the committed tally.
///
/// Commits for one poll, and the publishes that follow them, run one at a
/// time behind that poll's writer lock, which gives every subscriber the
/// same commit order. Different polls never share a lock.
pub struct VoteGate {
    store: Arc<dyn PollStore>,
    hub: Arc<BroadcastHub>,
    max_voters: usize,
    writers: DashMap<String, Arc<Mutex<()>>>,
}

impl VoteGate {
    pub fn new(store: Arc<dyn PollStore>, hub: Arc<BroadcastHub>, max_voters: usize) -> Self {
        Self {
            store,
            hub,
            max_voters,
            writers: DashMap::new(),
        }
    }

    pub async fn submit_vote(
        self: &Arc<Self>,
        poll_id: &str,
        option_index: i64,
        voter_key: &str,
        now: DateTime<Utc>,
    ) -> Result<Arc<Snapshot>, VoteError> {
        let ballot = Ballot {
            option_index,
            voter_key,
            cast_at: now,
            max_voters: self.max_voters,
        };

        // Every rule is monotonic, so rejecting on an older read is safe.
        let poll = self.store.get(poll_id).await?;
        if let Err(rejection) = poll.check_admission(&ballot) {
            debug!(poll_id, voter_key, %rejection, "vote rejected");
            return Err(rejection);
        }

        // Runs to completion even if the caller is dropped, so a commit
        // always gets its publish and the writer entry is always released.
        let gate = Arc::clone(self);
        let task_poll = poll_id.to_string();
        let task_voter = voter_key.to_string();
        let task = tokio::spawn(async move {
            let ballot = Ballot {
                option_index,
                voter_key: &task_voter,
                cast_at: now,
                max_voters: gate.max_voters,
            };
            gate.commit_serialized(&task_poll, &ballot).await
        });

        match task.await {
            Ok(result) => result,
            Err(err) => {
                error!(poll_id, %err, "vote commit task failed");
                Err(VoteError::Unavailable(err.to_string()))
            }
        }
    }

    pub async fn snapshot(&self, poll_id: &str, now: DateTime<Utc>) -> Result<Snapshot, VoteError> {
        let poll = self.store.get(poll_id).await?;
        Ok(poll.snapshot(now))
    }

    async fn commit_serialized(&self, poll_id: &str, ballot: &Ballot<'_>) -> Result<Arc<Snapshot>, VoteError> {
        let writer = self.writer(poll_id);
        let result = {
            let _guard = writer.lock().await;
            self.commit(poll_id, ballot).await
        };
        drop(writer);
        self.release_writer(poll_id);

        result
    }

    async fn commit(&self, poll_id: &str, ballot: &Ballot<'_>) -> Result<Arc<Snapshot>, VoteError> {
        let committed = match self.store.record_vote(poll_id, ballot).await {
            Ok(poll) => poll,
            Err(VoteError::Unavailable(msg)) => {
                error!(poll_id, %msg, "failed to record vote");
                return Err(VoteError::Unavailable(msg));
            }
            Err(rejection) => {
                debug!(poll_id, voter_key = ballot.voter_key, %rejection, "vote rejected on commit");
                return Err(rejection);
            }
        };

        let total_votes = committed.total_votes();
        let snapshot = Arc::new(committed.snapshot(ballot.cast_at));
        let delivered = self.hub.publish(poll_id, Arc::clone(&snapshot));

        info!(
            poll_id,
            total_votes,
            delivered,
            "vote admitted"
        );

        Ok(snapshot)
    }

    fn writer(&self, poll_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.writers.entry(poll_id.to_string()).or_default().value())
    }

    fn release_writer(&self, poll_id: &str) {
        self.writers
            .remove_if(poll_id, |_, writer| Arc::strong_count(writer) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    use chrono::Duration;
    use tokio::time::timeout;

    use crate::models::poll_models::NewPoll;
    use crate::store::MemoryPollStore;

    async fn setup(max_voters: usize, expires_at: Option<DateTime<Utc>>) -> (Arc<VoteGate>, Arc<BroadcastHub>, String) {
        let store = Arc::new(MemoryPollStore::new());
        let hub = BroadcastHub::new(256);
        let poll = NewPoll::new(
            "creator",
            "Favourite colour?",
            &["Red".to_string(), "Blue".to_string()],
            expires_at,
        )
        .unwrap()
        .into_poll(Utc::now() - Duration::minutes(5));
        let id = poll.id.clone();
        store.insert(poll).await.unwrap();

        (Arc::new(VoteGate::new(store, hub.clone(), max_voters)), hub, id)
    }

    #[tokio::test]
    async fn test_duplicate_voter_is_rejected() {
        let (gate, _, id) = setup(100, None).await;

        let snapshot = gate.submit_vote(&id, 0, "v1", Utc::now()).await.unwrap();
        assert_eq!(snapshot.options[0].votes, 1);
        assert_eq!(snapshot.options[1].votes, 0);
        assert!(!snapshot.expired);

        let again = gate.submit_vote(&id, 0, "v1", Utc::now()).await;
        assert_eq!(again, Err(VoteError::AlreadyVoted));

        let current = gate.snapshot(&id, Utc::now()).await.unwrap();
        assert_eq!(current.options[0].votes, 1);
        assert_eq!(current.total_votes(), 1);
    }

    #[tokio::test]
    async fn test_expired_poll_rejects_without_mutation() {
        let (gate, _, id) = setup(100, Some(Utc::now() - Duration::seconds(1))).await;

        let result = gate.submit_vote(&id, 0, "v1", Utc::now()).await;
        assert_eq!(result, Err(VoteError::Expired));

        let current = gate.snapshot(&id, Utc::now()).await.unwrap();
        assert!(current.expired);
        assert_eq!(current.total_votes(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_option_is_invalid() {
        let (gate, _, id) = setup(100, None).await;

        assert_eq!(gate.submit_vote(&id, 5, "v1", Utc::now()).await, Err(VoteError::InvalidOption));
        assert_eq!(gate.submit_vote(&id, -1, "v1", Utc::now()).await, Err(VoteError::InvalidOption));
        assert_eq!(gate.submit_vote("nope", 0, "v1", Utc::now()).await, Err(VoteError::NotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_votes_stop_at_capacity() {
        let (gate, _, id) = setup(100, None).await;

        let mut handles = Vec::new();
        for voter in 0..150 {
            let gate = gate.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                gate.submit_vote(&id, voter % 2, &format!("voter-{voter}"), Utc::now())
                    .await
            }));
        }

        let mut admitted = 0;
        let mut full = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(VoteError::CapacityReached) => full += 1,
                Err(other) => panic!("unexpected rejection: {other}"),
            }
        }

        assert_eq!(admitted, 100);
        assert_eq!(full, 50);
        assert_eq!(gate.snapshot(&id, Utc::now()).await.unwrap().total_votes(), 100);

        // Existing votes are untouched by further attempts.
        assert_eq!(
            gate.submit_vote(&id, 0, "late", Utc::now()).await,
            Err(VoteError::CapacityReached)
        );
        assert_eq!(gate.snapshot(&id, Utc::now()).await.unwrap().total_votes(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_same_key_from_many_tasks_counts_once() {
        let (gate, _, id) = setup(100, None).await;

        let handles: Vec<_> = (0..40)
            .map(|attempt| {
                let gate = gate.clone();
                let id = id.clone();
                tokio::spawn(async move { gate.submit_vote(&id, attempt % 2, "10.1.1.1", Utc::now()).await })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => admitted += 1,
                Err(err) => assert_eq!(err, VoteError::AlreadyVoted),
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(gate.snapshot(&id, Utc::now()).await.unwrap().total_votes(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_subscribers_see_non_decreasing_totals() {
        let (gate, hub, id) = setup(100, None).await;
        let mut watcher = hub.connect();
        watcher.subscribe(&id);

        let handles: Vec<_> = (0..60)
            .map(|voter| {
                let gate = gate.clone();
                let id = id.clone();
                tokio::spawn(async move {
                    gate.submit_vote(&id, voter % 2, &format!("k{voter}"), Utc::now())
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut seen = Vec::new();
        while let Ok(Some(update)) = timeout(StdDuration::from_millis(50), watcher.recv()).await {
            seen.push(update.snapshot.total_votes());
        }

        assert_eq!(seen, (1..=60).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_writer_locks_are_released() {
        let (gate, _, id) = setup(100, None).await;

        gate.submit_vote(&id, 1, "v1", Utc::now()).await.unwrap();
        let _ = gate.submit_vote(&id, 1, "v1", Utc::now()).await;

        assert!(gate.writers.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_caller_still_commits_and_releases() {
        let (gate, hub, id) = setup(100, None).await;
        let mut watcher = hub.connect();
        watcher.subscribe(&id);

        // Hold the writer so the vote queues behind it.
        let writer = gate.writer(&id);
        let guard = writer.lock().await;

        let caller = {
            let gate = gate.clone();
            let id = id.clone();
            tokio::spawn(async move { gate.submit_vote(&id, 0, "v1", Utc::now()).await })
        };
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        drop(guard);
        drop(writer);

        let update = timeout(StdDuration::from_millis(200), watcher.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(update.snapshot.total_votes(), 1);
        assert_eq!(gate.snapshot(&id, Utc::now()).await.unwrap().total_votes(), 1);

        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert!(gate.writers.is_empty());
    }
}
