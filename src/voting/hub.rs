//! Per-poll fan-out of tally snapshots to live connections.
//!
//! The hub keeps, for each poll with at least one listener, the push queue
//! of every subscribed connection. Publishing never waits: a full queue
//! means the subscriber is too slow and misses that snapshot, a closed
//! queue means the connection is gone and its registration is dropped.
//! Subscribers reconcile through an on-demand snapshot read.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

use crate::models::poll_models::Snapshot;

pub type ConnectionId = Uuid;

#[derive(Debug, Clone)]
pub struct PollUpdate {
    pub poll_id: String,
    pub snapshot: Arc<Snapshot>,
}

pub struct BroadcastHub {
    polls: DashMap<String, HashMap<ConnectionId, mpsc::Sender<PollUpdate>>>,
    buffer: usize,
}

impl BroadcastHub {
    pub fn new(buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            polls: DashMap::new(),
            buffer: buffer.max(1),
        })
    }

    /// Opens a live connection. Dropping it unsubscribes it from every poll.
    pub fn connect(self: &Arc<Self>) -> Connection {
        let (tx, rx) = mpsc::channel(self.buffer);

        Connection {
            id: Uuid::new_v4(),
            hub: Arc::clone(self),
            tx,
            rx,
            polls: HashSet::new(),
            delivered: HashMap::new(),
        }
    }

    fn subscribe(&self, connection: ConnectionId, tx: mpsc::Sender<PollUpdate>, poll_id: &str) {
        self.polls
            .entry(poll_id.to_string())
            .or_default()
            .insert(connection, tx);
    }

    fn unsubscribe(&self, connection: ConnectionId, poll_id: &str) {
        if let Some(mut subscribers) = self.polls.get_mut(poll_id) {
            subscribers.remove(&connection);
        }
        self.polls.remove_if(poll_id, |_, subscribers| subscribers.is_empty());
    }

    /// Pushes `snapshot` to every current subscriber of `poll_id` and
    /// returns how many queues accepted it. Callers publishing for the same
    /// poll must do so in commit order.
    pub fn publish(&self, poll_id: &str, snapshot: Arc<Snapshot>) -> usize {
        let mut delivered = 0;

        if let Some(mut subscribers) = self.polls.get_mut(poll_id) {
            subscribers.retain(|connection, tx| {
                let update = PollUpdate {
                    poll_id: poll_id.to_string(),
                    snapshot: Arc::clone(&snapshot),
                };

                match tx.try_send(update) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    Err(TrySendError::Full(_)) => {
                        debug!(poll_id, %connection, "subscriber queue full, skipping update");
                        true
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(poll_id, %connection, "subscriber gone, dropping registration");
                        false
                    }
                }
            });
        } else {
            return 0;
        }

        self.polls.remove_if(poll_id, |_, subscribers| subscribers.is_empty());

        delivered
    }

    #[cfg(test)]
    pub fn subscriber_count(&self, poll_id: &str) -> usize {
        self.polls.get(poll_id).map_or(0, |subscribers| subscribers.len())
    }

    pub fn active_polls(&self) -> usize {
        self.polls.len()
    }
}

/// One live client connection, possibly watching several polls.
pub struct Connection {
    id: ConnectionId,
    hub: Arc<BroadcastHub>,
    tx: mpsc::Sender<PollUpdate>,
    rx: mpsc::Receiver<PollUpdate>,
    polls: HashSet<String>,
    /// Highest total vote count handed to the client per poll.
    delivered: HashMap<String, u64>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Registers for `poll_id`. Returns `false` if already subscribed.
    pub fn subscribe(&mut self, poll_id: &str) -> bool {
        if !self.polls.insert(poll_id.to_string()) {
            return false;
        }

        self.hub.subscribe(self.id, self.tx.clone(), poll_id);
        true
    }

    /// Takes effect for every later publish. Updates already queued are
    /// still delivered.
    pub fn unsubscribe(&mut self, poll_id: &str) {
        if self.polls.remove(poll_id) {
            self.hub.unsubscribe(self.id, poll_id);
        }
        self.delivered.remove(poll_id);
    }

    /// Records a snapshot sent outside the queue, such as the one read on
    /// join, and reports whether it should be sent at all.
    pub fn admit(&mut self, poll_id: &str, snapshot: &Snapshot) -> bool {
        let total = snapshot.total_votes();

        match self.delivered.get_mut(poll_id) {
            Some(seen) if *seen > total => false,
            Some(seen) => {
                *seen = total;
                true
            }
            None => {
                self.delivered.insert(poll_id.to_string(), total);
                true
            }
        }
    }

    /// Next queued update, skipping any that would move a poll backwards.
    pub async fn recv(&mut self) -> Option<PollUpdate> {
        loop {
            let update = self.rx.recv().await?;

            if self.admit(&update.poll_id, &update.snapshot) {
                return Some(update);
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        for poll_id in self.polls.drain() {
            self.hub.unsubscribe(self.id, &poll_id);
        }
    }
}
