use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use tokio::sync::RwLock;

use super::{FeedbackStore, PollStore, StoreError};
use crate::models::{
    feedback_models::Feedback,
    poll_models::{Poll, PollSummary},
    vote_models::Ballot,
};
use crate::voting::error::VoteError;

/// Process-local store. Votes on one poll are serialized by the entry's
/// shard lock; polls on other shards proceed in parallel. Nothing survives
/// a restart.
#[derive(Default)]
pub struct MemoryPollStore {
    polls: DashMap<String, Poll>,
}

impl MemoryPollStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryPollStore {
    async fn insert(&self, poll: Poll) -> Result<(), StoreError> {
        match self.polls.entry(poll.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(poll.id)),
            Entry::Vacant(slot) => {
                slot.insert(poll);
                Ok(())
            }
        }
    }

    async fn get(&self, poll_id: &str) -> Result<Poll, StoreError> {
        self.polls
            .get(poll_id)
            .map(|poll| poll.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn record_vote(&self, poll_id: &str, ballot: &Ballot<'_>) -> Result<Poll, VoteError> {
        let mut poll = self.polls.get_mut(poll_id).ok_or(VoteError::NotFound)?;

        poll.admit(ballot)?;

        Ok(poll.value().clone())
    }

    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<PollSummary>, StoreError> {
        let mut polls: Vec<PollSummary> = self
            .polls
            .iter()
            .filter(|poll| poll.creator_id == creator_id)
            .map(|poll| poll.summary())
            .collect();

        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(polls)
    }
}

/// Process-local testimonials, in insertion order.
#[derive(Default)]
pub struct MemoryFeedbackStore {
    entries: RwLock<Vec<Feedback>>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackStore for MemoryFeedbackStore {
    async fn insert(&self, feedback: Feedback) -> Result<(), StoreError> {
        self.entries.write().await.push(feedback);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Feedback>, StoreError> {
        let mut entries: Vec<Feedback> = self.entries.read().await.iter().rev().cloned().collect();

        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);

        Ok(entries)
    }
}
