//! Durable poll records and the per-poll atomic vote unit.
//!
//! Every backend must apply the admission check and the tally mutation of
//! [`PollStore::record_vote`] as one indivisible step: two concurrent calls
//! with the same voter key can never both succeed, and the counter increment
//! never lands without its matching key record.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    feedback_models::Feedback,
    poll_models::{Poll, PollSummary},
    vote_models::Ballot,
};
use crate::voting::error::VoteError;

pub use memory::{MemoryFeedbackStore, MemoryPollStore};
pub use mongo::{MongoFeedbackStore, MongoPollStore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Poll not found")]
    NotFound,

    #[error("Poll {0} already exists")]
    Duplicate(String),

    #[error("Poll store unavailable: {0}")]
    Unavailable(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[async_trait]
pub trait PollStore: Send + Sync {
    async fn insert(&self, poll: Poll) -> Result<(), StoreError>;

    async fn get(&self, poll_id: &str) -> Result<Poll, StoreError>;

    /// Re-validates `ballot` against the current poll state and, if it is
    /// admissible, records the key and increments the chosen option.
    /// Returns the poll as committed.
    async fn record_vote(&self, poll_id: &str, ballot: &Ballot<'_>) -> Result<Poll, VoteError>;

    /// Newest first.
    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<PollSummary>, StoreError>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn insert(&self, feedback: Feedback) -> Result<(), StoreError>;

    /// At most `limit` entries, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<Feedback>, StoreError>;
}
