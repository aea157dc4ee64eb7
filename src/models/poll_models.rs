use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::vote_models::Ballot;
use crate::voting::{error::VoteError, expiry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub creator_id: String,
    pub options: Vec<PollOption>,
    pub voted_keys: HashSet<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub votes: u64,
}

/// Validated authoring input. Built only through [`NewPoll::new`].
#[derive(Debug, Clone)]
pub struct NewPoll {
    question: String,
    options: Vec<String>,
    creator_id: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSummary {
    pub poll_id: String,
    pub question: String,
    pub created_at: DateTime<Utc>,
}

/// Tally plus expiry state, as pushed to subscribers and served on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub question: String,
    pub options: Vec<PollOption>,
    pub expired: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewPoll {
    pub fn new(
        creator_id: &str,
        question: &str,
        options: &[String],
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self, String> {
        let question = question.trim();
        if question.is_empty() {
            return Err("Question must not be empty".to_string());
        }

        let trimmed: Vec<String> = options.iter().map(|opt| opt.trim().to_string()).collect();

        if trimmed.len() < 2 {
            return Err("Enter at least 2 options for voters to select from".to_string());
        }

        if trimmed.iter().any(|opt| opt.is_empty()) {
            return Err("Poll options must not be empty".to_string());
        }

        let mut deduped: Vec<&String> = Vec::with_capacity(trimmed.len());
        for option in &trimmed {
            if !deduped.contains(&option) {
                deduped.push(option);
            }
        }

        if deduped.len() != trimmed.len() {
            return Err("Poll options must be unique".to_string());
        }

        Ok(Self {
            question: question.to_string(),
            options: trimmed,
            creator_id: creator_id.to_string(),
            expires_at,
        })
    }

    pub fn into_poll(self, now: DateTime<Utc>) -> Poll {
        Poll {
            id: Uuid::new_v4().to_string(),
            question: self.question,
            creator_id: self.creator_id,
            options: self
                .options
                .into_iter()
                .map(|text| PollOption { text, votes: 0 })
                .collect(),
            voted_keys: HashSet::new(),
            expires_at: self.expires_at,
            created_at: now,
        }
    }
}

impl Poll {
    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|option| option.votes).sum()
    }

    /// Runs every admission rule in order and returns the validated option index.
    pub fn check_admission(&self, ballot: &Ballot<'_>) -> Result<usize, VoteError> {
        if expiry::is_expired(self.expires_at, ballot.cast_at) {
            return Err(VoteError::Expired);
        }

        let index = usize::try_from(ballot.option_index)
            .ok()
            .filter(|index| *index < self.options.len())
            .ok_or(VoteError::InvalidOption)?;

        if self.voted_keys.contains(ballot.voter_key) {
            return Err(VoteError::AlreadyVoted);
        }

        if self.voted_keys.len() >= ballot.max_voters {
            return Err(VoteError::CapacityReached);
        }

        Ok(index)
    }

    /// Checks and applies a ballot as one step. Callers must hold exclusive access to the poll.
    pub fn admit(&mut self, ballot: &Ballot<'_>) -> Result<(), VoteError> {
        let index = self.check_admission(ballot)?;

        self.options[index].votes += 1;
        self.voted_keys.insert(ballot.voter_key.to_string());

        Ok(())
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            question: self.question.clone(),
            options: self.options.clone(),
            expired: expiry::is_expired(self.expires_at, now),
            expires_at: self.expires_at,
        }
    }

    pub fn summary(&self) -> PollSummary {
        PollSummary {
            poll_id: self.id.clone(),
            question: self.question.clone(),
            created_at: self.created_at,
        }
    }
}

impl Snapshot {
    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|option| option.votes).sum()
    }
}
