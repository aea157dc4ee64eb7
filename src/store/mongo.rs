use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::ReturnDocument,
    Collection, Database,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::{FeedbackStore, PollStore, StoreError};
use crate::models::{
    feedback_models::Feedback,
    poll_models::{Poll, PollOption, PollSummary},
    vote_models::Ballot,
};
use crate::voting::error::VoteError;

const POLLS: &str = "polls";
const FEEDBACK: &str = "feedback";
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PollDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub question: String,
    pub creator_id: String,
    pub options: Vec<OptionDocument>,
    pub voted_keys: Vec<String>,
    pub expires_at: Option<bson::DateTime>,
    pub created_at: bson::DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OptionDocument {
    pub text: String,
    pub votes: i64,
}

/// MongoDB backed store. A vote is a single conditional
/// `find_one_and_update` on the poll document, so the admission rules and
/// the `$inc`/`$push` pair succeed or fail together.
#[derive(Clone)]
pub struct MongoPollStore {
    polls: Collection<PollDocument>,
}

impl MongoPollStore {
    pub fn new(db: &Database) -> Self {
        Self {
            polls: db.collection::<PollDocument>(POLLS),
        }
    }
}

#[async_trait]
impl PollStore for MongoPollStore {
    async fn insert(&self, poll: Poll) -> Result<(), StoreError> {
        let id = poll.id.clone();

        match self.polls.insert_one(PollDocument::from(poll)).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::Duplicate(id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, poll_id: &str) -> Result<Poll, StoreError> {
        let document = self
            .polls
            .find_one(doc! { "_id": poll_id })
            .await?
            .ok_or(StoreError::NotFound)?;

        Poll::try_from(document)
    }

    async fn record_vote(&self, poll_id: &str, ballot: &Ballot<'_>) -> Result<Poll, VoteError> {
        let updated = self
            .polls
            .find_one_and_update(admission_filter(poll_id, ballot), vote_update(ballot))
            .return_document(ReturnDocument::After)
            .await
            .map_err(StoreError::from)?;

        if let Some(document) = updated {
            return Ok(Poll::try_from(document)?);
        }

        // Nothing matched: read the poll back to say which rule rejected the vote.
        let current = self.get(poll_id).await?;
        current.check_admission(ballot)?;

        error!(poll_id, "vote filter matched nothing but the poll admits the ballot");
        Err(VoteError::Unavailable("conflicting write, retry the vote".to_string()))
    }

    async fn list_by_creator(&self, creator_id: &str) -> Result<Vec<PollSummary>, StoreError> {
        let documents: Vec<PollDocument> = self
            .polls
            .find(doc! { "creator_id": creator_id })
            .sort(doc! { "created_at": -1 })
            .await?
            .try_collect()
            .await?;

        Ok(documents
            .into_iter()
            .map(|document| PollSummary {
                poll_id: document.id,
                question: document.question,
                created_at: to_chrono(document.created_at),
            })
            .collect())
    }
}

/// Matches the poll only while the ballot is still admissible: the key is
/// absent, a capacity slot is free, the option exists and the poll is open.
pub fn admission_filter(poll_id: &str, ballot: &Ballot<'_>) -> Document {
    let mut filter = doc! {
        "_id": poll_id,
        "voted_keys": { "$ne": ballot.voter_key },
        "$or": [
            { "expires_at": Bson::Null },
            { "expires_at": { "$gte": to_bson(ballot.cast_at) } },
        ],
    };

    match usize::try_from(ballot.option_index) {
        Ok(index) => {
            filter.insert(format!("options.{index}"), doc! { "$exists": true });
        }
        // A negative selector can never match.
        Err(_) => {
            filter.insert("options", doc! { "$exists": false });
        }
    }

    if ballot.max_voters == 0 {
        filter.insert("voted_keys", doc! { "$exists": false, "$ne": ballot.voter_key });
    } else {
        filter.insert(
            format!("voted_keys.{}", ballot.max_voters - 1),
            doc! { "$exists": false },
        );
    }

    filter
}

pub fn vote_update(ballot: &Ballot<'_>) -> Document {
    let mut increment = Document::new();
    if let Ok(index) = usize::try_from(ballot.option_index) {
        increment.insert(format!("options.{index}.votes"), 1_i64);
    }

    doc! {
        "$inc": increment,
        "$push": { "voted_keys": ballot.voter_key },
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn to_bson(at: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(at.timestamp_millis())
}

fn to_chrono(at: bson::DateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(at.timestamp_millis()).unwrap_or_default()
}

impl From<Poll> for PollDocument {
    fn from(poll: Poll) -> Self {
        Self {
            id: poll.id,
            question: poll.question,
            creator_id: poll.creator_id,
            options: poll
                .options
                .into_iter()
                .map(|option| OptionDocument {
                    text: option.text,
                    votes: i64::try_from(option.votes).unwrap_or(i64::MAX),
                })
                .collect(),
            voted_keys: poll.voted_keys.into_iter().collect(),
            expires_at: poll.expires_at.map(to_bson),
            created_at: to_bson(poll.created_at),
        }
    }
}

impl TryFrom<PollDocument> for Poll {
    type Error = StoreError;

    fn try_from(document: PollDocument) -> Result<Self, Self::Error> {
        let options = document
            .options
            .into_iter()
            .map(|option| {
                u64::try_from(option.votes)
                    .map(|votes| PollOption {
                        text: option.text,
                        votes,
                    })
                    .map_err(|_| {
                        StoreError::Unavailable(format!(
                            "poll {} has a negative vote counter",
                            document.id
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Poll {
            id: document.id,
            question: document.question,
            creator_id: document.creator_id,
            options,
            voted_keys: document.voted_keys.into_iter().collect(),
            expires_at: document.expires_at.map(to_chrono),
            created_at: to_chrono(document.created_at),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FeedbackDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub message: String,
    pub rating: i32,
    pub created_at: bson::DateTime,
}

#[derive(Clone)]
pub struct MongoFeedbackStore {
    feedback: Collection<FeedbackDocument>,
}

impl MongoFeedbackStore {
    pub fn new(db: &Database) -> Self {
        Self {
            feedback: db.collection::<FeedbackDocument>(FEEDBACK),
        }
    }
}

#[async_trait]
impl FeedbackStore for MongoFeedbackStore {
    async fn insert(&self, feedback: Feedback) -> Result<(), StoreError> {
        let id = feedback.id.clone();

        match self.feedback.insert_one(FeedbackDocument::from(feedback)).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::Duplicate(id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Feedback>, StoreError> {
        let documents: Vec<FeedbackDocument> = self
            .feedback
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await?
            .try_collect()
            .await?;

        documents.into_iter().map(Feedback::try_from).collect()
    }
}

impl From<Feedback> for FeedbackDocument {
    fn from(feedback: Feedback) -> Self {
        Self {
            id: feedback.id,
            name: feedback.name,
            message: feedback.message,
            rating: i32::from(feedback.rating),
            created_at: to_bson(feedback.created_at),
        }
    }
}

impl TryFrom<FeedbackDocument> for Feedback {
    type Error = StoreError;

    fn try_from(document: FeedbackDocument) -> Result<Self, Self::Error> {
        let rating = u8::try_from(document.rating).map_err(|_| {
            StoreError::Unavailable(format!(
                "feedback {} has rating {} out of range",
                document.id, document.rating
            ))
        })?;

        Ok(Feedback {
            id: document.id,
            name: document.name,
            message: document.message,
            rating,
            created_at: to_chrono(document.created_at),
        })
    }
}
