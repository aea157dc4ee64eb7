use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PollLinksResponse {
    pub poll_id: String,
    pub voting_url: String,
    pub results_url: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PollDetailsResponse {
    pub question: String,
    pub options: Vec<String>,
}

/// `optionIndex` is kept as raw JSON so a float, a string or a missing
/// field reaches the gate and is rejected there as an invalid option.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    #[serde(default)]
    pub option_index: Option<Value>,
}

impl CastVoteRequest {
    /// Anything that is not a JSON integer in `i64` range maps to `-1`,
    /// which no poll admits.
    pub fn option_index(&self) -> i64 {
        self.option_index
            .as_ref()
            .and_then(Value::as_i64)
            .unwrap_or(-1)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct VoteResponse {
    pub success: bool,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MyPollResponse {
    pub poll_id: String,
    pub question: String,
    pub created_at: DateTime<Utc>,
    pub voting_url: String,
    pub results_url: String,
}
