use chrono::{DateTime, Utc};

/// A single vote submission as seen by the admission check.
#[derive(Debug, Clone, Copy)]
pub struct Ballot<'a> {
    /// Raw selector from the client; negative values are rejected as invalid options.
    pub option_index: i64,
    pub voter_key: &'a str,
    pub cast_at: DateTime<Utc>,
    pub max_voters: usize,
}
