use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("Poll not found")]
    NotFound,

    #[error("Poll has expired")]
    Expired,

    #[error("Invalid option")]
    InvalidOption,

    #[error("You have already voted")]
    AlreadyVoted,

    #[error("Maximum voters reached")]
    CapacityReached,

    #[error("Poll store unavailable: {0}")]
    Unavailable(String),
}

impl VoteError {
    /// Business rule rejections are terminal; only store outages are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VoteError::Unavailable(_))
    }
}

impl From<StoreError> for VoteError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => VoteError::NotFound,
            StoreError::Duplicate(id) => VoteError::Unavailable(format!("duplicate poll id {id}")),
            StoreError::Unavailable(msg) => VoteError::Unavailable(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_store_outages_are_retryable() {
        assert!(VoteError::Unavailable("timeout".into()).is_retryable());
        assert!(!VoteError::AlreadyVoted.is_retryable());
        assert!(!VoteError::Expired.is_retryable());
    }

    #[test]
    fn store_not_found_stays_not_found() {
        assert_eq!(VoteError::from(StoreError::NotFound), VoteError::NotFound);
    }
}
