use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: String,
    pub name: String,
    pub message: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

/// Validated testimonial. Built only through [`NewFeedback::new`].
#[derive(Debug, Clone)]
pub struct NewFeedback {
    name: String,
    message: String,
    rating: u8,
}

impl NewFeedback {
    pub fn new(name: &str, message: &str, rating: Option<i64>) -> Result<Self, String> {
        let name = name.trim();
        let message = message.trim();

        let rating = rating
            .filter(|rating| (MIN_RATING..=MAX_RATING).contains(rating))
            .and_then(|rating| u8::try_from(rating).ok());

        match rating {
            Some(rating) if !name.is_empty() && !message.is_empty() => Ok(Self {
                name: name.to_string(),
                message: message.to_string(),
                rating,
            }),
            _ => Err(format!(
                "Name, message, and rating ({MIN_RATING}-{MAX_RATING}) required"
            )),
        }
    }

    pub fn into_feedback(self, now: DateTime<Utc>) -> Feedback {
        Feedback {
            id: Uuid::new_v4().to_string(),
            name: self.name,
            message: self.message,
            rating: self.rating,
            created_at: now,
        }
    }
}
