use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize, Debug, Default)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub rating: Option<Value>,
}

impl FeedbackRequest {
    pub fn rating(&self) -> Option<i64> {
        self.rating.as_ref().and_then(Value::as_i64)
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct FeedbackResponse {
    pub success: bool,
}
