use axum::{extract::State, Json};

use crate::models::feedback_models::Feedback;
use crate::state::AppState;
use crate::utils::error::AppResult;

/// How many testimonials the public listing shows.
pub const RECENT_FEEDBACK: usize = 12;

pub async fn list_feedback(State(state): State<AppState>) -> AppResult<Json<Vec<Feedback>>> {
    let feedback = state.feedback.recent(RECENT_FEEDBACK).await?;

    Ok(Json(feedback))
}
