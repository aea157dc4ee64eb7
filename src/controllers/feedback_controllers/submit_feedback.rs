use axum::{extract::State, Json};
use chrono::Utc;
use tracing::info;

use crate::controllers::feedback_controllers::models::{FeedbackRequest, FeedbackResponse};
use crate::models::feedback_models::NewFeedback;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(payload): Json<FeedbackRequest>,
) -> AppResult<Json<FeedbackResponse>> {
    let feedback = NewFeedback::new(&payload.name, &payload.message, payload.rating())
        .map_err(AppError::ValidationError)?
        .into_feedback(Utc::now());
    let rating = feedback.rating;

    state.feedback.insert(feedback).await?;

    info!(rating, "feedback received");

    Ok(Json(FeedbackResponse { success: true }))
}
