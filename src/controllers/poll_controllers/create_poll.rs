use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::Utc;
use tracing::info;

use crate::controllers::poll_controllers::models::{CreatePollRequest, PollLinksResponse};
use crate::models::poll_models::NewPoll;
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};
use crate::utils::session::Claims;

pub async fn create_poll(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePollRequest>,
) -> AppResult<Json<PollLinksResponse>> {
    let new_poll = NewPoll::new(
        &claims.sub,
        &payload.question,
        &payload.options,
        payload.expires_at,
    )
    .map_err(AppError::ValidationError)?;

    let poll = new_poll.into_poll(Utc::now());
    let poll_id = poll.id.clone();

    state.store.insert(poll).await?;

    info!(poll_id = %poll_id, creator = %claims.sub, "poll created");

    Ok(Json(PollLinksResponse {
        voting_url: state.config.voting_url(&poll_id),
        results_url: state.config.results_url(&poll_id),
        poll_id,
    }))
}
