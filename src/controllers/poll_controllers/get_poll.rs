use axum::{
    extract::{Path, State},
    Json,
};

use crate::controllers::poll_controllers::models::PollDetailsResponse;
use crate::state::AppState;
use crate::utils::error::AppResult;

/// Question and option texts for the voting page; tallies stay hidden.
pub async fn get_poll(
    Path(poll_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<PollDetailsResponse>> {
    let poll = state.store.get(&poll_id).await?;

    Ok(Json(PollDetailsResponse {
        question: poll.question,
        options: poll.options.into_iter().map(|option| option.text).collect(),
    }))
}
