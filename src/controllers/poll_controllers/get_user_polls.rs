use axum::{
    extract::{Extension, State},
    Json,
};

use crate::controllers::poll_controllers::models::MyPollResponse;
use crate::state::AppState;
use crate::utils::error::AppResult;
use crate::utils::session::Claims;

pub async fn get_polls_by_creator(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<MyPollResponse>>> {
    let polls = state.store.list_by_creator(&claims.sub).await?;

    let responses = polls
        .into_iter()
        .map(|poll| MyPollResponse {
            voting_url: state.config.voting_url(&poll.poll_id),
            results_url: state.config.results_url(&poll.poll_id),
            poll_id: poll.poll_id,
            question: poll.question,
            created_at: poll.created_at,
        })
        .collect();

    Ok(Json(responses))
}
