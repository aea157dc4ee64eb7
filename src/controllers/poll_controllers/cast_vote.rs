use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;

use crate::controllers::poll_controllers::models::{CastVoteRequest, VoteResponse};
use crate::state::AppState;
use crate::utils::{client_key::voter_key, error::AppResult};

pub async fn cast_vote(
    Path(poll_id): Path<String>,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<CastVoteRequest>,
) -> AppResult<Json<VoteResponse>> {
    let voter = voter_key(&headers, peer, state.config.trust_proxy);

    state
        .gate
        .submit_vote(&poll_id, payload.option_index(), &voter, Utc::now())
        .await?;

    Ok(Json(VoteResponse { success: true }))
}
