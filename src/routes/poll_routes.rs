use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

use crate::controllers::poll_controllers::{
    cast_vote, create_poll, get_poll, get_results, get_user_polls,
};
use crate::middleware::jwt::jwt_auth;
use crate::state::AppState;

pub fn poll_routes(state: AppState) -> Router {
    let creator_only = Router::new()
        .route("/", post(create_poll::create_poll))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth));

    Router::new()
        .merge(creator_only)
        .route("/:pollId", get(get_poll::get_poll))
        .route("/:pollId/vote", post(cast_vote::cast_vote))
        .route("/:pollId/results", get(get_results::get_results))
        .route("/:pollId/results/stream", get(get_results::poll_updates_stream))
        .with_state(state)
}

pub fn creator_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/my-polls", get(get_user_polls::get_polls_by_creator))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth))
        .with_state(state)
}
