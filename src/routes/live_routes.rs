use axum::{routing::get, Router};

use crate::controllers::live_controllers::socket::live_socket;
use crate::state::AppState;

pub fn live_routes(state: AppState) -> Router {
    Router::new().route("/ws", get(live_socket)).with_state(state)
}
