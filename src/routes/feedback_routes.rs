use axum::{routing::get, Router};

use crate::controllers::feedback_controllers::{list_feedback, submit_feedback};
use crate::state::AppState;

pub fn feedback_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(list_feedback::list_feedback).post(submit_feedback::submit_feedback),
        )
        .with_state(state)
}
