use std::time::{Duration, Instant};

use axum::{extract::State, response::Json};
use once_cell::sync::Lazy;
use serde_json::json;

use crate::state::AppState;

pub static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

pub async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": format!("Backend is running! Uptime: {}", format_uptime(START_TIME.elapsed())),
        "livePolls": state.hub.active_polls(),
    }))
}

fn format_uptime(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours % 24, minutes % 60, seconds % 60)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes % 60, seconds % 60)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}
