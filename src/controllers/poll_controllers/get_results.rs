use std::{convert::Infallible, future, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::models::poll_models::Snapshot;
use crate::state::AppState;
use crate::utils::error::AppResult;

pub async fn get_results(
    Path(poll_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<Snapshot>> {
    let snapshot = state.gate.snapshot(&poll_id, Utc::now()).await?;

    Ok(Json(snapshot))
}

/// Server-sent events for one poll: the current snapshot, then every
/// committed tally. Closing the stream unsubscribes.
pub async fn poll_updates_stream(
    Path(poll_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before reading so no commit falls between the two.
    let mut connection = state.hub.connect();
    connection.subscribe(&poll_id);

    let initial = state.gate.snapshot(&poll_id, Utc::now()).await?;
    connection.admit(&poll_id, &initial);

    debug!(poll_id = %poll_id, connection = %connection.id(), "results stream opened");

    let updates = stream::unfold(connection, |mut connection| async move {
        let update = connection.recv().await?;
        Some((update.snapshot, connection))
    });

    let events = stream::once(future::ready(Arc::new(initial)))
        .chain(updates)
        .filter_map(|snapshot| {
            let event = serde_json::to_string(snapshot.as_ref())
                .ok()
                .map(|json_data| Ok::<_, Infallible>(Event::default().event("updateResults").data(json_data)));
            future::ready(event)
        });

    Ok(Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
