use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chrono::Utc;
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::models::poll_models::Snapshot;
use crate::state::AppState;
use crate::voting::{Connection, VoteError};

/// A client that cannot take a frame within this window is disconnected.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    JoinPoll {
        #[serde(rename = "pollId")]
        poll_id: String,
    },
    LeavePoll {
        #[serde(rename = "pollId")]
        poll_id: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerFrame {
    UpdateResults {
        #[serde(rename = "pollId")]
        poll_id: String,
        results: Snapshot,
    },
    Error {
        #[serde(rename = "pollId", skip_serializing_if = "Option::is_none")]
        poll_id: Option<String>,
        message: String,
    },
}

type Outbound = SplitSink<WebSocket, Message>;

pub async fn live_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut outbound, mut inbound) = socket.split();
    let mut connection = state.hub.connect();
    let connection_id = connection.id();

    debug!(connection = %connection_id, "live connection opened");

    loop {
        tokio::select! {
            frame = inbound.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_frame(&text, &state, &mut connection).await {
                        if send(&mut outbound, &reply).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(connection = %connection_id, %err, "live connection errored");
                    break;
                }
            },
            update = connection.recv() => {
                let Some(update) = update else { break };
                let frame = ServerFrame::UpdateResults {
                    poll_id: update.poll_id,
                    results: Snapshot::clone(&update.snapshot),
                };
                if send(&mut outbound, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    // Dropping the connection removes every registration it still holds.
    drop(connection);
    debug!(connection = %connection_id, "live connection closed");
}

/// Applies one client frame to `connection` and returns the reply, if any.
async fn handle_frame(text: &str, state: &AppState, connection: &mut Connection) -> Option<ServerFrame> {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(err) => {
            return Some(ServerFrame::Error {
                poll_id: None,
                message: format!("Malformed frame: {err}"),
            });
        }
    };

    match frame {
        ClientFrame::JoinPoll { poll_id } => {
            // Subscribe before reading so no commit falls between the two.
            connection.subscribe(&poll_id);

            match state.gate.snapshot(&poll_id, Utc::now()).await {
                Ok(snapshot) => connection
                    .admit(&poll_id, &snapshot)
                    .then_some(ServerFrame::UpdateResults {
                        poll_id,
                        results: snapshot,
                    }),
                Err(err) => {
                    if err == VoteError::NotFound {
                        connection.unsubscribe(&poll_id);
                    }
                    Some(ServerFrame::Error {
                        poll_id: Some(poll_id),
                        message: err.to_string(),
                    })
                }
            }
        }
        ClientFrame::LeavePoll { poll_id } => {
            connection.unsubscribe(&poll_id);
            None
        }
    }
}

async fn send(outbound: &mut Outbound, frame: &ServerFrame) -> Result<(), ()> {
    let json = serde_json::to_string(frame).map_err(|err| {
        warn!(%err, "failed to encode live frame");
    })?;

    match timeout(SEND_TIMEOUT, outbound.send(Message::Text(json))).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            debug!(%err, "live connection send failed");
            Err(())
        }
        Err(_) => {
            debug!("live connection send timed out");
            Err(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::models::poll_models::{NewPoll, PollOption};

    async fn seeded_state() -> (AppState, String) {
        let state = AppState::in_memory();
        let poll = NewPoll::new("alice", "Colour?", &["Red".to_string(), "Blue".to_string()], None)
            .unwrap()
            .into_poll(Utc::now());
        let id = poll.id.clone();
        state.store.insert(poll).await.unwrap();
        (state, id)
    }

    fn join(poll_id: &str) -> String {
        format!(r#"{{"type":"joinPoll","pollId":"{poll_id}"}}"#)
    }

    async fn next(connection: &mut Connection) -> Option<u64> {
        tokio::time::timeout(Duration::from_millis(50), connection.recv())
            .await
            .ok()
            .flatten()
            .map(|update| update.snapshot.total_votes())
    }

    #[tokio::test]
    async fn join_replies_with_current_tally_and_subscribes() {
        let (state, id) = seeded_state().await;
        state.gate.submit_vote(&id, 0, "10.0.0.1", Utc::now()).await.unwrap();
        let mut connection = state.hub.connect();

        let (poll_id, results) = match handle_frame(&join(&id), &state, &mut connection).await {
            Some(ServerFrame::UpdateResults { poll_id, results }) => (poll_id, results),
            other => panic!("expected results, got {other:?}"),
        };
        assert_eq!(poll_id, id);
        assert_eq!(results.options[0].votes, 1);
        assert_eq!(state.hub.active_polls(), 1);

        state.gate.submit_vote(&id, 1, "10.0.0.2", Utc::now()).await.unwrap();
        assert_eq!(next(&mut connection).await, Some(2));
    }

    #[tokio::test]
    async fn join_unknown_poll_replies_error_and_unsubscribes() {
        let (state, _) = seeded_state().await;
        let mut connection = state.hub.connect();

        let (poll_id, message) = match handle_frame(&join("missing"), &state, &mut connection).await {
            Some(ServerFrame::Error { poll_id, message }) => (poll_id, message),
            other => panic!("expected an error, got {other:?}"),
        };
        assert_eq!(poll_id.as_deref(), Some("missing"));
        assert_eq!(message, VoteError::NotFound.to_string());
        assert_eq!(state.hub.active_polls(), 0);
    }

    #[tokio::test]
    async fn leave_stops_updates_without_reply() {
        let (state, id) = seeded_state().await;
        let mut connection = state.hub.connect();
        handle_frame(&join(&id), &state, &mut connection).await;

        let leave = format!(r#"{{"type":"leavePoll","pollId":"{id}"}}"#);
        assert!(handle_frame(&leave, &state, &mut connection).await.is_none());
        assert_eq!(state.hub.active_polls(), 0);

        state.gate.submit_vote(&id, 0, "10.0.0.1", Utc::now()).await.unwrap();
        assert_eq!(next(&mut connection).await, None);
    }

    #[tokio::test]
    async fn malformed_frame_replies_error_without_poll() {
        let (state, _) = seeded_state().await;
        let mut connection = state.hub.connect();

        let reply = handle_frame("not json", &state, &mut connection).await;
        assert!(matches!(reply, Some(ServerFrame::Error { poll_id: None, .. })));
        assert_eq!(state.hub.active_polls(), 0);
    }

    #[tokio::test]
    async fn join_racing_a_publish_never_moves_backwards() {
        let (state, id) = seeded_state().await;
        let mut connection = state.hub.connect();
        let before = Arc::new(state.gate.snapshot(&id, Utc::now()).await.unwrap());

        // A publish computed before the join read lands in the queue after it.
        connection.subscribe(&id);
        state.gate.submit_vote(&id, 0, "10.0.0.1", Utc::now()).await.unwrap();
        let reply = handle_frame(&join(&id), &state, &mut connection).await;
        state.hub.publish(&id, before);

        match reply {
            Some(ServerFrame::UpdateResults { results, .. }) => assert_eq!(results.total_votes(), 1),
            other => panic!("expected results, got {other:?}"),
        }

        // The queued commit matches what the join already showed; the stale one is skipped.
        assert_eq!(next(&mut connection).await, Some(1));
        assert_eq!(next(&mut connection).await, None);

        state.gate.submit_vote(&id, 1, "10.0.0.2", Utc::now()).await.unwrap();
        assert_eq!(next(&mut connection).await, Some(2));
    }

    #[test]
    fn client_frames_parse() {
        let join: ClientFrame = serde_json::from_str(r#"{"type":"joinPoll","pollId":"abc"}"#).unwrap();
        assert!(matches!(join, ClientFrame::JoinPoll { poll_id } if poll_id == "abc"));

        let leave: ClientFrame = serde_json::from_str(r#"{"type":"leavePoll","pollId":"abc"}"#).unwrap();
        assert!(matches!(leave, ClientFrame::LeavePoll { poll_id } if poll_id == "abc"));

        assert!(serde_json::from_str::<ClientFrame>(r#"{"type":"vote","pollId":"abc"}"#).is_err());
    }

    #[test]
    fn update_frame_shape() {
        let snapshot = Snapshot {
            question: "Colour?".to_string(),
            options: vec![PollOption {
                text: "Red".to_string(),
                votes: 3,
            }],
            expired: false,
            expires_at: None,
        };
        let frame = ServerFrame::UpdateResults {
            poll_id: "abc".to_string(),
            results: snapshot,
        };

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "updateResults");
        assert_eq!(json["pollId"], "abc");
        assert_eq!(json["results"]["options"][0]["votes"], 3);
    }

    #[test]
    fn error_frame_omits_missing_poll() {
        let frame = ServerFrame::Error {
            poll_id: None,
            message: "Malformed frame".to_string(),
        };

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["event"], "error");
        assert!(json.get("pollId").is_none());
    }
}
