pub mod list_feedback;
pub mod models;
pub mod submit_feedback;

#[cfg(test)]
mod tests {
    use axum::{extract::State, Json};

    use super::list_feedback::{list_feedback, RECENT_FEEDBACK};
    use super::models::FeedbackRequest;
    use super::submit_feedback::submit_feedback;
    use crate::state::AppState;
    use crate::utils::error::AppError;

    async fn submit(state: &AppState, raw: &str) -> Result<(), AppError> {
        let body: FeedbackRequest = serde_json::from_str(raw).unwrap();
        submit_feedback(State(state.clone()), Json(body)).await.map(|_| ())
    }

    #[tokio::test]
    async fn test_submit_then_list() {
        let state = AppState::in_memory();

        submit(&state, r#"{"name":" Ada ","message":"Loved it","rating":5}"#)
            .await
            .unwrap();

        let Json(listed) = list_feedback(State(state)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Ada");
        assert_eq!(listed[0].rating, 5);
    }

    #[tokio::test]
    async fn test_invalid_feedback_is_rejected() {
        let state = AppState::in_memory();

        for raw in [
            r#"{"name":"Ada","message":"Nice","rating":0}"#,
            r#"{"name":"Ada","message":"Nice","rating":6}"#,
            r#"{"name":"Ada","message":"Nice","rating":2.5}"#,
            r#"{"name":"Ada","message":"Nice"}"#,
            r#"{"name":"  ","message":"Nice","rating":3}"#,
            r#"{"name":"Ada","rating":3}"#,
        ] {
            let result = submit(&state, raw).await;
            assert!(matches!(result, Err(AppError::ValidationError(_))), "{raw}");
        }

        let Json(listed) = list_feedback(State(state)).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn test_listing_caps_at_recent_limit() {
        let state = AppState::in_memory();

        for n in 0..RECENT_FEEDBACK + 3 {
            let raw = format!(r#"{{"name":"user-{n}","message":"Nice","rating":4}}"#);
            submit(&state, &raw).await.unwrap();
        }

        let Json(listed) = list_feedback(State(state)).await.unwrap();
        assert_eq!(listed.len(), RECENT_FEEDBACK);
        assert_eq!(listed[0].name, format!("user-{}", RECENT_FEEDBACK + 2));
    }
}
