use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::state::AppState;
use crate::utils::{error::AppError, session::verify_token};

/// Requires a creator token, either as `Authorization: Bearer` or the
/// `token` cookie, and exposes its [`Claims`](crate::utils::session::Claims)
/// to the handler.
pub async fn jwt_auth(
    State(state): State<AppState>,
    cookie_jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    let token = bearer
        .or_else(|| cookie_jar.get("token").map(|cookie| cookie.value().to_string()))
        .ok_or_else(|| AppError::AuthenticationError("No token found".to_string()))?;

    let claims = verify_token(&token, &state.config.session_secret)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
