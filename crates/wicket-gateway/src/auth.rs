use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::state::AppState;

/// Shared-secret check for the request routes. Disabled entirely when no
/// PROXY_API_KEY is configured.
pub async fn require_api_key(
    State(st): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, std::convert::Infallible> {
    let Some(expected) = st.config.proxy_api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let presented = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| req.headers().get("x-api-key").and_then(|v| v.to_str().ok()));

    if presented != Some(expected) {
        tracing::warn!("request with missing or invalid api key");
        return Ok(unauthorized());
    }

    Ok(next.run(req).await)
}

fn unauthorized() -> Response {
    (
        axum::http::StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"message": "invalid api key"}})),
    )
        .into_response()
}
