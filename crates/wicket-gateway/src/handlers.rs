use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use wicket_common::{AgentRequest, AgentResponse, GatewayError};

use crate::state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Native request shape: a validated request in, status-mapped response out.
pub async fn execute(State(st): State<AppState>, Json(req): Json<AgentRequest>) -> Response {
    if let Some(reason) = validate(&req) {
        let body = AgentResponse {
            error: Some(reason.to_string()),
            ..AgentResponse::default()
        };
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    }

    match st.scheduler.submit(req).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => (error_status(&e), Json(error_body(&e))).into_response(),
    }
}

pub async fn stats(State(st): State<AppState>) -> impl IntoResponse {
    Json(st.scheduler.snapshot_metrics().await)
}

fn validate(req: &AgentRequest) -> Option<&'static str> {
    if req.prompt.trim().is_empty() {
        return Some("prompt is required");
    }
    if req.max_turns == Some(0) {
        return Some("maxTurns must be positive");
    }
    if req.timeout_ms == Some(0) {
        return Some("timeoutMs must be positive");
    }
    None
}

pub fn error_status(e: &GatewayError) -> StatusCode {
    StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn error_body(e: &GatewayError) -> AgentResponse {
    AgentResponse {
        error: Some(e.to_string()),
        ..AgentResponse::default()
    }
}
