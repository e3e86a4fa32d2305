use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use http::{header, Method, StatusCode};
use std::sync::Arc;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::handler::AlertHandler;

pub async fn healthz() -> &'static str {
    "Webhook receiver is running\n"
}

/// Alertmanager expects a 200 OK here, otherwise send_resolved never works.
pub async fn acknowledge() -> Response {
    (StatusCode::OK, Json("OK")).into_response()
}

pub async fn receive_alert(
    State(handler): State<Arc<AlertHandler>>,
    body: Bytes,
) -> Response {
    let span = info_span!("alert", request_id = %Uuid::new_v4());

    match handler.handle(&body).instrument(span).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => (e.status_code(), e.public_message()).into_response(),
    }
}

pub async fn unsupported_method(method: Method) -> Response {
    (
        StatusCode::BAD_REQUEST,
        format!("Unsupported HTTP method: {}", method),
    )
        .into_response()
}

pub async fn metrics() -> Response {
    match crate::metrics::gather_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
