//! Inbound webhook endpoint.

use {
    axum::{
        body::Bytes,
        extract::State,
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Json, Response},
    },
    serde_json::json,
    tracing::{error, info, warn},
};

use tansa_line::{event::Event, signature};

use crate::{router, server::AppState};

const SIGNATURE_HEADER: &str = "x-line-signature";

/// `POST /webhook`: authenticate the delivery, then route each event,
/// isolating per-event failures so one bad event never fails the batch.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match handle_delivery(&state, &headers, &body).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "webhook handling failed");
            // Internal detail stays in the logs; the platform sees an
            // opaque body.
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "internal error",
            )
        },
    }
}

async fn handle_delivery(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> anyhow::Result<Response> {
    let Some(credentials) = state.gateway.credentials.as_ref() else {
        warn!("webhook request while LINE credentials are unconfigured");
        return Ok(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "NOT_CONFIGURED",
            "LINE credentials are not configured",
        ));
    };

    let signature_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !signature::verify_signature(body, signature_header, credentials.channel_secret()) {
        warn!("rejected webhook delivery with an invalid signature");
        return Ok(error_response(
            StatusCode::UNAUTHORIZED,
            "INVALID_SIGNATURE",
            "signature verification failed",
        ));
    }

    let events = decode_events(body);
    if !events.is_empty() {
        info!(count = events.len(), "processing webhook delivery");
    }
    for event in events {
        if let Err(e) = router::route_event(&state.gateway, event).await {
            error!(error = %e, "event handling failed, continuing with batch");
        }
    }

    Ok((StatusCode::OK, Json(json!({"status": "OK"}))).into_response())
}

/// Pull the events array out of the body. Absent or malformed input is an
/// empty batch, never a request failure; individually malformed events are
/// dropped with a log line.
fn decode_events(body: &[u8]) -> Vec<Event> {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "webhook body is not valid JSON");
            return Vec::new();
        },
    };

    let Some(items) = value.get("events").and_then(|e| e.as_array()) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "dropping malformed event");
                None
            },
        })
        .collect()
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": code, "message": message}})),
    )
        .into_response()
}
