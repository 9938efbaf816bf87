//! Request tracing middleware

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::{info_span, Instrument};
use uuid::Uuid;

/// Response header carrying the per-request trace id.
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Request extension carrying the generated trace id, for handlers that want
/// to include it in their own output.
#[derive(Clone, Debug)]
pub struct TraceId(pub String);

impl TraceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Wraps every request in an `http_request` span carrying a fresh UUID v4
/// trace id, logs request start and completion inside that span, and echoes
/// the id back in the `X-Trace-Id` response header.
pub async fn trace_id_middleware(request: Request, next: Next) -> Response {
    let trace_id = Uuid::new_v4().to_string();

    let method = request.method().clone();
    let uri = request.uri().clone();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        uri = %uri,
    );

    let mut request = request;
    request.extensions_mut().insert(TraceId(trace_id.clone()));

    let response = async move {
        tracing::info!("Request started");
        let response = next.run(request).await;
        tracing::info!(status = %response.status(), "Request completed");
        response
    }
    .instrument(span)
    .await;

    // A hyphenated UUID is always a valid header value
    let (mut parts, body) = response.into_parts();
    parts.headers.insert(
        TRACE_ID_HEADER,
        HeaderValue::from_str(&trace_id).unwrap_or_else(|_| HeaderValue::from_static("invalid")),
    );

    Response::from_parts(parts, body)
}
