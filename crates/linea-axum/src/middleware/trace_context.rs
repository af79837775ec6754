//! Request tracing middleware.
//!
//! Continues the caller's trace when a valid `traceparent` header arrives
//! and starts a new one otherwise. Every request gets a fresh span id; the
//! request id is the trace id. Both come back on the response as
//! `X-Request-ID` and `traceparent`.

use std::time::Instant;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::ProblemDetails;

pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const TRACE_ID_LEN: usize = 32;
const SPAN_ID_LEN: usize = 16;

/// Trace identifiers for one request, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    /// Caller's span when the trace was continued.
    pub parent_span_id: Option<String>,
}

impl TraceContext {
    /// Continue the trace in `headers`, or start a new one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let parsed = headers
            .get(TRACEPARENT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_traceparent);

        match parsed {
            Some((trace_id, parent)) => Self {
                trace_id: trace_id.to_string(),
                span_id: generate_span_id(),
                parent_span_id: Some(parent.to_string()),
            },
            None => Self {
                trace_id: generate_trace_id(),
                span_id: generate_span_id(),
                parent_span_id: None,
            },
        }
    }

    pub fn request_id(&self) -> &str {
        &self.trace_id
    }

    /// Header value announcing this request's span, always sampled.
    pub fn traceparent(&self) -> String {
        format!("00-{}-{}-01", self.trace_id, self.span_id)
    }
}

/// Split a version-00 `traceparent` into trace id and parent span id.
///
/// Only lowercase hex is accepted: `00-<32 hex>-<16 hex>-<2 hex>`.
pub fn parse_traceparent(value: &str) -> Option<(&str, &str)> {
    let mut parts = value.split('-');
    let version = parts.next()?;
    let trace_id = parts.next()?;
    let span_id = parts.next()?;
    let flags = parts.next()?;
    if parts.next().is_some() || version != "00" {
        return None;
    }

    let valid = is_lower_hex(trace_id, TRACE_ID_LEN)
        && is_lower_hex(span_id, SPAN_ID_LEN)
        && is_lower_hex(flags, 2);
    valid.then_some((trace_id, span_id))
}

fn is_lower_hex(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn generate_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn generate_span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(SPAN_ID_LEN);
    id
}

/// Attach trace context, log completion and finish problem documents.
pub async fn trace_requests(mut req: Request, next: Next) -> Response {
    let ctx = TraceContext::from_headers(req.headers());
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ctx.clone());

    let span = tracing::info_span!(
        "http_request",
        trace_id = %ctx.trace_id,
        span_id = %ctx.span_id,
        request_id = %ctx.request_id(),
    );

    let started = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let duration_ms = started.elapsed().as_millis();

    finish_problem(&mut response, &path, &ctx);

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
        headers.insert(REQUEST_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&ctx.traceparent()) {
        headers.insert(TRACEPARENT_HEADER, value);
    }

    span.in_scope(|| {
        tracing::info!(
            http_method = %method,
            http_path = %path,
            http_status_code = response.status().as_u16(),
            duration_ms = duration_ms,
            "Request completed"
        );
    });

    response
}

/// Fill request context into a problem body produced further down the stack.
fn finish_problem(response: &mut Response, path: &str, ctx: &TraceContext) {
    let Some(mut problem) = response.extensions_mut().remove::<ProblemDetails>() else {
        return;
    };
    problem.instance = path.to_string();
    problem.request_id = ctx.request_id().to_string();
    problem.trace_id.clone_from(&ctx.trace_id);

    *response.body_mut() = Body::from(problem.body_bytes());
    response.headers_mut().remove(header::CONTENT_LENGTH);
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";

    #[test]
    fn test_parse_valid_traceparent() {
        let (trace, span) = parse_traceparent(VALID).unwrap();
        assert_eq!(trace, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(span, "00f067aa0ba902b7");
    }

    #[test]
    fn test_parse_rejects_malformed_values() {
        assert!(parse_traceparent("").is_none());
        assert!(parse_traceparent("garbage").is_none());
        assert!(parse_traceparent(&VALID.to_uppercase()).is_none());
        assert!(parse_traceparent(&VALID.replacen("00-", "01-", 1)).is_none());
        assert!(parse_traceparent(&format!("{VALID}-extra")).is_none());
        assert!(parse_traceparent("00-4bf92f35-00f067aa0ba902b7-01").is_none());
    }

    #[test]
    fn test_context_continues_incoming_trace() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACEPARENT_HEADER, HeaderValue::from_static(VALID));
        let ctx = TraceContext::from_headers(&headers);

        assert_eq!(ctx.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.parent_span_id.as_deref(), Some("00f067aa0ba902b7"));
        assert_ne!(ctx.span_id, "00f067aa0ba902b7");
        assert_eq!(ctx.request_id(), ctx.trace_id);
    }

    #[test]
    fn test_context_generates_ids_without_header() {
        let ctx = TraceContext::from_headers(&HeaderMap::new());
        assert!(is_lower_hex(&ctx.trace_id, TRACE_ID_LEN));
        assert!(is_lower_hex(&ctx.span_id, SPAN_ID_LEN));
        assert!(ctx.parent_span_id.is_none());

        let header = ctx.traceparent();
        let (trace, span) = parse_traceparent(&header).unwrap();
        assert_eq!(trace, ctx.trace_id);
        assert_eq!(span, ctx.span_id);
    }
}
