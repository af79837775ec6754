//! HTTP middleware.
//!
//! - `trace_context` - W3C `traceparent` propagation, request ids, request
//!   logging and the final touch on problem documents

pub mod trace_context;

pub use trace_context::{
    REQUEST_ID_HEADER, TRACEPARENT_HEADER, TraceContext, parse_traceparent, trace_requests,
};
