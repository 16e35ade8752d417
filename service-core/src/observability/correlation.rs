//! Correlation id propagation for outgoing gateway calls.
//!
//! Every request made on behalf of a release run carries the run's correlation id,
//! so gateway-side logs can be joined with the task log.

use reqwest::header::HeaderMap;

/// Header name for the release run correlation id
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Header name for the per-request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Inject the correlation id and a request id into `headers`.
///
/// Values that are not valid header values are skipped.
pub fn inject_correlation_headers(
    headers: &mut HeaderMap,
    correlation_id: &str,
    request_id: &str,
) {
    if let Ok(value) = correlation_id.parse() {
        headers.insert(CORRELATION_ID_HEADER, value);
    }

    if let Ok(value) = request_id.parse() {
        headers.insert(REQUEST_ID_HEADER, value);
    }
}

/// Correlation id echoed in response or request headers.
pub fn extract_correlation_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
