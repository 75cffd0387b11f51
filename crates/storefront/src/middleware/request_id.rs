//! Request ID middleware for request tracing and correlation.
//!
//! Generates a UUID v4 for each request unless a usable id was provided by
//! an upstream proxy. The request ID is:
//! - Recorded in the current tracing span
//! - Added to the Sentry scope for error correlation
//! - Returned in the response headers

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest upstream request id accepted as-is.
const MAX_REQUEST_ID_LENGTH: usize = 128;

/// The upstream id if it is short and made of safe characters, otherwise a
/// fresh UUID.
fn request_id_for(upstream: Option<&str>) -> String {
    upstream
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LENGTH
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
        .map_or_else(|| Uuid::new_v4().to_string(), String::from)
}

/// Middleware that ensures every request has a unique request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request_id_for(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok()),
    );

    // Record in current span for structured logging
    Span::current().record("request_id", &request_id);

    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_reasonable_upstream_id() {
        assert_eq!(request_id_for(Some("cf-ray_8a1b2c.3")), "cf-ray_8a1b2c.3");
    }

    #[test]
    fn test_replaces_missing_or_unsafe_id() {
        assert!(Uuid::parse_str(&request_id_for(None)).is_ok());
        assert!(Uuid::parse_str(&request_id_for(Some("a b"))).is_ok());
        assert!(Uuid::parse_str(&request_id_for(Some(&"x".repeat(200)))).is_ok());
    }
}
