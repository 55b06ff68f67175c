//! Mapping of upstream HTTP failures onto `ServiceError`

use reqwest::StatusCode;
use serde_json::Value;

use super::ServiceError;

/// Statuses that a remote chat call may retry.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Map a non-2xx upstream response to a ServiceError.
///
/// A JSON body is kept as-is; anything else is carried as text, truncated for sanity.
pub fn map_http_error(status: StatusCode, body: &str) -> ServiceError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        return ServiceError::upstream(status.as_u16(), json);
    }

    let message = if body.is_empty() {
        status.to_string()
    } else if body.len() > 200 {
        format!("{}: {}...", status, crate::util::truncate_string(body, 200))
    } else {
        format!("{}: {}", status, body)
    };

    ServiceError::upstream(status.as_u16(), Value::String(message))
}

/// Helper function to classify HTTP errors by category
pub fn classify_http_error(status: u16) -> &'static str {
    match status {
        400 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}

/// Determine if an HTTP status code indicates a retryable error
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body_preserved() {
        let err = map_http_error(StatusCode::TOO_MANY_REQUESTS, r#"{"error":"slow down"}"#);
        match err {
            ServiceError::Upstream { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, json!({"error": "slow down"}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_text_body_becomes_message() {
        let err = map_http_error(StatusCode::BAD_GATEWAY, "upstream down");
        match err {
            ServiceError::Upstream { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, json!("502 Bad Gateway: upstream down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify_http_error(401), "authentication");
        assert_eq!(classify_http_error(503), "server");
        assert_eq!(classify_http_error(418), "unknown");
    }
}
