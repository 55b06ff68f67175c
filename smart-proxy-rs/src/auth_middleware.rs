//! Bearer-token auth gate
//!
//! Runs before any body is read. A rejected request never reaches anonymization, routing or
//! an upstream call. Presented tokens are never logged.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use config_rs::Secret;

use crate::error::ProxyError;

/// Paths served without credentials
const PUBLIC_PATHS: [&str; 1] = ["/health"];

/// Extract the bearer token from the Authorization header
fn extract_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
}

pub async fn auth_middleware(
    State(secret): State<Secret>,
    req: Request,
    next: Next,
) -> Result<Response, ProxyError> {
    if PUBLIC_PATHS.contains(&req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let path = req.uri().path();
    match extract_token(&req) {
        None => {
            tracing::warn!(path = %path, "rejected request without bearer token");
            return Err(ProxyError::Unauthorized("Missing bearer token".to_string()));
        }
        Some(token) if !secret.matches(token) => {
            tracing::warn!(path = %path, "rejected request with invalid bearer token");
            return Err(ProxyError::Unauthorized("Invalid bearer token".to_string()));
        }
        Some(_) => {}
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_extract_token() {
        let req = Request::builder()
            .header(AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), Some("s3cret"));

        let req = Request::builder()
            .header(AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req), None);

        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_token(&req), None);
    }
}
