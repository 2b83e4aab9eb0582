//! Authentication middleware for the REST API
//!
//! Protected routes require an `X-API-Key` header equal to
//! `ApiConfig::api_key`. Requests without it, or with a different value,
//! receive `401 {"code":401,"message":"Unauthorized"}`. When no key is
//! configured every protected request is refused.

use crate::error::Error;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Authentication middleware that checks for a valid API key in the X-API-Key header
///
/// # Examples
///
/// ```no_run
/// use axum::{Router, middleware, routing::post};
/// use drive_relay::api::auth::require_api_key;
///
/// async fn handler() -> &'static str { "ok" }
///
/// let api_key = Some("secret-key-123".to_string());
/// let router: Router = Router::new()
///     .route("/gdrive-upload", post(handler))
///     .route_layer(middleware::from_fn_with_state(api_key, require_api_key));
/// ```
pub async fn require_api_key(
    State(expected_api_key): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_key) = expected_api_key else {
        tracing::warn!("rejecting request: no API key configured");
        return unauthorized_response();
    };

    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(provided_key)
            if constant_time_eq(provided_key.as_bytes(), expected_key.as_bytes()) =>
        {
            next.run(request).await
        }
        Some(_) => {
            tracing::debug!(path = %request.uri().path(), "invalid API key");
            unauthorized_response()
        }
        None => {
            tracing::debug!(path = %request.uri().path(), "missing API key");
            unauthorized_response()
        }
    }
}

/// Constant-time byte comparison.
/// Always compares all bytes regardless of where the first mismatch occurs.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn unauthorized_response() -> Response {
    Error::Unauthorized.into_response()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use tower::ServiceExt; // for oneshot

    async fn test_handler() -> impl IntoResponse {
        (StatusCode::OK, "Success")
    }

    fn app(api_key: Option<&str>) -> Router {
        Router::new()
            .route("/test", get(test_handler))
            .layer(middleware::from_fn_with_state(
                api_key.map(str::to_string),
                require_api_key,
            ))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_no_api_key_configured_refuses_everything() {
        let request = Request::builder()
            .uri("/test")
            .header("X-API-Key", "anything")
            .body(Body::empty())
            .unwrap();

        let response = app(None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_api_key() {
        let request = Request::builder()
            .uri("/test")
            .header("X-API-Key", "test-secret-key")
            .body(Body::empty())
            .unwrap();

        let response = app(Some("test-secret-key")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_api_key() {
        let request = Request::builder()
            .uri("/test")
            .header("X-API-Key", "wrong-key")
            .body(Body::empty())
            .unwrap();

        let response = app(Some("correct-key")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"code": 401, "message": "Unauthorized"})
        );
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app(Some("required-key")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"code": 401, "message": "Unauthorized"})
        );
    }

    #[tokio::test]
    async fn test_api_key_case_sensitive() {
        let request = Request::builder()
            .uri("/test")
            .header("X-API-Key", "casesensitivekey")
            .body(Body::empty())
            .unwrap();

        let response = app(Some("CaseSensitiveKey")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_header_name_case_insensitive() {
        let request = Request::builder()
            .uri("/test")
            .header("x-api-key", "test-key")
            .body(Body::empty())
            .unwrap();

        let response = app(Some("test-key")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_whitespace_in_api_key() {
        // Compared exactly, no trimming
        let request = Request::builder()
            .uri("/test")
            .header("X-API-Key", "key-with-space")
            .body(Body::empty())
            .unwrap();

        let response = app(Some("key-with-space ")).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
