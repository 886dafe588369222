use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application-level errors
///
/// The first four variants are the complete failure taxonomy of the remote
/// catalog boundary; the rest belong to the service around it.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited by catalog API{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Protocol(format!("HTTP transport failure: {}", err))
    }
}

impl AppError {
    /// True for failures of the remote catalog boundary
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::RateLimited { .. }
                | AppError::SessionExpired(_)
                | AppError::Protocol(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            AppError::RateLimited { retry_after } => *retry_after,
            _ => None,
        };

        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::SessionExpired(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Protocol(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            AppError::Cache(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message_includes_hint() {
        let err = AppError::RateLimited {
            retry_after: Some(30),
        };
        assert_eq!(err.to_string(), "Rate limited by catalog API (retry after 30s)");

        let err = AppError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "Rate limited by catalog API");
    }

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (AppError::NotFound("user".into()), StatusCode::NOT_FOUND),
            (AppError::SessionExpired("token".into()), StatusCode::UNAUTHORIZED),
            (AppError::Protocol("bad".into()), StatusCode::BAD_GATEWAY),
            (AppError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_rate_limited_sets_retry_after_header() {
        let response = AppError::RateLimited {
            retry_after: Some(12),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "12");
    }

    #[test]
    fn test_is_remote() {
        assert!(AppError::Protocol("x".into()).is_remote());
        assert!(AppError::RateLimited { retry_after: None }.is_remote());
        assert!(!AppError::InvalidInput("x".into()).is_remote());
    }
}
