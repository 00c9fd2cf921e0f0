use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Domain-specific error types for the analysis service.
/// Numeric edge cases never surface here: the engine absorbs them.
/// Only malformed requests and infrastructure failures do.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("model computation error: {0}")]
    Model(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("channel closed: {0}")]
    ChannelClosed(String),
}

impl EngineError {
    /// Stable name of the variant, reported to HTTP clients as `type`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::Parse(_) => "Parse",
            Self::Model(_) => "Model",
            Self::Database(_) => "Database",
            Self::NotFound(_) => "NotFound",
            Self::Config(_) => "Config",
            Self::ChannelClosed(_) => "ChannelClosed",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let details = match &self {
            Self::InvalidRequest(_) => "request body is not a valid analysis request",
            Self::NotFound(_) => "no cached analysis for this key",
            _ => "analysis service encountered an error",
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "type": self.kind(),
            "details": details,
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Parse(e.to_string())
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Database(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Database(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_is_bad_request() {
        let resp = EngineError::InvalidRequest("missing field `strike`".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_status() {
        let resp = EngineError::NotFound("CALL100_2026-01-02".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_infrastructure_errors_are_500() {
        let resp = EngineError::Database("lock poisoned".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(EngineError::Config("x".into()).kind(), "Config");
    }
}
