use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use zap_core::ZapError;

/// Errors raised while assembling or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] zap_store::StoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] zap_crypto::CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Error body: `{statusCode, code, message, success: false}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub code: String,
    pub message: String,
    pub success: bool,
}

/// Errors returned from request handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Zap(#[from] ZapError),

    #[error("malformed upload: {0}")]
    Multipart(#[from] MultipartError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Zap(e) => e.code(),
            Self::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                "payload_too_large"
            }
            Self::Multipart(_) => "bad_request",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Zap(e) => match e {
                ZapError::Validation(_) => StatusCode::BAD_REQUEST,
                ZapError::PasswordRequired | ZapError::InvalidPassword => StatusCode::UNAUTHORIZED,
                ZapError::NotFound => StatusCode::NOT_FOUND,
                ZapError::Conflict(_) => StatusCode::CONFLICT,
                ZapError::Expired | ZapError::ViewLimit => StatusCode::GONE,
                ZapError::DuplicateKey { .. }
                | ZapError::Storage(_)
                | ZapError::Persistence(_)
                | ZapError::Qr(_)
                | ZapError::Credential(_)
                | ZapError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Multipart(e) => e.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        // Internal details stay in the log.
        let message = if status.is_server_error() {
            "Internal server error.".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorResponse {
            status_code: status.as_u16(),
            code: self.code().to_string(),
            message,
            success: false,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
