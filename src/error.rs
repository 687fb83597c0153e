use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bucket '{cluster}/{label}' not found")]
    BucketNotFound { cluster: String, label: String },
    #[error("Bucket '{cluster}/{label}' already exists")]
    BucketAlreadyExists { cluster: String, label: String },
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),
    #[error("Unknown cluster '{0}'")]
    UnknownCluster(String),
    #[error("Unknown region '{0}'")]
    UnknownRegion(String),
    #[error("Instance {0} not found")]
    InstanceNotFound(u64),
    #[error("Invalid instance: {0}")]
    InvalidInstance(String),
    #[error("Invalid page size: {0}")]
    InvalidPageSize(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
    message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::BucketNotFound { .. } => (StatusCode::NOT_FOUND, "NoSuchBucket"),
            AppError::BucketAlreadyExists { .. } => (StatusCode::CONFLICT, "BucketAlreadyOwnedByYou"),
            AppError::InvalidBucketName(_) => (StatusCode::BAD_REQUEST, "InvalidBucketName"),
            AppError::UnknownCluster(_) => (StatusCode::BAD_REQUEST, "UnknownCluster"),
            AppError::UnknownRegion(_) => (StatusCode::BAD_REQUEST, "UnknownRegion"),
            AppError::InstanceNotFound(_) => (StatusCode::NOT_FOUND, "NoSuchInstance"),
            AppError::InvalidInstance(_) => (StatusCode::BAD_REQUEST, "InvalidInstance"),
            AppError::InvalidPageSize(_) => (StatusCode::BAD_REQUEST, "InvalidPageSize"),
            AppError::StorageError(_) | AppError::IoError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = ErrorResponse {
            error: code.to_string(),
            code: code.to_string(),
            message: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::StorageError(format!("Corrupt metadata: {}", e))
    }
}
