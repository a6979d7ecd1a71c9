use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chunkfund_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Missing or invalid acting user: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Store(e) => match e {
                StoreError::InvoiceNotFound(_) | StoreError::UserNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                StoreError::NotInvoiceOwner { .. } => StatusCode::FORBIDDEN,
                StoreError::InvalidStatus { .. }
                | StoreError::InsufficientChunks { .. }
                | StoreError::UsernameTaken(_) => StatusCode::CONFLICT,
                StoreError::InvalidChunkCount
                | StoreError::InvalidInput(_)
                | StoreError::Ledger(_) => StatusCode::BAD_REQUEST,
                StoreError::Sqlite(_) | StoreError::Migration(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
