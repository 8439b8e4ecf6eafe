use crate::error::GatewayError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Gateway(e) => match e {
                GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
                GatewayError::AlreadyExists(_) => StatusCode::CONFLICT,
                GatewayError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                GatewayError::Rejected(_) => StatusCode::BAD_GATEWAY,
                GatewayError::LocalIo { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                GatewayError::SigningFailure(_) | GatewayError::InvalidRequest(_) => {
                    StatusCode::BAD_REQUEST
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest(msg) | AppError::PayloadTooLarge(msg) => msg,
            AppError::Gateway(e @ GatewayError::LocalIo { .. }) => {
                tracing::error!("Local I/O error: {:?}", e);
                "Local storage failure".to_string()
            }
            AppError::Gateway(e) => {
                if status.is_server_error() {
                    tracing::error!("Backend error: {}", e);
                }
                e.to_string()
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
