use std::io::Error as IoError;

use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use ravenwatch::{DeliveryError, RegistryError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Device '{0}' not found")]
    DeviceNotFound(String),
    #[error("Troubleshooting category '{0}' not found")]
    CategoryNotFound(String),
    #[error("Notification failed: {0}")]
    Delivery(#[from] DeliveryError),
    #[error("Background task failed: {0}")]
    Blocking(#[from] BlockingError),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Registry(RegistryError::Validation(_)) | AppError::Delivery(DeliveryError::NotConfigured) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Registry(RegistryError::NotFound(_))
            | AppError::DeviceNotFound(_)
            | AppError::CategoryNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        HttpResponse::build(status).json(json!({ "detail": self.to_string() }))
    }
}
