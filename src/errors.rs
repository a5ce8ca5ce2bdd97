// src/errors.rs
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("Image decode error: {0}")]
    Decode(String),

    #[error("Image read error: {0}")]
    Read(String),

    #[error("Malformed image reference: {0}")]
    Format(String),

    #[error("Planning response parse error: {0}")]
    PlanParse(String),

    #[error("No image returned for design \"{0}\"")]
    ImagePartMissing(String),

    #[error("No image returned for edit request")]
    EditImagePartMissing,

    #[error("Remote generation error: {0}")]
    Remote(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),
}

impl ResponseError for StagingError {
    fn error_response(&self) -> HttpResponse {
        match self {
            StagingError::Decode(_) | StagingError::Read(_) | StagingError::Format(_) => {
                HttpResponse::BadRequest().json(serde_json::json!({
                    "error": "Image data error",
                    "message": self.to_string()
                }))
            }
            StagingError::PlanParse(_) => HttpResponse::BadGateway().json(serde_json::json!({
                "error": "Planning response error",
                "message": self.to_string()
            })),
            StagingError::ImagePartMissing(_) | StagingError::EditImagePartMissing => {
                HttpResponse::BadGateway().json(serde_json::json!({
                    "error": "Missing image in remote response",
                    "message": self.to_string()
                }))
            }
            StagingError::Remote(_) => {
                HttpResponse::ServiceUnavailable().json(serde_json::json!({
                    "error": "AI service error",
                    "message": self.to_string()
                }))
            }
            StagingError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Validation error",
                "message": self.to_string()
            })),
            StagingError::SessionNotFound(_) => HttpResponse::NotFound().json(serde_json::json!({
                "error": "Session not found",
                "message": self.to_string()
            })),
            StagingError::InvalidTransition(_) => {
                HttpResponse::Conflict().json(serde_json::json!({
                    "error": "Invalid session state",
                    "message": self.to_string()
                }))
            }
        }
    }
}
