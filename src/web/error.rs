use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::notifications::senders::SenderError;
use crate::traffic::TrafficError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Transport failure: {0}")]
    TransportFailure(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::UpstreamUnavailable(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::TransportFailure(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownRegion(county_no) => {
                AppError::NotFound(format!("Inget län hittat med county_no = {county_no}"))
            }
            DispatchError::DeviationNotFound(id) => {
                AppError::NotFound(format!("Ingen trafikhändelse hittad med id = {id}"))
            }
            DispatchError::Source(TrafficError::InvalidRegion(county_no)) => {
                AppError::NotFound(format!("Inget län hittat med county_no = {county_no}"))
            }
            DispatchError::Source(e) => AppError::UpstreamUnavailable(e.to_string()),
            DispatchError::Transport(e) => AppError::TransportFailure(e.to_string()),
            DispatchError::Database(e) => AppError::DatabaseError(e.to_string()),
        }
    }
}

impl From<SenderError> for AppError {
    fn from(err: SenderError) -> Self {
        match err {
            SenderError::WrongChannel { .. } => AppError::InternalServerError(err.to_string()),
            other => AppError::TransportFailure(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}
