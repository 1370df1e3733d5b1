use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::db::models::NotificationRecord;
use crate::db::services::ledger_service;
use crate::dispatch::DispatchOutcome;
use crate::notifications::Channel;
use crate::web::{AppError, AppState};

pub fn create_notification_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/send_sms_for_deviation", post(send_sms_for_deviation))
        .route("/send_email_for_deviation", post(send_email_for_deviation))
        .route("/send_verification_code", post(send_verification_code))
        .route("/notifications", get(list_notifications))
}

#[derive(Debug, PartialEq, Eq)]
pub struct DeviationDispatchRequest {
    pub dev_id: String,
    pub county_no: i32,
}

/// Validates the dispatch request body by hand so that missing or empty
/// fields come back as 400, not as an extractor rejection. The frontend has
/// historically sent `countyNo` both as a number and as a numeric string.
fn parse_dispatch_request(payload: &serde_json::Value) -> Result<DeviationDispatchRequest, AppError> {
    let dev_id = payload
        .get("devId")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());
    let county_no = payload.get("countyNo").and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
    });

    match (dev_id, county_no) {
        (Some(dev_id), Some(county_no)) => Ok(DeviationDispatchRequest {
            dev_id: dev_id.to_string(),
            county_no: county_no as i32,
        }),
        _ => Err(AppError::InvalidInput("devId och countyNo krävs".to_string())),
    }
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub message: String,
    pub count: usize,
}

impl From<DispatchOutcome> for DispatchResponse {
    fn from(outcome: DispatchOutcome) -> Self {
        Self {
            message: outcome.message,
            count: outcome.count,
        }
    }
}

// Triggers the synchronous single-deviation dispatch sequence for SMS.
// Zero eligible recipients is a 200 with an explanatory message, not an error.
async fn send_sms_for_deviation(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<DispatchResponse>, AppError> {
    let request = parse_dispatch_request(&payload)?;
    let outcome = app_state
        .dispatch_service
        .dispatch_by_id(Channel::Sms, &request.dev_id, request.county_no)
        .await?;
    Ok(Json(outcome.into()))
}

async fn send_email_for_deviation(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> Result<Json<DispatchResponse>, AppError> {
    let request = parse_dispatch_request(&payload)?;
    let outcome = app_state
        .dispatch_service
        .dispatch_by_id(Channel::Email, &request.dev_id, request.county_no)
        .await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize)]
pub struct VerificationCodeRequest {
    pub phone: String,
    /// Code supplied by the signup flow; generated here when absent.
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerificationCodeResponse {
    pub message: String,
    pub code: String,
}

// Internal endpoint for the signup flow. Drives the retrying
// verification-code transport path on the SMS sender.
async fn send_verification_code(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<VerificationCodeRequest>,
) -> Result<Json<VerificationCodeResponse>, AppError> {
    if payload.phone.trim().is_empty() {
        return Err(AppError::InvalidInput("phone krävs".to_string()));
    }

    let code = payload
        .code
        .unwrap_or_else(|| format!("{:06}", rand::rng().random_range(0..1_000_000)));

    app_state
        .sms_sender
        .send_verification_code(&payload.phone, &code)
        .await?;

    Ok(Json(VerificationCodeResponse {
        message: "Verifieringskod skickad".to_string(),
        code,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub limit: Option<i64>,
}

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 500;

async fn list_notifications(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<Vec<NotificationRecord>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let records = ledger_service::list_recent(&app_state.db_pool, limit).await?;
    Ok(Json(records))
}
