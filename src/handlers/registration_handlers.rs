use crate::error::Result;
use crate::models::OtpIssue;
use crate::response::ApiResponse;
use crate::services::{RegistrationStarted, SignUpCompleted};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRegistrationRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOtpRequest {
    pub registration_id: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSignUpRequest {
    pub registration_id: String,
    pub password: String,
}

/// POST /v1/registration
pub async fn initiate_registration(
    State(state): State<AppState>,
    payload: std::result::Result<Json<InitiateRegistrationRequest>, JsonRejection>,
) -> Result<ApiResponse<RegistrationStarted>> {
    let Json(request) = payload?;
    let started = state
        .registration_service
        .initiate(&request.email, &request.first_name, &request.last_name)
        .await?;
    Ok(ApiResponse::success(started))
}

/// PUT /v1/registration/{id}/resend-email-otp
pub async fn resend_email_otp(
    State(state): State<AppState>,
    Path(registration_id): Path<String>,
) -> Result<ApiResponse<OtpIssue>> {
    let issue = state
        .registration_service
        .send_email_otp(&registration_id)
        .await?;
    Ok(ApiResponse::success(issue))
}

/// PUT /v1/registration/validate-otp
pub async fn validate_otp(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ValidateOtpRequest>, JsonRejection>,
) -> Result<ApiResponse<()>> {
    let Json(request) = payload?;
    state
        .registration_service
        .validate_otp(&request.registration_id, &request.otp)
        .await?;
    Ok(ApiResponse::empty("Success"))
}

/// PUT /v1/registration/complete-sign-up
pub async fn complete_sign_up(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CompleteSignUpRequest>, JsonRejection>,
) -> Result<ApiResponse<SignUpCompleted>> {
    let Json(request) = payload?;
    let completed = state
        .registration_service
        .complete_sign_up(&request.registration_id, &request.password)
        .await?;
    Ok(ApiResponse::success(completed))
}

/// PUT /v1/registration/complete-admin-sign-up
pub async fn complete_admin_sign_up(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CompleteSignUpRequest>, JsonRejection>,
) -> Result<ApiResponse<SignUpCompleted>> {
    let Json(request) = payload?;
    let completed = state
        .registration_service
        .complete_admin_sign_up(&request.registration_id, &request.password)
        .await?;
    Ok(ApiResponse::success(completed))
}
