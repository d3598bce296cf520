use crate::error::Result;
use crate::models::OtpIssue;
use crate::response::ApiResponse;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateResetOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

pub async fn initiate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EmailRequest>, JsonRejection>,
) -> Result<ApiResponse<OtpIssue>> {
    let Json(request) = payload?;
    let issue = state
        .password_reset_service
        .initiate(&request.email)
        .await?;
    Ok(ApiResponse::with_message(
        "Password reset OTP sent to your email",
        issue,
    ))
}

pub async fn validate_otp(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ValidateResetOtpRequest>, JsonRejection>,
) -> Result<ApiResponse<()>> {
    let Json(request) = payload?;
    state
        .password_reset_service
        .validate_otp(&request.email, &request.otp)
        .await?;
    Ok(ApiResponse::empty("OTP validated successfully"))
}

pub async fn reset(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<ApiResponse<()>> {
    let Json(request) = payload?;
    state
        .password_reset_service
        .reset(&request.email, &request.otp, &request.new_password)
        .await?;
    Ok(ApiResponse::empty("Password reset successfully"))
}

pub async fn resend_otp(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EmailRequest>, JsonRejection>,
) -> Result<ApiResponse<OtpIssue>> {
    let Json(request) = payload?;
    let issue = state
        .password_reset_service
        .resend_otp(&request.email)
        .await?;
    Ok(ApiResponse::with_message("OTP resent successfully", issue))
}
