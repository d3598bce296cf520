use crate::error::Result;
use crate::response::ApiResponse;
use crate::services::JwtResponse;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/signin
pub async fn signin(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SigninRequest>, JsonRejection>,
) -> Result<ApiResponse<JwtResponse>> {
    let Json(request) = payload?;
    let response = state
        .auth_service
        .sign_in(&request.email, &request.password)
        .await?;
    Ok(ApiResponse::success(response))
}
