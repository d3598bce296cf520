use crate::error::AppError;
use crate::models::RoleName;
use crate::services::Principal;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

/// Extract Bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Authorization header is required".to_string()))?
        .to_str()
        .map_err(|_| {
            AppError::Unauthorized("Authorization header must be 'Bearer <token>'".to_string())
        })?;

    auth_header
        .strip_prefix("Bearer ")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Authorization header must be 'Bearer <token>'".to_string())
        })
}

/// Validates the bearer token, requires `ROLE_ADMIN`, and stores the
/// `Principal` in request extensions.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = authenticate(&state, request.headers())?;

    if !principal.has_role(RoleName::Admin.as_str()) {
        tracing::info!("User {} denied admin access", principal.user_id);
        return Err(AppError::Forbidden(
            crate::error::ErrorCode::Forbidden,
            "Admin access required".to_string(),
        ));
    }

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Principal, AppError> {
    let token = extract_bearer_token(headers)?;
    Ok(state.token_issuer.validate_token(token)?)
}
