use crate::error::Result;
use crate::models::{PublishedPost, Subscriber};
use crate::response::ApiResponse;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

pub async fn subscribe(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<ApiResponse<Subscriber>> {
    let Json(request) = payload?;
    let subscriber = state.subscriber_service.subscribe(&request.email).await?;
    Ok(ApiResponse::with_message("Successfully subscribed!", subscriber))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<ApiResponse<()>> {
    let Json(request) = payload?;
    state.subscriber_service.unsubscribe(&request.email).await?;
    Ok(ApiResponse::empty("Successfully unsubscribed!"))
}

pub async fn count(State(state): State<AppState>) -> Result<ApiResponse<i64>> {
    let count = state.subscriber_service.active_count().await?;
    Ok(ApiResponse::success(count))
}

pub async fn check(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<ApiResponse<bool>> {
    let subscribed = state.subscriber_service.is_subscribed(&email).await?;
    Ok(ApiResponse::success(subscribed))
}

/// Admin only.
pub async fn list(State(state): State<AppState>) -> Result<ApiResponse<Vec<Subscriber>>> {
    let subscribers = state.subscriber_service.list_all().await?;
    Ok(ApiResponse::success(subscribers))
}

/// Admin only. Queues the new-post fan-out and returns at once.
pub async fn notify_published_post(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PublishedPost>, JsonRejection>,
) -> Result<(StatusCode, ApiResponse<()>)> {
    let Json(post) = payload?;
    tracing::info!("Queueing subscriber notification for post {}", post.id);
    state.notification_service.spawn_new_post_notification(post);
    Ok((StatusCode::ACCEPTED, ApiResponse::empty("Notification queued")))
}
