use crate::auth::require_admin;
use crate::handlers::{
    auth_handlers, password_reset_handlers, registration_handlers, subscriber_handlers,
};
use crate::middleware::add_security_headers;
use crate::AppState;
use axum::{
    http::header,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Builds the full HTTP surface over `state`.
pub fn app_router(state: AppState) -> Router {
    let registration_routes = Router::new()
        .route("/", post(registration_handlers::initiate_registration))
        .route(
            "/{id}/resend-email-otp",
            put(registration_handlers::resend_email_otp),
        )
        .route("/validate-otp", put(registration_handlers::validate_otp))
        .route(
            "/complete-sign-up",
            put(registration_handlers::complete_sign_up),
        )
        .route(
            "/complete-admin-sign-up",
            put(registration_handlers::complete_admin_sign_up),
        );

    let password_reset_routes = Router::new()
        .route("/initiate", post(password_reset_handlers::initiate))
        .route("/validate-otp", post(password_reset_handlers::validate_otp))
        .route("/reset", post(password_reset_handlers::reset))
        .route("/resend-otp", post(password_reset_handlers::resend_otp));

    let subscriber_routes = Router::new()
        .route("/api/subscribers/subscribe", post(subscriber_handlers::subscribe))
        .route(
            "/api/subscribers/unsubscribe",
            post(subscriber_handlers::unsubscribe),
        )
        .route("/api/subscribers/count", get(subscriber_handlers::count))
        .route(
            "/api/subscribers/check/{email}",
            get(subscriber_handlers::check),
        );

    // Bearer token with ROLE_ADMIN
    let admin_routes = Router::new()
        .route("/api/subscribers", get(subscriber_handlers::list))
        .route(
            "/api/notifications/published-post",
            post(subscriber_handlers::notify_published_post),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .nest("/v1/registration", registration_routes)
        .route("/api/auth/signin", post(auth_handlers::signin))
        .nest("/api/password-reset", password_reset_routes)
        .merge(subscriber_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn(add_security_headers))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}
