use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use blogpress::{
    config::AppConfig,
    models::RoleName,
    routes::app_router,
    services::{Principal, TokenIssuer},
    test_utils::test_helpers::{self, TestApp},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

async fn setup() -> (TestApp, Router) {
    let app = test_helpers::create_test_app(AppConfig::default())
        .await
        .unwrap();
    test_helpers::insert_test_user(
        &app.pool,
        "reader",
        "reader@example.com",
        "readerpass",
        RoleName::Reader,
    )
    .await
    .unwrap();
    test_helpers::insert_test_user(
        &app.pool,
        "admin",
        "admin@example.com",
        "adminpass",
        RoleName::Admin,
    )
    .await
    .unwrap();
    let router = app_router(app.state.clone());
    (app, router)
}

async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (
        status,
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null),
    )
}

async fn sign_in(router: &Router, email: &str, password: &str) -> String {
    let (status, body) = call(
        router,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({"email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_signin_returns_bearer_token_with_roles() {
    let (app, router) = setup().await;

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({"email": "Admin@Example.com", "password": "adminpass"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "Bearer");
    assert_eq!(body["data"]["username"], "admin");
    assert_eq!(body["data"]["roles"], json!(["ROLE_ADMIN"]));

    let principal = app
        .tokens
        .validate_token(body["data"]["token"].as_str().unwrap())
        .unwrap();
    assert_eq!(principal.email, "admin@example.com");
    assert!(principal.has_role("ROLE_ADMIN"));
}

#[tokio::test]
async fn test_signin_failures_share_one_message() {
    let (_app, router) = setup().await;

    let (status, wrong_password) = call(
        &router,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({"email": "reader@example.com", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_user) = call(
        &router,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({"email": "ghost@example.com", "password": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], unknown_user["message"]);
    assert_eq!(unknown_user["errorCode"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_subscriber_listing_requires_admin() {
    let (_app, router) = setup().await;

    let (status, _) = call(&router, Method::GET, "/api/subscribers", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &router,
        Method::GET,
        "/api/subscribers",
        Some("not-a-jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let reader = sign_in(&router, "reader@example.com", "readerpass").await;
    let (status, body) = call(&router, Method::GET, "/api/subscribers", Some(&reader), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "FORBIDDEN");

    let admin = sign_in(&router, "admin@example.com", "adminpass").await;
    let (status, body) = call(&router, Method::GET, "/api/subscribers", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_token_from_other_key_is_rejected() {
    let (_app, router) = setup().await;
    let foreign = blogpress::services::JwtTokenIssuer::new(
        b"some-other-signing-key-for-this-test",
        chrono::Duration::minutes(5),
    );
    let token = foreign
        .issue_token(&Principal {
            user_id: "x".to_string(),
            email: "x@example.com".to_string(),
            roles: vec!["ROLE_ADMIN".to_string()],
        })
        .unwrap()
        .token;

    let (status, _) = call(&router, Method::GET, "/api/subscribers", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_subscriber_endpoints() {
    let (_app, router) = setup().await;

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/subscribers/subscribe",
        None,
        Some(json!({"email": "fan@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "fan@example.com");

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/subscribers/subscribe",
        None,
        Some(json!({"email": "fan@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errorCode"], "ALREADY_SUBSCRIBED");

    let (_, body) = call(&router, Method::GET, "/api/subscribers/count", None, None).await;
    assert_eq!(body["data"], 1);

    let (_, body) = call(
        &router,
        Method::GET,
        "/api/subscribers/check/fan@example.com",
        None,
        None,
    )
    .await;
    assert_eq!(body["data"], true);

    let (status, _) = call(
        &router,
        Method::POST,
        "/api/subscribers/unsubscribe",
        None,
        Some(json!({"email": "nobody@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_published_post_hook_is_accepted_immediately() {
    let (app, router) = setup().await;
    app.state
        .subscriber_service
        .subscribe("fan@example.com")
        .await
        .unwrap();
    let admin = sign_in(&router, "admin@example.com", "adminpass").await;

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/notifications/published-post",
        Some(&admin),
        Some(json!({"id": "p1", "title": "Hello", "slug": "hello", "excerpt": null})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Notification queued");

    let reader = sign_in(&router, "reader@example.com", "readerpass").await;
    let (status, _) = call(
        &router,
        Method::POST,
        "/api/notifications/published-post",
        Some(&reader),
        Some(json!({"id": "p2", "title": "Nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_password_reset_over_http() {
    let (app, router) = setup().await;

    let (status, _) = call(
        &router,
        Method::POST,
        "/api/password-reset/initiate",
        None,
        Some(json!({"email": "reader@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = app.emails.last_code_for("reader@example.com").unwrap();

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/password-reset/reset",
        None,
        Some(json!({"email": "reader@example.com", "otp": code, "newPassword": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], "VALIDATION_ERROR");

    let (status, _) = call(
        &router,
        Method::POST,
        "/api/password-reset/reset",
        None,
        Some(json!({"email": "reader@example.com", "otp": code, "newPassword": "brandnewpass"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/password-reset/validate-otp",
        None,
        Some(json!({"email": "reader@example.com", "otp": code})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], "INVALID_OTP");

    sign_in(&router, "reader@example.com", "brandnewpass").await;

    let (status, _) = call(
        &router,
        Method::POST,
        "/api/password-reset/initiate",
        None,
        Some(json!({"email": "ghost@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
