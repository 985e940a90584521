use axum::{body::Body, http::{Request, StatusCode}};
use storefront_platform::{
    config::AppConfig,
    db::create_lazy_pool,
    routes::{build_app, health::health_check},
    state::AppState,
};
use tower::ServiceExt;

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");
    assert!(response.0.data.is_some());
}

#[tokio::test]
async fn unknown_path_uses_error_envelope() -> anyhow::Result<()> {
    let config = AppConfig::for_platform("postgres://localhost/unused", "shops.example.com");
    let pool = create_lazy_pool(&config.database_url)?;
    let app = build_app(AppState::new(pool, config));

    let response = app
        .oneshot(Request::get("/nope").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key("x-request-id"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(json["message"], "Not Found");
    assert_eq!(json["error"], "no route for /nope");
    assert!(json.get("data").is_none());
    Ok(())
}

#[tokio::test]
async fn tenant_name_header_is_echoed() -> anyhow::Result<()> {
    let config = AppConfig::for_platform("postgres://localhost/unused", "shops.example.com");
    let pool = create_lazy_pool(&config.database_url)?;
    let app = build_app(AppState::new(pool, config));

    let response = app
        .oneshot(
            Request::get("/health")
                .header("x-tenant-name", "Demo Store")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-tenant-name"], "Demo Store");
    Ok(())
}
