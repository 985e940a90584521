use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use storefront_platform::{
    config::AppConfig,
    db::create_lazy_pool,
    domain::signature,
    routes::build_app,
    state::AppState,
};
use tower::ServiceExt;

const SECRET: &str = "whsec_route_test";
const EVENT: &str = r#"{"id":"evt_route","type":"invoice.paid","data":{"object":{}}}"#;

fn app(secret: &str) -> anyhow::Result<Router> {
    let mut config = AppConfig::for_platform("postgres://localhost/unused", "shops.example.com");
    config.stripe_webhook_secret = secret.to_string();
    let pool = create_lazy_pool(&config.database_url)?;
    Ok(build_app(AppState::new(pool, config)))
}

fn webhook(signature: Option<&str>) -> anyhow::Result<Request<Body>> {
    let mut builder = Request::post("/api/webhooks/stripe").header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    Ok(builder.body(Body::from(EVENT))?)
}

#[tokio::test]
async fn missing_signature_is_bad_request() -> anyhow::Result<()> {
    let response = app(SECRET)?.oneshot(webhook(None)?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn signature_from_another_secret_is_bad_request() -> anyhow::Result<()> {
    let header = signature::sign(EVENT.as_bytes(), "whsec_someone_else", Utc::now().timestamp())?;
    let response = app(SECRET)?.oneshot(webhook(Some(&header))?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unconfigured_secret_is_server_error() -> anyhow::Result<()> {
    let header = signature::sign(EVENT.as_bytes(), SECRET, Utc::now().timestamp())?;
    let response = app("")?.oneshot(webhook(Some(&header))?).await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    Ok(())
}

#[tokio::test]
async fn tenant_routes_reject_bad_tenant_header() -> anyhow::Result<()> {
    let request = Request::get("/api/tenant")
        .header("x-tenant-id", "not-a-uuid")
        .body(Body::empty())?;
    let response = app(SECRET)?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn platform_host_has_no_tenant() -> anyhow::Result<()> {
    let request = Request::get("/api/products")
        .header("host", "shops.example.com")
        .body(Body::empty())?;
    let response = app(SECRET)?.oneshot(request).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
