use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use chrono::{Duration, Utc};
use common_auth::{
    authenticate_request, authorize_request, AuthContext, JwtConfig, RoleGate, TokenCodec,
    TokenSubject, ROLE_ADMIN, ROLE_SELLER,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

const SECRET: &str = "s3cr3t";

fn codec() -> Arc<TokenCodec> {
    Arc::new(TokenCodec::new(
        &JwtConfig::new(SECRET).with_ttl(3600).expect("ttl"),
    ))
}

async fn whoami(auth: AuthContext) -> String {
    format!("{}:{}", auth.claims().member_id(), auth.claims().role())
}

fn router(codec: Arc<TokenCodec>) -> Router {
    let sellers = Router::new()
        .route("/seller", get(whoami))
        .route_layer(from_fn_with_state(
            RoleGate::new([ROLE_SELLER, ROLE_ADMIN]).unwrap(),
            authorize_request,
        ))
        .route_layer(from_fn_with_state(codec.clone(), authenticate_request));

    let admins = Router::new()
        .route("/admin", get(whoami))
        .route_layer(from_fn_with_state(
            RoleGate::new([ROLE_ADMIN]).unwrap(),
            authorize_request,
        ))
        .route_layer(from_fn_with_state(codec.clone(), authenticate_request));

    // authorization without authentication in front of it
    let misconfigured = Router::new().route("/unguarded", get(whoami)).route_layer(
        from_fn_with_state(RoleGate::new([ROLE_ADMIN]).unwrap(), authorize_request),
    );

    Router::new()
        .route("/me", get(whoami))
        .merge(sellers)
        .merge(admins)
        .merge(misconfigured)
        .with_state(codec)
}

fn token_for(codec: &TokenCodec, member_id: i64, role: &str) -> String {
    codec.encode(&TokenSubject::new(member_id, role)).unwrap()
}

async fn call(app: Router, uri: &str, authorization: Option<&str>) -> (StatusCode, String) {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    let resp = app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn code_of(body: &str) -> String {
    let value: Value = serde_json::from_str(body).unwrap();
    value["code"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn extractor_authenticates_without_layers() {
    let codec = codec();
    let token = token_for(&codec, 42, "buyer");
    let (status, body) = call(router(codec), "/me", Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "42:buyer");
}

#[tokio::test]
async fn missing_header_is_401_missing_token() {
    let (status, body) = call(router(codec()), "/seller", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code_of(&body), "missing_token");
}

#[tokio::test]
async fn malformed_headers_never_reach_decode() {
    for header in ["Token abc", "Bearer", "Bearer "] {
        let (status, body) = call(router(codec()), "/seller", Some(header)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{header:?}");
        assert_eq!(code_of(&body), "malformed_header", "{header:?}");
    }
}

#[tokio::test]
async fn permitted_role_reaches_handler() {
    let codec = codec();
    let token = token_for(&codec, 42, ROLE_SELLER);
    let (status, body) = call(router(codec), "/seller", Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "42:seller");
}

#[tokio::test]
async fn outside_role_is_403_naming_allowed_roles() {
    let codec = codec();
    let token = token_for(&codec, 42, ROLE_SELLER);
    let (status, body) = call(router(codec), "/admin", Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(code_of(&body), "insufficient_role");
    assert!(body.contains("admin"));
}

#[tokio::test]
async fn token_from_other_secret_is_invalid() {
    let foreign = TokenCodec::new(&JwtConfig::new("not-the-secret"));
    let token = token_for(&foreign, 42, ROLE_ADMIN);
    let (status, body) = call(router(codec()), "/admin", Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code_of(&body), "invalid_signature");
    assert!(body.contains("Invalid token"));
}

#[tokio::test]
async fn expired_token_is_reported_as_expired() {
    let codec = codec();
    let token = codec
        .encode_at(
            &TokenSubject::new(42, ROLE_ADMIN),
            Utc::now() - Duration::hours(2),
        )
        .unwrap();
    let (status, body) = call(router(codec), "/admin", Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code_of(&body), "expired");
    assert!(body.contains("Token has expired"));
}

#[tokio::test]
async fn authorization_before_authentication_is_precondition_failure() {
    let codec = codec();
    let token = token_for(&codec, 1, ROLE_ADMIN);
    let (status, body) = call(
        router(codec),
        "/unguarded",
        Some(&format!("Bearer {token}")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(code_of(&body), "authentication_required");
    assert!(body.contains("Authentication required"));
}
