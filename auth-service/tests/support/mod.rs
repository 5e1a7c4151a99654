#![allow(dead_code)]

use std::env;
use std::sync::Arc;

use anyhow::Result;
use auth_service::credentials::{CredentialStore, InMemoryCredentialStore};
use auth_service::metrics::AuthMetrics;
use auth_service::{build_router, AppState};
use axum::body::Body;
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use axum::Router;
use common_auth::{hash_password, JwtConfig, TokenCodec};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "s3cr3t";
pub const MIGRATION: &str = include_str!("../../migrations/0001_create_members.sql");

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<InMemoryCredentialStore>,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_ttl(3600)
    }

    pub fn with_ttl(ttl_seconds: i64) -> Result<Self> {
        let store = Arc::new(InMemoryCredentialStore::new());
        let credentials: Arc<dyn CredentialStore> = store.clone();
        let codec = TokenCodec::new(&JwtConfig::new(TEST_SECRET).with_ttl(ttl_seconds)?);
        let state = AppState::new(codec, credentials, AuthMetrics::new()?);
        let router = build_router(state.clone(), &["http://localhost:3000".to_string()])?;
        Ok(Self {
            router,
            state,
            store,
        })
    }

    /// Insert a member directly, bypassing the self-service role rules.
    pub async fn seed_member(&self, email: &str, password: &str, role: &str) -> Result<i64> {
        let hash = hash_password(password)?;
        let record = self.store.insert(email, &hash, role).await?;
        Ok(record.id)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?;
        self.send(request).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let (status, body) = self
            .post_json(
                "/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "login failed: {status} {body}");
        body["token"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("login response missing token"))
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        Ok((status, value))
    }
}

pub struct TestDatabase {
    pool: PgPool,
}

impl TestDatabase {
    pub async fn setup() -> Result<Option<Self>> {
        let Ok(database_url) = env::var("AUTH_TEST_DATABASE_URL") else {
            eprintln!("Skipping Postgres tests: set AUTH_TEST_DATABASE_URL to run them.");
            return Ok(None);
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;
        pool.execute(MIGRATION).await?;

        Ok(Some(Self { pool }))
    }

    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }
}
