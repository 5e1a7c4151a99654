use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{FromRef, Request, State};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method, StatusCode,
};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use common_auth::{
    authenticate_request, authorize_request, Argon2PasswordVerifier, PasswordVerifier, ReasonCode,
    RoleGate, TokenCodec, ROLE_ADMIN, ROLE_SELLER,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::credentials::CredentialStore;
use crate::metrics::AuthMetrics;
use crate::user_handlers::{
    dummy_hash, health, list_members, login_user, metrics_endpoint, register_user,
    seller_dashboard, whoami,
};

#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<TokenCodec>,
    pub credentials: Arc<dyn CredentialStore>,
    pub password_verifier: Arc<dyn PasswordVerifier>,
    pub metrics: Arc<AuthMetrics>,
}

impl FromRef<AppState> for Arc<TokenCodec> {
    fn from_ref(state: &AppState) -> Self {
        state.codec.clone()
    }
}

impl AppState {
    pub fn new(
        codec: TokenCodec,
        credentials: Arc<dyn CredentialStore>,
        metrics: AuthMetrics,
    ) -> Self {
        // pay for the placeholder hash up front, not on the first unknown email
        dummy_hash();
        Self {
            codec: Arc::new(codec),
            credentials,
            password_verifier: Arc::new(Argon2PasswordVerifier),
            metrics: Arc::new(metrics),
        }
    }

    pub fn record_login_metric(&self, outcome: &str) {
        self.metrics.login_attempt(outcome);
    }
}

/// Count 401/403 responses raised by the auth gates, keyed by reason code.
/// Login failures carry their own codes and are counted by the login handler.
pub async fn rejection_metrics(
    State(metrics): State<Arc<AuthMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let reason = response
            .headers()
            .get("X-Error-Code")
            .and_then(|v| v.to_str().ok())
            .and_then(ReasonCode::from_code);
        if let Some(reason) = reason {
            metrics.rejection(reason.as_str());
        }
    }
    response
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Result<Router> {
    let origins = cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).with_context(|| format!("Invalid CORS origin '{origin}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]);

    let seller_routes = Router::new()
        .route("/seller/dashboard", get(seller_dashboard))
        .route_layer(from_fn_with_state(
            RoleGate::new([ROLE_SELLER, ROLE_ADMIN])?,
            authorize_request,
        ));

    let admin_routes = Router::new()
        .route("/admin/members", get(list_members))
        .route_layer(from_fn_with_state(
            RoleGate::new([ROLE_ADMIN])?,
            authorize_request,
        ));

    // authenticate_request wraps the role gates, so it runs before them
    let protected = Router::new()
        .route("/me", get(whoami))
        .merge(seller_routes)
        .merge(admin_routes)
        .route_layer(from_fn_with_state(state.codec.clone(), authenticate_request));

    let app = Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/login", post(login_user))
        .route("/register", post(register_user))
        .merge(protected)
        .with_state(state.clone())
        .layer(cors)
        .layer(from_fn_with_state(state.metrics.clone(), rejection_metrics));

    Ok(app)
}
