use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::OnceLock;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use common_auth::{
    hash_password, AuthContext, Claims, PasswordError, TokenSubject, ROLE_BUYER, ROLE_SELLER,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::credentials::{Member, StoreError};
use crate::AppState;

/// Roles a member may pick for themselves; admins are provisioned out of band.
pub(crate) const SELF_SERVICE_ROLES: &[&str] = &[ROLE_BUYER, ROLE_SELLER];

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Hash checked against on unknown emails so both login failures cost one
/// argon2 verification.
pub(crate) fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| match hash_password("unknown-member-placeholder") {
            Ok(hash) => Some(hash),
            Err(err) => {
                error!(error = %err, "Failed to prepare placeholder password hash");
                None
            }
        })
        .as_deref()
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code,
                message: message.into(),
            },
        }
    }

    fn invalid_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid credentials. Please try again.",
        )
    }

    fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = HeaderValue::from_static(self.body.code);
        let mut response = (self.status, Json(self.body)).into_response();
        response.headers_mut().insert("X-Error-Code", code);
        response
    }
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<Response, ApiError> {
    state.metrics.render().map_err(|err| {
        error!(error = %err, "Failed to render metrics");
        ApiError::internal_error("Unable to render metrics.")
    })
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub expires_at: String,
    pub member: Member,
}

pub async fn login_user(
    State(state): State<AppState>,
    Json(login): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let LoginRequest { email, password } = login;

    let record = match state
        .credentials
        .find_by_email(email.trim())
        .await
        .map_err(|err| {
            error!(error = %err, "Credential lookup failed");
            state.record_login_metric("error");
            ApiError::internal_error("Unable to process login.")
        })? {
        Some(record) => record,
        None => {
            if let Some(hash) = dummy_hash() {
                let _ = state.password_verifier.verify(&password, hash);
            }
            state.record_login_metric("unknown_email");
            return Err(ApiError::invalid_credentials());
        }
    };

    if !state
        .password_verifier
        .verify(&password, &record.password_hash)
    {
        warn!(member_id = record.id, "Password mismatch on login");
        state.record_login_metric("bad_password");
        return Err(ApiError::invalid_credentials());
    }

    let issued_at = Utc::now();
    let subject = TokenSubject::new(record.id, record.role.clone());
    let token = state.codec.encode_at(&subject, issued_at).map_err(|err| {
        error!(member_id = record.id, error = %err, "Failed to issue token");
        state.record_login_metric("error");
        ApiError::internal_error("Unable to issue authentication token.")
    })?;

    let expires_in = state.codec.ttl_seconds();
    let expires_at: DateTime<Utc> = issued_at + Duration::seconds(expires_in);

    state.record_login_metric("success");
    info!(member_id = record.id, role = %record.role, "Member logged in");

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in,
        expires_at: expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        member: record.member(),
    }))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    let RegisterRequest {
        email,
        password,
        role,
    } = request;

    let email = email.trim().to_string();
    if !is_plausible_email(&email) {
        return Err(ApiError::bad_request(
            "INVALID_EMAIL",
            "A valid email address is required.",
        ));
    }

    let role = role.unwrap_or_else(|| ROLE_BUYER.to_string());
    validate_role(&role)?;

    let password_hash = hash_password(&password).map_err(|err| match err {
        PasswordError::Empty => ApiError::bad_request("INVALID_PASSWORD", err.to_string()),
        PasswordError::Hash(_) => {
            error!(error = %err, "Password hashing failed");
            ApiError::internal_error("Unable to register member.")
        }
    })?;

    let record = state
        .credentials
        .insert(&email, &password_hash, &role)
        .await
        .map_err(|err| match err {
            StoreError::DuplicateEmail(_) => ApiError::new(
                StatusCode::CONFLICT,
                "EMAIL_TAKEN",
                "An account with this email already exists.",
            ),
            StoreError::Backend(_) => {
                error!(error = %err, "Failed to store new member");
                ApiError::internal_error("Unable to register member.")
            }
        })?;

    info!(member_id = record.id, role = %record.role, "Member registered");
    Ok((StatusCode::CREATED, Json(record.member())))
}

pub async fn whoami(auth: AuthContext) -> Json<Claims> {
    Json(auth.into_claims())
}

#[derive(Debug, Serialize)]
pub struct SellerDashboard {
    pub member_id: i64,
    pub role: String,
    pub token_expires_at: String,
}

pub async fn seller_dashboard(auth: AuthContext) -> Json<SellerDashboard> {
    let claims = auth.claims();
    Json(SellerDashboard {
        member_id: claims.member_id(),
        role: claims.role().to_string(),
        token_expires_at: claims
            .expires_at()
            .to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

pub async fn list_members(State(state): State<AppState>) -> Result<Json<Vec<Member>>, ApiError> {
    let records = state.credentials.list().await.map_err(|err| {
        error!(error = %err, "Failed to list members");
        ApiError::internal_error("Unable to list members.")
    })?;
    Ok(Json(records.iter().map(|record| record.member()).collect()))
}

fn validate_role(role: &str) -> Result<(), ApiError> {
    if SELF_SERVICE_ROLES.contains(&role) {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "INVALID_ROLE",
            format!(
                "Unsupported role '{role}'. Allowed roles: {}",
                SELF_SERVICE_ROLES.join(", ")
            ),
        ))
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}
