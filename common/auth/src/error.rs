use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failure kinds reported by [`TokenCodec`](crate::TokenCodec).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token signature mismatch")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match value.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed(value.to_string()),
        }
    }
}

/// Every way a request can be turned away by the auth gates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingHeader,
    #[error("authorization header malformed")]
    MalformedHeader,
    #[error("bearer token rejected: {0}")]
    Unauthorized(#[source] TokenError),
    #[error("authorization attempted before authentication")]
    PreconditionFailed,
    #[error("role not permitted; required one of: {}", .required.join(", "))]
    Forbidden { required: Vec<String> },
}

/// Machine-readable denial reason, rendered as the `code` of a rejection body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    MissingToken,
    MalformedHeader,
    MalformedToken,
    InvalidSignature,
    Expired,
    AuthenticationRequired,
    InsufficientRole,
}

impl ReasonCode {
    pub const ALL: [ReasonCode; 7] = [
        ReasonCode::MissingToken,
        ReasonCode::MalformedHeader,
        ReasonCode::MalformedToken,
        ReasonCode::InvalidSignature,
        ReasonCode::Expired,
        ReasonCode::AuthenticationRequired,
        ReasonCode::InsufficientRole,
    ];

    /// Inverse of [`ReasonCode::as_str`]; `None` for codes the gates never emit.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|reason| reason.as_str() == code)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::MissingToken => "missing_token",
            ReasonCode::MalformedHeader => "malformed_header",
            ReasonCode::MalformedToken => "malformed_token",
            ReasonCode::InvalidSignature => "invalid_signature",
            ReasonCode::Expired => "expired",
            ReasonCode::AuthenticationRequired => "authentication_required",
            ReasonCode::InsufficientRole => "insufficient_role",
        }
    }
}

impl AuthError {
    pub fn reason(&self) -> ReasonCode {
        match self {
            AuthError::MissingHeader => ReasonCode::MissingToken,
            AuthError::MalformedHeader => ReasonCode::MalformedHeader,
            AuthError::Unauthorized(TokenError::Expired) => ReasonCode::Expired,
            AuthError::Unauthorized(TokenError::InvalidSignature) => ReasonCode::InvalidSignature,
            AuthError::Unauthorized(_) => ReasonCode::MalformedToken,
            AuthError::PreconditionFailed => ReasonCode::AuthenticationRequired,
            AuthError::Forbidden { .. } => ReasonCode::InsufficientRole,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AuthError::MissingHeader
            | AuthError::MalformedHeader
            | AuthError::Unauthorized(_)
            | AuthError::PreconditionFailed => StatusCode::UNAUTHORIZED,
        }
    }

    /// Text shown to the client. Token failures collapse to a generic message
    /// except for the expired and bad-signature cases.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::MissingHeader => "Authorization header missing".to_string(),
            AuthError::MalformedHeader => {
                "Authorization header must be in the form 'Bearer <token>'".to_string()
            }
            AuthError::Unauthorized(TokenError::Expired) => "Token has expired".to_string(),
            AuthError::Unauthorized(TokenError::InvalidSignature) => "Invalid token".to_string(),
            AuthError::Unauthorized(_) => "Authentication failed".to_string(),
            AuthError::PreconditionFailed => "Authentication required".to_string(),
            AuthError::Forbidden { required } => {
                if required.is_empty() {
                    "Insufficient role".to_string()
                } else {
                    format!("Insufficient role. Required one of: {}", required.join(", "))
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_roles: Option<Vec<String>>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.reason().as_str();
        let message = self.user_message();
        let required_roles = match self {
            AuthError::Forbidden { required } => Some(required),
            _ => None,
        };

        let body = ErrorBody {
            code,
            message,
            required_roles,
        };
        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert("X-Error-Code", HeaderValue::from_static(code));
        response
    }
}
