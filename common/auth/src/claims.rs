use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TokenError;

/// Verified identity carried by a bearer token.
///
/// There is no public constructor: a `Claims` value only comes out of
/// [`TokenCodec::decode`](crate::TokenCodec::decode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    member_id: i64,
    role: String,
    roles: Vec<String>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Claims {
    pub fn member_id(&self) -> i64 {
        self.member_id
    }

    /// Primary role; the only one role gates look at.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Auxiliary roles, possibly empty.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// What a freshly issued token should assert about a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub member_id: i64,
    pub role: String,
    pub roles: Vec<String>,
}

impl TokenSubject {
    pub fn new(member_id: i64, role: impl Into<String>) -> Self {
        Self {
            member_id,
            role: role.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

/// Payload as it appears on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ClaimsRepr {
    pub(crate) sub: String,
    pub(crate) role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) roles: Vec<String>,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

impl ClaimsRepr {
    pub(crate) fn issue(
        subject: &TokenSubject,
        iat: i64,
        ttl_seconds: i64,
    ) -> Result<Self, TokenError> {
        let exp = iat.checked_add(ttl_seconds).ok_or_else(|| {
            TokenError::Signing(format!("expiry overflows: iat {iat} + ttl {ttl_seconds}"))
        })?;
        Ok(Self {
            sub: subject.member_id.to_string(),
            role: subject.role.clone(),
            roles: subject.roles.clone(),
            iat,
            exp,
        })
    }
}

impl TryFrom<ClaimsRepr> for Claims {
    type Error = TokenError;

    fn try_from(value: ClaimsRepr) -> Result<Self, TokenError> {
        let member_id = value
            .sub
            .parse::<i64>()
            .map_err(|_| TokenError::Malformed(format!("invalid claim 'sub' with value '{}'", value.sub)))?;

        if value.role.is_empty() {
            return Err(TokenError::Malformed("empty claim 'role'".to_string()));
        }

        let issued_at = timestamp("iat", value.iat)?;
        let expires_at = timestamp("exp", value.exp)?;

        Ok(Self {
            member_id,
            role: value.role,
            roles: value.roles,
            issued_at,
            expires_at,
        })
    }
}

fn timestamp(name: &str, seconds: i64) -> Result<DateTime<Utc>, TokenError> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| TokenError::Malformed(format!("invalid claim '{name}' with value '{seconds}'")))
}
