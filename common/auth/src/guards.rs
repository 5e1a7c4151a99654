use std::collections::BTreeSet;

use thiserror::Error;
use tracing::warn;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};

/// Setup-time error: a protected route must allow at least one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("role gate requires at least one allowed role")]
pub struct EmptyRoleSet;

/// Fixed set of roles allowed through a protected route.
///
/// Matching is exact membership on the primary role; there is no hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    allowed: BTreeSet<String>,
}

impl RoleGate {
    pub fn new<I, R>(roles: I) -> Result<Self, EmptyRoleSet>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let allowed: BTreeSet<String> = roles.into_iter().map(Into::into).collect();
        if allowed.is_empty() {
            return Err(EmptyRoleSet);
        }
        Ok(Self { allowed })
    }

    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    pub fn permits(&self, role: &str) -> bool {
        self.allowed.contains(role)
    }

    /// Decide for an identity established by the authentication gate.
    /// `None` means authentication never ran for this request.
    pub fn check(&self, identity: Option<&Claims>) -> AuthResult<()> {
        let claims = identity.ok_or(AuthError::PreconditionFailed)?;
        if self.permits(claims.role()) {
            return Ok(());
        }

        let required: Vec<String> = self.allowed.iter().cloned().collect();
        warn!(
            member_id = claims.member_id(),
            role = claims.role(),
            ?required,
            "role_check_failed"
        );
        Err(AuthError::Forbidden { required })
    }
}
