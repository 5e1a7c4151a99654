use std::fmt;

use thiserror::Error;

/// Default token lifetime: one day.
pub const DEFAULT_TTL_SECONDS: i64 = 24 * 60 * 60;

/// Longest accepted token lifetime: ten years.
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("token ttl must be between 1 and {max} seconds, got {0}", max = MAX_TTL_SECONDS)]
pub struct InvalidTtl(pub i64);

/// Signing configuration for the token codec. Built once at startup.
#[derive(Clone)]
pub struct JwtConfig {
    secret: String,
    ttl_seconds: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }

    /// Adjust the token lifetime. Must lie in `1..=MAX_TTL_SECONDS`.
    pub fn with_ttl(mut self, seconds: i64) -> Result<Self, InvalidTtl> {
        if !(1..=MAX_TTL_SECONDS).contains(&seconds) {
            return Err(InvalidTtl(seconds));
        }
        self.ttl_seconds = seconds;
        Ok(self)
    }

    pub fn secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Lifetime of issued tokens, in seconds.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}
