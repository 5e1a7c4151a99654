use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use crate::claims::{Claims, ClaimsRepr, TokenSubject};
use crate::config::JwtConfig;
use crate::error::TokenError;

/// Signs and verifies HS256 bearer tokens with a fixed secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp is compared against the caller's clock in `decode_at`
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(config.secret()),
            decoding: DecodingKey::from_secret(config.secret()),
            validation,
            ttl_seconds: config.ttl_seconds(),
        }
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn encode(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.encode_at(subject, Utc::now())
    }

    /// Issue a token as if the clock read `issued_at`. Same subject and
    /// instant always produce the same token.
    pub fn encode_at(
        &self,
        subject: &TokenSubject,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = ClaimsRepr::issue(subject, issued_at.timestamp(), self.ttl_seconds)?;
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::Signing(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Verify `token` against the clock value `now`. The signature is checked
    /// before expiry, so a forged expired token reports `InvalidSignature`.
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = decode::<ClaimsRepr>(token, &self.decoding, &self.validation)?;
        if now.timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }

        let claims = Claims::try_from(data.claims)?;
        debug!(member_id = claims.member_id(), role = claims.role(), "verified token");
        Ok(claims)
    }
}
