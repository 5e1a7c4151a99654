use tracing::warn;

use crate::claims::Claims;
use crate::codec::TokenCodec;
use crate::error::{AuthError, AuthResult};

const BEARER_SCHEME: &str = "Bearer";

/// Establish who is calling from the raw `Authorization` header value.
///
/// Never looks at roles. Codec failures are folded into
/// [`AuthError::Unauthorized`], which keeps the underlying reason for logs.
pub fn authenticate(header: Option<&str>, codec: &TokenCodec) -> AuthResult<Claims> {
    let raw = match header {
        Some(value) if !value.is_empty() => value,
        _ => return Err(AuthError::MissingHeader),
    };

    let token = parse_bearer(raw)?;
    codec.decode(token).map_err(|reason| {
        warn!(%reason, "bearer token rejected");
        AuthError::Unauthorized(reason)
    })
}

/// Split `Bearer <token>` into its token. Exactly two space-separated parts
/// are accepted.
pub fn parse_bearer(raw: &str) -> AuthResult<&str> {
    let mut parts = raw.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::TokenSubject;
    use crate::config::JwtConfig;
    use crate::error::TokenError;
    use chrono::{Duration, Utc};

    fn codec() -> TokenCodec {
        TokenCodec::new(&JwtConfig::new("s3cr3t").with_ttl(3600).expect("ttl"))
    }

    #[test]
    fn parse_bearer_accepts_valid_token() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Ok("abc.def.ghi"));
    }

    #[test]
    fn parse_bearer_rejects_bad_shapes() {
        for raw in [
            "Token abc",
            "Bearer",
            "Bearer ",
            "bearer abc",
            "Bearer  abc",
            "Bearer abc def",
            "Basic credentials",
        ] {
            assert_eq!(parse_bearer(raw), Err(AuthError::MalformedHeader), "{raw:?}");
        }
    }

    #[test]
    fn absent_or_empty_header_is_missing() {
        assert_eq!(authenticate(None, &codec()), Err(AuthError::MissingHeader));
        assert_eq!(authenticate(Some(""), &codec()), Err(AuthError::MissingHeader));
    }

    #[test]
    fn valid_header_yields_claims() {
        let codec = codec();
        let token = codec.encode(&TokenSubject::new(42, "seller")).expect("encode");
        let header = format!("Bearer {token}");

        let claims = authenticate(Some(&header), &codec).expect("authenticated");
        assert_eq!(claims.member_id(), 42);
        assert_eq!(claims.role(), "seller");
    }

    #[test]
    fn codec_failures_become_unauthorized() {
        let codec = codec();
        let expired = codec
            .encode_at(&TokenSubject::new(1, "buyer"), Utc::now() - Duration::hours(3))
            .expect("encode");

        let err = authenticate(Some(&format!("Bearer {expired}")), &codec).expect_err("expired");
        assert_eq!(err, AuthError::Unauthorized(TokenError::Expired));
        assert_eq!(err.user_message(), "Token has expired");

        let err = authenticate(Some("Bearer not-a-token"), &codec).expect_err("malformed");
        assert!(matches!(err, AuthError::Unauthorized(TokenError::Malformed(_))));
        assert_eq!(err.user_message(), "Authentication failed");
    }
}
