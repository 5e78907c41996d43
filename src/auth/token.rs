//! Signed identity tokens.
//!
//! Tokens are HS256 JWTs signed with the single process-wide secret. The
//! claim is the principal's numeric id; `exp` is only present when a token
//! lifetime is configured.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::error::AuthError;
use crate::types::{AuthToken, UserId};

/// Identity claim carried by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Principal identifier
    pub id: UserId,
}

impl Claim {
    pub fn new(id: UserId) -> Self {
        Self { id }
    }
}

/// JWT payload as it appears on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    id: UserId,
    /// Issued at (Unix timestamp)
    iat: i64,
    /// Expiration time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

/// Issues and verifies identity tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Option<Duration>,
}

impl TokenService {
    /// Create a token service bound to `secret`.
    ///
    /// With `ttl` set, issued tokens expire and tokens lacking `exp` are
    /// rejected.
    pub fn new(secret: &str, ttl: Option<Duration>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        validation.validate_exp = ttl.is_some();
        if ttl.is_some() {
            validation.set_required_spec_claims(&["exp"]);
        }

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Sign `claim` into a token.
    pub fn issue(&self, claim: Claim) -> Result<AuthToken, AuthError> {
        let now = Utc::now();
        let exp = match self.ttl {
            Some(ttl) => Some(
                now.checked_add_signed(ttl)
                    .ok_or_else(|| AuthError::Signing("token expiry out of range".to_string()))?
                    .timestamp(),
            ),
            None => None,
        };
        let claims = TokenClaims {
            id: claim.id,
            iat: now.timestamp(),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map(AuthToken::new)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify a token and return its claim.
    ///
    /// Every failure (bad structure, foreign signature, expiry) is reported
    /// as the same [`AuthError::InvalidToken`].
    pub fn verify(&self, token: &str) -> Result<Claim, AuthError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| Claim::new(data.claims.id))
            .map_err(|e| {
                debug!("Token verification failed: {:?}", e.kind());
                AuthError::InvalidToken
            })
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "testKey";

    fn service() -> TokenService {
        TokenService::new(TEST_KEY, None)
    }

    fn sign_raw(secret: &str, payload: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_then_verify_round_trip() {
        let service = service();
        for id in [1, 42, i64::MAX] {
            let claim = Claim::new(UserId::new(id));
            let token = service.issue(claim).unwrap();
            assert_eq!(service.verify(token.as_str()).unwrap(), claim);
        }
    }

    #[test]
    fn test_token_without_ttl_has_no_exp() {
        let service = service();
        let token = service.issue(Claim::new(UserId::new(1))).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let data = decode::<serde_json::Value>(
            token.as_str(),
            &DecodingKey::from_secret(TEST_KEY.as_bytes()),
            &validation,
        )
        .unwrap();

        assert_eq!(data.claims["id"], 1);
        assert!(data.claims.get("exp").is_none());
    }

    #[test]
    fn test_rejects_foreign_secret() {
        let other = TokenService::new("anotherKey", None);
        let token = other.issue(Claim::new(UserId::new(1))).unwrap();

        assert_eq!(service().verify(token.as_str()), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        let service = service();
        for token in ["", "TOKEN", "a.b.c", "not.a.jwt.at.all"] {
            assert_eq!(service.verify(token), Err(AuthError::InvalidToken));
        }
    }

    #[test]
    fn test_rejects_tampered_payload() {
        let service = service();
        let token = service.issue(Claim::new(UserId::new(1))).unwrap();
        let forged_payload = sign_raw("testKey", &serde_json::json!({ "id": 2, "iat": 0 }));

        // Splice the forged payload onto the original signature.
        let original: Vec<&str> = token.as_str().split('.').collect();
        let forged: Vec<&str> = forged_payload.split('.').collect();
        let spliced = format!("{}.{}.{}", original[0], forged[1], original[2]);

        assert_eq!(service.verify(&spliced), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_rejects_claim_without_id() {
        let token = sign_raw(TEST_KEY, &serde_json::json!({ "sub": "1", "iat": 0 }));
        assert_eq!(service().verify(&token), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_expiring_tokens() {
        let service = TokenService::new(TEST_KEY, Some(Duration::hours(1)));
        let claim = Claim::new(UserId::new(5));
        let token = service.issue(claim).unwrap();
        assert_eq!(service.verify(token.as_str()).unwrap(), claim);

        let expired = sign_raw(
            TEST_KEY,
            &serde_json::json!({ "id": 5, "iat": 0, "exp": Utc::now().timestamp() - 60 }),
        );
        assert_eq!(service.verify(&expired), Err(AuthError::InvalidToken));
    }

    #[test]
    fn test_expiring_service_requires_exp() {
        let unbounded = service().issue(Claim::new(UserId::new(5))).unwrap();
        let expiring = TokenService::new(TEST_KEY, Some(Duration::hours(1)));

        assert_eq!(
            expiring.verify(unbounded.as_str()),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn test_unrepresentable_expiry_is_signing_error() {
        let service = TokenService::new(TEST_KEY, Some(Duration::MAX));
        assert!(matches!(
            service.issue(Claim::new(UserId::new(1))),
            Err(AuthError::Signing(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", service());
        assert!(!rendered.contains(TEST_KEY));
        assert!(rendered.contains("<redacted>"));
    }
}
