use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use super::error::TokenError;
use super::principal::{Principal, Role};

/// Access token (JWT) claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn subject_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }

    pub fn token_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.jti).map_err(|_| TokenError::Malformed)
    }

    pub fn expires_at(&self) -> Result<DateTime<Utc>, TokenError> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .ok_or(TokenError::Malformed)
    }

    pub fn issued_at(&self) -> Result<DateTime<Utc>, TokenError> {
        Utc.timestamp_opt(self.iat, 0)
            .single()
            .ok_or(TokenError::Malformed)
    }

    pub fn principal(&self) -> Result<Principal, TokenError> {
        Ok(Principal::new(
            self.subject_id()?,
            self.role,
            self.issued_at()?,
        ))
    }
}

/// HS256 signer/verifier for access tokens.
///
/// Expiry is not checked here: `jsonwebtoken` reads the system clock, while the
/// token service takes `now` as a parameter. Signature, `iss` and `aud` are.
#[derive(Clone)]
pub struct AccessTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    ttl_seconds: u64,
}

impl std::fmt::Debug for AccessTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("AccessTokenCodec")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl AccessTokenCodec {
    pub fn new(secret: &[u8], issuer: &str, audience: &str, ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Build fresh claims for `subject_id`, issued at `now`.
    pub fn claims_for(&self, subject_id: Uuid, role: Role, now: DateTime<Utc>) -> AccessTokenClaims {
        let iat = now.timestamp();
        let exp = (now + ChronoDuration::seconds(self.ttl_seconds as i64)).timestamp();

        AccessTokenClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: subject_id.to_string(),
            role,
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        }
    }

    pub fn sign(&self, claims: &AccessTokenClaims) -> Result<String, TokenError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign JWT");
            TokenError::Signing
        })
    }

    /// Verify signature, `iss` and `aud`, and decode the claims.
    pub fn decode(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "access token rejected");
                TokenError::Malformed
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> AccessTokenCodec {
        AccessTokenCodec::new(secret.as_bytes(), "test-issuer", "test-audience", 60)
    }

    #[test]
    fn test_sign_and_decode() {
        let codec = codec("0123456789abcdef0123456789abcdef");
        let subject = Uuid::new_v4();
        let claims = codec.claims_for(subject, Role::Admin, Utc::now());

        let token = codec.sign(&claims).expect("sign");
        let decoded = codec.decode(&token).expect("decode");

        assert_eq!(decoded.subject_id().expect("sub"), subject);
        assert_eq!(decoded.role, Role::Admin);
        assert_eq!(decoded.exp - decoded.iat, 60);
    }

    #[test]
    fn test_foreign_signature_is_malformed() {
        let ours = codec("0123456789abcdef0123456789abcdef");
        let theirs = codec("fedcba9876543210fedcba9876543210");
        let claims = theirs.claims_for(Uuid::new_v4(), Role::User, Utc::now());
        let token = theirs.sign(&claims).expect("sign");

        assert_eq!(ours.decode(&token).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_wrong_audience_is_malformed() {
        let secret = b"0123456789abcdef0123456789abcdef";
        let issuer = AccessTokenCodec::new(secret, "test-issuer", "other-audience", 60);
        let verifier = AccessTokenCodec::new(secret, "test-issuer", "test-audience", 60);
        let token = issuer
            .sign(&issuer.claims_for(Uuid::new_v4(), Role::User, Utc::now()))
            .expect("sign");

        assert_eq!(verifier.decode(&token).unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec("0123456789abcdef0123456789abcdef");
        assert_eq!(codec.decode("not-a-jwt").unwrap_err(), TokenError::Malformed);
        assert_eq!(codec.decode("").unwrap_err(), TokenError::Malformed);
    }
}
