use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::TokenSettings;

/// Minimum HS256 secret length accepted at startup.
pub const MIN_SECRET_BYTES: usize = 32;

/// Upper bounds accepted for the token lifetime and the clock-skew leeway.
pub const MAX_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;
pub const MAX_LEEWAY_SECONDS: u64 = 5 * 60;

/// Why a presented bearer credential was rejected.
///
/// `Expired` only for a well-formed, correctly signed token past `exp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing secret must be at least {MIN_SECRET_BYTES} bytes")]
    WeakSecret,
    #[error("token ttl must be between 1 and {MAX_TTL_SECONDS} seconds")]
    InvalidTtl,
    #[error("token leeway must be at most {MAX_LEEWAY_SECONDS} seconds")]
    InvalidLeeway,
    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessTokenClaims {
    iss: String,
    aud: String,
    sub: String,
    iat: i64,
    exp: i64,
    jti: String,
}

/// An access token as handed to the client.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
}

/// Claims a request is allowed to act on once the token checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: Uuid,
    pub token_id: String,
}

/// HS256 access-token issuer and verifier.
///
/// Holds the process signing key; built once at startup and shared
/// read-only. Debug output omits the key.
#[derive(Clone)]
pub struct TokenService {
    issuer: String,
    audience: String,
    ttl_seconds: u64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("leeway_seconds", &self.validation.leeway)
            .finish()
    }
}

impl TokenService {
    pub fn new(settings: &TokenSettings) -> Result<Self, TokenError> {
        let secret = settings.secret.as_bytes();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::WeakSecret);
        }
        if settings.ttl_seconds == 0 || settings.ttl_seconds > MAX_TTL_SECONDS {
            return Err(TokenError::InvalidTtl);
        }
        if settings.leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(TokenError::InvalidLeeway);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = settings.leeway_seconds;

        Ok(Self {
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            ttl_seconds: settings.ttl_seconds,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Issue an access token for `user_id`, valid for the configured TTL.
    pub fn issue(&self, user_id: Uuid) -> Result<IssuedToken, TokenError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Same as `issue`, with an explicit issue time.
    pub fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<IssuedToken, TokenError> {
        let expires_at = i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(ChronoDuration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(TokenError::ExpiryOutOfRange)?;

        let claims = AccessTokenClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        let access_token =
            jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
                error!(error = %e, "failed to sign JWT");
                TokenError::Signing(e)
            })?;

        debug!(user_id = %user_id, jti = %claims.jti, expires_at = %expires_at, "issued access token");

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer",
            expires_in: self.ttl_seconds,
            expires_at,
        })
    }

    /// Verify signature, `iss`, `aud` and `exp`, then return the subject.
    pub fn validate(&self, token: &str) -> Result<Uuid, AuthError> {
        self.verify(token).map(|verified| verified.user_id)
    }

    /// Like `validate`, keeping the token id for log correlation.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let data =
            jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
                .map_err(|e| match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::Expired,
                    _ => {
                        debug!(error = %e, "access token rejected");
                        AuthError::Invalid
                    }
                })?;

        // Project convention: subject is a UUID
        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::Invalid)?;

        Ok(VerifiedToken {
            user_id,
            token_id: data.claims.jti,
        })
    }
}
