use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::auth::role::Role;
use crate::services::record_id::RecordId;

// Errors returned by access-token verification + strict claim validation.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("invalid 'sub' (expected record id)")]
    InvalidSubject,
    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

/// Access token (JWT) claims as they travel on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub iss: String,
    pub sub: String,
    pub role: String,
    pub exp: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub jti: Option<String>,
}

/// What the rest of the application sees after verification.
///
/// - `sub` is promoted to a `RecordId` (user ids are record ids)
/// - `role` is promoted to `Role`; unknown roles never get this far
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub subject_id: RecordId,
    pub role: Role,
    pub jti: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: u64,
}

/// HS256 access-token issuer and verifier sharing one process-wide secret.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl_seconds: u64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("leeway", &self.validation.leeway)
            .finish()
    }
}

impl TokenService {
    pub fn new(secret: &str, issuer: &str, ttl_seconds: u64, leeway_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = leeway_seconds;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer: issuer.to_string(),
            ttl_seconds,
        }
    }

    /// Verify signature, expiry and issuer, then promote the claims.
    ///
    /// `jsonwebtoken::Validation` covers signature/`exp`/`iss`; this adds:
    /// - `sub` must be a record id
    /// - `role` must be a known role
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let claims =
            jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?
                .claims;

        let subject_id = RecordId::parse(&claims.sub).map_err(|_| TokenError::InvalidSubject)?;
        let role = Role::parse(&claims.role).ok_or(TokenError::UnknownRole(claims.role))?;

        Ok(VerifiedToken {
            subject_id,
            role,
            jti: claims.jti,
        })
    }

    pub fn issue(&self, subject_id: &RecordId, role: Role) -> Result<IssuedToken, TokenError> {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = AccessTokenClaims {
            iss: self.issuer.clone(),
            sub: subject_id.to_string(),
            role: role.as_str().to_string(),
            exp: now + self.ttl_seconds,
            iat: Some(now),
            jti: Some(Uuid::new_v4().to_string()),
        };

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        let token = jsonwebtoken::encode(&header, &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            expires_in: self.ttl_seconds,
        })
    }
}
