use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::RolePolicy;
use crate::state::AppState;

use super::IdentityClaim;

/// Role gate.
///
/// Reads the IdentityClaim the access middleware stored in the request extensions and
/// checks it against `P`. Put it before any path/body extractor in the handler
/// signature: axum runs extractors in order, so a forbidden caller is turned away
/// before an id is parsed or the store is touched.
pub struct Authorized<P> {
    pub claim: IdentityClaim,
    _policy: PhantomData<P>,
}

impl<P> FromRequestParts<AppState> for Authorized<P>
where
    P: RolePolicy,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Missing claim: the route is not behind the access middleware
        let claim = parts
            .extensions
            .get::<IdentityClaim>()
            .cloned()
            .ok_or(AppError::Unauthenticated)?;

        if !P::permits(claim.role) {
            tracing::warn!(
                subject = %claim.subject_id,
                role = %claim.role,
                required = P::REQUIREMENT,
                "role gate rejected request"
            );
            return Err(AppError::Forbidden {
                required: P::REQUIREMENT,
            });
        }

        Ok(Self {
            claim,
            _policy: PhantomData,
        })
    }
}

impl<P> std::fmt::Debug for Authorized<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorized")
            .field("claim", &self.claim)
            .finish()
    }
}
