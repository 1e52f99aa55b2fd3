/*
 * Responsibility
 * - The authenticated identity handlers see (IdentityClaim)
 * - Role policies as uninhabited tag types, plus the per-route aliases
 *
 * Notes
 * - Token verification lives in middleware::auth::access; this file is only the contract
 * - IdentityClaim is request-scoped and never persisted
 */
use serde::Serialize;

use crate::services::auth::{Role, RolePolicy, VerifiedToken};
use crate::services::record_id::RecordId;

use super::core::Authorized;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaim {
    pub subject_id: RecordId,
    pub role: Role,
    #[serde(skip)]
    pub jti: Option<String>,
}

impl From<VerifiedToken> for IdentityClaim {
    fn from(token: VerifiedToken) -> Self {
        Self {
            subject_id: token.subject_id,
            role: token.role,
            jti: token.jti,
        }
    }
}

pub enum EducatorOnly {}

impl RolePolicy for EducatorOnly {
    const REQUIREMENT: &'static str = "educator role";

    fn permits(role: Role) -> bool {
        role == Role::Educator
    }
}

pub enum LearnerOnly {}

impl RolePolicy for LearnerOnly {
    const REQUIREMENT: &'static str = "learner role";

    fn permits(role: Role) -> bool {
        role == Role::Learner
    }
}

pub enum AnyRole {}

impl RolePolicy for AnyRole {
    const REQUIREMENT: &'static str = "an authenticated user";

    fn permits(_role: Role) -> bool {
        true
    }
}

pub type AsEducator = Authorized<EducatorOnly>;
pub type AsLearner = Authorized<LearnerOnly>;
pub type Authenticated = Authorized<AnyRole>;
