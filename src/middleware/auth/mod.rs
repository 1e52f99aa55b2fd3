/*
 * Responsibility
 * - Token verification middleware (access) applied to the protected part of /api/v1
 * - Role checks are not done here; see extractors::auth_ctx
 */
pub mod access;
