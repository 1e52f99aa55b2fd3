/*
 * Responsibility
 * - Request extractors shared by the v1 handlers
 *   - auth_ctx: identity claim + role gate
 *   - record_ref: path id -> RecordRef
 *   - json: JSON body with envelope-shaped rejections
 */
pub mod auth_ctx;
pub mod json;
pub mod record_ref;

pub use auth_ctx::{AsEducator, AsLearner, Authenticated, IdentityClaim};
pub use json::JsonBody;
pub use record_ref::{CourseId, NotificationId, QuizId};
