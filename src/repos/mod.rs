/*
 * Responsibility
 * - Document store interface and its backends (PostgreSQL JSONB, in-memory)
 * - Per-collection repos: record shapes and the filters/transitions built on them
 */
pub mod document;
pub mod error;
pub mod memory;
pub mod pg;
pub mod store;

pub mod course_repo;
pub mod notification_repo;
pub mod otp_repo;
pub mod preference_repo;
pub mod progress_repo;
pub mod quiz_repo;
pub mod user_repo;
