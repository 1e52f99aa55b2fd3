/*
 * Responsibility
 * - Domain services and external collaborators, independent of HTTP
 */
pub mod auth;
pub mod cache;
pub mod content;
pub mod grading;
pub mod notify;
pub mod record_id;
pub mod sweep;
pub mod transition;
