/*
 * Responsibility
 * - v1 handlers, one module per resource
 * - Extractor order in every signature: State, role gate, path id, body
 */
pub mod auth;
pub mod courses;
pub mod health;
pub mod me;
pub mod notifications;
pub mod preferences;
pub mod progress;
pub mod quizzes;
