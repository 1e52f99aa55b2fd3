/*
 * Responsibility
 * - Request/response DTOs per resource; request DTOs carry validate()
 */
pub mod auth;
pub mod courses;
pub mod notifications;
pub mod preferences;
pub mod quizzes;
