/*
 * Responsibility
 * - v1 URL structure
 * - Public: /health and the /auth flow
 * - Everything else sits behind the bearer access layer (route_layer, so unknown paths stay 404)
 * - A known path with the wrong method answers 405 in the failure envelope
 */
use axum::{
    Router,
    routing::{get, post, put},
};

use crate::error::AppError;
use crate::middleware::auth::access;
use crate::state::AppState;

use crate::api::v1::handlers::{
    auth::{register, request_otp, verify_otp},
    courses::{
        announce, archive_course, create_course, enroll, generate_resources, get_course,
        list_courses, publish_course, unpublish_course,
    },
    health::health,
    me::me,
    notifications::{list_notifications, mark_read},
    preferences::{get_preferences, update_preferences},
    progress::get_progress,
    quizzes::{create_quiz, get_quiz, publish_quiz, submit_quiz, unpublish_quiz},
};

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/otp", post(request_otp))
        .route("/auth/otp/verify", post(verify_otp));

    let protected = Router::new()
        .route("/me", get(me))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{course_id}", get(get_course))
        .route("/courses/{course_id}/publish", put(publish_course))
        .route("/courses/{course_id}/unpublish", put(unpublish_course))
        .route("/courses/{course_id}/archive", put(archive_course))
        .route("/courses/{course_id}/resources", post(generate_resources))
        .route("/courses/{course_id}/enroll", post(enroll))
        .route("/courses/{course_id}/announcements", post(announce))
        .route("/quizzes", post(create_quiz))
        .route("/quizzes/{quiz_id}", get(get_quiz))
        .route("/quizzes/{quiz_id}/publish", put(publish_quiz))
        .route("/quizzes/{quiz_id}/unpublish", put(unpublish_quiz))
        .route("/quizzes/{quiz_id}/submit", post(submit_quiz))
        .route("/progress", get(get_progress))
        .route("/notifications", get(list_notifications))
        .route("/notifications/{notification_id}/read", put(mark_read))
        .route("/preferences", get(get_preferences).put(update_preferences));

    public
        .merge(access::apply(protected, state))
        .method_not_allowed_fallback(method_not_allowed)
}
