/*
 * Responsibility
 * - /quizzes handlers: authoring, publish flag, learner submissions
 * - Submissions append an attempt to the learner's progress document (never overwrite)
 */
use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::api::v1::dto::quizzes::{
    AttemptResponse, CreateQuizRequest, QuizResponse, SubmitQuizRequest,
};
use crate::api::v1::extractors::{AsEducator, AsLearner, Authenticated, JsonBody, QuizId};
use crate::api::v1::response::{Applied, Envelope};
use crate::error::AppError;
use crate::repos::document::{RecordRef, timestamp};
use crate::repos::progress_repo::{self, Attempt};
use crate::repos::{course_repo, quiz_repo};
use crate::services::auth::Role;
use crate::services::grading::grade;
use crate::services::record_id::RecordId;
use crate::services::transition;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct OneQuiz {
    quiz: QuizResponse,
}

pub async fn create_quiz(
    State(state): State<AppState>,
    auth: AsEducator,
    JsonBody(req): JsonBody<CreateQuizRequest>,
) -> Result<Envelope<OneQuiz>, AppError> {
    req.validate().map_err(AppError::validation)?;
    let store = state.store.as_ref();

    // A linked course must exist and belong to the same educator
    let course_id = match req.course_id.as_deref() {
        Some(raw) => {
            let id = RecordId::parse(raw)?;
            let reference = RecordRef::new(course_repo::COLLECTION, id.clone());
            course_repo::find(
                store,
                &course_repo::owned_by(&reference, &auth.claim.subject_id),
            )
            .await?
            .ok_or_else(|| AppError::not_found("course"))?;
            Some(id)
        }
        None => None,
    };

    let quiz = quiz_repo::create(
        store,
        &auth.claim.subject_id,
        course_id,
        req.title.trim(),
        req.questions,
        Utc::now(),
    )
    .await?;
    tracing::info!(quiz_id = %quiz.id, questions = quiz.questions.len(), "quiz created");

    Ok(Envelope::created(OneQuiz {
        quiz: QuizResponse::new(quiz, true),
    }))
}

/// Educators: own quizzes with answer keys. Learners: published quizzes without them.
pub async fn get_quiz(
    State(state): State<AppState>,
    auth: Authenticated,
    quiz: QuizId,
) -> Result<Envelope<OneQuiz>, AppError> {
    let (filter, with_answers) = match auth.claim.role {
        Role::Educator => (
            quiz_repo::owned_by(&quiz.reference, &auth.claim.subject_id),
            true,
        ),
        Role::Learner => (quiz_repo::published(&quiz.reference), false),
    };

    let found = quiz_repo::find(state.store.as_ref(), &filter)
        .await?
        .ok_or_else(|| AppError::not_found(quiz.resource()))?;

    Ok(Envelope::ok(OneQuiz {
        quiz: QuizResponse::new(found, with_answers),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedView {
    is_published: bool,
}

async fn set_published(
    state: &AppState,
    auth: &AsEducator,
    quiz: &QuizId,
    published: bool,
) -> Result<Envelope<Applied<PublishedView>>, AppError> {
    let result = transition::execute(
        state.store.as_ref(),
        quiz.resource(),
        &quiz_repo::owned_by(&quiz.reference, &auth.claim.subject_id),
        &quiz_repo::set_published(published, Utc::now()),
    )
    .await?;

    if result.modified {
        tracing::info!(quiz_id = %quiz.id(), published, "quiz visibility changed");
    }
    Ok(Applied::new(
        result,
        PublishedView {
            is_published: published,
        },
    ))
}

pub async fn publish_quiz(
    State(state): State<AppState>,
    auth: AsEducator,
    quiz: QuizId,
) -> Result<Envelope<Applied<PublishedView>>, AppError> {
    set_published(&state, &auth, &quiz, true).await
}

pub async fn unpublish_quiz(
    State(state): State<AppState>,
    auth: AsEducator,
    quiz: QuizId,
) -> Result<Envelope<Applied<PublishedView>>, AppError> {
    set_published(&state, &auth, &quiz, false).await
}

#[derive(Debug, Serialize)]
pub struct AttemptView {
    attempt: AttemptResponse,
}

pub async fn submit_quiz(
    State(state): State<AppState>,
    auth: AsLearner,
    quiz: QuizId,
    JsonBody(req): JsonBody<SubmitQuizRequest>,
) -> Result<Envelope<Applied<AttemptView>>, AppError> {
    let store = state.store.as_ref();
    let found = quiz_repo::find(store, &quiz_repo::published(&quiz.reference))
        .await?
        .ok_or_else(|| AppError::not_found(quiz.resource()))?;

    let graded = grade(&found.questions, &req.answers)
        .map_err(|e| AppError::validation(e.to_string()))?;

    let now = Utc::now();
    let attempt = Attempt {
        quiz_id: found.id,
        answers: req.answers,
        correct_count: graded.correct_count,
        total: graded.total,
        score: graded.score,
        answered_at: timestamp(now),
    };

    let (filter, update) = progress_repo::record_attempt(&auth.claim.subject_id, &attempt, now)?;
    let result = transition::execute(store, progress_repo::COLLECTION, &filter, &update).await?;
    tracing::info!(
        quiz_id = %quiz.id(),
        learner = %auth.claim.subject_id,
        score = graded.score,
        "quiz submitted"
    );

    Ok(Applied::new(
        result,
        AttemptView {
            attempt: attempt.into(),
        },
    ))
}
