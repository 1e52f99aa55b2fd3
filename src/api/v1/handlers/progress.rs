/*
 * Responsibility
 * - GET /progress: the learner's enrolments and per-quiz attempt summary
 */
use axum::extract::State;
use serde::Serialize;

use crate::api::v1::extractors::AsLearner;
use crate::api::v1::response::Envelope;
use crate::error::AppError;
use crate::repos::progress_repo::{self, QuizSummary};
use crate::services::record_id::RecordId;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    enrolled_courses: Vec<RecordId>,
    total_attempts: usize,
    quizzes: Vec<QuizSummary>,
}

pub async fn get_progress(
    State(state): State<AppState>,
    auth: AsLearner,
) -> Result<Envelope<ProgressView>, AppError> {
    let store = state.store.as_ref();
    let progress = progress_repo::get(store, &auth.claim.subject_id).await?;
    let quizzes = progress_repo::quiz_summaries(store, &auth.claim.subject_id).await?;

    Ok(Envelope::ok(ProgressView {
        enrolled_courses: progress.enrolled_courses,
        total_attempts: progress.attempts.len(),
        quizzes,
    }))
}
