/*
 * Responsibility
 * - Quiz request/response DTOs
 * - Learner views never include answer keys
 */
use serde::{Deserialize, Serialize};

use crate::repos::progress_repo::Attempt;
use crate::repos::quiz_repo::{Question, QuizDoc};
use crate::services::record_id::RecordId;

const MAX_TITLE_LEN: usize = 200;
const MAX_QUESTIONS: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    pub title: String,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl CreateQuizRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.trim().is_empty() {
            return Err("title is required");
        }
        if self.title.len() > MAX_TITLE_LEN {
            return Err("title must be <= 200 chars");
        }
        if self.questions.len() > MAX_QUESTIONS {
            return Err("at most 200 questions");
        }
        for q in &self.questions {
            if q.prompt.trim().is_empty() {
                return Err("every question needs a prompt");
            }
            if q.options.len() < 2 {
                return Err("every question needs at least 2 options");
            }
            if q.correct >= q.options.len() {
                return Err("correct must index into options");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub answers: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub id: RecordId,
    pub educator_id: RecordId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<RecordId>,
    pub title: String,
    pub questions: Vec<QuestionView>,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl QuizResponse {
    pub fn new(quiz: QuizDoc, with_answers: bool) -> Self {
        Self {
            id: quiz.id,
            educator_id: quiz.educator_id,
            course_id: quiz.course_id,
            title: quiz.title,
            questions: quiz
                .questions
                .into_iter()
                .map(|q| QuestionView {
                    prompt: q.prompt,
                    options: q.options,
                    correct: with_answers.then_some(q.correct),
                })
                .collect(),
            is_published: quiz.is_published,
            created_at: quiz.created_at,
            updated_at: quiz.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    pub quiz_id: RecordId,
    pub correct_count: usize,
    pub total: usize,
    pub score: f64,
    pub answered_at: String,
}

impl From<Attempt> for AttemptResponse {
    fn from(attempt: Attempt) -> Self {
        Self {
            quiz_id: attempt.quiz_id,
            correct_count: attempt.correct_count,
            total: attempt.total,
            score: attempt.score,
            answered_at: attempt.answered_at,
        }
    }
}
