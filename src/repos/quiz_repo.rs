/*
 * Responsibility
 * - `quizzes` collection (quizzes / test series): record shape, publish flag, ownership
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::repos::document::{
    Document, Filter, RecordRef, Transition, Update, decode, encode, timestamp,
};
use crate::repos::error::RepoResult;
use crate::repos::store::DocumentStore;
use crate::services::record_id::RecordId;

pub const COLLECTION: &str = "quizzes";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDoc {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub educator_id: RecordId,
    #[serde(default)]
    pub course_id: Option<RecordId>,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewQuiz<'a> {
    educator_id: &'a RecordId,
    course_id: Option<&'a RecordId>,
    title: &'a str,
    questions: &'a [Question],
    is_published: bool,
    created_at: String,
    updated_at: String,
}

pub async fn create(
    store: &dyn DocumentStore,
    educator_id: &RecordId,
    course_id: Option<RecordId>,
    title: &str,
    questions: Vec<Question>,
    at: DateTime<Utc>,
) -> RepoResult<QuizDoc> {
    let now = timestamp(at);
    let doc = encode(&NewQuiz {
        educator_id,
        course_id: course_id.as_ref(),
        title,
        questions: &questions,
        is_published: false,
        created_at: now.clone(),
        updated_at: now.clone(),
    })?;
    let id = store.insert_one(COLLECTION, doc).await?;

    Ok(QuizDoc {
        id,
        educator_id: educator_id.clone(),
        course_id,
        title: title.to_string(),
        questions,
        is_published: false,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find(store: &dyn DocumentStore, filter: &Filter) -> RepoResult<Option<QuizDoc>> {
    match store.find_one(filter).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub fn owned_by(quiz: &RecordRef, educator_id: &RecordId) -> Filter {
    Filter::by_ref(quiz).eq("educatorId", educator_id.as_str())
}

pub fn published(quiz: &RecordRef) -> Filter {
    Filter::by_ref(quiz).eq("isPublished", true)
}

pub fn set_published(published: bool, at: DateTime<Utc>) -> Update {
    let mut fields = Document::new();
    fields.insert("isPublished".to_string(), Value::Bool(published));
    Update::new(Transition::Set(fields), at)
}
