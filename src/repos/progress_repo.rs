/*
 * Responsibility
 * - `progress` collection: one document per learner, keyed by the learner's id
 *   - enrolledCourses: set of course ids
 *   - attempts: append-only quiz attempts
 * - per-quiz summaries (attempt count, best, average) via the store's aggregate
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::repos::document::{
    Accumulator, Document, Filter, FindOptions, Pipeline, RecordRef, Transition, Update, decode,
    encode,
};
use crate::repos::error::RepoResult;
use crate::repos::store::DocumentStore;
use crate::services::record_id::RecordId;

pub const COLLECTION: &str = "progress";

const ENROLLED_FIELD: &str = "enrolledCourses";
const ATTEMPTS_FIELD: &str = "attempts";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub quiz_id: RecordId,
    pub answers: Vec<usize>,
    pub correct_count: usize,
    pub total: usize,
    pub score: f64,
    pub answered_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDoc {
    #[serde(default)]
    pub enrolled_courses: Vec<RecordId>,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub quiz_id: String,
    pub attempts: u64,
    pub best_score: Option<f64>,
    pub average_score: Option<f64>,
}

fn reference(learner_id: &RecordId) -> RecordRef {
    RecordRef::new(COLLECTION, learner_id.clone())
}

fn on_insert(learner_id: &RecordId) -> Document {
    let mut doc = Document::new();
    doc.insert("userId".to_string(), Value::String(learner_id.to_string()));
    doc
}

pub fn enroll(learner_id: &RecordId, course_id: &RecordId, at: DateTime<Utc>) -> (Filter, Update) {
    let update = Update::new(
        Transition::AddToSet {
            field: ENROLLED_FIELD,
            value: Value::String(course_id.to_string()),
        },
        at,
    )
    .upsert(on_insert(learner_id));
    (Filter::by_ref(&reference(learner_id)), update)
}

pub fn record_attempt(
    learner_id: &RecordId,
    attempt: &Attempt,
    at: DateTime<Utc>,
) -> Result<(Filter, Update), serde_json::Error> {
    let update = Update::new(
        Transition::Push {
            field: ATTEMPTS_FIELD,
            value: Value::Object(encode(attempt)?),
        },
        at,
    )
    .upsert(on_insert(learner_id));
    Ok((Filter::by_ref(&reference(learner_id)), update))
}

pub async fn get(store: &dyn DocumentStore, learner_id: &RecordId) -> RepoResult<ProgressDoc> {
    match store.find_one(&Filter::by_ref(&reference(learner_id))).await? {
        Some(doc) => Ok(decode(doc)?),
        None => Ok(ProgressDoc::default()),
    }
}

pub async fn quiz_summaries(
    store: &dyn DocumentStore,
    learner_id: &RecordId,
) -> RepoResult<Vec<QuizSummary>> {
    let pipeline = Pipeline {
        filter: Filter::by_ref(&reference(learner_id)),
        unwind: Some(ATTEMPTS_FIELD),
        group_by: "quizId",
        accumulators: vec![
            ("attempts", Accumulator::Count),
            ("bestScore", Accumulator::Max("score")),
            ("averageScore", Accumulator::Avg("score")),
        ],
    };

    let mut summaries: Vec<QuizSummary> = store
        .aggregate(&pipeline)
        .await?
        .into_iter()
        .map(|group| QuizSummary {
            quiz_id: group.key.as_str().unwrap_or_default().to_string(),
            attempts: group
                .values
                .get("attempts")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            best_score: group.values.get("bestScore").and_then(Value::as_f64),
            average_score: group
                .values
                .get("averageScore")
                .and_then(Value::as_f64)
                .map(round2),
        })
        .collect();
    summaries.sort_by(|a, b| a.quiz_id.cmp(&b.quiz_id));
    Ok(summaries)
}

/// Ids of every learner enrolled in `course_id`.
pub async fn enrolled_learners(
    store: &dyn DocumentStore,
    course_id: &RecordId,
) -> RepoResult<Vec<RecordId>> {
    let filter = Filter::collection(COLLECTION).contains(ENROLLED_FIELD, course_id.as_str());
    let docs = store.find_many(&filter, &FindOptions::default()).await?;

    Ok(docs
        .into_iter()
        .filter_map(|doc| {
            doc.get("userId")
                .and_then(Value::as_str)
                .and_then(|id| RecordId::parse(id).ok())
        })
        .collect())
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::document::{TransitionResult, timestamp};
    use crate::repos::memory::MemoryStore;

    fn attempt(quiz_id: &RecordId, score: f64) -> Attempt {
        Attempt {
            quiz_id: quiz_id.clone(),
            answers: vec![0],
            correct_count: 0,
            total: 1,
            score,
            answered_at: timestamp(Utc::now()),
        }
    }

    #[tokio::test]
    async fn enroll_is_idempotent_and_creates_the_document() {
        let store = MemoryStore::new();
        let learner = RecordId::generate();
        let course = RecordId::generate();

        let (filter, update) = enroll(&learner, &course, Utc::now());
        assert_eq!(
            store.update_one(&filter, &update).await.unwrap(),
            TransitionResult::CREATED
        );
        assert_eq!(
            store.update_one(&filter, &update).await.unwrap(),
            TransitionResult::UNCHANGED
        );

        assert_eq!(get(&store, &learner).await.unwrap().enrolled_courses, vec![course.clone()]);
        assert_eq!(enrolled_learners(&store, &course).await.unwrap(), vec![learner]);
        assert!(
            enrolled_learners(&store, &RecordId::generate())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn attempts_accumulate_and_summarize_per_quiz() {
        let store = MemoryStore::new();
        let learner = RecordId::generate();
        let quiz = RecordId::generate();

        for score in [50.0, 100.0, 66.67] {
            let (filter, update) = record_attempt(&learner, &attempt(&quiz, score), Utc::now()).unwrap();
            assert!(store.update_one(&filter, &update).await.unwrap().modified);
        }

        let progress = get(&store, &learner).await.unwrap();
        assert_eq!(progress.attempts.len(), 3);
        assert_eq!(progress.attempts[0].score, 50.0);

        let summaries = quiz_summaries(&store, &learner).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].quiz_id, quiz.as_str());
        assert_eq!(summaries[0].attempts, 3);
        assert_eq!(summaries[0].best_score, Some(100.0));
        assert_eq!(summaries[0].average_score, Some(72.22));
    }

    #[test]
    fn rounds_to_two_places() {
        assert_eq!(round2(200.0 / 3.0), 66.67);
        assert_eq!(round2(50.0), 50.0);
    }
}
