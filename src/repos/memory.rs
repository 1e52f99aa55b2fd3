//! In-process `DocumentStore` for development runs (`STORE_BACKEND=memory`) and tests.
//!
//! A single mutex guards all collections, so each call is atomic with respect
//! to every other call, matching the per-document atomicity of the real store.
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Number, Value};

use crate::repos::document::{
    Accumulator, Document, Filter, FindOptions, Group, ID_FIELD, Pipeline, TransitionResult,
    UNIQUE_FIELDS, UPDATED_AT, Update, timestamp,
};
use crate::repos::error::{RepoError, RepoResult};
use crate::repos::store::DocumentStore;
use crate::services::record_id::RecordId;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<&'static str, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<&'static str, Vec<Document>>> {
        // A panic while holding the lock cannot leave a document half-written
        // (every mutation is a single assignment), so the data is still usable.
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn float(value: f64) -> Value {
    Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
}

fn accumulate(items: &[&Value], accumulator: Accumulator) -> Value {
    let numbers = |field: &str| -> Vec<f64> {
        items
            .iter()
            .filter_map(|item| item.get(field).and_then(Value::as_f64))
            .collect()
    };

    match accumulator {
        Accumulator::Count => Value::from(items.len() as u64),
        Accumulator::Max(field) => numbers(field)
            .into_iter()
            .reduce(f64::max)
            .map(float)
            .unwrap_or(Value::Null),
        Accumulator::Avg(field) => {
            let values = numbers(field);
            if values.is_empty() {
                Value::Null
            } else {
                float(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find_one(&self, filter: &Filter) -> RepoResult<Option<Document>> {
        let collections = self.lock();
        Ok(collections
            .get(filter.collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    async fn find_many(&self, filter: &Filter, options: &FindOptions) -> RepoResult<Vec<Document>> {
        let collections = self.lock();
        let mut found: Vec<Document> = collections
            .get(filter.collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();

        if let Some(sort) = options.sort {
            found.sort_by(|a, b| {
                let ord = compare(a.get(sort.field), b.get(sort.field));
                if sort.descending { ord.reverse() } else { ord }
            });
        }
        if let Some(limit) = options.limit {
            found.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(found)
    }

    async fn insert_one(&self, collection: &'static str, mut doc: Document) -> RepoResult<RecordId> {
        let mut collections = self.lock();
        let docs = collections.entry(collection).or_default();

        for (_, field) in UNIQUE_FIELDS.iter().filter(|(c, _)| *c == collection) {
            if let Some(value) = doc.get(*field)
                && !value.is_null()
                && docs.iter().any(|d| d.get(*field) == Some(value))
            {
                return Err(RepoError::Duplicate(collection));
            }
        }

        let id = RecordId::generate();
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
        docs.push(doc);
        Ok(id)
    }

    async fn update_one(&self, filter: &Filter, update: &Update) -> RepoResult<TransitionResult> {
        if update.on_insert.is_some() && (filter.id.is_none() || !filter.conditions.is_empty()) {
            return Err(RepoError::Unsupported("upsert requires an id-only filter"));
        }

        let mut collections = self.lock();
        let docs = collections.entry(filter.collection).or_default();

        if let Some(doc) = docs.iter_mut().find(|d| filter.matches(d)) {
            if update.transition.apply(doc) {
                doc.insert(UPDATED_AT.to_string(), Value::String(timestamp(update.at)));
                return Ok(TransitionResult::CHANGED);
            }
            return Ok(TransitionResult::UNCHANGED);
        }

        match (&update.on_insert, &filter.id) {
            (Some(_), Some(id)) => {
                docs.push(update.initial_document(id));
                Ok(TransitionResult::CREATED)
            }
            _ => Ok(TransitionResult::NOT_FOUND),
        }
    }

    async fn delete_many(&self, filter: &Filter) -> RepoResult<u64> {
        let mut collections = self.lock();
        let Some(docs) = collections.get_mut(filter.collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }

    async fn aggregate(&self, pipeline: &Pipeline) -> RepoResult<Vec<Group>> {
        let collections = self.lock();
        let Some(docs) = collections.get(pipeline.filter.collection) else {
            return Ok(Vec::new());
        };

        let sources: Vec<Value> = docs
            .iter()
            .filter(|d| pipeline.filter.matches(d))
            .flat_map(|d| match pipeline.unwind {
                Some(field) => match d.get(field) {
                    Some(Value::Array(items)) => items.clone(),
                    _ => Vec::new(),
                },
                None => vec![Value::Object(d.clone())],
            })
            .collect();

        let mut buckets: Vec<(Value, Vec<&Value>)> = Vec::new();
        for source in &sources {
            let key = source.get(pipeline.group_by).cloned().unwrap_or(Value::Null);
            match buckets.iter_mut().find(|(k, _)| *k == key) {
                Some((_, items)) => items.push(source),
                None => buckets.push((key, vec![source])),
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(key, items)| Group {
                key,
                values: pipeline
                    .accumulators
                    .iter()
                    .map(|(name, acc)| (name.to_string(), accumulate(&items, *acc)))
                    .collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::*;
    use crate::repos::document::{RecordRef, Transition};

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[tokio::test]
    async fn update_distinguishes_missing_unchanged_and_changed() {
        let store = MemoryStore::new();
        let id = store
            .insert_one("notifications", doc(json!({"read": false})))
            .await
            .unwrap();
        let reference = RecordRef::new("notifications", id);
        let update = Update::new(Transition::Set(doc(json!({"read": true}))), Utc::now());

        let first = store.update_one(&Filter::by_ref(&reference), &update).await.unwrap();
        let second = store.update_one(&Filter::by_ref(&reference), &update).await.unwrap();
        let missing = RecordRef::new("notifications", RecordId::generate());
        let third = store.update_one(&Filter::by_ref(&missing), &update).await.unwrap();

        assert_eq!(first, TransitionResult::CHANGED);
        assert_eq!(second, TransitionResult::UNCHANGED);
        assert_eq!(third, TransitionResult::NOT_FOUND);
    }

    #[tokio::test]
    async fn updated_at_is_only_stamped_on_change() {
        let store = MemoryStore::new();
        let id = store
            .insert_one("courses", doc(json!({"status": "draft", "updatedAt": "old"})))
            .await
            .unwrap();
        let filter = Filter::by_ref(&RecordRef::new("courses", id));

        let noop = Update::new(Transition::Set(doc(json!({"status": "draft"}))), Utc::now());
        store.update_one(&filter, &noop).await.unwrap();
        let unchanged = store.find_one(&filter).await.unwrap().unwrap();
        assert_eq!(unchanged["updatedAt"], "old");

        let at = Utc::now();
        let publish = Update::new(Transition::Set(doc(json!({"status": "published"}))), at);
        store.update_one(&filter, &publish).await.unwrap();
        let changed = store.find_one(&filter).await.unwrap().unwrap();
        assert_eq!(changed["updatedAt"], timestamp(at));
    }

    #[tokio::test]
    async fn unique_fields_reject_a_second_insert() {
        let store = MemoryStore::new();
        store
            .insert_one("users", doc(json!({"email": "ada@example.com"})))
            .await
            .unwrap();

        let again = store
            .insert_one("users", doc(json!({"email": "ada@example.com"})))
            .await;
        assert!(matches!(again, Err(RepoError::Duplicate("users"))));

        // Other collections and other values are unaffected.
        store
            .insert_one("users", doc(json!({"email": "grace@example.com"})))
            .await
            .unwrap();
        store
            .insert_one("notifications", doc(json!({"email": "ada@example.com"})))
            .await
            .unwrap();
        let users = store
            .find_many(&Filter::collection("users"), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn upsert_creates_then_updates() {
        let store = MemoryStore::new();
        let subject = RecordId::generate();
        let filter = Filter::by_ref(&RecordRef::new("preferences", subject.clone()));
        let update = Update::new(Transition::Set(doc(json!({"theme": "dark"}))), Utc::now())
            .upsert(doc(json!({"userId": subject.as_str()})));

        assert_eq!(
            store.update_one(&filter, &update).await.unwrap(),
            TransitionResult::CREATED
        );
        assert_eq!(
            store.update_one(&filter, &update).await.unwrap(),
            TransitionResult::UNCHANGED
        );
        let stored = store.find_one(&filter).await.unwrap().unwrap();
        assert_eq!(stored["userId"], subject.as_str());
    }

    #[tokio::test]
    async fn upsert_with_conditions_is_rejected() {
        let store = MemoryStore::new();
        let filter = Filter::by_ref(&RecordRef::new("preferences", RecordId::generate()))
            .eq("theme", "dark");
        let update = Update::new(Transition::Set(Document::new()), Utc::now()).upsert(Document::new());
        assert!(matches!(
            store.update_one(&filter, &update).await,
            Err(RepoError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn delete_many_removes_only_expired_records() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for offset in [-120, -60, 60, 120, 180] {
            let expires = timestamp(now + Duration::seconds(offset));
            store
                .insert_one("otps", doc(json!({"expiresAt": expires})))
                .await
                .unwrap();
        }

        let expired = Filter::collection("otps").lt("expiresAt", timestamp(now));
        assert_eq!(store.delete_many(&expired).await.unwrap(), 2);

        let remaining = store
            .find_many(&Filter::collection("otps"), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 3);
    }

    #[tokio::test]
    async fn find_many_sorts_and_limits() {
        let store = MemoryStore::new();
        for at in ["2024-01-01", "2024-03-01", "2024-02-01"] {
            store
                .insert_one("notifications", doc(json!({"createdAt": at})))
                .await
                .unwrap();
        }
        let found = store
            .find_many(&Filter::collection("notifications"), &FindOptions::newest_first(2))
            .await
            .unwrap();
        let order: Vec<&str> = found.iter().filter_map(|d| d["createdAt"].as_str()).collect();
        assert_eq!(order, vec!["2024-03-01", "2024-02-01"]);
    }

    #[tokio::test]
    async fn aggregate_unwinds_and_groups() {
        let store = MemoryStore::new();
        store
            .insert_one(
                "progress",
                doc(json!({
                    "userId": "u1",
                    "attempts": [
                        {"quizId": "q1", "score": 50.0},
                        {"quizId": "q1", "score": 100.0},
                        {"quizId": "q2", "score": 20.0}
                    ]
                })),
            )
            .await
            .unwrap();

        let pipeline = Pipeline {
            filter: Filter::collection("progress").eq("userId", "u1"),
            unwind: Some("attempts"),
            group_by: "quizId",
            accumulators: vec![
                ("attempts", Accumulator::Count),
                ("bestScore", Accumulator::Max("score")),
                ("averageScore", Accumulator::Avg("score")),
            ],
        };
        let groups = store.aggregate(&pipeline).await.unwrap();
        assert_eq!(groups.len(), 2);

        let q1 = groups.iter().find(|g| g.key == json!("q1")).unwrap();
        assert_eq!(q1.values["attempts"], json!(2));
        assert_eq!(q1.values["bestScore"].as_f64(), Some(100.0));
        assert_eq!(q1.values["averageScore"].as_f64(), Some(75.0));
    }
}
