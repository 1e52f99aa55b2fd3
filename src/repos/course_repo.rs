/*
 * Responsibility
 * - `courses` collection: record shape, lifecycle states, listing filters
 * - builds the filters/transitions the executor runs; never writes on its own
 *   except for creation
 */
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::repos::document::{
    Document, Filter, FindOptions, RecordRef, Transition, Update, decode, encode, timestamp,
};
use crate::repos::error::RepoResult;
use crate::repos::store::DocumentStore;
use crate::services::content::ResourceSet;
use crate::services::record_id::RecordId;

pub const COLLECTION: &str = "courses";
pub const STATUS_FIELD: &str = "status";

const LIST_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

impl CourseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseStatus::Draft => "draft",
            CourseStatus::Published => "published",
            CourseStatus::Archived => "archived",
        }
    }

    /// States a course may be in for a move to `self` to be accepted.
    ///
    /// The target itself is always included so re-applying a transition
    /// matches and reports `modified=false`.
    pub fn reachable_from(&self) -> &'static [CourseStatus] {
        match self {
            CourseStatus::Draft => &[CourseStatus::Draft, CourseStatus::Published],
            CourseStatus::Published => &[CourseStatus::Draft, CourseStatus::Published],
            CourseStatus::Archived => &[
                CourseStatus::Draft,
                CourseStatus::Published,
                CourseStatus::Archived,
            ],
        }
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDoc {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDoc {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub educator_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub modules: Vec<ModuleDoc>,
    pub status: CourseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceSet>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewCourse<'a> {
    educator_id: &'a RecordId,
    title: &'a str,
    description: &'a str,
    modules: &'a [ModuleDoc],
    status: CourseStatus,
    created_at: String,
    updated_at: String,
}

pub async fn create(
    store: &dyn DocumentStore,
    educator_id: &RecordId,
    title: &str,
    description: &str,
    modules: Vec<ModuleDoc>,
    at: DateTime<Utc>,
) -> RepoResult<CourseDoc> {
    let now = timestamp(at);
    let doc = encode(&NewCourse {
        educator_id,
        title,
        description,
        modules: &modules,
        status: CourseStatus::Draft,
        created_at: now.clone(),
        updated_at: now.clone(),
    })?;
    let id = store.insert_one(COLLECTION, doc).await?;

    Ok(CourseDoc {
        id,
        educator_id: educator_id.clone(),
        title: title.to_string(),
        description: description.to_string(),
        modules,
        status: CourseStatus::Draft,
        resources: None,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find(store: &dyn DocumentStore, filter: &Filter) -> RepoResult<Option<CourseDoc>> {
    match store.find_one(filter).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

async fn list(store: &dyn DocumentStore, filter: Filter) -> RepoResult<Vec<CourseDoc>> {
    let docs = store
        .find_many(&filter, &FindOptions::newest_first(LIST_LIMIT))
        .await?;
    docs.into_iter()
        .map(|doc| decode(doc).map_err(Into::into))
        .collect()
}

pub async fn list_for_educator(
    store: &dyn DocumentStore,
    educator_id: &RecordId,
) -> RepoResult<Vec<CourseDoc>> {
    list(
        store,
        Filter::collection(COLLECTION).eq("educatorId", educator_id.as_str()),
    )
    .await
}

pub async fn list_published(store: &dyn DocumentStore) -> RepoResult<Vec<CourseDoc>> {
    list(
        store,
        Filter::collection(COLLECTION).eq(STATUS_FIELD, CourseStatus::Published.as_str()),
    )
    .await
}

/// The course, only if `educator_id` owns it.
pub fn owned_by(course: &RecordRef, educator_id: &RecordId) -> Filter {
    Filter::by_ref(course).eq("educatorId", educator_id.as_str())
}

pub fn published(course: &RecordRef) -> Filter {
    Filter::by_ref(course).eq(STATUS_FIELD, CourseStatus::Published.as_str())
}

pub fn move_to(target: CourseStatus, at: DateTime<Utc>) -> Update {
    let mut fields = Document::new();
    fields.insert(
        STATUS_FIELD.to_string(),
        Value::String(target.as_str().to_string()),
    );
    Update::new(Transition::Set(fields), at)
}

#[derive(Serialize)]
struct ResourcesField<'a> {
    resources: &'a ResourceSet,
}

pub fn attach_resources(
    resources: &ResourceSet,
    at: DateTime<Utc>,
) -> Result<Update, serde_json::Error> {
    Ok(Update::new(
        Transition::set(ResourcesField { resources })?,
        at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::memory::MemoryStore;

    #[test]
    fn archived_is_terminal() {
        assert!(!CourseStatus::Draft.reachable_from().contains(&CourseStatus::Archived));
        assert!(!CourseStatus::Published.reachable_from().contains(&CourseStatus::Archived));
        assert!(CourseStatus::Archived.reachable_from().contains(&CourseStatus::Archived));
    }

    #[test]
    fn move_to_sets_status() {
        let update = move_to(CourseStatus::Published, Utc::now());
        match update.transition {
            Transition::Set(fields) => assert_eq!(fields["status"], "published"),
            other => panic!("unexpected transition {other:?}"),
        }
    }

    #[tokio::test]
    async fn listing_separates_owners_and_published_courses() {
        let store = MemoryStore::new();
        let ada = RecordId::generate();
        let bob = RecordId::generate();
        let first = create(&store, &ada, "Rust", "", Vec::new(), Utc::now())
            .await
            .unwrap();
        create(&store, &bob, "Go", "", Vec::new(), Utc::now())
            .await
            .unwrap();

        let own = list_for_educator(&store, &ada).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].title, "Rust");
        assert!(list_published(&store).await.unwrap().is_empty());

        let reference = RecordRef::new(COLLECTION, first.id.clone());
        let result = store
            .update_one(
                &owned_by(&reference, &ada),
                &move_to(CourseStatus::Published, Utc::now()),
            )
            .await
            .unwrap();
        assert!(result.modified);
        assert_eq!(list_published(&store).await.unwrap().len(), 1);
        assert!(find(&store, &owned_by(&reference, &bob)).await.unwrap().is_none());
        assert!(find(&store, &published(&reference)).await.unwrap().is_some());
    }
}
