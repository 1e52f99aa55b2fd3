/*
 * Responsibility
 * - `notifications` collection: per-recipient inbox, read flag
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::repos::document::{
    Document, Filter, FindOptions, RecordRef, Transition, Update, decode, encode, timestamp,
};
use crate::repos::error::RepoResult;
use crate::repos::store::DocumentStore;
use crate::services::record_id::RecordId;

pub const COLLECTION: &str = "notifications";

const LIST_LIMIT: i64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDoc {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub recipient_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub read: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewNotification<'a> {
    recipient_id: &'a RecordId,
    title: &'a str,
    body: &'a str,
    read: bool,
    created_at: String,
    updated_at: String,
}

pub async fn create(
    store: &dyn DocumentStore,
    recipient_id: &RecordId,
    title: &str,
    body: &str,
    at: DateTime<Utc>,
) -> RepoResult<RecordId> {
    let now = timestamp(at);
    let doc = encode(&NewNotification {
        recipient_id,
        title,
        body,
        read: false,
        created_at: now.clone(),
        updated_at: now,
    })?;
    store.insert_one(COLLECTION, doc).await
}

/// Newest first.
pub async fn list_for(
    store: &dyn DocumentStore,
    recipient_id: &RecordId,
) -> RepoResult<Vec<NotificationDoc>> {
    let filter = Filter::collection(COLLECTION).eq("recipientId", recipient_id.as_str());
    let docs = store
        .find_many(&filter, &FindOptions::newest_first(LIST_LIMIT))
        .await?;
    docs.into_iter()
        .map(|doc| decode(doc).map_err(Into::into))
        .collect()
}

pub fn addressed_to(notification: &RecordRef, recipient_id: &RecordId) -> Filter {
    Filter::by_ref(notification).eq("recipientId", recipient_id.as_str())
}

pub fn mark_read(at: DateTime<Utc>) -> Update {
    let mut fields = Document::new();
    fields.insert("read".to_string(), Value::Bool(true));
    Update::new(Transition::Set(fields), at)
}
