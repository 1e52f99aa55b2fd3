/*
 * Responsibility
 * - `preferences` collection: one document per user, keyed by the user's id
 * - defaults are served (not stored) until the first write
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::repos::document::{Document, Filter, RecordRef, Transition, Update, decode, encode};
use crate::repos::error::RepoResult;
use crate::repos::store::DocumentStore;
use crate::services::record_id::RecordId;

pub const COLLECTION: &str = "preferences";

pub const DEFAULT_THEME: &str = "system";
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub email_notifications: bool,
    pub theme: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            email_notifications: true,
            theme: DEFAULT_THEME.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            updated_at: None,
        }
    }
}

/// Fields to change; `None` leaves the stored (or default) value alone.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

fn reference(user_id: &RecordId) -> RecordRef {
    RecordRef::new(COLLECTION, user_id.clone())
}

pub async fn get_or_default(
    store: &dyn DocumentStore,
    user_id: &RecordId,
) -> RepoResult<Preferences> {
    match store.find_one(&Filter::by_ref(&reference(user_id))).await? {
        Some(doc) => Ok(decode(doc)?),
        None => Ok(Preferences::default()),
    }
}

/// Upsert keyed by the user id. Defaults fill whatever the patch leaves out on creation.
pub fn upsert(
    user_id: &RecordId,
    patch: &PreferencesPatch,
    at: DateTime<Utc>,
) -> Result<(Filter, Update), serde_json::Error> {
    let defaults = Preferences::default();
    let mut on_insert: Document = encode(&defaults)?;
    on_insert.insert("userId".to_string(), Value::String(user_id.to_string()));

    let update = Update::new(Transition::set(patch)?, at).upsert(on_insert);
    Ok((Filter::by_ref(&reference(user_id)), update))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::document::TransitionResult;
    use crate::repos::memory::MemoryStore;

    #[tokio::test]
    async fn first_write_creates_then_merges() {
        let store = MemoryStore::new();
        let user = RecordId::generate();
        assert_eq!(
            get_or_default(&store, &user).await.unwrap(),
            Preferences::default()
        );

        let dark = PreferencesPatch {
            theme: Some("dark".to_string()),
            ..Default::default()
        };
        let (filter, update) = upsert(&user, &dark, Utc::now()).unwrap();
        assert_eq!(
            store.update_one(&filter, &update).await.unwrap(),
            TransitionResult::CREATED
        );
        assert_eq!(
            store.update_one(&filter, &update).await.unwrap(),
            TransitionResult::UNCHANGED
        );

        let muted = PreferencesPatch {
            email_notifications: Some(false),
            ..Default::default()
        };
        let (filter, update) = upsert(&user, &muted, Utc::now()).unwrap();
        assert_eq!(
            store.update_one(&filter, &update).await.unwrap(),
            TransitionResult::CHANGED
        );

        let stored = get_or_default(&store, &user).await.unwrap();
        assert_eq!(stored.theme, "dark");
        assert!(!stored.email_notifications);
        assert_eq!(stored.language, DEFAULT_LANGUAGE);
        assert!(stored.updated_at.is_some());
    }
}
