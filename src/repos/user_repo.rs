/*
 * Responsibility
 * - `users` collection: registration and lookup by (normalized) email
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repos::document::{Filter, RecordRef, decode, encode, timestamp};
use crate::repos::error::RepoResult;
use crate::repos::store::DocumentStore;
use crate::services::auth::Role;
use crate::services::record_id::RecordId;

pub const COLLECTION: &str = "users";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDoc {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewUser<'a> {
    name: &'a str,
    email: &'a str,
    role: Role,
    created_at: String,
    updated_at: String,
}

pub async fn find_by_email(store: &dyn DocumentStore, email: &str) -> RepoResult<Option<UserDoc>> {
    let filter = Filter::collection(COLLECTION).eq("email", email);
    match store.find_one(&filter).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

pub async fn get(store: &dyn DocumentStore, id: &RecordId) -> RepoResult<Option<UserDoc>> {
    let filter = Filter::by_ref(&RecordRef::new(COLLECTION, id.clone()));
    match store.find_one(&filter).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

/// `email` must already be normalized; uniqueness is checked by the caller.
pub async fn create(
    store: &dyn DocumentStore,
    name: &str,
    email: &str,
    role: Role,
    at: DateTime<Utc>,
) -> RepoResult<UserDoc> {
    let now = timestamp(at);
    let doc = encode(&NewUser {
        name,
        email,
        role,
        created_at: now.clone(),
        updated_at: now.clone(),
    })?;
    let id = store.insert_one(COLLECTION, doc).await?;

    Ok(UserDoc {
        id,
        name: name.to_string(),
        email: email.to_string(),
        role,
        created_at: now.clone(),
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::memory::MemoryStore;

    #[tokio::test]
    async fn created_users_are_found_by_email_and_id() {
        let store = MemoryStore::new();
        let created = create(&store, "Ada", "ada@example.com", Role::Educator, Utc::now())
            .await
            .unwrap();

        let by_email = find_by_email(&store, "ada@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.role, Role::Educator);

        let by_id = get(&store, &created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "ada@example.com");
        assert!(find_by_email(&store, "bob@example.com").await.unwrap().is_none());
    }
}
