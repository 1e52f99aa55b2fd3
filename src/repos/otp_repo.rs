/*
 * Responsibility
 * - `otps` collection: one-time login codes (hash only) with an absolute expiry
 * - expiry sweep used by the background task
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repos::document::{Filter, decode, encode, timestamp};
use crate::repos::error::RepoResult;
use crate::repos::store::DocumentStore;
use crate::services::record_id::RecordId;

pub const COLLECTION: &str = "otps";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpDoc {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub email: String,
    pub code_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

impl OtpDoc {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.as_str() <= timestamp(now).as_str()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewOtp<'a> {
    email: &'a str,
    code_hash: &'a str,
    expires_at: String,
    created_at: String,
}

/// Store a code hash. Earlier codes for the same email are removed first so only
/// the latest one can be redeemed.
pub async fn replace(
    store: &dyn DocumentStore,
    email: &str,
    code_hash: &str,
    expires_at: DateTime<Utc>,
    at: DateTime<Utc>,
) -> RepoResult<RecordId> {
    consume(store, email).await?;
    let doc = encode(&NewOtp {
        email,
        code_hash,
        expires_at: timestamp(expires_at),
        created_at: timestamp(at),
    })?;
    store.insert_one(COLLECTION, doc).await
}

pub async fn find(
    store: &dyn DocumentStore,
    email: &str,
    code_hash: &str,
) -> RepoResult<Option<OtpDoc>> {
    let filter = Filter::collection(COLLECTION)
        .eq("email", email)
        .eq("codeHash", code_hash);
    match store.find_one(&filter).await? {
        Some(doc) => Ok(Some(decode(doc)?)),
        None => Ok(None),
    }
}

/// Delete every code for `email`. Returns the number deleted; zero means a
/// concurrent verification already consumed it.
pub async fn consume(store: &dyn DocumentStore, email: &str) -> RepoResult<u64> {
    store
        .delete_many(&Filter::collection(COLLECTION).eq("email", email))
        .await
}

/// Delete codes whose expiry is strictly before `now`.
pub async fn delete_expired(store: &dyn DocumentStore, now: DateTime<Utc>) -> RepoResult<u64> {
    store
        .delete_many(&Filter::collection(COLLECTION).lt("expiresAt", timestamp(now)))
        .await
}
