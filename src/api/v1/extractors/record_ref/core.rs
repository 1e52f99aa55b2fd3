/*
 * Responsibility
 * - Resource locator: the `{..._id}` path segment -> validated RecordRef
 * - Malformed ids are rejected here (400) before any store key is built
 *
 * Resource-specific names live in types.rs; nothing here knows about courses or quizzes.
 */
use std::marker::PhantomData;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::error::AppError;
use crate::repos::document::RecordRef;
use crate::services::record_id::RecordId;
use crate::state::AppState;

/// Binds a path id to its collection.
pub trait Collection: Send + Sync + 'static {
    const NAME: &'static str;
    /// Singular resource name used in error messages.
    const RESOURCE: &'static str;
}

pub struct RecordPath<T> {
    pub reference: RecordRef,
    _marker: PhantomData<T>,
}

impl<T: Collection> RecordPath<T> {
    fn new(id: RecordId) -> Self {
        Self {
            reference: RecordRef::new(T::NAME, id),
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.reference.id
    }

    pub fn resource(&self) -> &'static str {
        T::RESOURCE
    }
}

impl<T> FromRequestParts<AppState> for RecordPath<T>
where
    T: Collection,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                AppError::validation_with("invalid path parameter", rejection.body_text())
            })?;

        let id = RecordId::parse(&raw)?;
        Ok(Self::new(id))
    }
}

impl<T> std::fmt::Debug for RecordPath<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordPath")
            .field("reference", &self.reference)
            .finish()
    }
}
