/*
 * Responsibility
 * - GET /preferences: stored preferences, or defaults before the first write
 * - PUT /preferences: upsert keyed by the caller's id
 */
use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::api::v1::dto::preferences::UpdatePreferencesRequest;
use crate::api::v1::extractors::{Authenticated, JsonBody};
use crate::api::v1::response::{Applied, Envelope};
use crate::error::AppError;
use crate::repos::preference_repo::{self, Preferences};
use crate::services::transition;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PreferencesView {
    preferences: Preferences,
}

pub async fn get_preferences(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Envelope<PreferencesView>, AppError> {
    let preferences =
        preference_repo::get_or_default(state.store.as_ref(), &auth.claim.subject_id).await?;
    Ok(Envelope::ok(PreferencesView { preferences }))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<UpdatePreferencesRequest>,
) -> Result<Envelope<Applied<PreferencesView>>, AppError> {
    req.validate().map_err(AppError::validation)?;
    let store = state.store.as_ref();

    let (filter, update) =
        preference_repo::upsert(&auth.claim.subject_id, &req.into_patch(), Utc::now())?;
    let result = transition::execute(store, preference_repo::COLLECTION, &filter, &update).await?;

    let preferences = preference_repo::get_or_default(store, &auth.claim.subject_id).await?;
    Ok(Applied::new(result, PreferencesView { preferences }))
}
