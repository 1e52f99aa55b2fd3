/*
 * Responsibility
 * - GET /notifications: own inbox, newest first
 * - PUT /notifications/{id}/read: idempotent read flag on an own notification
 */
use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::api::v1::dto::notifications::NotificationResponse;
use crate::api::v1::extractors::{Authenticated, NotificationId};
use crate::api::v1::response::{Applied, Envelope};
use crate::error::AppError;
use crate::repos::notification_repo;
use crate::services::transition;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Inbox {
    notifications: Vec<NotificationResponse>,
    unread: usize,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    auth: Authenticated,
) -> Result<Envelope<Inbox>, AppError> {
    let notifications: Vec<NotificationResponse> =
        notification_repo::list_for(state.store.as_ref(), &auth.claim.subject_id)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

    Ok(Envelope::ok(Inbox {
        unread: notifications.iter().filter(|n| !n.read).count(),
        notifications,
    }))
}

#[derive(Debug, Serialize)]
pub struct ReadView {
    read: bool,
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: Authenticated,
    notification: NotificationId,
) -> Result<Envelope<Applied<ReadView>>, AppError> {
    let result = transition::execute(
        state.store.as_ref(),
        notification.resource(),
        &notification_repo::addressed_to(&notification.reference, &auth.claim.subject_id),
        &notification_repo::mark_read(Utc::now()),
    )
    .await?;

    Ok(Applied::new(result, ReadView { read: true }))
}
