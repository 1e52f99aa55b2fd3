use serde::Serialize;

use crate::repos::notification_repo::NotificationDoc;
use crate::services::record_id::RecordId;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: RecordId,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<NotificationDoc> for NotificationResponse {
    fn from(n: NotificationDoc) -> Self {
        Self {
            id: n.id,
            title: n.title,
            body: n.body,
            read: n.read,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}
