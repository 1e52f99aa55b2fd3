/*
 * Responsibility
 * - Success side of the response envelope: {"success": true, ...payload}
 * - The failure side is AppError's IntoResponse (error.rs)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::repos::document::TransitionResult;

/// `payload` must serialize to a JSON object; its fields are flattened next to `success`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip)]
    status: StatusCode,
    success: bool,
    #[serde(flatten)]
    payload: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            status: StatusCode::OK,
            success: true,
            payload,
        }
    }

    pub fn created(payload: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            success: true,
            payload,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Payload of a state-transition route: `{matched, modified, upserted, ...extra}`.
#[derive(Debug, Serialize)]
pub struct Applied<T> {
    #[serde(flatten)]
    pub result: TransitionResult,
    #[serde(flatten)]
    pub extra: T,
}

impl<T: Serialize> Applied<T> {
    pub fn new(result: TransitionResult, extra: T) -> Envelope<Self> {
        Envelope::ok(Self { result, extra })
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    use super::*;

    #[tokio::test]
    async fn flattens_payload_next_to_success() {
        let res = Envelope::created(json!({"course": {"title": "Rust"}})).into_response();
        assert_eq!(res.status(), StatusCode::CREATED);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"success": true, "course": {"title": "Rust"}}));
    }

    #[tokio::test]
    async fn transition_payload_carries_the_result() {
        let res = Applied::new(TransitionResult::UNCHANGED, json!({"read": true})).into_response();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({"success": true, "matched": true, "modified": false, "upserted": false, "read": true})
        );
    }
}
