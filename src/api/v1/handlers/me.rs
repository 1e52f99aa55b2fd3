/*
 * Responsibility
 * - GET /me: echo the verified identity claim
 */
use serde::Serialize;

use crate::api::v1::extractors::{Authenticated, IdentityClaim};
use crate::api::v1::response::Envelope;

#[derive(Debug, Serialize)]
pub struct Me {
    identity: IdentityClaim,
}

pub async fn me(auth: Authenticated) -> Envelope<Me> {
    Envelope::ok(Me {
        identity: auth.claim,
    })
}
