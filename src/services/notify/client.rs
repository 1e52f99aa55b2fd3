use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub success: bool,
    pub details: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Hand a message to the delivery channel.
///
/// `Ok` with `success=false` means the channel answered and refused the
/// message; `Err` means it could not be reached at all.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    fn backend_name(&self) -> &'static str;

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReport, NotifyError>;
}
