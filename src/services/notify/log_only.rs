use async_trait::async_trait;

use crate::services::notify::client::{DeliveryReport, Notifier, NotifyError, OutboundMessage};

/// Development notifier: records the message in the trace log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn backend_name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReport, NotifyError> {
        tracing::info!(
            recipient = %message.recipient,
            subject = %message.subject,
            "notification logged (no relay configured)"
        );
        Ok(DeliveryReport {
            success: true,
            details: "logged".to_string(),
        })
    }
}
