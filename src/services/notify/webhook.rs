use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::services::notify::client::{DeliveryReport, Notifier, NotifyError, OutboundMessage};

/// Posts each message as JSON to a mail/notification relay.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn backend_name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReport, NotifyError> {
        let res = self
            .client
            .post(self.url.clone())
            .json(message)
            .send()
            .await?;

        let status = res.status();
        Ok(DeliveryReport {
            success: status.is_success(),
            details: format!("relay responded {}", status.as_u16()),
        })
    }
}
