//! Chat webhook notification for published diffs.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info};

use crate::NotifyConfig;
use crate::error::Result;

/// What a finished pipeline run announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub after: String,
    /// Web URL of the source repository
    pub html_url: String,
    /// Public URL of the published diff
    pub diff_url: String,
}

impl Notification {
    pub fn content(&self) -> String {
        format!(
            "Diff for commit [{}](<{}/commit/{}>) is published at: {}",
            self.after,
            self.html_url.trim_end_matches('/'),
            self.after,
            self.diff_url
        )
    }
}

/// JSON body posted to the chat webhook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub content: String,
}

pub trait Notify: Send + Sync {
    fn notify(&self, notification: &Notification) -> impl Future<Output = Result<()>> + Send;
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    config: NotifyConfig,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, config: NotifyConfig) -> Self {
        Self { client, config }
    }

    pub fn payload(&self, notification: &Notification) -> NotificationPayload {
        NotificationPayload {
            username: self.config.username.clone(),
            avatar_url: self.config.avatar_url.clone(),
            content: notification.content(),
        }
    }
}

impl Notify for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let Some(url) = self.config.webhook_url.as_deref() else {
            debug!("No notification webhook configured; skipping");
            return Ok(());
        };

        info!("Sending notification for {}", notification.after);
        let response = self
            .client
            .post(url)
            .json(&self.payload(notification))
            .send()
            .await?;

        let status = response.status();
        let response = response.error_for_status()?;
        let body = response.text().await.unwrap_or_default();
        info!("Notification webhook responded {}: {}", status, body);
        Ok(())
    }
}
