use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use crate::models::User;

/// Summary of a cancelled or deleted session, as sent to recipients.
#[derive(Debug, Clone, Serialize)]
pub struct CancelledTraining {
    pub date_time: DateTime<Utc>,
    pub location: String,
    pub description: Option<String>,
}

/// Delivers cancellation notices through an external webhook.
///
/// Constructed once at startup and handed to the training manager;
/// delivery is best-effort and never blocks or fails the request that
/// triggered it.
#[derive(Clone)]
pub struct NotificationDispatcher {
    client: reqwest::Client,
    base_url: Option<Arc<Url>>,
}

#[derive(Serialize)]
struct CancellationNotice<'a> {
    email: &'a str,
    name: &'a str,
    training: &'a CancelledTraining,
}

impl NotificationDispatcher {
    pub fn new(base_url: Option<Url>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.map(Arc::new),
        }
    }

    /// Fan-out: one spawned task per recipient. The caller returns
    /// immediately; per-recipient failures are logged and dropped.
    pub fn dispatch_cancellations(&self, recipients: Vec<User>, training: CancelledTraining) {
        if recipients.is_empty() {
            return;
        }
        tracing::info!(
            count = recipients.len(),
            location = %training.location,
            "sending cancellation notices"
        );
        for player in recipients {
            let dispatcher = self.clone();
            let training = training.clone();
            tokio::spawn(async move {
                if !dispatcher
                    .notify_cancellation(&player.email, &player.name, &training)
                    .await
                {
                    tracing::error!(email = %player.email, "failed to deliver cancellation notice");
                }
            });
        }
    }

    pub async fn notify_cancellation(
        &self,
        email: &str,
        name: &str,
        training: &CancelledTraining,
    ) -> bool {
        let Some(base) = &self.base_url else {
            tracing::warn!("notifier not configured: APP_NOTIFIER_BASE_URL not set");
            return false;
        };
        let url = format!("{}/cancellations", base.as_str().trim_end_matches('/'));
        let notice = CancellationNotice {
            email,
            name,
            training,
        };

        match self.client.post(url).json(&notice).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::error!(
                    email = %email,
                    status = %response.status(),
                    "notification webhook rejected the notice"
                );
                false
            }
            Err(err) => {
                tracing::error!(email = %email, error = %err, "failed to reach notification webhook");
                false
            }
        }
    }
}
