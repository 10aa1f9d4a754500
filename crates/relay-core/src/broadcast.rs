use std::sync::Arc;

use futures_util::{stream, StreamExt};
use tracing::{error, info};

use crate::{domain::UserId, messaging::port::MessagingPort, store::registry::Registry, Result};

/// Outcome of one fan-out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: Vec<UserId>,
}

/// Best-effort notification of every registered identity.
///
/// A failed delivery is logged and counted; it never aborts the batch and is
/// never retried.
pub struct BroadcastService {
    registry: Registry,
    messenger: Arc<dyn MessagingPort>,
    message: String,
    concurrency: usize,
}

impl BroadcastService {
    pub fn new(
        registry: Registry,
        messenger: Arc<dyn MessagingPort>,
        message: impl Into<String>,
        concurrency: usize,
    ) -> Self {
        Self {
            registry,
            messenger,
            message: message.into(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub async fn notify_all(&self) -> Result<BroadcastReport> {
        let ids = self.registry.list_identities().await?;
        if ids.is_empty() {
            return Ok(BroadcastReport::default());
        }

        let outcomes: Vec<(UserId, bool)> = stream::iter(ids)
            .map(|user_id| async move {
                match self
                    .messenger
                    .send_text(user_id.private_chat(), &self.message)
                    .await
                {
                    Ok(_) => {
                        info!(user_id = user_id.0, "Broadcast delivered");
                        (user_id, true)
                    }
                    Err(e) => {
                        error!(user_id = user_id.0, error = %e, "Broadcast delivery failed");
                        (user_id, false)
                    }
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = BroadcastReport::default();
        for (user_id, ok) in outcomes {
            if ok {
                report.delivered += 1;
            } else {
                report.failed.push(user_id);
            }
        }
        report.failed.sort();
        Ok(report)
    }
}
