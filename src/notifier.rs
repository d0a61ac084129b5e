use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use poise::serenity_prelude::{CreateMessage, Http, UserId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Participant, ParticipantId};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Could not deliver a message to {recipient}: {reason}")]
    DeliveryFailure { recipient: UserId, reason: String },
    #[error("Timed out delivering a message to {recipient}")]
    Timeout { recipient: UserId },
}

/// One-way delivery of text messages to a single recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: UserId, message: &str) -> Result<(), NotifyError>;
}

/// Sends messages as Discord DMs.
pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> DiscordNotifier {
        DiscordNotifier { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, recipient: UserId, message: &str) -> Result<(), NotifyError> {
        recipient
            .direct_message(self.http.as_ref(), CreateMessage::new().content(message))
            .await
            .map(|_| ())
            .map_err(|err| NotifyError::DeliveryFailure {
                recipient,
                reason: err.to_string(),
            })
    }
}

/// Outbound rate limiting for batches of messages.
#[derive(Clone, Copy, Debug)]
pub struct DeliveryPacing {
    /// Pause between two consecutive recipients.
    pub delay: Duration,
    /// How long a single recipient may take.
    pub timeout: Duration,
}

impl Default for DeliveryPacing {
    fn default() -> Self {
        DeliveryPacing {
            delay: Duration::from_millis(100),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<ParticipantId>,
    pub failed: Vec<ParticipantId>,
}

/// Delivers each message to its participant in turn. A failing or slow
/// recipient is logged and skipped, the rest of the batch still goes out.
pub async fn deliver_batch<I>(
    notifier: &dyn Notifier,
    messages: I,
    pacing: DeliveryPacing,
) -> DeliveryReport
where
    I: IntoIterator<Item = (Participant, String)>,
{
    let mut report = DeliveryReport::default();

    for (index, (participant, message)) in messages.into_iter().enumerate() {
        if index > 0 && !pacing.delay.is_zero() {
            tokio::time::sleep(pacing.delay).await;
        }

        let result = match tokio::time::timeout(
            pacing.timeout,
            notifier.notify(participant.handle, &message),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout {
                recipient: participant.handle,
            }),
        };

        match result {
            Ok(()) => {
                debug!("Delivered a message to {}", participant.handle);
                report.delivered.push(participant.id);
            }
            Err(err) => {
                warn!("Skipping participant {:?}: {err}", participant.id);
                report.failed.push(participant.id);
            }
        }
    }

    report
}

#[cfg(test)]
pub mod testing {
    use std::{collections::HashSet, sync::Mutex};

    use async_trait::async_trait;
    use poise::serenity_prelude::UserId;

    use super::{Notifier, NotifyError};

    /// Records every delivered message and fails for the configured recipients.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<(UserId, String)>>,
        pub unreachable: HashSet<UserId>,
        pub stalled: HashSet<UserId>,
    }

    impl RecordingNotifier {
        pub fn sent(&self) -> Vec<(UserId, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, recipient: UserId, message: &str) -> Result<(), NotifyError> {
            if self.stalled.contains(&recipient) {
                std::future::pending::<()>().await;
            }
            if self.unreachable.contains(&recipient) {
                return Err(NotifyError::DeliveryFailure {
                    recipient,
                    reason: "Cannot send messages to this user".to_string(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient, message.to_string()));
            Ok(())
        }
    }
}
