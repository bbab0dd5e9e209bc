use crate::cache::{CacheError, MessageCache};
use crate::notifier::{Notifier, NotifyError};

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Notification failed: {0}")]
    Notify(#[from] NotifyError),
}

/// What a run did with the single cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing to report; the slot now holds the empty string.
    Cleared,
    /// Same message as last time; nothing written, nothing sent.
    Suppressed,
    /// New message written to the slot and handed to the notifier.
    Sent,
}

pub struct ChangeDetector<'a> {
    cache: &'a mut dyn MessageCache,
    notifier: &'a dyn Notifier,
    key: &'a str,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(cache: &'a mut dyn MessageCache, notifier: &'a dyn Notifier, key: &'a str) -> Self {
        Self {
            cache,
            notifier,
            key,
        }
    }

    /// The cache is written before the notifier is called, so a failed send is
    /// not retried by the next run.
    pub async fn process(&mut self, message: Option<String>) -> Result<Outcome, DetectorError> {
        let Some(message) = message else {
            log::info!("No message to send");
            self.cache.set(self.key, "").await?;
            return Ok(Outcome::Cleared);
        };

        let last_message = self.cache.get(self.key).await?;
        if last_message.as_deref() == Some(message.as_str()) {
            log::info!("Message is the same as last time, skipping");
            return Ok(Outcome::Suppressed);
        }

        log::info!("Sending message:\n{}", message);
        self.cache.set(self.key, &message).await?;
        self.notifier.send(&message).await?;

        Ok(Outcome::Sent)
    }
}
