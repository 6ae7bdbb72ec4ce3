//! Builds the result event and hands it to a [`Publisher`].

use std::time::Duration;

use tracing::{debug, error, info};

use httpcheck_core::{CheckConfig, Outcome, DEFAULT_TOPIC};

use crate::error::{PublishError, PublishResult};
use crate::event::ReportEvent;
use crate::publisher::{Delivery, Publisher};

/// How long to wait for delivery confirmation by default.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes one event per run to a fixed topic.
pub struct Reporter<P> {
    publisher: P,
    topic: String,
    drain_timeout: Duration,
}

impl<P: Publisher> Reporter<P> {
    pub fn new(publisher: P, topic: impl Into<String>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Reporter on the default `httpcheck` topic.
    pub fn with_default_topic(publisher: P) -> Self {
        Self::new(publisher, DEFAULT_TOPIC)
    }

    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Serialize the event and wait for the transport to confirm it.
    ///
    /// Blocks for at most the drain timeout. Any failure is returned as-is;
    /// the caller decides to abort.
    pub async fn publish(&self, config: &CheckConfig, outcome: &Outcome) -> PublishResult<Delivery> {
        let event = ReportEvent::new(config, outcome);
        let payload = event.to_json()?;
        debug!(
            topic = %self.topic,
            payload = %String::from_utf8_lossy(&payload),
            "publishing check result"
        );

        let send = self
            .publisher
            .publish(&self.topic, &payload, self.drain_timeout);
        let delivery = match tokio::time::timeout(self.drain_timeout, send).await {
            Ok(Ok(delivery)) => delivery,
            Ok(Err(e)) => {
                error!(topic = %self.topic, error = %e, "check result not delivered");
                return Err(e);
            }
            Err(_) => {
                error!(topic = %self.topic, timeout = ?self.drain_timeout, "delivery confirmation timed out");
                return Err(PublishError::Timeout(self.drain_timeout));
            }
        };

        info!(
            topic = %self.topic,
            partition = delivery.partition,
            offset = delivery.offset,
            "check result delivered"
        );
        Ok(delivery)
    }
}
