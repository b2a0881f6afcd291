//! Redis Pub/Sub for cross-instance event distribution.
//!
//! Form edits and reveal toggles made on one server instance must reach
//! editors connected to another, so every instance publishes to and
//! subscribes from shared Redis channels and re-broadcasts locally.

#![allow(missing_docs)]

use async_trait::async_trait;
use fred::clients::{Client, SubscriberClient};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use pollboard_common::AppResult;
use pollboard_core::services::EventPublisher;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Pub/Sub channel names.
pub mod channels {
    /// Form lifecycle and content events.
    pub const FORMS: &str = "pollboard:forms";
    /// Per-form edit-session events (suffix with form ID).
    pub const FORM_PREFIX: &str = "pollboard:form:";
}

/// Pub/Sub event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PubSubEvent {
    /// A user redeemed an invite and became an editor.
    EditorJoined {
        form_id: String,
        user_id: String,
        username: String,
    },
    /// Form metadata or structure changed.
    FormUpdated { form_id: String },
    /// Results were revealed or hidden again.
    ResultsRevealed { form_id: String, revealed: bool },
}

impl PubSubEvent {
    /// The form this event concerns.
    #[must_use]
    pub fn form_id(&self) -> &str {
        match self {
            Self::EditorJoined { form_id, .. }
            | Self::FormUpdated { form_id }
            | Self::ResultsRevealed { form_id, .. } => form_id,
        }
    }
}

/// Redis Pub/Sub manager for event distribution.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    /// Local broadcast channel for events received from Redis.
    local_tx: broadcast::Sender<PubSubEvent>,
}

impl RedisPubSub {
    /// Create a new Redis Pub/Sub manager.
    pub async fn new(redis_url: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await?;

        let (local_tx, _) = broadcast::channel(1000);

        info!("Redis Pub/Sub initialized");

        Ok(Self {
            publisher,
            subscriber,
            local_tx,
        })
    }

    /// Subscribe to the shared channels and start the relay loop.
    pub async fn start(&self) -> Result<(), RedisError> {
        self.subscriber.subscribe(channels::FORMS).await?;

        info!("Subscribed to Redis Pub/Sub channels");

        let local_tx = self.local_tx.clone();
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                if let Some(payload) = message.value.as_string() {
                    match serde_json::from_str::<PubSubEvent>(&payload) {
                        Ok(event) => {
                            debug!(?event, "Received Pub/Sub event");
                            if local_tx.send(event).is_err() {
                                debug!("No local subscribers for Pub/Sub event");
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse Pub/Sub message: {}", e);
                        }
                    }
                }
            }
            info!("Pub/Sub message stream ended");
        });

        Ok(())
    }

    /// Publish an event to a channel.
    pub async fn publish(&self, channel: &str, event: &PubSubEvent) -> Result<(), RedisError> {
        let payload = serde_json::to_string(event).map_err(|e| {
            RedisError::new(
                RedisErrorKind::InvalidArgument,
                format!("Serialization error: {e}"),
            )
        })?;
        let _: () = self.publisher.publish(channel, payload).await?;
        debug!(channel, ?event, "Published Pub/Sub event");
        Ok(())
    }

    /// Publish an event to the shared channel and the per-form channel.
    pub async fn publish_form_event(&self, event: &PubSubEvent) -> Result<(), RedisError> {
        self.publish(channels::FORMS, event).await?;
        let form_channel = format!("{}{}", channels::FORM_PREFIX, event.form_id());
        self.publish(&form_channel, event).await
    }

    /// Get a receiver for local broadcast events.
    #[must_use]
    pub fn subscribe_local(&self) -> broadcast::Receiver<PubSubEvent> {
        self.local_tx.subscribe()
    }

    /// Get the number of local subscribers.
    #[must_use]
    pub fn local_subscriber_count(&self) -> usize {
        self.local_tx.receiver_count()
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> Result<(), RedisError> {
        self.subscriber.quit().await?;
        self.publisher.quit().await?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }
}

/// Lets core services publish events without depending on this crate.
#[async_trait]
impl EventPublisher for RedisPubSub {
    async fn publish_editor_joined(
        &self,
        form_id: &str,
        user_id: &str,
        username: &str,
    ) -> AppResult<()> {
        let event = PubSubEvent::EditorJoined {
            form_id: form_id.to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
        };
        self.publish_form_event(&event)
            .await
            .map_err(|e| pollboard_common::AppError::Redis(e.to_string()))
    }

    async fn publish_form_updated(&self, form_id: &str) -> AppResult<()> {
        let event = PubSubEvent::FormUpdated {
            form_id: form_id.to_string(),
        };
        self.publish_form_event(&event)
            .await
            .map_err(|e| pollboard_common::AppError::Redis(e.to_string()))
    }

    async fn publish_results_revealed(&self, form_id: &str, revealed: bool) -> AppResult<()> {
        let event = PubSubEvent::ResultsRevealed {
            form_id: form_id.to_string(),
            revealed,
        };
        self.publish_form_event(&event)
            .await
            .map_err(|e| pollboard_common::AppError::Redis(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names() {
        assert_eq!(channels::FORMS, "pollboard:forms");
        assert_eq!(channels::FORM_PREFIX, "pollboard:form:");
    }

    #[test]
    fn test_pubsub_event_serialization() {
        let event = PubSubEvent::EditorJoined {
            form_id: "f1".to_string(),
            user_id: "u1".to_string(),
            username: "alice".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"editorJoined\""));
        assert!(json.contains("\"form_id\":\"f1\""));

        let parsed: PubSubEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(parsed, PubSubEvent::EditorJoined { .. }));
        assert_eq!(parsed.form_id(), "f1");
    }

    #[test]
    fn test_results_revealed_serialization() {
        let event = PubSubEvent::ResultsRevealed {
            form_id: "f1".to_string(),
            revealed: true,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"resultsRevealed\""));
        assert!(json.contains("\"revealed\":true"));
    }
}
