//! Event publisher service.
//!
//! Provides an abstraction for publishing real-time events.
//! The actual implementation is provided by the realtime crate (Redis Pub/Sub).

use async_trait::async_trait;
use pollboard_common::AppResult;
use std::sync::Arc;

/// Trait for publishing real-time events.
///
/// This allows the core services to publish events
/// without directly depending on the realtime/pubsub implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an editor-joined event (successful invite redemption).
    async fn publish_editor_joined(
        &self,
        form_id: &str,
        user_id: &str,
        username: &str,
    ) -> AppResult<()>;

    /// Publish a form content/metadata update event.
    async fn publish_form_updated(&self, form_id: &str) -> AppResult<()>;

    /// Publish a results-reveal toggle event.
    async fn publish_results_revealed(&self, form_id: &str, revealed: bool) -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for testing or when real-time
/// events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_editor_joined(
        &self,
        _form_id: &str,
        _user_id: &str,
        _username: &str,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn publish_form_updated(&self, _form_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_results_revealed(&self, _form_id: &str, _revealed: bool) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `EventPublisher` trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;
