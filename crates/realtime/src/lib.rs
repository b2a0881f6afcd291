//! Realtime layer: Redis Pub/Sub event distribution and in-process presence
//! tracking for collaborative form editing.

pub mod presence;
pub mod pubsub;

pub use presence::{PresenceEntry, PresenceEvent, PresenceRegistry};
pub use pubsub::{channels, PubSubEvent, RedisPubSub};
