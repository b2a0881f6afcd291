//! In-process presence tracking for form edit sessions.
//!
//! Each form edit session lives on a channel keyed `poll-edit:<form_id>`.
//! The registry is authoritative: every membership change broadcasts a full
//! `sync` snapshot, with `join`/`leave` deltas alongside for telemetry.
//! Consumers must render from the latest snapshot, never by accumulating
//! deltas, since a late subscriber has no delta history.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

/// Channel key prefix for form edit sessions.
pub const CHANNEL_PREFIX: &str = "poll-edit:";

/// Build the channel key for a form's edit session.
#[must_use]
pub fn channel_key(form_id: &str) -> String {
    format!("{CHANNEL_PREFIX}{form_id}")
}

/// One live connection to a form's edit session.
#[derive(Debug, Clone, Serialize)]
pub struct PresenceEntry {
    pub user_id: String,
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

/// Presence events delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PresenceEvent {
    /// Full current membership, deduplicated by user. Authoritative.
    Sync { members: Vec<PresenceEntry> },
    /// A connection arrived. Telemetry only.
    Join { member: PresenceEntry },
    /// A connection left. Telemetry only.
    Leave { user_id: String },
}

struct Channel {
    /// Connections keyed by connection ID; one user may hold several.
    connections: HashMap<u64, PresenceEntry>,
    tx: broadcast::Sender<PresenceEvent>,
}

impl Channel {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            connections: HashMap::new(),
            tx,
        }
    }

    /// Membership deduplicated by user, earliest join wins.
    fn snapshot(&self) -> Vec<PresenceEntry> {
        let mut by_user: HashMap<&str, &PresenceEntry> = HashMap::new();
        for entry in self.connections.values() {
            by_user
                .entry(entry.user_id.as_str())
                .and_modify(|existing| {
                    if entry.joined_at < existing.joined_at {
                        *existing = entry;
                    }
                })
                .or_insert(entry);
        }
        let mut members: Vec<PresenceEntry> = by_user.values().map(|e| (*e).clone()).collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        members
    }
}

/// Registry of live edit-session connections, one channel per form.
pub struct PresenceRegistry {
    channels: RwLock<HashMap<String, Channel>>,
    next_connection_id: AtomicU64,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Join a form's edit session.
    ///
    /// Returns the connection ID (needed to leave) and a receiver that will
    /// see every subsequent event. The join itself is broadcast as a delta
    /// followed by a fresh snapshot; the caller also gets the snapshot back
    /// directly so it can render before any event arrives.
    pub async fn join(
        self: &Arc<Self>,
        form_id: &str,
        user_id: &str,
        username: &str,
    ) -> (u64, broadcast::Receiver<PresenceEvent>, Vec<PresenceEntry>) {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let entry = PresenceEntry {
            user_id: user_id.to_string(),
            username: username.to_string(),
            joined_at: Utc::now(),
        };

        let mut channels = self.channels.write().await;
        let channel = channels
            .entry(form_id.to_string())
            .or_insert_with(Channel::new);
        channel.connections.insert(connection_id, entry.clone());

        let snapshot = channel.snapshot();
        let _ = channel.tx.send(PresenceEvent::Join { member: entry });
        let _ = channel.tx.send(PresenceEvent::Sync {
            members: snapshot.clone(),
        });
        // Subscribe after broadcasting so the caller does not replay its own
        // join; it already holds the snapshot.
        let rx = channel.tx.subscribe();

        debug!(form_id, user_id, connection_id, "presence join");
        (connection_id, rx, snapshot)
    }

    /// Leave a form's edit session, broadcasting the departure immediately
    /// rather than waiting for transport timeout.
    pub async fn leave(&self, form_id: &str, connection_id: u64) {
        let mut channels = self.channels.write().await;
        let Some(channel) = channels.get_mut(form_id) else {
            return;
        };

        let Some(entry) = channel.connections.remove(&connection_id) else {
            return;
        };
        let snapshot = channel.snapshot();
        let _ = channel.tx.send(PresenceEvent::Leave {
            user_id: entry.user_id.clone(),
        });
        let _ = channel.tx.send(PresenceEvent::Sync { members: snapshot });

        debug!(form_id, user_id = %entry.user_id, connection_id, "presence leave");

        if channel.connections.is_empty() {
            channels.remove(form_id);
        }
    }

    /// Current membership of a form's edit session.
    pub async fn snapshot(&self, form_id: &str) -> Vec<PresenceEntry> {
        let channels = self.channels.read().await;
        channels.get(form_id).map(Channel::snapshot).unwrap_or_default()
    }

    /// Number of live connections across all forms.
    pub async fn connection_count(&self) -> usize {
        let channels = self.channels.read().await;
        channels.values().map(|c| c.connections.len()).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_then_leave_converges_to_empty() {
        let registry = Arc::new(PresenceRegistry::new());

        let (conn, _rx, snapshot) = registry.join("f1", "u1", "alice").await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].user_id, "u1");

        registry.leave("f1", conn).await;
        assert!(registry.snapshot("f1").await.is_empty());
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn second_joiner_sees_first_in_snapshot() {
        let registry = Arc::new(PresenceRegistry::new());

        let (_c1, _rx1, _) = registry.join("f1", "u1", "alice").await;
        let (_c2, _rx2, snapshot) = registry.join("f1", "u2", "bob").await;

        let ids: Vec<&str> = snapshot.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2"]);
    }

    #[tokio::test]
    async fn duplicate_connections_dedupe_by_user() {
        let registry = Arc::new(PresenceRegistry::new());

        let (c1, _rx1, _) = registry.join("f1", "u1", "alice").await;
        let (_c2, _rx2, snapshot) = registry.join("f1", "u1", "alice").await;
        assert_eq!(snapshot.len(), 1);

        // Dropping one tab keeps the user present through the other.
        registry.leave("f1", c1).await;
        let snapshot = registry.snapshot("f1").await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].user_id, "u1");
    }

    #[tokio::test]
    async fn join_broadcasts_delta_then_sync() {
        let registry = Arc::new(PresenceRegistry::new());

        let (_c1, mut rx, _) = registry.join("f1", "u1", "alice").await;
        let (_c2, _rx2, _) = registry.join("f1", "u2", "bob").await;

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, PresenceEvent::Join { ref member } if member.user_id == "u2"));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, PresenceEvent::Sync { ref members } if members.len() == 2));
    }

    #[tokio::test]
    async fn channels_are_isolated_per_form() {
        let registry = Arc::new(PresenceRegistry::new());

        let (_c1, _rx1, _) = registry.join("f1", "u1", "alice").await;
        let (_c2, _rx2, snapshot) = registry.join("f2", "u2", "bob").await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.snapshot("f1").await.len(), 1);
    }

    #[test]
    fn channel_key_format() {
        assert_eq!(channel_key("abc"), "poll-edit:abc");
    }
}
