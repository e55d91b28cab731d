//! Connection Hub
//!
//! Tracks live subscriber connections and their room memberships, and
//! delivers messages with per-connection failure isolation: one dead
//! subscriber never blocks or fails delivery to the others.
//!
//! Every connection owns a bounded outbound queue. `send` enqueues without
//! blocking; a failed enqueue (receiver gone, or a consumer so slow its
//! buffer filled) deregisters exactly that connection. Broadcasts iterate a
//! snapshot of the membership taken at call time, so concurrent
//! subscribe/unsubscribe cannot corrupt the iteration.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::envelope::{sensor_topic, site_topic, Envelope, TOPIC_ALERTS};

/// Outbound queue depth per connection
const OUTBOUND_BUFFER: usize = 64;

struct ConnectionEntry {
    user_id: Option<String>,
    topics: HashSet<String>,
    tx: mpsc::Sender<Envelope>,
    /// Unix timestamp of the last send or control message
    last_activity: AtomicI64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HubStats {
    pub active_connections: usize,
    pub active_rooms: usize,
    pub total_connections: u64,
    pub total_messages_sent: u64,
    pub rooms: HashMap<String, usize>,
}

#[derive(Default)]
pub struct ConnectionHub {
    connections: RwLock<HashMap<String, ConnectionEntry>>,
    rooms: RwLock<HashMap<String, HashSet<String>>>,
    total_connections: AtomicU64,
    total_messages_sent: AtomicU64,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and return its id plus the outbound queue
    /// the transport task drains.
    pub fn connect(
        &self,
        user_id: Option<String>,
        topics: &[String],
    ) -> (String, mpsc::Receiver<Envelope>) {
        let connection_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);

        self.connections.write().insert(
            connection_id.clone(),
            ConnectionEntry {
                user_id: user_id.clone(),
                topics: HashSet::new(),
                tx,
                last_activity: AtomicI64::new(Utc::now().timestamp()),
            },
        );
        self.total_connections.fetch_add(1, Ordering::Relaxed);

        self.subscribe(&connection_id, topics);

        tracing::info!(%connection_id, ?user_id, "connection registered");

        (connection_id, rx)
    }

    /// Remove a connection and leave every room it was in
    pub fn disconnect(&self, connection_id: &str) {
        let entry = self.connections.write().remove(connection_id);
        let Some(entry) = entry else {
            return;
        };

        let mut rooms = self.rooms.write();
        for topic in &entry.topics {
            let emptied = rooms
                .get_mut(topic)
                .map(|members| {
                    members.remove(connection_id);
                    members.is_empty()
                })
                .unwrap_or(false);
            if emptied {
                rooms.remove(topic);
            }
        }

        tracing::info!(connection_id, "connection removed");
    }

    /// Join rooms; rooms are created lazily on first subscriber
    pub fn subscribe(&self, connection_id: &str, topics: &[String]) {
        if topics.is_empty() {
            return;
        }
        let mut connections = self.connections.write();
        let Some(entry) = connections.get_mut(connection_id) else {
            return;
        };

        let mut rooms = self.rooms.write();
        for topic in topics {
            entry.topics.insert(topic.clone());
            rooms
                .entry(topic.clone())
                .or_default()
                .insert(connection_id.to_string());
        }
    }

    /// Leave rooms; empty rooms are dropped
    pub fn unsubscribe(&self, connection_id: &str, topics: &[String]) {
        let mut connections = self.connections.write();
        let Some(entry) = connections.get_mut(connection_id) else {
            return;
        };

        let mut rooms = self.rooms.write();
        for topic in topics {
            entry.topics.remove(topic);
            let emptied = rooms
                .get_mut(topic)
                .map(|members| {
                    members.remove(connection_id);
                    members.is_empty()
                })
                .unwrap_or(false);
            if emptied {
                rooms.remove(topic);
            }
        }
    }

    /// Refresh the activity timestamp (control message received)
    pub fn touch(&self, connection_id: &str) {
        if let Some(entry) = self.connections.read().get(connection_id) {
            entry
                .last_activity
                .store(Utc::now().timestamp(), Ordering::Relaxed);
        }
    }

    /// Deliver to one connection. A failed enqueue deregisters it.
    pub fn send(&self, connection_id: &str, message: Envelope) -> bool {
        let tx = {
            let connections = self.connections.read();
            let Some(entry) = connections.get(connection_id) else {
                return false;
            };
            entry
                .last_activity
                .store(Utc::now().timestamp(), Ordering::Relaxed);
            entry.tx.clone()
        };

        match tx.try_send(message) {
            Ok(()) => {
                self.total_messages_sent.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(err) => {
                tracing::debug!(connection_id, %err, "send failed, removing connection");
                self.disconnect(connection_id);
                false
            }
        }
    }

    /// Broadcast to a room over a snapshot of its membership.
    ///
    /// Returns the number of connections actually delivered to, not the
    /// number attempted.
    pub fn broadcast_to_room(
        &self,
        room: &str,
        message: &Envelope,
        exclude: Option<&HashSet<String>>,
    ) -> usize {
        let members: Vec<String> = match self.rooms.read().get(room) {
            Some(members) => members.iter().cloned().collect(),
            None => return 0,
        };

        let mut sent = 0;
        for connection_id in members {
            if exclude.is_some_and(|e| e.contains(&connection_id)) {
                continue;
            }
            if self.send(&connection_id, message.clone()) {
                sent += 1;
            }
        }
        sent
    }

    /// Broadcast to every connection
    pub fn broadcast_all(&self, message: &Envelope, exclude: Option<&HashSet<String>>) -> usize {
        let ids: Vec<String> = self.connections.read().keys().cloned().collect();

        let mut sent = 0;
        for connection_id in ids {
            if exclude.is_some_and(|e| e.contains(&connection_id)) {
                continue;
            }
            if self.send(&connection_id, message.clone()) {
                sent += 1;
            }
        }
        sent
    }

    // ========================================================================
    // PUBLISH HELPERS
    // ========================================================================

    /// New alert: site room + global alerts room
    pub fn publish_alert(&self, site_id: Uuid, alert: serde_json::Value) -> usize {
        let message = Envelope::new("alert")
            .with_event("new_alert")
            .with_data(alert);

        let sent = self.broadcast_to_room(&site_topic(site_id), &message, None)
            + self.broadcast_to_room(TOPIC_ALERTS, &message, None);

        tracing::debug!(%site_id, sent, "alert published");
        sent
    }

    /// Sensor reading: site room + per-sensor room
    pub fn publish_sensor_data(
        &self,
        sensor_uid: &str,
        site_id: Uuid,
        data: serde_json::Value,
    ) -> usize {
        let message = Envelope::new("sensor_data")
            .with_event("reading")
            .with_data(data);

        self.broadcast_to_room(&site_topic(site_id), &message, None)
            + self.broadcast_to_room(&sensor_topic(sensor_uid), &message, None)
    }

    /// Safety events go to everyone, flagged critical
    pub fn publish_safety_event(&self, event_type: &str, data: serde_json::Value) -> usize {
        let message = Envelope::new("safety")
            .with_event(event_type)
            .with_data(data)
            .with_priority("critical");

        self.broadcast_all(&message, None)
    }

    // ========================================================================
    // INTROSPECTION
    // ========================================================================

    pub fn is_user_online(&self, user_id: &str) -> bool {
        self.connections
            .read()
            .values()
            .any(|e| e.user_id.as_deref() == Some(user_id))
    }

    pub fn connection_topics(&self, connection_id: &str) -> Vec<String> {
        self.connections
            .read()
            .get(connection_id)
            .map(|e| e.topics.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> HubStats {
        let connections = self.connections.read();
        let rooms = self.rooms.read();

        HubStats {
            active_connections: connections.len(),
            active_rooms: rooms.len(),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            total_messages_sent: self.total_messages_sent.load(Ordering::Relaxed),
            rooms: rooms
                .iter()
                .map(|(name, members)| (name.clone(), members.len()))
                .collect(),
        }
    }
}
