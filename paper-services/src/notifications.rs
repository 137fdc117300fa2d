//! Notification hub
//!
//! Fan-out of price ticks, trade confirmations, and alert triggers to
//! connected WebSocket clients. Clients register for an id, subscribe to
//! keys, and filter the shared broadcast stream by their own subscriptions.

use dashmap::DashMap;
use paper_core::{ServerMessage, SubscriptionKey};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Unique identifier for a connected client
pub type ClientId = u64;

/// Capacity of the shared broadcast channel
const BROADCAST_CAPACITY: usize = 1024;

/// A message published to subscribers of a key
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    /// Which subscription this message belongs to
    pub key: SubscriptionKey,
    /// The message to deliver
    pub message: ServerMessage,
}

/// Tracks client subscriptions and fans messages out to them
pub struct NotificationHub {
    /// Next client id to hand out
    next_client_id: AtomicU64,
    /// Key -> clients subscribed to it
    subscriptions: DashMap<SubscriptionKey, HashSet<ClientId>>,
    /// Client -> keys it is subscribed to (for cleanup on disconnect)
    client_subscriptions: DashMap<ClientId, HashSet<SubscriptionKey>>,
    /// Shared broadcast channel; receivers filter by subscription
    sender: broadcast::Sender<BroadcastMessage>,
}

impl NotificationHub {
    /// Create a new hub
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            next_client_id: AtomicU64::new(1),
            subscriptions: DashMap::new(),
            client_subscriptions: DashMap::new(),
            sender,
        }
    }

    /// Register a new client and return its id
    pub fn register_client(&self) -> ClientId {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        self.client_subscriptions.insert(id, HashSet::new());
        debug!("Registered notification client {}", id);
        id
    }

    /// Get a receiver for the shared broadcast stream
    pub fn receiver(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.sender.subscribe()
    }

    /// Subscribe a client to a key
    pub fn subscribe(&self, client_id: ClientId, key: SubscriptionKey) {
        self.subscriptions
            .entry(key.clone())
            .or_default()
            .insert(client_id);
        self.client_subscriptions
            .entry(client_id)
            .or_default()
            .insert(key);
    }

    /// Unsubscribe a client from a key
    pub fn unsubscribe(&self, client_id: ClientId, key: &SubscriptionKey) {
        if let Some(mut clients) = self.subscriptions.get_mut(key) {
            clients.remove(&client_id);
        }
        if let Some(mut keys) = self.client_subscriptions.get_mut(&client_id) {
            keys.remove(key);
        }
    }

    /// Remove a client and all of its subscriptions
    pub fn remove_client(&self, client_id: ClientId) {
        if let Some((_, keys)) = self.client_subscriptions.remove(&client_id) {
            for key in keys {
                if let Some(mut clients) = self.subscriptions.get_mut(&key) {
                    clients.remove(&client_id);
                }
            }
        }
        debug!("Removed notification client {}", client_id);
    }

    /// Whether a client is subscribed to a key
    pub fn is_subscribed(&self, client_id: ClientId, key: &SubscriptionKey) -> bool {
        self.subscriptions
            .get(key)
            .map(|clients| clients.contains(&client_id))
            .unwrap_or(false)
    }

    /// Number of clients subscribed to a key
    pub fn subscriber_count(&self, key: &SubscriptionKey) -> usize {
        self.subscriptions
            .get(key)
            .map(|clients| clients.len())
            .unwrap_or(0)
    }

    /// Publish a message to subscribers of a key
    ///
    /// A send error only means no receiver is currently connected, which is
    /// fine; the message is simply dropped.
    pub fn publish(&self, key: SubscriptionKey, message: ServerMessage) {
        let _ = self.sender.send(BroadcastMessage { key, message });
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationHub")
            .field("subscriptions", &self.subscriptions.len())
            .field("clients", &self.client_subscriptions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let hub = NotificationHub::new();
        let client = hub.register_client();
        let key = SubscriptionKey::ticker("BTC");

        hub.subscribe(client, key.clone());
        assert!(hub.is_subscribed(client, &key));
        assert_eq!(hub.subscriber_count(&key), 1);

        hub.unsubscribe(client, &key);
        assert!(!hub.is_subscribed(client, &key));
        assert_eq!(hub.subscriber_count(&key), 0);
    }

    #[test]
    fn test_remove_client_clears_subscriptions() {
        let hub = NotificationHub::new();
        let client = hub.register_client();

        hub.subscribe(client, SubscriptionKey::ticker("BTC"));
        hub.subscribe(client, SubscriptionKey::trades("acct-1"));

        hub.remove_client(client);
        assert!(!hub.is_subscribed(client, &SubscriptionKey::ticker("BTC")));
        assert!(!hub.is_subscribed(client, &SubscriptionKey::trades("acct-1")));
    }

    #[tokio::test]
    async fn test_publish_reaches_receiver() {
        let hub = NotificationHub::new();
        let mut rx = hub.receiver();

        hub.publish(
            SubscriptionKey::ticker("BTC"),
            ServerMessage::Pong {
                client_timestamp: 1,
                server_timestamp: 2,
            },
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.key, SubscriptionKey::ticker("BTC"));
    }

    #[test]
    fn test_distinct_client_ids() {
        let hub = NotificationHub::new();
        let a = hub.register_client();
        let b = hub.register_client();
        assert_ne!(a, b);
    }
}
