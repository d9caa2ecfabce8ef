//! Latest-snapshot store and the push channel to live subscribers.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::Snapshot;

const CHANNEL_CAPACITY: usize = 64;

/// Messages sent to push subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    CheckingStarted,
    StatusUpdate(Arc<Snapshot>),
    InitialStatus(Arc<Snapshot>),
}

impl PushMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Holds the snapshot of the last completed cycle
#[derive(Debug)]
pub struct StatusStore {
    current: RwLock<Arc<Snapshot>>,
}

impl StatusStore {
    pub fn new(initial: Snapshot) -> Self {
        Self { current: RwLock::new(Arc::new(initial)) }
    }

    pub fn get(&self) -> Arc<Snapshot> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, snapshot: Arc<Snapshot>) {
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

/// Fan-out of cycle events, slow subscribers drop the oldest messages
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<PushMessage>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, message: PushMessage) {
        // Ignore errors if there are no receivers
        let _ = self.tx.send(message);
    }

    pub fn checking_started(&self) {
        debug!(subscribers = self.tx.receiver_count(), "Publishing checking_started");
        self.publish(PushMessage::CheckingStarted);
    }

    pub fn status_update(&self, snapshot: Arc<Snapshot>) {
        debug!(
            subscribers = self.tx.receiver_count(),
            cycle = snapshot.cycle,
            "Publishing status_update"
        );
        self.publish(PushMessage::StatusUpdate(snapshot));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Register a new subscriber. The receiver exists before the store is
    /// read, so no update published afterwards can be missed.
    pub fn subscribe(&self, store: &StatusStore) -> Subscription {
        let rx = self.tx.subscribe();
        let initial = PushMessage::InitialStatus(store.get());
        Subscription { initial: Some(initial), rx }
    }
}

/// One subscriber's view of the channel, starting with `initial_status`
#[derive(Debug)]
pub struct Subscription {
    initial: Option<PushMessage>,
    rx: broadcast::Receiver<PushMessage>,
}

impl Subscription {
    /// Next message, `None` once the broadcaster is gone
    pub async fn recv(&mut self) -> Option<PushMessage> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Push subscriber lagging, dropped oldest messages");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Device;

    #[test]
    fn test_messages_are_tagged() {
        let json = PushMessage::CheckingStarted.to_json().unwrap();
        assert_eq!(json, r#"{"type":"checking_started"}"#);

        let snapshot = Arc::new(Snapshot::pending(&[Device::new("cam", vec![])]));
        let value: serde_json::Value =
            serde_json::from_str(&PushMessage::StatusUpdate(snapshot).to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "status_update");
        assert_eq!(value["devices"][0]["name"], "cam");
        assert_eq!(value["total_devices"], 1);
    }

    #[tokio::test]
    async fn test_subscriber_gets_initial_then_updates() {
        let store = StatusStore::new(Snapshot::pending(&[Device::new("cam", vec![])]));
        let broadcaster = Broadcaster::new();

        let mut subscription = broadcaster.subscribe(&store);
        broadcaster.checking_started();

        match subscription.recv().await {
            Some(PushMessage::InitialStatus(snapshot)) => assert_eq!(snapshot.total_devices, 1),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(subscription.recv().await, Some(PushMessage::CheckingStarted)));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_going() {
        let store = StatusStore::new(Snapshot::default());
        let broadcaster = Broadcaster::new();
        let mut subscription = broadcaster.subscribe(&store);

        for cycle in 0..(CHANNEL_CAPACITY as u64 + 10) {
            broadcaster.status_update(Arc::new(Snapshot { cycle, ..Snapshot::default() }));
        }

        assert!(matches!(subscription.recv().await, Some(PushMessage::InitialStatus(_))));
        match subscription.recv().await {
            Some(PushMessage::StatusUpdate(snapshot)) => assert_eq!(snapshot.cycle, 10),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_closed_channel_ends_subscription() {
        let store = StatusStore::new(Snapshot::default());
        let broadcaster = Broadcaster::new();
        let mut subscription = broadcaster.subscribe(&store);
        drop(broadcaster);

        assert!(subscription.recv().await.is_some());
        assert!(subscription.recv().await.is_none());
    }
}
