use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

/// Handle identifying one registered channel, returned by `register` and
/// required by `unregister`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(u64);

/// Live push channel: the sending half of an unbounded queue whose receiver
/// is drained by the websocket task for one connection.
pub type PushChannel = mpsc::UnboundedSender<serde_json::Value>;

/// Tracks which recipients currently hold open push channels.
///
/// State is process-local and rebuilt from zero on restart. All structural
/// mutation happens under a single guard; `broadcast` snapshots the
/// recipient's channel set under the guard and sends outside it, so a slow
/// or failing send never blocks unrelated register/unregister calls.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, HashMap<ChannelId, PushChannel>>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    pub fn register(&self, citizen_id: &str, channel: PushChannel) -> ChannelId {
        let id = ChannelId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut connections = self.connections.lock().expect("registry mutex poisoned");
        connections
            .entry(citizen_id.to_string())
            .or_default()
            .insert(id, channel);
        id
    }

    pub fn unregister(&self, citizen_id: &str, id: ChannelId) {
        let mut connections = self.connections.lock().expect("registry mutex poisoned");
        if let Some(channels) = connections.get_mut(citizen_id) {
            channels.remove(&id);
            if channels.is_empty() {
                connections.remove(citizen_id);
            }
        }
    }

    /// Sends `message` to every channel the recipient holds; channels whose
    /// send fails are removed afterward. Returns the delivered count.
    pub fn broadcast(&self, citizen_id: &str, message: &serde_json::Value) -> usize {
        let snapshot: Vec<(ChannelId, PushChannel)> = {
            let connections = self.connections.lock().expect("registry mutex poisoned");
            connections
                .get(citizen_id)
                .map(|channels| {
                    channels
                        .iter()
                        .map(|(id, channel)| (*id, channel.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, channel) in snapshot {
            if channel.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            let mut connections = self.connections.lock().expect("registry mutex poisoned");
            if let Some(channels) = connections.get_mut(citizen_id) {
                for id in dead {
                    channels.remove(&id);
                }
                if channels.is_empty() {
                    connections.remove(citizen_id);
                }
            }
        }

        delivered
    }

    pub fn channel_count(&self, citizen_id: &str) -> usize {
        let connections = self.connections.lock().expect("registry mutex poisoned");
        connections
            .get(citizen_id)
            .map(|channels| channels.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn broadcast_reaches_every_channel_of_the_recipient() {
        let registry = ConnectionRegistry::default();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let (other_tx, mut other_rx) = mpsc::unbounded_channel();
        registry.register("CIT00001", tx1);
        registry.register("CIT00001", tx2);
        registry.register("CIT00002", other_tx);

        let delivered = registry.broadcast("CIT00001", &json!({"kind": "notification"}));
        assert_eq!(delivered, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn dead_channels_are_pruned_after_a_failed_send() {
        let registry = ConnectionRegistry::default();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        registry.register("CIT00001", tx1);
        registry.register("CIT00001", tx2);
        drop(rx1);

        let delivered = registry.broadcast("CIT00001", &json!({"kind": "notification"}));
        assert_eq!(delivered, 1);
        assert_eq!(registry.channel_count("CIT00001"), 1);
    }

    #[tokio::test]
    async fn unregister_drops_the_recipient_entry_when_empty() {
        let registry = ConnectionRegistry::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register("CIT00001", tx);
        assert_eq!(registry.channel_count("CIT00001"), 1);
        registry.unregister("CIT00001", id);
        assert_eq!(registry.channel_count("CIT00001"), 0);
        assert_eq!(registry.broadcast("CIT00001", &json!({})), 0);
    }
}
