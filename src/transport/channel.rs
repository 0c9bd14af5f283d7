//! In-process notification hub.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::mpsc;

use super::{Notification, Subscription, Transport, TransportError};

type Subscribers = FxHashMap<String, Vec<(u64, mpsc::UnboundedSender<Notification>)>>;

/// Routes broadcast notifications to every subscriber of the identifier.
///
/// Cloning shares the hub.
#[derive(Clone, Default)]
pub struct ChannelTransport {
    subscribers: Arc<Mutex<Subscribers>>,
    next_id: Arc<AtomicU64>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `notification` to its identifier's subscribers.
    ///
    /// Returns how many subscribers received it.
    pub fn broadcast(&self, notification: Notification) -> usize {
        let mut subscribers = self.subscribers.lock();
        let Some(list) = subscribers.get_mut(&notification.identifier) else {
            crate::debug!("channel"; "no subscriber for {}", notification.identifier);
            return 0;
        };
        list.retain(|(_, tx)| tx.send(notification.clone()).is_ok());
        list.len()
    }

    pub fn subscriber_count(&self, identifier: &str) -> usize {
        self.subscribers
            .lock()
            .get(identifier)
            .map_or(0, |list| list.len())
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn subscribe(&self, channel: &str, identifier: &str) -> Result<Subscription, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .entry(identifier.to_string())
            .or_default()
            .push((id, tx));
        crate::debug!("channel"; "subscribed {} to {}", identifier, channel);

        let subscribers = Arc::clone(&self.subscribers);
        let identifier = identifier.to_string();
        Ok(Subscription::new(rx, move || {
            let mut subscribers = subscribers.lock();
            if let Some(list) = subscribers.get_mut(&identifier) {
                list.retain(|(sid, _)| *sid != id);
                if list.is_empty() {
                    subscribers.remove(&identifier);
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::STREAM_CHANNEL;

    #[tokio::test]
    async fn test_broadcast_reaches_matching_subscribers() {
        let hub = ChannelTransport::new();
        let mut a1 = hub.subscribe(STREAM_CHANNEL, "a").await.unwrap();
        let mut a2 = hub.subscribe(STREAM_CHANNEL, "a").await.unwrap();
        let _b = hub.subscribe(STREAM_CHANNEL, "b").await.unwrap();

        assert_eq!(hub.broadcast(Notification::new("a")), 2);
        assert_eq!(a1.recv().await, Some(Notification::new("a")));
        assert_eq!(a2.recv().await, Some(Notification::new("a")));
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let hub = ChannelTransport::new();
        let sub = hub.subscribe(STREAM_CHANNEL, "a").await.unwrap();
        assert_eq!(hub.subscriber_count("a"), 1);

        drop(sub);
        assert_eq!(hub.subscriber_count("a"), 0);
        assert_eq!(hub.broadcast(Notification::new("a")), 0);
    }
}
