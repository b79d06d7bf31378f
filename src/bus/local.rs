use dashmap::DashMap;
use futures::StreamExt;
use futures::future::BoxFuture;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tracing::warn;

use super::{BusResult, BusStream, MessageBus};

/// Single-process bus backed by one broadcast channel per topic.
///
/// This is the default transport for single-instance deployments and for
/// tests. Every subscription on a topic receives every publish, the
/// publisher's own subscription included.
pub struct LocalBus {
    topics: DashMap<String, broadcast::Sender<String>>,
    capacity: usize,
}

impl LocalBus {
    /// Create a bus whose per-topic channels hold `capacity` pending messages.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        self.topics
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl MessageBus for LocalBus {
    fn publish(&self, topic: String, payload: String) -> BoxFuture<'static, BusResult<()>> {
        let sender = self.sender(&topic);
        Box::pin(async move {
            // A send error only means nobody is subscribed right now.
            let _ = sender.send(payload);
            Ok(())
        })
    }

    fn subscribe(&self, topic: String) -> BoxFuture<'static, BusResult<BusStream>> {
        let receiver = self.sender(&topic).subscribe();
        Box::pin(async move {
            let stream = BroadcastStream::new(receiver).filter_map(|item| async move {
                match item {
                    Ok(payload) => Some(payload),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(skipped, "bus subscriber lagged; skipping missed messages");
                        None
                    }
                }
            });
            Ok(Box::pin(stream) as BusStream)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;

    #[tokio::test]
    async fn publisher_receives_its_own_publish() {
        let bus = LocalBus::new(8);
        let mut stream = bus.subscribe("race".to_owned()).await.unwrap();

        bus.publish("race".to_owned(), "hello".to_owned())
            .await
            .unwrap();

        assert_eq!(stream.next().await, Some("hello".to_owned()));
    }

    #[tokio::test]
    async fn every_subscription_sees_every_publish_in_order() {
        let bus = LocalBus::new(8);
        let mut first = bus.subscribe("race".to_owned()).await.unwrap();
        let mut second = bus.subscribe("race".to_owned()).await.unwrap();

        for payload in ["one", "two"] {
            bus.publish("race".to_owned(), payload.to_owned())
                .await
                .unwrap();
        }

        for stream in [&mut first, &mut second] {
            assert_eq!(stream.next().await, Some("one".to_owned()));
            assert_eq!(stream.next().await, Some("two".to_owned()));
        }
    }

    #[tokio::test]
    async fn topics_do_not_leak_into_each_other() {
        let bus = LocalBus::new(8);
        let mut other = bus.subscribe("other".to_owned()).await.unwrap();

        bus.publish("race".to_owned(), "hello".to_owned())
            .await
            .unwrap();

        let unexpected = timeout(Duration::from_millis(50), other.next()).await;
        assert!(unexpected.is_err());
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let bus = LocalBus::new(8);
        assert!(
            bus.publish("race".to_owned(), "hello".to_owned())
                .await
                .is_ok()
        );
    }
}
