use futures::StreamExt;
use futures::future::BoxFuture;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::warn;

use super::{BusError, BusResult, BusStream, MessageBus};

/// Redis-backed bus for multi-instance deployments.
///
/// Publishes go through one shared multiplexed connection. Each subscription
/// opens a dedicated pub/sub connection, as the Redis protocol requires.
pub struct RedisBus {
    client: redis::Client,
    publisher: ConnectionManager,
}

impl RedisBus {
    /// Connect to the Redis node at `url` and verify it is reachable.
    pub async fn connect(url: &str) -> BusResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|err| BusError::unavailable("invalid redis url", Some(Box::new(err))))?;
        let publisher = client
            .get_connection_manager()
            .await
            .map_err(|err| BusError::unavailable("redis is unreachable", Some(Box::new(err))))?;

        Ok(Self { client, publisher })
    }
}

impl MessageBus for RedisBus {
    fn publish(&self, topic: String, payload: String) -> BoxFuture<'static, BusResult<()>> {
        let mut publisher = self.publisher.clone();
        Box::pin(async move {
            publisher
                .publish::<_, _, ()>(topic.as_str(), payload)
                .await
                .map_err(|err| {
                    BusError::unavailable(
                        format!("publish to {topic} failed"),
                        Some(Box::new(err)),
                    )
                })
        })
    }

    fn subscribe(&self, topic: String) -> BoxFuture<'static, BusResult<BusStream>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut pubsub = client.get_async_pubsub().await.map_err(|err| {
                BusError::unavailable("opening pub/sub connection failed", Some(Box::new(err)))
            })?;
            pubsub.subscribe(topic.as_str()).await.map_err(|err| {
                BusError::unavailable(format!("subscribe to {topic} failed"), Some(Box::new(err)))
            })?;

            let stream = pubsub.into_on_message().filter_map(|message| async move {
                match message.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(err) => {
                        warn!(error = %err, "discarding undecodable bus message");
                        None
                    }
                }
            });
            Ok(Box::pin(stream) as BusStream)
        })
    }
}
