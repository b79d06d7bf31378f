use std::time::Duration;

use futures::StreamExt;
use tracing::{info, warn};

use crate::{dto::ws::Envelope, state::SharedState};

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Pump every message arriving on the shared topic into the local hub.
///
/// This subscription is the only path that delivers broadcasts locally; see
/// [`publish`]. Losing it means this instance stops seeing remote (and its
/// own) traffic, so the loop resubscribes with growing delay until the bus
/// answers again.
pub async fn run(state: SharedState) {
    let topic = state.config().relay_topic.clone();
    let mut delay = INITIAL_RETRY_DELAY;

    loop {
        match state.bus().subscribe(topic.clone()).await {
            Ok(mut stream) => {
                info!(topic = %topic, "relay subscribed");
                delay = INITIAL_RETRY_DELAY;

                while let Some(payload) = stream.next().await {
                    state.hub().broadcast(payload).await;
                }
                warn!(topic = %topic, "relay subscription ended");
            }
            Err(err) => {
                warn!(topic = %topic, error = %err, "relay subscription failed");
            }
        }

        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(MAX_RETRY_DELAY);
    }
}

/// Serialize `event` canonically and publish it to the shared topic.
///
/// The publishing instance receives the message back through its own
/// subscription, so local sessions are reached without a second fan-out path.
pub async fn publish(state: &SharedState, event: Envelope) {
    let payload = match event.to_json_string() {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize event for the bus");
            return;
        }
    };

    let topic = state.config().relay_topic.clone();
    if let Err(err) = state.bus().publish(topic, payload).await {
        warn!(error = %err, "failed to publish event to the bus");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::ws::Message;
    use futures::future::BoxFuture;
    use serde_json::json;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::{
        bus::{BusResult, BusStream, LocalBus, MessageBus},
        config::AppConfig,
        state::{AppState, SessionHandle, SharedState},
    };

    /// Wraps [`LocalBus`] to signal each subscribe call and optionally hand
    /// out a number of immediately-dead subscriptions first.
    struct TrackingBus {
        inner: LocalBus,
        subscribed: mpsc::UnboundedSender<()>,
        dead_subscriptions: AtomicUsize,
    }

    impl MessageBus for TrackingBus {
        fn publish(&self, topic: String, payload: String) -> BoxFuture<'static, BusResult<()>> {
            self.inner.publish(topic, payload)
        }

        fn subscribe(&self, topic: String) -> BoxFuture<'static, BusResult<BusStream>> {
            let _ = self.subscribed.send(());
            let is_dead = self
                .dead_subscriptions
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if is_dead {
                return Box::pin(async { Ok(Box::pin(futures::stream::empty()) as BusStream) });
            }
            self.inner.subscribe(topic)
        }
    }

    fn tracked_state(dead_subscriptions: usize) -> (SharedState, mpsc::UnboundedReceiver<()>) {
        let config = AppConfig::default();
        let (subscribed, subscriptions) = mpsc::unbounded_channel();
        let bus = Arc::new(TrackingBus {
            inner: LocalBus::new(config.bus_channel_capacity),
            subscribed,
            dead_subscriptions: AtomicUsize::new(dead_subscriptions),
        });
        (AppState::new(config, bus), subscriptions)
    }

    async fn attach_session(state: &SharedState) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(8);
        state
            .hub()
            .register(SessionHandle {
                id: Uuid::new_v4(),
                tx,
            })
            .await;
        rx
    }

    fn text_of(message: Message) -> String {
        match message {
            Message::Text(text) => text.to_string(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn published_events_reach_local_sessions_through_the_subscription() {
        let (state, mut subscriptions) = tracked_state(0);

        tokio::spawn(run(state.clone()));
        subscriptions.recv().await;

        let mut session_rx = attach_session(&state).await;
        publish(
            &state,
            Envelope::ChatMessage(json!({"user_id":"u1","room_id":"global","message":"hi"})),
        )
        .await;

        let frame = text_of(session_rx.recv().await.unwrap());
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["type"], "chat_message");
        assert_eq!(value["payload"]["message"], "hi");
    }

    #[tokio::test]
    async fn one_publish_reaches_sessions_on_every_instance_sharing_the_bus() {
        let config = AppConfig::default();
        let (subscribed, mut subscriptions) = mpsc::unbounded_channel();
        let bus = Arc::new(TrackingBus {
            inner: LocalBus::new(config.bus_channel_capacity),
            subscribed,
            dead_subscriptions: AtomicUsize::new(0),
        });
        let first = AppState::new(config.clone(), bus.clone());
        let second = AppState::new(config, bus);

        tokio::spawn(run(first.clone()));
        tokio::spawn(run(second.clone()));
        subscriptions.recv().await;
        subscriptions.recv().await;

        let mut first_rx = attach_session(&first).await;
        let mut second_rx = attach_session(&second).await;
        publish(
            &first,
            Envelope::TypingUpdate(
                json!({"user_id":"u1","room_id":"global","progress":40.0,"wpm":92.0}),
            ),
        )
        .await;

        for rx in [&mut first_rx, &mut second_rx] {
            let frame = text_of(rx.recv().await.unwrap());
            let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
            assert_eq!(value["type"], "typing_update");
            assert_eq!(value["payload"]["wpm"], 92.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn relay_resubscribes_after_losing_its_stream() {
        let (state, mut subscriptions) = tracked_state(1);

        tokio::spawn(run(state.clone()));
        // First subscription dies immediately; wait for the retry.
        subscriptions.recv().await;
        subscriptions.recv().await;

        let mut session_rx = attach_session(&state).await;
        publish(
            &state,
            Envelope::ChatMessage(json!({"user_id":"u1","room_id":"global","message":"back"})),
        )
        .await;

        let frame = text_of(session_rx.recv().await.unwrap());
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["payload"]["message"], "back");
    }
}
