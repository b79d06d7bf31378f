use std::collections::HashMap;

use axum::extract::ws::{Message, Utf8Bytes};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

/// Handle to one registered session: its identity plus the sending side of its
/// bounded outbound queue.
///
/// After registration the hub holds the only sender clone, so removing the
/// handle closes the queue and lets the session's writer loop wind down.
pub struct SessionHandle {
    pub id: Uuid,
    pub tx: mpsc::Sender<Message>,
}

enum HubCommand {
    Register(SessionHandle),
    Unregister(Uuid),
    Broadcast(Utf8Bytes),
    SessionCount(oneshot::Sender<usize>),
    Shutdown,
}

/// Coordinator owning the live-session set.
///
/// Registration, unregistration, and broadcast all travel through one command
/// channel and are applied one at a time by a single task, so the session set
/// needs no lock. `broadcast` enqueues without blocking; a session whose queue
/// is full is unregistered on the spot and its queue closed, keeping delivery
/// to healthy sessions prompt.
#[derive(Clone)]
pub struct SessionHub {
    commands: mpsc::Sender<HubCommand>,
}

impl SessionHub {
    /// Spawn the coordinating task and return a cloneable handle to it.
    pub fn new(command_capacity: usize) -> Self {
        let (commands, inbox) = mpsc::channel(command_capacity);
        tokio::spawn(run_hub(inbox));
        Self { commands }
    }

    /// Add a session to the live set.
    pub async fn register(&self, session: SessionHandle) {
        self.send(HubCommand::Register(session)).await;
    }

    /// Remove a session from the live set; a no-op if it is already gone.
    pub async fn unregister(&self, id: Uuid) {
        self.send(HubCommand::Unregister(id)).await;
    }

    /// Queue a text frame for delivery to every registered session.
    pub async fn broadcast(&self, message: String) {
        self.send(HubCommand::Broadcast(message.into())).await;
    }

    /// Number of currently registered sessions.
    ///
    /// Processed in command order, so a count requested after a broadcast
    /// observes that broadcast's effects.
    pub async fn session_count(&self) -> usize {
        let (reply, response) = oneshot::channel();
        self.send(HubCommand::SessionCount(reply)).await;
        response.await.unwrap_or(0)
    }

    /// Stop the coordinator and close every session queue.
    pub async fn shutdown(&self) {
        self.send(HubCommand::Shutdown).await;
    }

    async fn send(&self, command: HubCommand) {
        if self.commands.send(command).await.is_err() {
            warn!("session hub is no longer running");
        }
    }
}

async fn run_hub(mut inbox: mpsc::Receiver<HubCommand>) {
    let mut sessions: HashMap<Uuid, SessionHandle> = HashMap::new();

    while let Some(command) = inbox.recv().await {
        match command {
            HubCommand::Register(session) => {
                debug!(id = %session.id, "session registered");
                sessions.insert(session.id, session);
            }
            HubCommand::Unregister(id) => {
                if sessions.remove(&id).is_some() {
                    debug!(id = %id, "session unregistered");
                }
            }
            HubCommand::Broadcast(message) => {
                let mut stalled = Vec::new();
                for (id, session) in sessions.iter() {
                    match session.tx.try_send(Message::Text(message.clone())) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            warn!(id = %id, "outbound queue full; dropping session");
                            stalled.push(*id);
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!(id = %id, "outbound queue closed; dropping session");
                            stalled.push(*id);
                        }
                    }
                }
                for id in stalled {
                    sessions.remove(&id);
                }
            }
            HubCommand::SessionCount(reply) => {
                let _ = reply.send(sessions.len());
            }
            HubCommand::Shutdown => break,
        }
    }

    // Dropping the handles closes every outbound queue, which ends the
    // corresponding writer loops.
    debug!(open_sessions = sessions.len(), "session hub stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(capacity: usize) -> (SessionHandle, mpsc::Receiver<Message>, Uuid) {
        let (tx, rx) = mpsc::channel(capacity);
        let id = Uuid::new_v4();
        (SessionHandle { id, tx }, rx, id)
    }

    fn text_of(message: Message) -> String {
        match message {
            Message::Text(text) => text.to_string(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn live_set_is_registered_minus_unregistered() {
        let hub = SessionHub::new(16);
        let (first, _first_rx, first_id) = session(4);
        let (second, _second_rx, second_id) = session(4);

        hub.register(first).await;
        hub.register(second).await;
        assert_eq!(hub.session_count().await, 2);

        hub.unregister(first_id).await;
        assert_eq!(hub.session_count().await, 1);

        // Unregistering an absent session is a no-op.
        hub.unregister(first_id).await;
        assert_eq!(hub.session_count().await, 1);

        hub.unregister(second_id).await;
        assert_eq!(hub.session_count().await, 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_session_in_order() {
        let hub = SessionHub::new(16);
        let (first, mut first_rx, _) = session(4);
        let (second, mut second_rx, _) = session(4);
        hub.register(first).await;
        hub.register(second).await;

        hub.broadcast("one".into()).await;
        hub.broadcast("two".into()).await;
        // Rendezvous: both broadcasts have been processed once this resolves.
        assert_eq!(hub.session_count().await, 2);

        for rx in [&mut first_rx, &mut second_rx] {
            assert_eq!(text_of(rx.recv().await.unwrap()), "one");
            assert_eq!(text_of(rx.recv().await.unwrap()), "two");
        }
    }

    #[tokio::test]
    async fn full_queue_drops_only_the_lagging_session() {
        let hub = SessionHub::new(16);
        let (healthy, mut healthy_rx, _) = session(8);
        let (stalled, mut stalled_rx, _) = session(1);
        hub.register(healthy).await;
        hub.register(stalled).await;

        // First broadcast fills the stalled session's single-slot queue.
        hub.broadcast("one".into()).await;
        // Second broadcast overflows it; the hub must drop that session while
        // still delivering to the healthy one.
        hub.broadcast("two".into()).await;
        assert_eq!(hub.session_count().await, 1);

        assert_eq!(text_of(healthy_rx.recv().await.unwrap()), "one");
        assert_eq!(text_of(healthy_rx.recv().await.unwrap()), "two");

        // The stalled session keeps its backlog, then sees its queue close.
        assert_eq!(text_of(stalled_rx.recv().await.unwrap()), "one");
        assert!(stalled_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_queue_sessions_are_pruned_on_broadcast() {
        let hub = SessionHub::new(16);
        let (gone, gone_rx, _) = session(4);
        hub.register(gone).await;
        drop(gone_rx);

        hub.broadcast("hello".into()).await;
        assert_eq!(hub.session_count().await, 0);
    }

    #[tokio::test]
    async fn shutdown_closes_all_session_queues() {
        let hub = SessionHub::new(16);
        let (handle, mut rx, _) = session(4);
        hub.register(handle).await;

        hub.shutdown().await;
        assert!(rx.recv().await.is_none());
        // Queries against a stopped hub fall back to zero.
        assert_eq!(hub.session_count().await, 0);
    }
}
