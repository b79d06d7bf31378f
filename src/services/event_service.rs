use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    dao::models::{NewMatchRecord, UserEntity},
    dto::ws::{
        ChatMessagePayload, Envelope, GameEndPayload, JoinLobbyPayload, TypingUpdatePayload,
    },
    services::relay_service,
    state::SharedState,
};

/// Route one inbound text frame to the handler matching its event type.
///
/// Every failure mode is local to the offending event: malformed frames and
/// payloads are logged and dropped, and no handler error reaches the session
/// that sent the frame.
pub async fn dispatch(state: &SharedState, raw: &str) {
    let envelope = match Envelope::from_json_str(raw) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "dropping malformed event");
            return;
        }
    };

    let kind = envelope.kind_name();
    match envelope {
        Envelope::JoinLobby(payload) => handle_join_lobby(state, payload).await,
        Envelope::TypingUpdate(payload) => handle_typing_update(state, payload).await,
        Envelope::ChatMessage(payload) => handle_chat_message(state, payload).await,
        Envelope::GameEnd(payload) => handle_game_end(state, payload).await,
        Envelope::LeaveLobby(_) | Envelope::GameStart(_) | Envelope::Error(_) => {
            debug!(kind, "event type has no handler");
        }
        Envelope::Unknown => {
            warn!("ignoring unknown event type");
        }
    }
}

async fn handle_join_lobby(state: &SharedState, payload: Value) {
    let join: JoinLobbyPayload = match serde_json::from_value(payload) {
        Ok(join) => join,
        Err(err) => {
            warn!(error = %err, "invalid join_lobby payload");
            return;
        }
    };

    info!(user_id = %join.user_id, room_id = %join.room_id, "user joined lobby");

    if join.user_id.is_empty() {
        return;
    }

    let username = join
        .username
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| default_guest_name(&join.user_id));

    let Some(store) = state.match_store().await else {
        warn!(user_id = %join.user_id, "guest upsert skipped; storage degraded");
        return;
    };

    let user = UserEntity {
        id: join.user_id.clone(),
        username,
        is_guest: true,
    };
    match timeout(state.config().storage_timeout(), store.create_guest(user)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(user_id = %join.user_id, error = %err, "failed to upsert guest user"),
        Err(_) => warn!(user_id = %join.user_id, "guest upsert timed out"),
    }
}

async fn handle_typing_update(state: &SharedState, payload: Value) {
    let update: TypingUpdatePayload = match serde_json::from_value(payload.clone()) {
        Ok(update) => update,
        Err(err) => {
            warn!(error = %err, "invalid typing_update payload");
            return;
        }
    };
    if let Err(err) = update.validate() {
        warn!(user_id = %update.user_id, error = %err, "rejecting typing_update");
        return;
    }

    debug!(
        user_id = %update.user_id,
        wpm = update.wpm,
        progress = update.progress,
        "typing update"
    );
    relay_service::publish(state, Envelope::TypingUpdate(payload)).await;
}

async fn handle_chat_message(state: &SharedState, payload: Value) {
    let chat: ChatMessagePayload = match serde_json::from_value(payload.clone()) {
        Ok(chat) => chat,
        Err(err) => {
            warn!(error = %err, "invalid chat_message payload");
            return;
        }
    };
    if let Err(err) = chat.validate() {
        warn!(user_id = %chat.user_id, error = %err, "rejecting chat_message");
        return;
    }

    debug!(user_id = %chat.user_id, room_id = %chat.room_id, "chat message");
    relay_service::publish(state, Envelope::ChatMessage(payload)).await;
}

async fn handle_game_end(state: &SharedState, payload: Value) {
    let end: GameEndPayload = match serde_json::from_value(payload) {
        Ok(end) => end,
        Err(err) => {
            warn!(error = %err, "invalid game_end payload");
            return;
        }
    };

    let Some(store) = state.match_store().await else {
        warn!(user_id = %end.user_id, "match result not persisted; storage degraded");
        return;
    };

    let record = NewMatchRecord {
        user_id: end.user_id.clone(),
        wpm: end.wpm,
        raw_wpm: end.raw_wpm,
        accuracy: end.accuracy,
        consistency: end.consistency,
        error_count: end.error_count,
        mode: end.mode.clone(),
        language: end.language.clone(),
        duration_seconds: end.duration,
        bad_keys: end.bad_keys_or_default(),
        improvement_needed: end.improvement_needed.clone(),
    };

    let deadline = state.config().storage_timeout();
    let saved = match timeout(deadline, store.create_match(record)).await {
        Ok(Ok(saved)) => saved,
        Ok(Err(err)) => {
            warn!(user_id = %end.user_id, error = %err, "failed to save match result");
            return;
        }
        Err(_) => {
            warn!(user_id = %end.user_id, "match insert timed out");
            return;
        }
    };
    info!(id = %saved.id, user_id = %saved.user_id, wpm = saved.wpm, "match saved");

    let username = match timeout(deadline, store.find_username(end.user_id.clone())).await {
        Ok(Ok(Some(username))) if !username.is_empty() => username,
        Ok(Ok(_)) => {
            debug!(user_id = %end.user_id, "no username on file; leaderboard unchanged");
            return;
        }
        Ok(Err(err)) => {
            warn!(user_id = %end.user_id, error = %err, "username lookup failed; leaderboard unchanged");
            return;
        }
        Err(_) => {
            warn!(user_id = %end.user_id, "username lookup timed out; leaderboard unchanged");
            return;
        }
    };

    state
        .leaderboard()
        .update_score(&username, &end.user_id, end.wpm)
        .await;
    info!(username = %username, wpm = end.wpm, "leaderboard updated");
}

/// Fallback display name derived from the user id.
fn default_guest_name(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(8).collect();
    format!("Guest_{prefix}")
}
