use tokio::time::timeout;
use tracing::debug;

use crate::{dto::history::MatchHistoryEntry, error::ServiceError, state::SharedState};

/// Serialized match history for `user_id`, newest first, capped at the
/// configured page limit.
///
/// Fresh results are cached per user for the configured TTL; a cache hit
/// returns the stored blob verbatim without touching the store.
pub async fn match_history(state: &SharedState, user_id: &str) -> Result<String, ServiceError> {
    if user_id.is_empty() {
        return Err(ServiceError::InvalidInput("user_id is required".into()));
    }

    if let Some(blob) = state.leaderboard().cached_history(user_id) {
        debug!(user_id = %user_id, "match history served from cache");
        return Ok(blob);
    }

    let store = state.require_match_store().await?;
    let records = timeout(
        state.config().storage_timeout(),
        store.matches_by_user(user_id.to_owned(), state.config().history_page_limit),
    )
    .await
    .map_err(|_| ServiceError::Timeout)??;

    let entries: Vec<MatchHistoryEntry> = records.into_iter().map(Into::into).collect();
    let blob = serde_json::to_string(&entries)
        .map_err(|err| ServiceError::Internal(format!("failed to encode history: {err}")))?;

    state.leaderboard().cache_history(user_id, blob.clone());
    Ok(blob)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::{
        bus::LocalBus,
        config::AppConfig,
        dao::{
            match_store::{MatchStore, memory::MemoryMatchStore},
            models::NewMatchRecord,
        },
        state::AppState,
    };

    fn record(user_id: &str, wpm: u32) -> NewMatchRecord {
        NewMatchRecord {
            user_id: user_id.to_owned(),
            wpm,
            raw_wpm: wpm + 5,
            accuracy: 96.0,
            consistency: 80.0,
            error_count: 3,
            mode: "time".to_owned(),
            language: "english".to_owned(),
            duration_seconds: 60,
            bad_keys: json!({}),
            improvement_needed: String::new(),
        }
    }

    async fn seeded_state() -> (SharedState, Arc<MemoryMatchStore>) {
        let config = AppConfig::default();
        let bus = Arc::new(LocalBus::new(config.bus_channel_capacity));
        let state = AppState::new(config, bus);
        let store = Arc::new(MemoryMatchStore::new());
        state.install_match_store(store.clone()).await;
        (state, store)
    }

    #[tokio::test]
    async fn empty_user_id_is_rejected() {
        let (state, _store) = seeded_state().await;
        let err = match_history(&state, "").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_cached() {
        let (state, store) = seeded_state().await;
        store.create_match(record("u1", 60)).await.unwrap();
        store.create_match(record("u1", 75)).await.unwrap();

        let blob = match_history(&state, "u1").await.unwrap();
        let entries: Vec<serde_json::Value> = serde_json::from_str(&blob).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["wpm"], 75);
        assert_eq!(entries[1]["wpm"], 60);

        // A match saved after caching stays invisible until the TTL expires.
        store.create_match(record("u1", 90)).await.unwrap();
        assert_eq!(match_history(&state, "u1").await.unwrap(), blob);
    }

    #[tokio::test]
    async fn unknown_user_gets_an_empty_list() {
        let (state, _store) = seeded_state().await;
        assert_eq!(match_history(&state, "nobody").await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn degraded_storage_refuses_uncached_lookups() {
        let (state, store) = seeded_state().await;
        store.create_match(record("u1", 60)).await.unwrap();
        let cached = match_history(&state, "u1").await.unwrap();

        state.clear_match_store().await;

        // Cached user still works; an uncached one surfaces the degradation.
        assert_eq!(match_history(&state, "u1").await.unwrap(), cached);
        let err = match_history(&state, "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }
}
