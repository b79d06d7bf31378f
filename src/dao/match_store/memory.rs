use std::{collections::HashMap, sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::MatchStore;
use crate::dao::{
    models::{MatchRecordEntity, NewMatchRecord, UserEntity},
    storage::StorageResult,
};

/// Match store keeping every record in process memory.
///
/// Backs the test suite and deployments that run without a database; data does
/// not survive a restart.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    // Insertion order is chronological, so reverse iteration yields newest first.
    matches: Vec<MatchRecordEntity>,
    users: HashMap<String, String>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for MemoryMatchStore {
    fn create_match(
        &self,
        record: NewMatchRecord,
    ) -> BoxFuture<'static, StorageResult<MatchRecordEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let entity = MatchRecordEntity {
                id: Uuid::new_v4(),
                user_id: record.user_id,
                wpm: record.wpm,
                raw_wpm: record.raw_wpm,
                accuracy: record.accuracy,
                consistency: record.consistency,
                error_count: record.error_count,
                mode: record.mode,
                language: record.language,
                duration_seconds: record.duration_seconds,
                bad_keys: record.bad_keys,
                improvement_needed: record.improvement_needed,
                created_at: SystemTime::now(),
            };

            let mut state = inner.lock().await;
            state.matches.push(entity.clone());
            Ok(entity)
        })
    }

    fn matches_by_user(
        &self,
        user_id: String,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<MatchRecordEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let state = inner.lock().await;
            Ok(state
                .matches
                .iter()
                .rev()
                .filter(|record| record.user_id == user_id)
                .take(limit)
                .cloned()
                .collect())
        })
    }

    fn create_guest(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut state = inner.lock().await;
            state.users.entry(user.id).or_insert(user.username);
            Ok(())
        })
    }

    fn find_username(&self, user_id: String) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let state = inner.lock().await;
            Ok(state.users.get(&user_id).cloned())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(user_id: &str, wpm: u32) -> NewMatchRecord {
        NewMatchRecord {
            user_id: user_id.to_string(),
            wpm,
            raw_wpm: wpm + 5,
            accuracy: 95.0,
            consistency: 80.0,
            error_count: 3,
            mode: "time".into(),
            language: "english".into(),
            duration_seconds: 60,
            bad_keys: json!({}),
            improvement_needed: String::new(),
        }
    }

    #[tokio::test]
    async fn matches_come_back_newest_first_and_capped() {
        let store = MemoryMatchStore::new();
        for wpm in [40, 55, 70] {
            store.create_match(record("u1", wpm)).await.unwrap();
        }
        store.create_match(record("u2", 99)).await.unwrap();

        let matches = store.matches_by_user("u1".into(), 10).await.unwrap();
        assert_eq!(
            matches.iter().map(|m| m.wpm).collect::<Vec<_>>(),
            vec![70, 55, 40]
        );

        let capped = store.matches_by_user("u1".into(), 2).await.unwrap();
        assert_eq!(capped.len(), 2);
        assert_eq!(capped[0].wpm, 70);
    }

    #[tokio::test]
    async fn create_match_assigns_id_and_timestamp() {
        let store = MemoryMatchStore::new();
        let first = store.create_match(record("u1", 60)).await.unwrap();
        let second = store.create_match(record("u1", 62)).await.unwrap();
        assert_ne!(first.id, second.id);
        assert!(second.created_at >= first.created_at);
    }

    #[tokio::test]
    async fn guest_creation_keeps_existing_username() {
        let store = MemoryMatchStore::new();
        let user = UserEntity {
            id: "abc".into(),
            username: "alice".into(),
            is_guest: true,
        };
        store.create_guest(user).await.unwrap();
        store
            .create_guest(UserEntity {
                id: "abc".into(),
                username: "bob".into(),
                is_guest: true,
            })
            .await
            .unwrap();

        let name = store.find_username("abc".into()).await.unwrap();
        assert_eq!(name.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn unknown_user_has_no_username() {
        let store = MemoryMatchStore::new();
        assert_eq!(store.find_username("missing".into()).await.unwrap(), None);
    }
}
