use std::time::{Duration, Instant};

use dashmap::DashMap;
use indexmap::IndexMap;
use tokio::sync::RwLock;

struct CachedHistory {
    blob: String,
    stored_at: Instant,
}

/// In-process ranking cache plus a TTL-bounded per-user match-history cache.
///
/// Leaderboard members are composite `"username:user_id"` keys; writing a
/// member that already exists replaces its score. Entries keep their update
/// recency, which [`LeaderboardCache::top_players`] uses to break score ties
/// deterministically (most recently updated first).
pub struct LeaderboardCache {
    scores: RwLock<IndexMap<String, u32>>,
    history: DashMap<String, CachedHistory>,
    history_ttl: Duration,
}

impl LeaderboardCache {
    pub fn new(history_ttl: Duration) -> Self {
        Self {
            scores: RwLock::new(IndexMap::new()),
            history: DashMap::new(),
            history_ttl,
        }
    }

    /// Composite member key for one user under one display name.
    pub fn member_key(username: &str, user_id: &str) -> String {
        format!("{username}:{user_id}")
    }

    /// Upsert the score for `username:user_id`; last write wins for that key.
    pub async fn update_score(&self, username: &str, user_id: &str, wpm: u32) {
        let member = Self::member_key(username, user_id);
        let mut scores = self.scores.write().await;
        // Re-insert at the tail so the map's order doubles as update recency.
        scores.shift_remove(&member);
        scores.insert(member, wpm);
    }

    /// Up to `limit` members, highest score first; ties go to the member
    /// updated most recently.
    pub async fn top_players(&self, limit: usize) -> Vec<String> {
        let scores = self.scores.read().await;
        let mut ranked: Vec<(&String, &u32)> = scores.iter().rev().collect();
        ranked.sort_by(|a, b| b.1.cmp(a.1));
        ranked
            .into_iter()
            .take(limit)
            .map(|(member, _)| member.clone())
            .collect()
    }

    /// Store a serialized history blob for `user_id`, restarting its TTL.
    pub fn cache_history(&self, user_id: &str, blob: String) {
        self.history.insert(
            user_id.to_owned(),
            CachedHistory {
                blob,
                stored_at: Instant::now(),
            },
        );
    }

    /// Fetch the cached history blob for `user_id`.
    ///
    /// Returns `None` on a miss, absent or past its TTL. A cached empty list
    /// comes back as `Some("[]")`, so callers can tell the two apart.
    pub fn cached_history(&self, user_id: &str) -> Option<String> {
        match self.history.get(user_id) {
            None => return None,
            Some(entry) => {
                if entry.stored_at.elapsed() < self.history_ttl {
                    return Some(entry.blob.clone());
                }
            }
        }
        // Entry is stale. The read guard above is gone at this point; the map
        // must not be mutated while a guard for the same key is held.
        self.history.remove(user_id);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn rewriting_a_member_replaces_its_score() {
        let cache = LeaderboardCache::new(TTL);
        cache.update_score("alice", "u1", 80).await;
        cache.update_score("alice", "u1", 95).await;
        cache.update_score("bob", "u2", 90).await;

        assert_eq!(
            cache.top_players(10).await,
            vec!["alice:u1".to_owned(), "bob:u2".to_owned()]
        );
    }

    #[tokio::test]
    async fn same_username_for_two_users_keeps_two_entries() {
        let cache = LeaderboardCache::new(TTL);
        cache.update_score("alice", "u1", 80).await;
        cache.update_score("alice", "u2", 70).await;

        assert_eq!(
            cache.top_players(10).await,
            vec!["alice:u1".to_owned(), "alice:u2".to_owned()]
        );
    }

    #[tokio::test]
    async fn ties_rank_the_most_recently_updated_member_first() {
        let cache = LeaderboardCache::new(TTL);
        cache.update_score("ann", "u1", 50).await;
        cache.update_score("ben", "u2", 70).await;
        cache.update_score("cat", "u3", 70).await;

        assert_eq!(
            cache.top_players(10).await,
            vec!["cat:u3".to_owned(), "ben:u2".to_owned(), "ann:u1".to_owned()]
        );

        // Refreshing ben's score moves him ahead of cat within the tie.
        cache.update_score("ben", "u2", 70).await;
        assert_eq!(
            cache.top_players(10).await,
            vec!["ben:u2".to_owned(), "cat:u3".to_owned(), "ann:u1".to_owned()]
        );
    }

    #[tokio::test]
    async fn top_players_respects_the_limit() {
        let cache = LeaderboardCache::new(TTL);
        for (name, id, wpm) in [("a", "u1", 10), ("b", "u2", 20), ("c", "u3", 30)] {
            cache.update_score(name, id, wpm).await;
        }

        assert_eq!(
            cache.top_players(2).await,
            vec!["c:u3".to_owned(), "b:u2".to_owned()]
        );
    }

    #[test]
    fn history_round_trips_and_distinguishes_empty_from_missing() {
        let cache = LeaderboardCache::new(TTL);
        cache.cache_history("u1", "[]".to_owned());

        assert_eq!(cache.cached_history("u1"), Some("[]".to_owned()));
        assert_eq!(cache.cached_history("nobody"), None);
    }

    #[test]
    fn expired_history_reads_as_a_miss() {
        let cache = LeaderboardCache::new(Duration::ZERO);
        cache.cache_history("u1", "[{\"wpm\":90}]".to_owned());

        assert_eq!(cache.cached_history("u1"), None);
        assert_eq!(cache.cached_history("u1"), None);
    }
}
