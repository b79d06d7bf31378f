pub mod hub;
pub mod leaderboard;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::bus::MessageBus;
use crate::config::AppConfig;
use crate::dao::match_store::MatchStore;
use crate::error::ServiceError;

pub use self::hub::{SessionHandle, SessionHub};
pub use self::leaderboard::LeaderboardCache;

pub type SharedState = Arc<AppState>;

/// Central application state shared by handlers and background tasks.
pub struct AppState {
    config: AppConfig,
    hub: SessionHub,
    leaderboard: LeaderboardCache,
    bus: Arc<dyn MessageBus>,
    match_store: RwLock<Option<Arc<dyn MatchStore>>>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a match store is installed.
    pub fn new(config: AppConfig, bus: Arc<dyn MessageBus>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let hub = SessionHub::new(config.hub_command_capacity);
        let leaderboard = LeaderboardCache::new(config.history_ttl());

        Arc::new(Self {
            config,
            hub,
            leaderboard,
            bus,
            match_store: RwLock::new(None),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration the instance was started with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Coordinator owning the live-session set.
    pub fn hub(&self) -> &SessionHub {
        &self.hub
    }

    /// Ranking and match-history cache.
    pub fn leaderboard(&self) -> &LeaderboardCache {
        &self.leaderboard
    }

    /// Handle to the cross-instance message bus.
    pub fn bus(&self) -> Arc<dyn MessageBus> {
        self.bus.clone()
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn match_store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.match_store.read().await;
        guard.as_ref().cloned()
    }

    /// Like [`AppState::match_store`], but degrades into a [`ServiceError`]
    /// when no store is installed.
    pub async fn require_match_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        self.match_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn install_match_store(&self, store: Arc<dyn MatchStore>) {
        {
            let mut guard = self.match_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_match_store(&self) {
        {
            let mut guard = self.match_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.match_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    fn update_degraded(&self, value: bool) {
        if *self.degraded.borrow() == value {
            return;
        }

        let _ = self.degraded.send(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;
    use crate::dao::match_store::memory::MemoryMatchStore;

    fn state() -> SharedState {
        let config = AppConfig::default();
        let bus = Arc::new(LocalBus::new(config.bus_channel_capacity));
        AppState::new(config, bus)
    }

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = state();
        assert!(state.is_degraded().await);
        assert!(state.require_match_store().await.is_err());

        state
            .install_match_store(Arc::new(MemoryMatchStore::new()))
            .await;
        assert!(!state.is_degraded().await);
        assert!(state.require_match_store().await.is_ok());
    }

    #[tokio::test]
    async fn watcher_follows_store_installs_and_removals() {
        let state = state();
        let mut watcher = state.degraded_watcher();
        assert!(*watcher.borrow_and_update());

        state
            .install_match_store(Arc::new(MemoryMatchStore::new()))
            .await;
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow_and_update());

        state.clear_match_store().await;
        watcher.changed().await.unwrap();
        assert!(*watcher.borrow_and_update());

        state
            .install_match_store(Arc::new(MemoryMatchStore::new()))
            .await;
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow_and_update());
    }

    #[tokio::test]
    async fn reinstalling_a_store_does_not_renotify_watchers() {
        let state = state();
        let mut watcher = state.degraded_watcher();

        state
            .install_match_store(Arc::new(MemoryMatchStore::new()))
            .await;
        watcher.changed().await.unwrap();
        assert!(!*watcher.borrow_and_update());

        state
            .install_match_store(Arc::new(MemoryMatchStore::new()))
            .await;
        assert!(!watcher.has_changed().unwrap());
    }
}
