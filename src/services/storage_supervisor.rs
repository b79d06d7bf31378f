use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{match_store::MatchStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Keep a healthy match store installed, holding the shared state in degraded
/// mode whenever the backend is unreachable.
///
/// `connect` is invoked for the initial connection and again from scratch when
/// an established store stops answering health checks and cannot be
/// reconnected.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn MatchStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_match_store(store.clone()).await;
                info!("match store connected; leaving degraded mode");
                delay = INITIAL_DELAY;

                supervise(&state, store).await;
            }
            Err(err) => {
                warn!(error = %err, "match store connection attempt failed");
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Poll the installed store until it fails health checks beyond repair.
async fn supervise(state: &SharedState, store: Arc<dyn MatchStore>) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded().await {
                    info!("match store healthy again; leaving degraded mode");
                    state.install_match_store(store.clone()).await;
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(_) => {
                if reconnect_with_backoff(state, store.as_ref()).await {
                    state.install_match_store(store.clone()).await;
                    sleep(HEALTH_POLL_INTERVAL).await;
                } else {
                    warn!("exhausted match store reconnect attempts; staying in degraded mode");
                    return;
                }
            }
        }
    }
}

/// Drive a bounded series of reconnect attempts, entering degraded mode on the
/// first failure. Returns whether the store answered again.
async fn reconnect_with_backoff(state: &SharedState, store: &dyn MatchStore) -> bool {
    let mut delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!("match store reconnected after a failed health check");
                return true;
            }
            Err(err) if attempt == 0 => {
                warn!(
                    attempt, error = %err,
                    "match store reconnect failed; entering degraded mode"
                );
                state.clear_match_store().await;
            }
            Err(err) => {
                warn!(attempt, error = %err, "match store reconnect attempt failed");
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }

    false
}
