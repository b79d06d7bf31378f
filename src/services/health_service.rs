use tokio::time::timeout;
use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness and dependency status while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let storage = match state.require_match_store().await {
        Ok(store) => {
            match timeout(state.config().storage_timeout(), store.health_check()).await {
                Ok(Ok(())) => "connected",
                Ok(Err(err)) => {
                    warn!(error = %err, "storage health check failed");
                    "unhealthy"
                }
                Err(_) => {
                    warn!("storage health check timed out");
                    "unhealthy"
                }
            }
        }
        Err(_) => {
            warn!("storage unavailable (degraded mode)");
            "unavailable"
        }
    };

    let status = if state.is_degraded().await {
        "degraded"
    } else {
        "ok"
    };

    HealthResponse {
        status: status.to_owned(),
        storage: storage.to_owned(),
        sessions: state.hub().session_count().await,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        bus::LocalBus, config::AppConfig, dao::match_store::memory::MemoryMatchStore,
        state::AppState,
    };

    #[tokio::test]
    async fn reports_degraded_until_a_store_is_installed() {
        let config = AppConfig::default();
        let bus = Arc::new(LocalBus::new(config.bus_channel_capacity));
        let state = AppState::new(config, bus);

        let response = health_status(&state).await;
        assert_eq!(response.status, "degraded");
        assert_eq!(response.storage, "unavailable");

        state
            .install_match_store(Arc::new(MemoryMatchStore::new()))
            .await;

        let response = health_status(&state).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.storage, "connected");
        assert_eq!(response.sessions, 0);
    }
}
