use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/health` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall status ("ok" or "degraded").
    pub status: String,
    /// Storage backend status ("connected", "unhealthy", or "unavailable").
    pub storage: String,
    /// Number of live WebSocket sessions on this instance.
    pub sessions: usize,
}
