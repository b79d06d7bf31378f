/// OpenAPI documentation generation.
pub mod documentation;
/// Inbound event decoding and routing.
pub mod event_service;
/// Health check service.
pub mod health_service;
/// Match history lookups backed by the TTL cache.
pub mod history_service;
/// Global ranking queries.
pub mod leaderboard_service;
/// Cross-instance broadcast relay.
pub mod relay_service;
/// Storage reconnection supervisor.
pub mod storage_supervisor;
/// WebSocket connection and message handling service.
pub mod websocket_service;
