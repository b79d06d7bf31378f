use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Typerace Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::history::match_history,
        crate::routes::leaderboard::top_players,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::history::MatchHistoryEntry,
            crate::dto::ws::Envelope,
            crate::dto::ws::JoinLobbyPayload,
            crate::dto::ws::TypingUpdatePayload,
            crate::dto::ws::ChatMessagePayload,
            crate::dto::ws::GameEndPayload,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "history", description = "Per-user match history"),
        (name = "leaderboard", description = "Global ranking"),
        (name = "websocket", description = "Real-time race event stream"),
    )
)]
pub struct ApiDoc;
