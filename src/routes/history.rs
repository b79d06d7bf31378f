use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use crate::{
    dto::history::MatchHistoryEntry, error::AppError, services::history_service,
    state::SharedState,
};

#[derive(Debug, Deserialize)]
/// Query parameters accepted by the history endpoint.
pub struct HistoryParams {
    #[serde(default)]
    user_id: String,
}

/// Return the most recent matches for a user, newest first.
#[utoipa::path(
    get,
    path = "/history",
    params(("user_id" = String, Query, description = "User whose history to fetch")),
    responses(
        (status = 200, description = "Most recent matches, newest first", body = [MatchHistoryEntry]),
        (status = 400, description = "Missing user_id parameter"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn match_history(
    State(state): State<SharedState>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let blob = history_service::match_history(&state, &params.user_id).await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], blob))
}

/// Configure the history routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/history", get(match_history))
}
