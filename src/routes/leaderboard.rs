use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::{services::leaderboard_service, state::SharedState};

#[derive(Debug, Deserialize)]
/// Query parameters accepted by the leaderboard endpoint.
pub struct LeaderboardParams {
    limit: Option<usize>,
}

/// Return the global ranking as `username:user_id` members, best first.
#[utoipa::path(
    get,
    path = "/leaderboard",
    params(("limit" = Option<usize>, Query, description = "Maximum number of entries")),
    responses((status = 200, description = "Ranked members, best first", body = [String]))
)]
pub async fn top_players(
    State(state): State<SharedState>,
    Query(params): Query<LeaderboardParams>,
) -> Json<Vec<String>> {
    Json(leaderboard_service::top_players(&state, params.limit).await)
}

/// Configure the leaderboard routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/leaderboard", get(top_players))
}
