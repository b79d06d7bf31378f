use crate::state::SharedState;

/// Current global ranking as `"username:user_id"` members, best first.
///
/// `limit` falls back to the configured default when absent.
pub async fn top_players(state: &SharedState, limit: Option<usize>) -> Vec<String> {
    let limit = limit.unwrap_or(state.config().leaderboard_limit);
    state.leaderboard().top_players(limit).await
}
